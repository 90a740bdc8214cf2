pub mod api;
pub mod clock;
pub mod config;
pub mod controller;
pub mod decode;
pub mod driver;
pub mod error;
pub mod estimate;
pub mod render;
pub mod settings;
pub mod storage;

use serde::{Deserialize, Serialize};

use crate::settings::SettingsSnapshot;

/// School day of a generated week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Day {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
}

impl Day {
    pub const ALL: [Day; 5] = [
        Day::Monday,
        Day::Tuesday,
        Day::Wednesday,
        Day::Thursday,
        Day::Friday,
    ];

    /// Two-letter code used by the job result payload.
    pub fn code(self) -> &'static str {
        match self {
            Day::Monday => "Mo",
            Day::Tuesday => "Tu",
            Day::Wednesday => "We",
            Day::Thursday => "Th",
            Day::Friday => "Fr",
        }
    }

    pub fn from_code(code: &str) -> Option<Day> {
        Day::ALL.into_iter().find(|d| d.code() == code)
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

impl std::fmt::Display for Day {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Day::Monday => "Monday",
            Day::Tuesday => "Tuesday",
            Day::Wednesday => "Wednesday",
            Day::Thursday => "Thursday",
            Day::Friday => "Friday",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LessonRecord {
    pub id: u32,
    pub day: Day,
    /// 1-based.
    pub period: u32,
    pub class_name: String,
    pub subject: String,
    pub teacher_name: String,
}

/// Lifecycle state of the remote generation job and its last decoded result.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct TimetableJobState {
    pub job_id: Option<String>,
    pub is_generating: bool,
    pub estimated_duration_seconds: u64,
    /// Milliseconds since the unix epoch, recorded at launch.
    pub start_timestamp: Option<i64>,
    pub exists: bool,
    pub class_names: Vec<String>,
    pub teacher_names: Vec<String>,
    pub num_periods: u32,
    pub lessons: Vec<LessonRecord>,
    #[serde(default)]
    pub epoch: u64,
    #[serde(default)]
    pub last_error: Option<String>,
    /// Launched, but the backend has not answered with a job id yet.
    #[serde(default)]
    pub starting: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Generating,
    /// Countdown over while the start request is still in flight.
    Starting,
    /// Ticking has finished but the job result has not been fetched yet.
    AwaitingResult,
    Succeeded,
    Failed,
}

impl Phase {
    pub fn is_settled(self) -> bool {
        !matches!(self, Phase::Generating | Phase::Starting | Phase::AwaitingResult)
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Idle => write!(f, "idle"),
            Phase::Generating => write!(f, "generating"),
            Phase::Starting => write!(f, "starting"),
            Phase::AwaitingResult => write!(f, "awaiting result"),
            Phase::Succeeded => write!(f, "succeeded"),
            Phase::Failed => write!(f, "failed"),
        }
    }
}

impl TimetableJobState {
    pub fn phase(&self) -> Phase {
        if self.is_generating {
            Phase::Generating
        } else if self.starting {
            Phase::Starting
        } else if self.job_id.is_some() {
            Phase::AwaitingResult
        } else if self.last_error.is_some() {
            Phase::Failed
        } else if self.exists {
            Phase::Succeeded
        } else {
            Phase::Idle
        }
    }

    /// No job is ticking, starting or waiting for its result.
    pub fn is_settled(&self) -> bool {
        self.phase().is_settled()
    }

    pub fn lessons_for_class<'a>(&'a self, class_name: &'a str) -> impl Iterator<Item = &'a LessonRecord> {
        self.lessons.iter().filter(move |l| l.class_name == class_name)
    }

    pub fn lessons_for_teacher<'a>(&'a self, teacher_name: &'a str) -> impl Iterator<Item = &'a LessonRecord> {
        self.lessons.iter().filter(move |l| l.teacher_name == teacher_name)
    }
}

/// Everything the client keeps across restarts, stored as one JSON blob.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct AppState {
    #[serde(default)]
    pub settings: SettingsSnapshot,
    #[serde(default)]
    pub settings_dirty: bool,
    #[serde(default)]
    pub timetable: TimetableJobState,
}
