use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use timetable_client::settings::SettingsSnapshot;

#[derive(Clone, Debug)]
pub enum JobStatus {
    Pending {
        started_at: DateTime<Utc>,
    },
    /// The solver ran; `result.status` tells whether it found a timetable.
    Finished {
        result: Value,
        finished_at: DateTime<Utc>,
    },
    Failed {
        error: String,
        finished_at: DateTime<Utc>,
    },
}

impl JobStatus {
    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        match self {
            JobStatus::Pending { .. } => None,
            JobStatus::Finished { finished_at, .. } | JobStatus::Failed { finished_at, .. } => {
                Some(*finished_at)
            }
        }
    }
}

#[derive(Clone, Debug)]
pub struct AppState {
    pub jobs: Arc<DashMap<Uuid, JobStatus>>,
    /// Last settings accepted by `POST /api/settings`.
    pub settings: Arc<RwLock<Option<SettingsSnapshot>>>,
    /// Artificial wait before solving, so clients can show their countdown.
    pub solve_delay: Duration,
    /// How long a finished job stays pollable.
    pub job_ttl: Duration,
}

impl AppState {
    pub fn new(solve_delay: Duration, job_ttl: Duration) -> Self {
        AppState {
            jobs: Arc::new(DashMap::new()),
            settings: Arc::new(RwLock::new(None)),
            solve_delay,
            job_ttl,
        }
    }

    /// Drops jobs that finished more than `job_ttl` before `now`. Returns how
    /// many were removed.
    pub fn prune_finished(&self, now: DateTime<Utc>) -> usize {
        let ttl = chrono::Duration::from_std(self.job_ttl).unwrap_or(chrono::Duration::MAX);
        let before = self.jobs.len();
        self.jobs
            .retain(|_, status| status.finished_at().map_or(true, |at| now - at <= ttl));
        before - self.jobs.len()
    }
}
