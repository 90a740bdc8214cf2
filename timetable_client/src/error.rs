use thiserror::Error;

/// Failure talking to the job execution or settings API.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    #[error("invalid session cookie")]
    InvalidCookie,

    #[error("{url} answered with HTTP {status}")]
    Status { status: u16, url: String },
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("stored state is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Structural violation in a job result payload.
#[derive(Error, Debug, PartialEq)]
pub enum DecodeError {
    #[error("result payload has the wrong shape: {0}")]
    Shape(String),

    #[error("unknown day code {code:?} for {owner}")]
    UnknownDay { owner: String, code: String },

    #[error("malformed slot {slot:?} for class {class_name} on {day} period {period}")]
    MalformedSlot {
        class_name: String,
        day: String,
        period: u32,
        slot: String,
    },
}

#[derive(Error, Debug, PartialEq)]
pub enum SettingsError {
    #[error("duplicate {kind} name: {name}")]
    Duplicate { kind: &'static str, name: String },

    #[error("class {class_name} references unknown {kind} {name}")]
    UnknownReference {
        class_name: String,
        kind: &'static str,
        name: String,
    },

    #[error("{kind} name {name:?} cannot be used in a timetable slot")]
    InvalidName { kind: &'static str, name: String },

    #[error("periods per day must be at least 1")]
    NoPeriods,

    #[error("class {class_name} needs {needed} periods but the week only has {capacity}")]
    OverCapacity {
        class_name: String,
        needed: u32,
        capacity: u32,
    },
}

/// Terminal outcome of a generation job, or a failure to persist its state.
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("could not start generation: {0}")]
    StartFailed(#[source] ApiError),

    #[error("generation was interrupted before the backend returned a job id")]
    StartInterrupted,

    #[error("generation did not finish in time (status {status:?})")]
    GenerationTimedOutOrFailed { status: String },

    #[error("solver rejected the problem (result status {status:?})")]
    GenerationRejected { status: String },

    #[error("could not fetch the generation result: {0}")]
    FetchError(#[source] ApiError),

    #[error("generation result is malformed: {0}")]
    MalformedResult(#[from] DecodeError),

    #[error(transparent)]
    Storage(#[from] StoreError),

    #[error("generation controller is not running")]
    ControllerStopped,
}

impl GenerationError {
    /// Short message for the alert banner.
    pub fn user_message(&self) -> &'static str {
        match self {
            GenerationError::StartFailed(_) => "Could not start timetable generation.",
            GenerationError::StartInterrupted => {
                "Timetable generation was interrupted before it started. Please try again."
            }
            GenerationError::GenerationTimedOutOrFailed { .. } => {
                "Timetable generation did not finish. Please try again."
            }
            GenerationError::GenerationRejected { .. } => {
                "No timetable could be generated for the current settings."
            }
            GenerationError::FetchError(_) => "Could not load the generated timetable.",
            GenerationError::MalformedResult(_) => "The generated timetable could not be read.",
            GenerationError::Storage(_) => "Could not save the timetable state.",
            GenerationError::ControllerStopped => "Timetable generation was interrupted.",
        }
    }
}

pub type Result<T> = std::result::Result<T, GenerationError>;
