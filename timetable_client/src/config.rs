use std::env;
use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::controller::RetentionPolicy;

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:3000";
pub const DEFAULT_STATE_DIR: &str = ".timetable";
pub const DEFAULT_TICK_MS: u64 = 1000;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the job execution and settings API.
    pub api_url: Url,
    /// Session token sent as the `session` cookie.
    pub session_token: Option<String>,
    /// Directory holding the persisted application state.
    pub state_dir: PathBuf,
    pub tick_interval: Duration,
    pub request_timeout: Duration,
    pub retention: RetentionPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: Url::parse(DEFAULT_API_URL).expect("default api url is valid"),
            session_token: None,
            state_dir: PathBuf::from(DEFAULT_STATE_DIR),
            tick_interval: Duration::from_millis(DEFAULT_TICK_MS),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            retention: RetentionPolicy::DiscardOnStart,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} is not a valid url: {source}")]
    InvalidUrl {
        name: &'static str,
        source: url::ParseError,
    },

    #[error("{name} must be a positive integer, got {value:?}")]
    InvalidNumber { name: &'static str, value: String },
}

impl ClientConfig {
    /// Reads `TIMETABLE_*` variables, falling back to the defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut cfg = Self::default();

        if let Some(url) = lookup("TIMETABLE_API_URL") {
            cfg.api_url = Url::parse(&url).map_err(|source| ConfigError::InvalidUrl {
                name: "TIMETABLE_API_URL",
                source,
            })?;
        }
        cfg.session_token = lookup("TIMETABLE_SESSION").filter(|s| !s.is_empty());
        if let Some(dir) = lookup("TIMETABLE_STATE_DIR") {
            cfg.state_dir = PathBuf::from(dir);
        }
        if let Some(ms) = lookup("TIMETABLE_TICK_MS") {
            cfg.tick_interval = Duration::from_millis(parse_positive("TIMETABLE_TICK_MS", &ms)?);
        }
        if let Some(secs) = lookup("TIMETABLE_TIMEOUT_SECS") {
            cfg.request_timeout =
                Duration::from_secs(parse_positive("TIMETABLE_TIMEOUT_SECS", &secs)?);
        }
        if let Some(keep) = lookup("TIMETABLE_KEEP_PREVIOUS") {
            cfg.retention = retention_from_flag(&keep);
        }

        Ok(cfg)
    }
}

fn parse_positive(name: &'static str, value: &str) -> Result<u64, ConfigError> {
    match value.trim().parse::<u64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::InvalidNumber {
            name,
            value: value.to_string(),
        }),
    }
}

pub fn retention_from_flag(keep_previous: &str) -> RetentionPolicy {
    match keep_previous.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => RetentionPolicy::KeepUntilSuccess,
        _ => RetentionPolicy::DiscardOnStart,
    }
}
