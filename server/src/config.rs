use std::env;
use std::time::Duration;

pub const DEFAULT_ADDR: &str = "127.0.0.1:3000";
pub const DEFAULT_SOLVE_DELAY_SECS: u64 = 5;
pub const DEFAULT_JOB_TTL_SECS: u64 = 600;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: String,
    /// Allowed CORS origin. Any origin is allowed when unset.
    pub client_url: Option<String>,
    pub solve_delay: Duration,
    /// How long finished jobs stay pollable.
    pub job_ttl: Duration,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, String> {
        let solve_delay = secs_var("SOLVE_DELAY_SECS", DEFAULT_SOLVE_DELAY_SECS)?;
        let job_ttl = secs_var("JOB_TTL_SECS", DEFAULT_JOB_TTL_SECS)?;

        Ok(ServerConfig {
            addr: env::var("SERVER_ADDR").unwrap_or_else(|_| DEFAULT_ADDR.to_string()),
            client_url: env::var("CLIENT_URL").ok().filter(|url| !url.is_empty()),
            solve_delay: Duration::from_secs(solve_delay),
            job_ttl: Duration::from_secs(job_ttl),
        })
    }
}

fn secs_var(name: &str, default: u64) -> Result<u64, String> {
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| format!("{name} must be a number of seconds, got {raw:?}")),
        Err(_) => Ok(default),
    }
}
