#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use timetable_client::api::{JobStatusResponse, TimetableApi};
use timetable_client::error::ApiError;
use timetable_client::settings::SettingsSnapshot;

/// Scripted stand-in for the remote API.
#[derive(Default)]
pub struct FakeApi {
    pub start_results: Mutex<VecDeque<Result<String, ApiError>>>,
    pub status_results: Mutex<VecDeque<Result<JobStatusResponse, ApiError>>>,
    pub status_calls: Mutex<Vec<String>>,
    pub saved: Mutex<Vec<SettingsSnapshot>>,
    /// How long `start_job` takes to answer.
    pub start_delay: Duration,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_start(self, result: Result<String, ApiError>) -> Self {
        self.start_results.lock().unwrap().push_back(result);
        self
    }

    pub fn with_start_delay(mut self, delay: Duration) -> Self {
        self.start_delay = delay;
        self
    }

    pub fn with_status(self, result: Result<JobStatusResponse, ApiError>) -> Self {
        self.status_results.lock().unwrap().push_back(result);
        self
    }

    pub fn status_call_count(&self) -> usize {
        self.status_calls.lock().unwrap().len()
    }
}

pub fn http_error() -> ApiError {
    ApiError::Status {
        status: 502,
        url: "http://backend/api/jobs".into(),
    }
}

pub fn finished(result: serde_json::Value) -> JobStatusResponse {
    JobStatusResponse {
        status: "finished".into(),
        result: Some(result),
    }
}

pub fn success_payload() -> serde_json::Value {
    json!({
        "status": "success",
        "classes": {
            "1A": {"Mo": ["Math (Smith)", "free"], "Tu": ["free", "Art (Lee)"]},
            "1B": {"Mo": ["Art (Lee)", "Math (Smith)"], "Tu": ["free", "free"]}
        },
        "teachers": {
            "Lee": {"Mo": ["Art (1B)", "free"], "Tu": ["free", "Art (1A)"]},
            "Smith": {"Mo": ["Math (1A)", "Math (1B)"], "Tu": ["free", "free"]}
        }
    })
}

#[async_trait]
impl TimetableApi for FakeApi {
    async fn start_job(&self) -> Result<String, ApiError> {
        if !self.start_delay.is_zero() {
            tokio::time::sleep(self.start_delay).await;
        }
        self.start_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok("job-default".into()))
    }

    async fn job_status(&self, job_id: &str) -> Result<JobStatusResponse, ApiError> {
        self.status_calls.lock().unwrap().push(job_id.to_string());
        self.status_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(finished(success_payload())))
    }

    async fn save_settings(&self, settings: &SettingsSnapshot) -> Result<(), ApiError> {
        self.saved.lock().unwrap().push(settings.clone());
        Ok(())
    }
}
