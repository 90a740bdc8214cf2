use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, COOKIE};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ApiError;
use crate::settings::SettingsSnapshot;

/// Job status reported once the solver has stopped.
pub const STATUS_FINISHED: &str = "finished";
/// Result status of a successful solve.
pub const RESULT_SUCCESS: &str = "success";

/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE: &str = "session";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct StartJobResponse {
    pub job_id: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct JobStatusResponse {
    pub status: String,
    /// Left as raw JSON; shape checks belong to the decoder.
    #[serde(default)]
    pub result: Option<serde_json::Value>,
}

impl JobStatusResponse {
    pub fn is_finished(&self) -> bool {
        self.status == STATUS_FINISHED
    }

    pub fn result_status(&self) -> Option<&str> {
        self.result.as_ref()?.get("status")?.as_str()
    }
}

/// Remote collaborators of the generation controller.
#[async_trait]
pub trait TimetableApi: Send + Sync {
    /// Starts a generation job from the last saved settings.
    async fn start_job(&self) -> Result<String, ApiError>;

    async fn job_status(&self, job_id: &str) -> Result<JobStatusResponse, ApiError>;

    async fn save_settings(&self, settings: &SettingsSnapshot) -> Result<(), ApiError>;
}

pub struct HttpTimetableApi {
    client: Client,
    base_url: Url,
    headers: HeaderMap,
}

impl HttpTimetableApi {
    pub fn new(
        mut base_url: Url,
        session_token: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(token) = session_token {
            let cookie = HeaderValue::from_str(&format!("{SESSION_COOKIE}={token}"))
                .map_err(|_| ApiError::InvalidCookie)?;
            headers.insert(COOKIE, cookie);
        }

        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            base_url,
            headers,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.base_url.join(path)?)
    }

    fn job_url(&self, job_id: &str) -> Result<Url, ApiError> {
        let mut url = self.endpoint("api/jobs")?;
        url.path_segments_mut()
            .map_err(|_| ApiError::Url(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .push(job_id);
        Ok(url)
    }
}

fn check_status(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(ApiError::Status {
            status: status.as_u16(),
            url: response.url().to_string(),
        })
    }
}

#[async_trait]
impl TimetableApi for HttpTimetableApi {
    async fn start_job(&self) -> Result<String, ApiError> {
        let url = self.endpoint("api/jobs")?;
        let response = self
            .client
            .post(url)
            .headers(self.headers.clone())
            .send()
            .await?;
        let created = check_status(response)?.json::<StartJobResponse>().await?;
        tracing::debug!(job_id = %created.job_id, "generation job started");
        Ok(created.job_id)
    }

    async fn job_status(&self, job_id: &str) -> Result<JobStatusResponse, ApiError> {
        let url = self.job_url(job_id)?;
        let response = self
            .client
            .get(url)
            .headers(self.headers.clone())
            .send()
            .await?;
        Ok(check_status(response)?.json::<JobStatusResponse>().await?)
    }

    async fn save_settings(&self, settings: &SettingsSnapshot) -> Result<(), ApiError> {
        let url = self.endpoint("api/settings")?;
        let response = self
            .client
            .post(url)
            .headers(self.headers.clone())
            .json(settings)
            .send()
            .await?;
        check_status(response)?;
        Ok(())
    }
}
