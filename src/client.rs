use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use std::time::Duration;
use tracing::{debug, info};

use crate::config::ApiConfig;
use crate::job::{Job, JobId};
use crate::poller::StatusSource;
use crate::request::SubmissionForm;
use crate::{Result, VideoError};

/// HTTP client for the `/videos` API
#[derive(Clone)]
pub struct VideoClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    request_timeout: Duration,
}

impl VideoClient {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .build()
            .map_err(|e| VideoError::Config(format!("cannot build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            request_timeout: config.request_timeout(),
        })
    }

    fn videos_url(&self) -> String {
        format!("{}/videos", self.base_url)
    }

    fn status_url(&self, job_id: &JobId) -> String {
        format!("{}/videos/{}", self.base_url, job_id)
    }

    pub(crate) fn content_url(&self, job_id: &JobId) -> String {
        format!("{}/videos/{}/content", self.base_url, job_id)
    }

    /// Create a generation job. Never retried.
    pub async fn submit(&self, form: SubmissionForm) -> Result<Job> {
        let url = self.videos_url();
        debug!("Sending submission to {}", url);

        let response = self
            .client
            .post(&url)
            .header(AUTHORIZATION, &self.api_key)
            .header(ACCEPT, "application/json")
            .timeout(self.request_timeout)
            .multipart(form.into_multipart()?)
            .send()
            .await
            .map_err(|e| VideoError::Submission {
                status: None,
                message: e.to_string(),
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| VideoError::Submission {
            status: Some(status.as_u16()),
            message: format!("failed to read response body: {}", e),
        })?;

        if !status.is_success() {
            return Err(VideoError::Submission {
                status: Some(status.as_u16()),
                message: body,
            });
        }

        let job: Job = serde_json::from_str(&body).map_err(|e| VideoError::Submission {
            status: Some(status.as_u16()),
            message: format!("unexpected response ({}): {}", e, body),
        })?;

        if job.id.as_str().is_empty() {
            return Err(VideoError::Submission {
                status: Some(status.as_u16()),
                message: format!("response did not include a job id: {}", body),
            });
        }

        info!("✅ Job submitted: {} (status: {})", job.id, job.status);
        if let Some(created_at) = job.created_at {
            info!("   - created at: {}", created_at.format("%Y-%m-%d %H:%M:%S UTC"));
        }
        Ok(job)
    }

    /// Fetch the current job record
    pub async fn fetch_job(&self, job_id: &JobId) -> Result<Job> {
        let response = self
            .client
            .get(self.status_url(job_id))
            .header(AUTHORIZATION, &self.api_key)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| VideoError::Poll {
                status: None,
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = error_body(response).await;
            return Err(VideoError::Poll {
                status: Some(status.as_u16()),
                message: text,
            });
        }

        response.json::<Job>().await.map_err(|e| VideoError::Poll {
            status: Some(status.as_u16()),
            message: format!("cannot decode status response: {}", e),
        })
    }

    /// Open the artifact stream. The response body has not been read yet.
    pub(crate) async fn open_content(&self, job_id: &JobId) -> Result<reqwest::Response> {
        let response = self
            .client
            .get(self.content_url(job_id))
            .header(AUTHORIZATION, &self.api_key)
            .send()
            .await
            .map_err(|e| VideoError::Download {
                status: None,
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = error_body(response).await;
            return Err(VideoError::Download {
                status: Some(status.as_u16()),
                message: text,
            });
        }

        Ok(response)
    }
}

/// Body of an error response, or a marker when it cannot be read
async fn error_body(response: reqwest::Response) -> String {
    response
        .text()
        .await
        .unwrap_or_else(|e| format!("<unreadable body: {}>", e))
}

#[async_trait]
impl StatusSource for VideoClient {
    async fn fetch_status(&self, job_id: &JobId) -> Result<Job> {
        self.fetch_job(job_id).await
    }
}
