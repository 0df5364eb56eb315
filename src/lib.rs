//! Sora Video - async video generation client
//!
//! Submits a generation job to a Sora-compatible `/videos` API, polls the job
//! until the service reports a terminal status, then streams the finished
//! artifact to disk.

pub mod config;
pub mod job;
pub mod request;
pub mod client;
pub mod poller;
pub mod download;
pub mod workflow;

use std::time::Duration;

// Re-export main types for easy access
pub use crate::config::{Config, ConfigBuilder};
pub use crate::job::{CompletedJob, Job, JobFailure, JobId, JobStatus};
pub use crate::request::{Attachment, RequestParameters, SubmissionForm, SubmissionMode};
pub use crate::client::VideoClient;
pub use crate::poller::{RetryPolicy, StatusPoller, StatusSource};
pub use crate::download::{artifact_file_name, DownloadProgress, FileStats};
pub use crate::workflow::{Workflow, WorkflowOutcome};

/// Result type for video generation operations
pub type Result<T> = std::result::Result<T, VideoError>;

/// Error types for video generation operations
#[derive(thiserror::Error, Debug)]
pub enum VideoError {
    #[error("Submission failed{}: {message}", fmt_status(.status))]
    Submission { status: Option<u16>, message: String },

    #[error("Video generation failed for job {job_id}{}", fmt_reason(.reason))]
    GenerationFailed { job_id: String, reason: Option<String> },

    #[error("Timed out after {}s waiting for job {job_id} (last status: {})",
        fmt_secs(.waited), fmt_last_status(.last_status))]
    Timeout {
        job_id: String,
        waited: Duration,
        last_status: Option<JobStatus>,
    },

    #[error("Download failed{}: {message}", fmt_status(.status))]
    Download { status: Option<u16>, message: String },

    #[error("Status query failed{}: {message}", fmt_status(.status))]
    Poll { status: Option<u16>, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl VideoError {
    /// Whether the poller may retry after this error
    pub fn is_transient(&self) -> bool {
        matches!(self, VideoError::Poll { .. })
    }
}

fn fmt_status(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {})", s)).unwrap_or_default()
}

fn fmt_secs(waited: &Duration) -> u64 {
    waited.as_secs()
}

fn fmt_last_status(status: &Option<JobStatus>) -> String {
    status
        .as_ref()
        .map(|s| s.to_string())
        .unwrap_or_else(|| "none".to_string())
}

fn fmt_reason(reason: &Option<String>) -> String {
    reason.as_ref().map(|r| format!(": {}", r)).unwrap_or_default()
}
