use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Result, VideoError};

/// Opaque job identifier issued by the video service
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Trailing `len` characters of the id, or the whole id when shorter
    pub fn suffix(&self, len: usize) -> &str {
        let count = self.0.chars().count();
        if count <= len {
            return &self.0;
        }
        let start = self
            .0
            .char_indices()
            .nth(count - len)
            .map(|(idx, _)| idx)
            .unwrap_or(0);
        &self.0[start..]
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Job status as reported by the service.
///
/// Anything outside the known vocabulary is kept verbatim in `Unknown` and is
/// treated as non-terminal.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum JobStatus {
    Submitted,
    InProgress,
    Completed,
    Failed,
    Unknown(String),
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    pub fn as_str(&self) -> &str {
        match self {
            JobStatus::Submitted => "submitted",
            JobStatus::InProgress => "in_progress",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Unknown(raw) => raw,
        }
    }
}

impl From<String> for JobStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "submitted" => JobStatus::Submitted,
            "in_progress" => JobStatus::InProgress,
            "completed" => JobStatus::Completed,
            "failed" => JobStatus::Failed,
            _ => JobStatus::Unknown(value),
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure details the service may attach to a `failed` job
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct JobFailure {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl JobFailure {
    /// Human-readable reason, if the service provided any
    pub fn describe(&self) -> Option<String> {
        match (&self.code, &self.message) {
            (Some(code), Some(message)) => Some(format!("{} ({})", message, code)),
            (None, Some(message)) => Some(message.clone()),
            (Some(code), None) => Some(code.clone()),
            (None, None) => None,
        }
    }
}

/// One remote video generation job, mirrored from the service.
///
/// The process never derives status locally; every field comes from the last
/// creation or status response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub status: JobStatus,
    #[serde(default)]
    pub progress: Option<f64>,
    #[serde(default, with = "chrono::serde::ts_seconds_option")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, with = "chrono::serde::ts_seconds_option")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub error: Option<JobFailure>,
}

impl Job {
    /// Failure reason reported by the service
    pub fn failure_reason(&self) -> Option<String> {
        self.error.as_ref().and_then(JobFailure::describe)
    }
}

/// A job the service reported as completed, with its result location
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedJob {
    job: Job,
    url: String,
    completed_at: DateTime<Utc>,
}

impl CompletedJob {
    pub fn id(&self) -> &JobId {
        &self.job.id
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.job.created_at
    }

    pub fn job(&self) -> &Job {
        &self.job
    }
}

impl TryFrom<Job> for CompletedJob {
    type Error = VideoError;

    fn try_from(job: Job) -> Result<Self> {
        if job.status != JobStatus::Completed {
            return Err(VideoError::InvalidResponse(format!(
                "job {} is {}, not completed",
                job.id, job.status
            )));
        }

        let url = job
            .url
            .clone()
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| {
                VideoError::InvalidResponse(format!("completed job {} has no result url", job.id))
            })?;

        let completed_at = job.completed_at.ok_or_else(|| {
            VideoError::InvalidResponse(format!(
                "completed job {} has no completion timestamp",
                job.id
            ))
        })?;

        Ok(Self { job, url, completed_at })
    }
}
