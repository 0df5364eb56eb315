use async_trait::async_trait;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::job::{CompletedJob, Job, JobId, JobStatus};
use crate::{Result, VideoError};

/// Anything that can report the current state of a job
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn fetch_status(&self, job_id: &JobId) -> Result<Job>;
}

/// How long and how often to poll, and how many failed queries to tolerate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    interval: Duration,
    max_wait: Duration,
    max_consecutive_failures: Option<u32>,
}

impl RetryPolicy {
    pub fn new(interval: Duration, max_wait: Duration) -> Self {
        Self {
            interval,
            max_wait,
            max_consecutive_failures: None,
        }
    }

    /// Cap consecutive transient failures; `None` leaves only `max_wait`
    pub fn with_max_consecutive_failures(mut self, limit: Option<u32>) -> Self {
        self.max_consecutive_failures = limit;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn max_wait(&self) -> Duration {
        self.max_wait
    }

    pub fn max_consecutive_failures(&self) -> Option<u32> {
        self.max_consecutive_failures
    }

    fn exhausted(&self, consecutive_failures: u32) -> bool {
        self.max_consecutive_failures
            .map(|limit| consecutive_failures > limit)
            .unwrap_or(false)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(30), Duration::from_secs(600))
    }
}

/// Polls a job until the service reports `completed` or `failed`
#[derive(Debug, Clone)]
pub struct StatusPoller {
    policy: RetryPolicy,
}

impl StatusPoller {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Query `source` every interval until the job is terminal.
    ///
    /// Elapsed time counts from the first query. Transient query errors are
    /// logged and retried; a `failed` status or any non-transient error ends
    /// polling immediately.
    pub async fn poll_until_terminal<S>(&self, source: &S, job_id: &JobId) -> Result<CompletedJob>
    where
        S: StatusSource + ?Sized,
    {
        info!(
            "💡 Polling job {} every {}s (max wait {}s)",
            job_id,
            self.policy.interval.as_secs(),
            self.policy.max_wait.as_secs()
        );

        let started = Instant::now();
        let mut last_status: Option<JobStatus> = None;
        let mut consecutive_failures = 0u32;

        loop {
            let elapsed = started.elapsed();
            if elapsed > self.policy.max_wait {
                warn!("⏱️ Gave up on job {} after {}s", job_id, elapsed.as_secs());
                return Err(VideoError::Timeout {
                    job_id: job_id.to_string(),
                    waited: elapsed,
                    last_status,
                });
            }

            info!("🔍 Checking status... ({}s elapsed)", elapsed.as_secs());

            match source.fetch_status(job_id).await {
                Ok(job) => {
                    if job.id != *job_id {
                        return Err(VideoError::InvalidResponse(format!(
                            "status query for job {} returned job {}",
                            job_id, job.id
                        )));
                    }
                    consecutive_failures = 0;
                    log_progress(&job);

                    match job.status {
                        JobStatus::Completed => {
                            let completed = CompletedJob::try_from(job)?;
                            info!("✅ Video generation completed: {}", completed.url());
                            return Ok(completed);
                        }
                        JobStatus::Failed => {
                            let reason = job.failure_reason();
                            warn!("❌ Video generation failed for job {}", job_id);
                            return Err(VideoError::GenerationFailed {
                                job_id: job_id.to_string(),
                                reason,
                            });
                        }
                        JobStatus::Submitted | JobStatus::InProgress => {
                            info!(
                                "⏳ Still generating, checking again in {}s",
                                self.policy.interval.as_secs()
                            );
                        }
                        JobStatus::Unknown(ref raw) => {
                            warn!("⚠️ Unknown status: {}", raw);
                        }
                    }
                    last_status = Some(job.status);
                }
                Err(e) if e.is_transient() => {
                    consecutive_failures += 1;
                    warn!(
                        "❌ Status query failed ({} in a row): {}",
                        consecutive_failures, e
                    );
                    if self.policy.exhausted(consecutive_failures) {
                        return Err(e);
                    }
                }
                Err(e) => return Err(e),
            }

            tokio::time::sleep(self.policy.interval).await;
        }
    }
}

fn log_progress(job: &Job) {
    match job.progress {
        Some(progress) => info!("   - status: {} ({:.0}%)", job.status, progress),
        None => info!("   - status: {}", job.status),
    }
}
