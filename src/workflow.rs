use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::info;

use crate::client::VideoClient;
use crate::config::Config;
use crate::download::{artifact_file_name, FileStats};
use crate::job::CompletedJob;
use crate::poller::StatusPoller;
use crate::request::{SubmissionForm, SubmissionMode};
use crate::Result;

/// Everything a successful run produced
#[derive(Debug, Clone)]
pub struct WorkflowOutcome {
    pub job: CompletedJob,
    pub mode: SubmissionMode,
    pub file: FileStats,
    pub elapsed: Duration,
}

/// Submit, poll, and download, strictly in that order
pub struct Workflow {
    config: Config,
    client: VideoClient,
    poller: StatusPoller,
    output_override: Option<PathBuf>,
}

impl Workflow {
    pub fn new(config: Config) -> Result<Self> {
        let client = VideoClient::new(&config.api)?;
        let poller = StatusPoller::new(config.polling.retry_policy());

        Ok(Self {
            config,
            client,
            poller,
            output_override: None,
        })
    }

    /// Write the artifact to this exact path instead of the derived name
    pub fn with_output_path(mut self, path: Option<PathBuf>) -> Self {
        self.output_override = path;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run the full workflow. The first failing step's error is returned as-is.
    pub async fn run(&self) -> Result<WorkflowOutcome> {
        let started = Instant::now();

        info!("{}", "=".repeat(60));
        info!("Step 1: submit video generation request");
        info!("{}", "=".repeat(60));
        let form = SubmissionForm::build(&self.config.request.parameters()).await?;
        let mode = form.mode();
        form.log_summary();
        let job = self.client.submit(form).await?;
        info!("   ⏱️  Generation usually takes 3-5 minutes");

        info!("{}", "=".repeat(60));
        info!("Step 2: poll generation status");
        info!("{}", "=".repeat(60));
        let completed = self.poller.poll_until_terminal(&self.client, &job.id).await?;

        info!("{}", "=".repeat(60));
        info!("Step 3: download video");
        info!("{}", "=".repeat(60));
        let destination = self.output_override.clone().unwrap_or_else(|| {
            self.config.output.dir.join(artifact_file_name(
                &self.config.output.file_prefix,
                mode,
                &job.id,
            ))
        });
        let file = self.client.download(&job.id, &destination).await?;

        Ok(WorkflowOutcome {
            job: completed,
            mode,
            file,
            elapsed: started.elapsed(),
        })
    }
}
