use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use sora_video::{Config, SubmissionForm, Workflow};

#[tokio::main]
async fn main() {
    let matches = cli().get_matches();

    init_logging(matches.get_flag("verbose"));

    if let Err(e) = run(&matches).await {
        error!("❌ Workflow aborted: {:#}", e);
        std::process::exit(1);
    }
}

fn cli() -> Command {
    Command::new("sora-video")
        .version("0.1.0")
        .author("TigreRoll")
        .about("Generate a Sora-2 video: submit, poll until done, download")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file (default: sora-video.toml)")
        )
        .arg(
            Arg::new("prompt")
                .short('p')
                .long("prompt")
                .value_name("TEXT")
                .help("Video prompt")
        )
        .arg(
            Arg::new("image")
                .short('i')
                .long("image")
                .value_name("FILE")
                .help("Reference image for image-to-video")
        )
        .arg(
            Arg::new("model")
                .short('m')
                .long("model")
                .value_name("MODEL")
                .help("Model name, e.g. sora-2")
        )
        .arg(
            Arg::new("size")
                .short('s')
                .long("size")
                .value_name("WxH")
                .help("Output resolution, e.g. 1280x720 or 720x1280")
        )
        .arg(
            Arg::new("seconds")
                .long("seconds")
                .value_name("SECONDS")
                .help("Clip duration in seconds")
                .value_parser(clap::value_parser!(u32))
        )
        .arg(
            Arg::new("output-dir")
                .short('o')
                .long("output-dir")
                .value_name("DIR")
                .help("Directory for the downloaded video")
        )
        .arg(
            Arg::new("output")
                .long("output")
                .value_name("FILE")
                .help("Exact output file path (overrides the derived name)")
        )
        .arg(
            Arg::new("interval")
                .long("interval")
                .value_name("SECONDS")
                .help("Seconds between status checks")
                .value_parser(clap::value_parser!(u64))
        )
        .arg(
            Arg::new("max-wait")
                .long("max-wait")
                .value_name("SECONDS")
                .help("Give up polling after this many seconds")
                .value_parser(clap::value_parser!(u64))
        )
        .arg(
            Arg::new("dry-run")
                .long("dry-run")
                .help("Show the request that would be sent without calling the API")
                .action(clap::ArgAction::SetTrue)
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(clap::ArgAction::SetTrue)
        )
}

fn init_logging(verbose: bool) {
    if verbose {
        tracing_subscriber::fmt()
            .with_target(true)
            .with_env_filter(EnvFilter::new("debug"))
            .init();
    } else {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("sora_video=info,warn"));
        tracing_subscriber::fmt()
            .with_target(false)
            .with_env_filter(filter)
            .init();
    }
}

fn apply_cli_overrides(config: &mut Config, matches: &ArgMatches) {
    if let Some(prompt) = matches.get_one::<String>("prompt") {
        config.request.prompt = prompt.clone();
    }
    if let Some(image) = matches.get_one::<String>("image") {
        config.request.image_path = Some(PathBuf::from(image));
    }
    if let Some(model) = matches.get_one::<String>("model") {
        config.request.model = model.clone();
    }
    if let Some(size) = matches.get_one::<String>("size") {
        config.request.size = size.clone();
    }
    if let Some(seconds) = matches.get_one::<u32>("seconds") {
        config.request.seconds = *seconds;
    }
    if let Some(dir) = matches.get_one::<String>("output-dir") {
        config.output.dir = PathBuf::from(dir);
    }
    if let Some(interval) = matches.get_one::<u64>("interval") {
        config.polling.interval_seconds = *interval;
    }
    if let Some(max_wait) = matches.get_one::<u64>("max-wait") {
        config.polling.max_wait_seconds = *max_wait;
    }
}

async fn run(matches: &ArgMatches) -> Result<()> {
    let config_path = matches.get_one::<String>("config").map(PathBuf::from);
    let mut config = Config::load(config_path.as_deref()).context("Failed to load configuration")?;
    apply_cli_overrides(&mut config, matches);

    let dry_run = matches.get_flag("dry-run");

    info!("🎬 Starting Sora-2 video generation");
    info!("⏰ Start time: {}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S"));
    for line in config.summary().lines() {
        info!("{}", line);
    }

    if dry_run {
        let form = SubmissionForm::build(&config.request.parameters()).await?;
        form.log_summary();
        info!("🧪 Dry run complete - no request sent");
        return Ok(());
    }

    config.validate().context("Invalid configuration")?;

    if !config.output.dir.exists() {
        tokio::fs::create_dir_all(&config.output.dir)
            .await
            .with_context(|| format!("Cannot create output directory {}", config.output.dir.display()))?;
    }

    let output_path = matches.get_one::<String>("output").map(PathBuf::from);
    let workflow = Workflow::new(config)?.with_output_path(output_path);
    let outcome = workflow.run().await?;

    let saved = tokio::fs::canonicalize(&outcome.file.path)
        .await
        .unwrap_or_else(|_| outcome.file.path.clone());

    info!("{}", "=".repeat(60));
    info!("🎉 Workflow completed in {:.1}s", outcome.elapsed.as_secs_f64());
    info!("{}", "=".repeat(60));
    info!("🆔 Job: {} ({} mode)", outcome.job.id(), outcome.mode.label());
    info!("🔗 Result URL: {}", outcome.job.url());
    info!("🕒 Completed at: {}", outcome.job.completed_at().format("%Y-%m-%d %H:%M:%S UTC"));
    info!("📁 Saved to: {}", saved.display());
    info!("📦 Size: {:.2} MB", outcome.file.bytes_written as f64 / (1024.0 * 1024.0));
    info!("⏰ End time: {}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S"));

    Ok(())
}
