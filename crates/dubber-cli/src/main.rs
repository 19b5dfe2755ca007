//! dubber-cli: run the dubbing pipeline locally with the configured engines.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};

use dubber_core::domain::{AudioFormat, FailurePolicy, JobSubmission, JobView, TranscodeOptions, VideoId};
use dubber_core::observability::{LogFormat, init_tracing};
use dubber_core::{DubbingService, PipelineBuilder, PipelineConfig};

#[derive(Debug, Parser)]
#[command(name = "dubber-cli", version, about = "Transcribe, translate and dub videos")]
struct Cli {
    /// Configuration file (defaults to ./dubber.toml when present)
    #[arg(long, global = true, env = "DUBBER_CONFIG")]
    config: Option<PathBuf>,

    /// Overrides `storage_dir` from the configuration
    #[arg(long, global = true)]
    storage_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Upload a video, dub it into the given languages and print the result
    Run(RunArgs),
    /// List the artifacts stored for a video
    Assets {
        #[arg(long)]
        video_id: String,
    },
    /// Extract the audio track of a stored video
    Convert(ConvertArgs),
    /// Print the registered engines and the configured default per stage
    Engines,
}

#[derive(Debug, Args)]
struct RunArgs {
    #[arg(long)]
    video: PathBuf,

    /// Target language, repeatable (`--lang fr --lang es`)
    #[arg(long = "lang", required = true)]
    languages: Vec<String>,

    /// `fail-fast` or `best-effort`
    #[arg(long)]
    policy: Option<FailurePolicy>,

    #[arg(long, default_value_t = 600)]
    timeout_secs: u64,
}

#[derive(Debug, Args)]
struct ConvertArgs {
    #[arg(long)]
    video_id: String,

    #[arg(long, default_value = "wav")]
    format: AudioFormat,

    #[arg(long, default_value_t = 16_000)]
    sample_rate: u32,

    #[arg(long, default_value_t = 1)]
    channels: u8,

    #[arg(long)]
    bitrate_kbps: Option<u32>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing(LogFormat::from_env());

    let cli = Cli::parse();
    let mut config = PipelineConfig::load(cli.config.as_deref()).context("loading configuration")?;
    if let Some(dir) = cli.storage_dir {
        config.storage_dir = dir;
    }

    match cli.command {
        Command::Run(args) => {
            if let Some(policy) = args.policy {
                config.failure_policy = policy;
            }
            let service = PipelineBuilder::from_config(&config).build()?;
            service.start().await?;
            let outcome = run(&service, &args).await;
            service.shutdown().await;
            outcome
        }
        Command::Assets { video_id } => {
            let video_id = VideoId::parse(video_id)?;
            let service = PipelineBuilder::from_config(&config).build()?;
            let assets = service.list_assets(&video_id).await?;
            println!("{}", serde_json::to_string_pretty(&assets)?);
            Ok(())
        }
        Command::Convert(args) => {
            let video_id = VideoId::parse(args.video_id)?;
            let options = TranscodeOptions {
                format: args.format,
                sample_rate: args.sample_rate,
                channels: args.channels,
                bitrate_kbps: args.bitrate_kbps,
            };
            let service = PipelineBuilder::from_config(&config).build()?;
            let path = service.convert_audio(&video_id, options).await?;
            println!("{}", path.display());
            Ok(())
        }
        Command::Engines => {
            let service = PipelineBuilder::from_config(&config).build()?;
            println!("{}", serde_json::to_string_pretty(&service.engines())?);
            Ok(())
        }
    }
}

async fn run(service: &DubbingService, args: &RunArgs) -> anyhow::Result<()> {
    let bytes = tokio::fs::read(&args.video)
        .await
        .with_context(|| format!("reading {}", args.video.display()))?;
    let name = file_name(&args.video);
    let video_id = service.upload_video(&name, &bytes).await?;
    tracing::info!(%video_id, "video uploaded");

    let job_id = service
        .submit(JobSubmission::new(video_id.as_str(), args.languages.iter().cloned()))
        .await?;

    let view = tokio::time::timeout(
        Duration::from_secs(args.timeout_secs),
        service.wait(job_id, Duration::from_millis(200)),
    )
    .await
    .with_context(|| format!("job {job_id} did not finish within {}s", args.timeout_secs))??;

    println!("{}", serde_json::to_string_pretty(&view)?);
    match view {
        JobView::Failed { failure } => bail!("job {job_id} {failure}"),
        _ => Ok(()),
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
