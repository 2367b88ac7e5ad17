use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use imagehub::config::Config;
use imagehub::handler::{record_history, HandlerResponse, ProcessingService};
use imagehub::history::{retention_days, JsonlHistoryStore};
use imagehub::keys::KeyCodec;
use imagehub::pipeline::Pipeline;
use imagehub::storage::build_blob_store;
use imagehub::upload::UploadRequest;

/// Image Hub - parameterized image processing for uploaded objects
#[derive(Parser, Debug)]
#[command(name = "imagehub")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file (built-in defaults when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate an upload request and print the issued storage key
    UploadKey {
        #[arg(long)]
        filename: String,
        #[arg(long)]
        content_type: String,
        #[arg(long)]
        width: Option<i64>,
        #[arg(long)]
        height: Option<i64>,
        #[arg(long)]
        quality: Option<i64>,
        #[arg(long)]
        format: Option<String>,
        #[arg(long)]
        watermark: Option<String>,
    },

    /// Process one uploaded object from the configured store
    Process {
        #[arg(long)]
        key: String,
        /// Source bucket (defaults to buckets.source)
        #[arg(long)]
        bucket: Option<String>,
        /// Record the run in the history file for this user
        #[arg(long)]
        user_id: Option<String>,
    },

    /// Handle an object-created event read from a JSON file
    Event {
        #[arg(long)]
        file: PathBuf,
    },

    /// Run the pipeline on a local file without touching any store
    Local {
        #[arg(long)]
        input: PathBuf,
        /// Upload key whose parameters drive the run
        #[arg(long)]
        key: String,
        #[arg(long)]
        output: PathBuf,
    },
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<Config> {
    let config = match path {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => Config::default(),
    };
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn build_pipeline(config: &Config) -> Pipeline {
    Pipeline::new(KeyCodec::new(config.defaults.to_parameters()))
        .with_png_effort(config.output.png_effort)
}

async fn build_service(config: &Config) -> ProcessingService {
    let cache_control = Some(config.output.cache_control.clone()).filter(|c| !c.is_empty());
    ProcessingService::new(
        build_blob_store(&config.storage).await,
        build_pipeline(config),
        config.buckets.processed.clone(),
        cache_control,
    )
}

fn print_response(response: &HandlerResponse) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(response)?);
    if !response.is_success() {
        std::process::exit(1);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = load_config(args.config.as_ref())?;

    imagehub::logging::init_subscriber(&config.logging)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging subsystem: {}", e))?;

    tracing::debug!(
        backend = ?config.storage.backend,
        source_bucket = %config.buckets.source,
        processed_bucket = %config.buckets.processed,
        "Configuration loaded"
    );

    match args.command {
        Command::UploadKey {
            filename,
            content_type,
            width,
            height,
            quality,
            format,
            watermark,
        } => {
            let request = UploadRequest {
                filename: Some(filename),
                content_type: Some(content_type),
                width,
                height,
                quality,
                format,
                watermark,
            };
            let codec = KeyCodec::new(config.defaults.to_parameters());
            match request.issue(&codec) {
                Ok(ticket) => println!("{}", serde_json::to_string_pretty(&ticket)?),
                Err(errors) => bail!("Invalid upload request: {}", errors),
            }
        }

        Command::Process {
            key,
            bucket,
            user_id,
        } => {
            let service = build_service(&config).await;
            let bucket = bucket.unwrap_or_else(|| config.buckets.source.clone());

            let response = match service.process_object(&bucket, &key).await {
                Ok(report) => {
                    if let (Some(user_id), Some(path)) = (&user_id, &config.history.path) {
                        let history = JsonlHistoryStore::new(path);
                        record_history(
                            &history,
                            user_id,
                            &report,
                            retention_days(config.history.retention_days),
                        )
                        .await
                        .context("Failed to record history")?;
                    }
                    HandlerResponse::success(&report)
                }
                Err(err) => {
                    tracing::error!(error = %err, kind = err.kind(), "Error processing image");
                    HandlerResponse::failure(&err)
                }
            };
            print_response(&response)?;
        }

        Command::Event { file } => {
            let raw = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("Failed to read event file {}", file.display()))?;
            let event: serde_json::Value =
                serde_json::from_str(&raw).context("Event file is not valid JSON")?;

            let service = build_service(&config).await;
            print_response(&service.handle_event(&event).await)?;
        }

        Command::Local { input, key, output } => {
            let source = std::fs::read(&input)
                .with_context(|| format!("Failed to read {}", input.display()))?;

            let artifact = build_pipeline(&config).run(&key, &source)?;
            std::fs::write(&output, &artifact.bytes)
                .with_context(|| format!("Failed to write {}", output.display()))?;

            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "output_key": artifact.output_key,
                    "content_type": artifact.content_type,
                    "metadata": artifact.params,
                    "key_degraded": artifact.key_degraded,
                    "original_size": artifact.original_size,
                    "output_size": artifact.output_size,
                    "bytes": artifact.bytes.len(),
                }))?
            );
        }
    }

    Ok(())
}
