//! Vistune CLI - dataset tooling for fine-tuning a vision model on invoice images
//!
//! Provides a `vistune` command that labels images, prepares and validates the
//! JSONL training dataset, uploads it, and manages the fine-tuning job.

mod commands;
mod logging;

use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use vistune_training::VistuneConfig;

use commands::{job, label, metrics, prepare, split, upload, validate};
use commands::{JobCommand, LabelArgs, MetricsArgs, PrepareArgs, SplitArgs, UploadArgs, ValidateArgs};

/// Vistune - fine-tuning dataset tooling for Bedrock vision models
#[derive(Parser, Debug)]
#[command(
    name = "vistune",
    author,
    version,
    about = "Vistune - fine-tuning dataset tooling for Bedrock vision models",
    long_about = "Vistune turns a folder of invoice images and their labels into a validated Bedrock conversation dataset,\nuploads it, and drives the model customization job."
)]
struct Args {
    /// Log level (trace, debug, info, warn, error) [default: info]
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Also write logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Configuration file (defaults to ./vistune.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// AWS region (overrides AWS_REGION and [aws] region)
    #[arg(long, global = true)]
    region: Option<String>,

    /// S3 bucket (overrides S3_BUCKET and [aws] bucket)
    #[arg(long, global = true)]
    bucket: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate labels for a directory of images with a Bedrock model
    ///
    /// Writes a two-column label table. Failed calls are written with a
    /// failure marker so `prepare` skips them.
    Label(LabelArgs),

    /// Build training_data.jsonl from a label table and an image directory
    ///
    /// Uploads each image, builds one conversation record per row, validates
    /// it and appends it to the output. Rows with failed or empty labels are skipped.
    Prepare(PrepareArgs),

    /// Validate a dataset against the Bedrock conversation format rules
    Validate(ValidateArgs),

    /// Split a dataset into train_data.jsonl and test_data.jsonl
    Split(SplitArgs),

    /// Upload the train/test files to S3
    Upload(UploadArgs),

    /// Create or inspect a model customization job
    #[command(subcommand)]
    Job(JobCommand),

    /// Summarise step-wise training metrics
    Metrics(MetricsArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = VistuneConfig::discover(args.config.as_deref())?;
    let mut overrides = VistuneConfig::default();
    overrides.aws.region = args.region;
    overrides.aws.bucket = args.bucket;
    overrides.log_file = args.log_file;
    config.merge(&overrides);

    let level = resolve_log_level(args.log_level, config.log_level.as_deref());
    logging::init(&level, config.log_file.as_deref())?;

    let Some(command) = args.command else {
        Args::command().print_help()?;
        return Ok(());
    };

    match command {
        Command::Label(cmd) => label::execute(cmd, &config).await?,
        Command::Prepare(cmd) => prepare::execute(cmd, &config).await?,
        Command::Validate(cmd) => validate::execute(cmd)?,
        Command::Split(cmd) => split::execute(cmd, &config)?,
        Command::Upload(cmd) => upload::execute(cmd, &config).await?,
        Command::Job(cmd) => job::execute(cmd, &config).await?,
        Command::Metrics(cmd) => metrics::execute(cmd)?,
    }

    Ok(())
}

/// `--log-level` beats the config file, which beats `info`.
fn resolve_log_level(flag: Option<String>, configured: Option<&str>) -> String {
    flag.or_else(|| configured.map(str::to_string)).unwrap_or_else(|| "info".to_string())
}
