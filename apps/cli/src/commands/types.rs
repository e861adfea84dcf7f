//! Command type definitions shared between main.rs and the command modules.

use clap::{Args, Subcommand};
use std::path::PathBuf;

#[derive(Args, Debug, Clone)]
pub struct LabelArgs {
    /// Directory of invoice images (jpg, jpeg, png)
    #[arg(long)]
    pub images_dir: Option<PathBuf>,

    /// Label table to write (defaults to [paths] labels_csv)
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Bedrock model used to read the images
    #[arg(long)]
    pub model: Option<String>,

    /// Flush the table every N images
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Only label the first N images
    #[arg(long)]
    pub limit: Option<usize>,
}

#[derive(Args, Debug, Clone)]
pub struct PrepareArgs {
    /// Label table (CSV with image-name and label columns)
    #[arg(long)]
    pub labels: Option<PathBuf>,

    /// Directory holding the images named in the label table
    #[arg(long)]
    pub images_dir: Option<PathBuf>,

    /// Directory for training_data.jsonl
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Key prefix for uploaded images
    #[arg(long)]
    pub image_prefix: Option<String>,

    /// Account id recorded as the image bucket owner
    #[arg(long)]
    pub account_id: Option<String>,

    /// Images are already in the bucket; only compute their URIs
    #[arg(long)]
    pub no_upload: bool,

    /// Build and validate records without uploading or writing output
    #[arg(long)]
    pub dry_run: bool,

    /// Write `jpeg` instead of `jpg` as the image format
    #[arg(long)]
    pub jpeg_alias: bool,

    /// Print the run summary as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ValidateArgs {
    /// Dataset file (.jsonl)
    pub path: Option<PathBuf>,

    /// Validate every .jsonl file in a directory
    #[arg(long, conflicts_with = "path")]
    pub dir: Option<PathBuf>,

    /// Target model family (micro, lite, pro)
    #[arg(long, default_value = "lite")]
    pub model: String,

    /// Also run the single-record structure checks on every sample
    #[arg(long)]
    pub record_checks: bool,

    /// Write the validation report to this file
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct SplitArgs {
    /// Dataset to split (defaults to <output_dir>/training_data.jsonl)
    pub input: Option<PathBuf>,

    /// Directory for train_data.jsonl and test_data.jsonl
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Fraction of samples held out for testing
    #[arg(long, default_value_t = 0.1)]
    pub test_ratio: f64,

    /// Shuffle seed
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct UploadArgs {
    /// Training file (defaults to <output_dir>/train_data.jsonl)
    #[arg(long)]
    pub train: Option<PathBuf>,

    /// Optional test file (defaults to <output_dir>/test_data.jsonl when present)
    #[arg(long)]
    pub test: Option<PathBuf>,

    /// Key prefix (defaults to [s3] training_prefix)
    #[arg(long)]
    pub prefix: Option<String>,

    /// Log what would be uploaded without uploading
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum JobCommand {
    /// Submit a fine-tuning job
    Create(JobCreateArgs),

    /// Show the status of a job
    Status {
        /// Job ARN or name
        job: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug, Clone)]
pub struct JobCreateArgs {
    /// Job name (defaults to invoice-seller-extraction-<timestamp>)
    #[arg(long)]
    pub job_name: Option<String>,

    /// Custom model name (defaults to the job name)
    #[arg(long)]
    pub custom_model_name: Option<String>,

    /// Base model identifier
    #[arg(long)]
    pub base_model_id: Option<String>,

    /// Execution role ARN
    #[arg(long)]
    pub role_arn: Option<String>,

    /// Training data URI (defaults to s3://<bucket>/<training_prefix>/train_data.jsonl)
    #[arg(long)]
    pub training_data: Option<String>,

    /// Validation data URI
    #[arg(long)]
    pub validation_data: Option<String>,

    /// Output URI (defaults to s3://<bucket>/<output_prefix>/)
    #[arg(long)]
    pub output_uri: Option<String>,

    #[arg(long)]
    pub epochs: Option<u32>,

    #[arg(long)]
    pub batch_size: Option<u32>,

    #[arg(long)]
    pub learning_rate: Option<f64>,

    /// Do not check that the training object exists
    #[arg(long)]
    pub skip_s3_check: bool,

    /// Print the request instead of submitting it
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args, Debug, Clone)]
pub struct MetricsArgs {
    /// step_wise_training_metrics.csv from the job output
    pub file: PathBuf,

    /// Keep outliers in the loss distribution
    #[arg(long)]
    pub include_outliers: bool,

    /// Histogram bucket count
    #[arg(long, default_value_t = 10)]
    pub buckets: usize,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}
