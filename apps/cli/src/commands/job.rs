//! Model customization job commands.

use crate::commands::types::{JobCommand, JobCreateArgs};
use anyhow::{Context, Result};
use chrono::{Local, Utc};
use colored::Colorize;
use tracing::info;
use vistune_aws::{parse_s3_uri, AwsCli, BedrockClient, JobDescription, S3Client};
use vistune_training::driver::{object_key, s3_uri};
use vistune_training::job::{default_role_arn, job_id_from_arn, timestamped_name, DEFAULT_JOB_PREFIX};
use vistune_training::split::TRAIN_FILE_NAME;
use vistune_training::{CustomizationJobSpec, HyperParameters, JobStatus, VistuneConfig};

pub async fn execute(command: JobCommand, config: &VistuneConfig) -> Result<()> {
    match command {
        JobCommand::Create(args) => create(args, config).await,
        JobCommand::Status { job, json } => status(&job, json, config).await,
    }
}

fn build_spec(args: &JobCreateArgs, config: &VistuneConfig) -> Result<CustomizationJobSpec> {
    let job_name = args.job_name.clone().unwrap_or_else(|| timestamped_name(DEFAULT_JOB_PREFIX, Local::now()));
    let custom_model_name = args.custom_model_name.clone().unwrap_or_else(|| job_name.clone());

    let role_arn = match (&args.role_arn, &config.aws.role_arn) {
        (Some(arn), _) | (None, Some(arn)) => arn.clone(),
        (None, None) => default_role_arn(config.require_account_id()?),
    };

    let training_data_uri = match &args.training_data {
        Some(uri) => uri.clone(),
        None => s3_uri(config.require_bucket()?, &object_key(config.training_prefix(), TRAIN_FILE_NAME)),
    };
    let output_uri = match &args.output_uri {
        Some(uri) => uri.clone(),
        None => format!("{}/", s3_uri(config.require_bucket()?, config.output_prefix().trim_matches('/'))),
    };

    let defaults = config.hyperparameters();
    let spec = CustomizationJobSpec {
        job_name,
        custom_model_name,
        base_model_id: args.base_model_id.clone().unwrap_or_else(|| config.base_model_id().to_string()),
        role_arn,
        training_data_uri,
        validation_data_uri: args.validation_data.clone(),
        output_uri,
        hyperparameters: HyperParameters {
            epoch_count: args.epochs.unwrap_or(defaults.epoch_count),
            batch_size: args.batch_size.unwrap_or(defaults.batch_size),
            learning_rate: args.learning_rate.unwrap_or(defaults.learning_rate),
        },
        created_at: Utc::now(),
    };
    spec.validate()?;
    Ok(spec)
}

async fn create(args: JobCreateArgs, config: &VistuneConfig) -> Result<()> {
    let spec = build_spec(&args, config)?;
    let request = spec.to_request();

    if args.dry_run {
        println!("{}", serde_json::to_string_pretty(&request)?);
        return Ok(());
    }

    let cli = AwsCli::new(config.region());
    if !args.skip_s3_check {
        let (bucket, key) = parse_s3_uri(&spec.training_data_uri)
            .with_context(|| format!("Not an S3 URI: {}", spec.training_data_uri))?;
        let exists = S3Client::new(cli.clone()).object_exists(bucket, key).await?;
        if !exists {
            anyhow::bail!("Training data not found at {}", spec.training_data_uri);
        }
        info!(uri = %spec.training_data_uri, "training data found");
    }

    let client = BedrockClient::new(cli, config.base_model_id());
    let job_arn = client.create_customization_job(&request).await.context("Failed to create customization job")?;

    println!("{}", "Fine-tuning job created".bold().green());
    println!("  Job name: {}", spec.job_name);
    println!("  Job ARN:  {}", job_arn);
    println!("  Job id:   {}", job_id_from_arn(&job_arn));

    let description = client.get_customization_job(&job_arn).await?;
    print_status(&description);
    Ok(())
}

async fn status(job: &str, json: bool, config: &VistuneConfig) -> Result<()> {
    let client = BedrockClient::new(AwsCli::new(config.region()), config.base_model_id());
    let description = client.get_customization_job(job).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&description)?);
    } else {
        print_status(&description);
    }
    Ok(())
}

fn print_status(job: &JobDescription) {
    let status = match job.status {
        JobStatus::Completed => job.status.to_string().green(),
        JobStatus::Failed | JobStatus::Stopped => job.status.to_string().red(),
        _ => job.status.to_string().yellow(),
    };
    println!("  Status:   {status}");
    if let Some(created) = &job.creation_time {
        println!("  Created:  {created}");
    }
    if let Some(ended) = &job.end_time {
        println!("  Ended:    {ended}");
    }
    if let Some(model) = &job.output_model_arn {
        println!("  Model:    {model}");
    }
    if let Some(message) = &job.failure_message {
        println!("  {}: {}", "Failure".red(), message);
    }
}
