//! Upload the split dataset files to S3.

use crate::commands::types::UploadArgs;
use anyhow::{Context, Result};
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Table};
use std::path::PathBuf;
use tracing::{info, warn};
use vistune_aws::{AwsCli, S3Client};
use vistune_training::driver::{object_key, s3_uri};
use vistune_training::jsonl::file_digest;
use vistune_training::split::{TEST_FILE_NAME, TRAIN_FILE_NAME};
use vistune_training::VistuneConfig;

pub async fn execute(args: UploadArgs, config: &VistuneConfig) -> Result<()> {
    let bucket = config.require_bucket()?;
    let prefix = args.prefix.unwrap_or_else(|| config.training_prefix().to_string());
    let output_dir = config.output_dir();

    let train = args.train.unwrap_or_else(|| output_dir.join(TRAIN_FILE_NAME));
    if !train.is_file() {
        anyhow::bail!("Training file not found: {}", train.display());
    }

    let mut files: Vec<PathBuf> = vec![train];
    match args.test {
        Some(test) if test.is_file() => files.push(test),
        Some(test) => warn!(file = %test.display(), "test file not found, skipping"),
        None => {
            let default_test = output_dir.join(TEST_FILE_NAME);
            if default_test.is_file() {
                files.push(default_test);
            }
        }
    }

    let client = S3Client::new(AwsCli::new(config.region()));
    for file in &files {
        let name = file.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        let key = object_key(&prefix, &name);
        let digest = file_digest(file)?;

        if args.dry_run {
            info!(file = %file.display(), uri = %s3_uri(bucket, &key), sha256 = %digest, "dry run: would upload");
            continue;
        }
        let uri = client
            .put_file(file, bucket, &key)
            .await
            .with_context(|| format!("Failed to upload {}", file.display()))?;
        info!(%uri, sha256 = %digest, "uploaded dataset file");
        println!("  {} {}", "✓".green().bold(), uri);
    }

    if args.dry_run {
        println!("{}", "Dry run: nothing uploaded.".dimmed());
        return Ok(());
    }

    let objects = client.list_prefix(bucket, &prefix).await?;
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec!["Key", "Size", "Last modified"]);
    for object in &objects {
        table.add_row(vec![
            object.key.clone(),
            object.size.to_string(),
            object.last_modified.clone().unwrap_or_default(),
        ]);
    }
    println!();
    println!("{}", format!("s3://{bucket}/{prefix}").bold().cyan());
    println!("{table}");
    Ok(())
}
