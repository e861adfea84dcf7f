//! Label generation command.

use crate::commands::types::LabelArgs;
use anyhow::{Context, Result};
use colored::Colorize;
use std::path::PathBuf;
use tracing::info;
use vistune_aws::{AwsCli, BedrockClient};
use vistune_training::scan::list_label_images;
use vistune_training::{generate_labels, LabelWriter, VistuneConfig};

pub async fn execute(args: LabelArgs, config: &VistuneConfig) -> Result<()> {
    let images_dir = args
        .images_dir
        .or_else(|| config.paths.images_dir.clone())
        .context("No image directory given (--images-dir or [paths] images_dir)")?;
    let output = args
        .output
        .or_else(|| config.paths.labels_csv.clone())
        .unwrap_or_else(|| PathBuf::from("labels.csv"));
    let model_id = args.model.unwrap_or_else(|| config.labeling_model_id().to_string());
    let batch_size = args.batch_size.unwrap_or_else(|| config.labeling_batch_size());

    let mut images = list_label_images(&images_dir)
        .with_context(|| format!("Failed to scan images in {}", images_dir.display()))?;
    if let Some(limit) = args.limit {
        images.truncate(limit);
    }

    info!(images_dir = %images_dir.display(), output = %output.display(), model = %model_id, batch_size, "labelling");
    info!("found {} image(s)", images.len());

    let client = BedrockClient::new(AwsCli::new(config.region()), model_id);
    let mut writer = LabelWriter::create(&output, &config.label_columns())
        .with_context(|| format!("Failed to create {}", output.display()))?;

    let summary = generate_labels(&client, &images, config.labeling_prompt(), &mut writer, batch_size).await?;
    writer.finish()?;

    println!();
    println!("{}", "Labelling complete".bold().cyan());
    println!("  Labelled: {}", summary.labelled.to_string().green());
    println!("  Failed:   {}", summary.failed.to_string().red());
    println!("  Output:   {}", output.display());
    Ok(())
}
