use crate::commands::prepare::OUTPUT_FILE_NAME;
use crate::commands::types::SplitArgs;
use anyhow::{Context, Result};
use colored::Colorize;
use tracing::info;
use vistune_training::{split_dataset, SplitOptions, VistuneConfig};

pub fn execute(args: SplitArgs, config: &VistuneConfig) -> Result<()> {
    let output_dir = args.output_dir.unwrap_or_else(|| config.output_dir());
    let input = args.input.unwrap_or_else(|| config.output_dir().join(OUTPUT_FILE_NAME));
    let options = SplitOptions { test_ratio: args.test_ratio, seed: args.seed };

    info!(input = %input.display(), test_ratio = options.test_ratio, seed = options.seed, "splitting dataset");
    let outcome = split_dataset(&input, &output_dir, &options)
        .with_context(|| format!("Failed to split {}", input.display()))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    println!("{}", "Dataset split".bold().cyan());
    println!("  Train: {} samples -> {}", outcome.train_samples.to_string().green(), outcome.train_path.display());
    println!("  Test:  {} samples -> {}", outcome.test_samples.to_string().green(), outcome.test_path.display());
    Ok(())
}
