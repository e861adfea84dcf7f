//! Training metrics summary.

use crate::commands::types::MetricsArgs;
use anyhow::{Context, Result};
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Table};
use vistune_training::metrics::{read_step_metrics, MetricsReport};

pub fn execute(args: MetricsArgs) -> Result<()> {
    let steps = read_step_metrics(&args.file).with_context(|| format!("Failed to read {}", args.file.display()))?;
    let report = MetricsReport::analyze(&steps, args.include_outliers, args.buckets)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{}", "Training metrics".bold().cyan());
    println!("  Steps: {}  First loss: {:.4}  Final loss: {:.4}", report.total_steps, report.first_loss, report.final_loss);
    println!("  Loss:  {}", MetricsReport::losses_sparkline(&steps));
    println!();

    let mut epochs = Table::new();
    epochs.load_preset(UTF8_FULL).set_header(vec!["Epoch", "Steps", "Mean loss", "Min loss", "Min at step"]);
    for epoch in &report.epochs {
        epochs.add_row(vec![
            epoch.epoch.to_string(),
            format!("{}-{}", epoch.first_step, epoch.last_step),
            format!("{:.4}", epoch.mean_loss),
            format!("{:.4}", epoch.min_loss),
            epoch.min_step.to_string(),
        ]);
    }
    println!("{epochs}");
    println!();

    match &report.outlier_bounds {
        Some(bounds) => println!(
            "  Loss distribution (outliers removed: {}, kept range {:.4}..{:.4})",
            report.outliers_removed, bounds.lower, bounds.upper
        ),
        None => println!("  Loss distribution (all steps)"),
    }
    let widest = report.histogram.iter().map(|b| b.count).max().unwrap_or(0).max(1);
    for bucket in &report.histogram {
        let bar = "█".repeat(bucket.count * 40 / widest);
        println!("  {:>8.4} - {:<8.4} {:>5} {}", bucket.lower, bucket.upper, bucket.count, bar.blue());
    }
    println!();

    if let (Some(max_up), Some(max_down)) = (
        report.deltas.iter().max_by(|a, b| a.change.total_cmp(&b.change)),
        report.deltas.iter().min_by(|a, b| a.change.total_cmp(&b.change)),
    ) {
        println!("  Largest increase: {:+.4} at step {}", max_up.change, max_up.step_number);
        println!("  Largest decrease: {:+.4} at step {}", max_down.change, max_down.step_number);
    }
    Ok(())
}
