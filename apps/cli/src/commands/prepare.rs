//! Dataset preparation command: label table + images -> training_data.jsonl.

use crate::commands::types::PrepareArgs;
use anyhow::{Context, Result};
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Table};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use vistune_aws::{AwsCli, S3Client};
use vistune_training::{
    BatchDriver, BatchSummary, DriverOptions, ImageUploader, JsonlWriter, LabelReader, ProgressEvent, ProgressSink,
    RunContext, StagedImages, TracingProgressSink, VistuneConfig,
};

pub const OUTPUT_FILE_NAME: &str = "training_data.jsonl";

/// Spinner with running counts; every event is also logged.
struct BarProgressSink {
    bar: ProgressBar,
    written: AtomicUsize,
    skipped: AtomicUsize,
    failed: AtomicUsize,
    log: TracingProgressSink,
}

impl BarProgressSink {
    fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(ProgressStyle::with_template("{spinner} {msg}").unwrap_or_else(|_| ProgressStyle::default_spinner()));
        bar.enable_steady_tick(Duration::from_millis(120));
        Self {
            bar,
            written: AtomicUsize::new(0),
            skipped: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
            log: TracingProgressSink,
        }
    }

    fn refresh(&self) {
        self.bar.set_message(format!(
            "{} written, {} skipped, {} failed",
            self.written.load(Ordering::Relaxed),
            self.skipped.load(Ordering::Relaxed),
            self.failed.load(Ordering::Relaxed)
        ));
    }
}

impl ProgressSink for BarProgressSink {
    fn on_event(&self, event: ProgressEvent) {
        match &event {
            ProgressEvent::Written { .. } => {
                self.written.fetch_add(1, Ordering::Relaxed);
            }
            ProgressEvent::Skipped { .. } => {
                self.skipped.fetch_add(1, Ordering::Relaxed);
            }
            ProgressEvent::Failed { .. } => {
                self.failed.fetch_add(1, Ordering::Relaxed);
            }
            ProgressEvent::Finished { .. } => self.bar.finish_and_clear(),
            ProgressEvent::Started { .. } => {}
        }
        self.refresh();
        self.bar.suspend(|| self.log.on_event(event));
    }
}

pub async fn execute(args: PrepareArgs, config: &VistuneConfig) -> Result<()> {
    let labels = args
        .labels
        .or_else(|| config.paths.labels_csv.clone())
        .context("No label table given (--labels or [paths] labels_csv)")?;
    let images_dir = args
        .images_dir
        .or_else(|| config.paths.images_dir.clone())
        .context("No image directory given (--images-dir or [paths] images_dir)")?;
    let output_dir = args.output_dir.unwrap_or_else(|| config.output_dir());
    let account_id = match args.account_id {
        Some(id) => id,
        None => config.require_account_id()?.to_string(),
    };
    let bucket = config.require_bucket()?.to_string();
    let key_prefix = args.image_prefix.unwrap_or_else(|| config.image_prefix().to_string());

    let mut builder = config.record_builder();
    if args.jpeg_alias {
        builder = builder.with_jpeg_alias(true);
    }

    let s3;
    let staged = StagedImages;
    let uploader: &dyn ImageUploader = if args.no_upload || args.dry_run {
        &staged
    } else {
        s3 = S3Client::new(AwsCli::new(config.region()));
        &s3
    };

    let driver = BatchDriver::new(builder, uploader, DriverOptions { images_dir, bucket, key_prefix, account_id });
    let rows = LabelReader::open(&labels, &config.label_columns())?.rows();

    let sink = BarProgressSink::new();
    let ctx = RunContext::new(&sink);
    ctx.started(labels.display().to_string());

    let output_path = output_dir.join(OUTPUT_FILE_NAME);
    let summary = if args.dry_run {
        let mut out = JsonlWriter::new(std::io::sink());
        driver.run(rows, &mut out, ctx).await?
    } else {
        let mut out = JsonlWriter::create(&output_path)
            .with_context(|| format!("Failed to create {}", output_path.display()))?;
        let summary = driver.run(rows, &mut out, ctx).await?;
        out.finish()?;
        summary
    };

    if args.json {
        let output = json!({
            "output": (!args.dry_run).then(|| output_path.display().to_string()),
            "dry_run": args.dry_run,
            "summary": summary,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        output_human(&summary, &output_path, args.dry_run);
    }
    Ok(())
}

fn output_human(summary: &BatchSummary, output_path: &Path, dry_run: bool) {
    println!();
    println!("{}", "Dataset preparation".bold().cyan());
    println!();

    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec!["Outcome", "Reason", "Rows"]);
    table.add_row(vec!["succeeded".to_string(), "-".to_string(), summary.succeeded.to_string()]);
    for (reason, count) in &summary.skips {
        table.add_row(vec!["skipped".to_string(), reason.clone(), count.to_string()]);
    }
    for (reason, count) in &summary.failures {
        table.add_row(vec!["failed".to_string(), reason.clone(), count.to_string()]);
    }
    println!("{table}");
    println!();

    println!(
        "  Total: {}  Succeeded: {}  Skipped: {}  Failed: {}",
        summary.total(),
        summary.succeeded.to_string().green(),
        summary.skipped.to_string().yellow(),
        summary.failed.to_string().red()
    );
    if dry_run {
        println!("  {}", "Dry run: nothing uploaded or written.".dimmed());
    } else {
        println!("  Output: {}", output_path.display());
    }
}
