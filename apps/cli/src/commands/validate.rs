//! Dataset validation command.
//!
//! Checks one `.jsonl` file, or every `.jsonl` file in a directory, against the
//! converse fine-tuning format rules for the chosen model family.

use crate::commands::types::ValidateArgs;
use anyhow::Context;
use colored::Colorize;
use serde::Serialize;
use std::fmt::Write as _;
use std::path::PathBuf;
use vistune_training::scan::list_jsonl_files;
use vistune_training::{validate_dataset_file, ConverseOptions, ModelFamily};

#[derive(Debug, Serialize)]
struct FileResult {
    file: String,
    valid: bool,
    samples: usize,
    message: Option<String>,
}

/// Execute the validate command. Exits with status 1 when any file is invalid.
pub fn execute(args: ValidateArgs) -> anyhow::Result<()> {
    let model: ModelFamily = args.model.parse()?;
    let options = ConverseOptions { model, record_checks: args.record_checks };

    let files: Vec<PathBuf> = match (&args.path, &args.dir) {
        (Some(path), _) => vec![path.clone()],
        (None, Some(dir)) => {
            list_jsonl_files(dir).with_context(|| format!("Failed to list {}", dir.display()))?
        }
        (None, None) => anyhow::bail!("A dataset file or --dir is required"),
    };
    if files.is_empty() {
        anyhow::bail!("No .jsonl files found");
    }

    let results: Vec<FileResult> = files
        .iter()
        .map(|file| {
            let name = file.display().to_string();
            match validate_dataset_file(file, options) {
                Ok(report) => FileResult {
                    file: name,
                    valid: report.is_valid(),
                    samples: report.samples,
                    message: report.failure_message(),
                },
                Err(e) => FileResult { file: name, valid: false, samples: 0, message: Some(e.to_string()) },
            }
        })
        .collect();

    if let Some(path) = &args.report {
        std::fs::write(path, render_report(&results, model))
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        output_human(&results, model);
    }

    if results.iter().any(|r| !r.valid) {
        std::process::exit(1);
    }
    Ok(())
}

fn render_report(results: &[FileResult], model: ModelFamily) -> String {
    let mut out = format!("Dataset validation report (model: {model})\n\n");
    for result in results {
        let status = if result.valid { "PASSED" } else { "FAILED" };
        let _ = writeln!(out, "{}: {} ({} samples)", result.file, status, result.samples);
        if let Some(message) = &result.message {
            let _ = writeln!(out, "  {message}");
        }
    }
    let passed = results.iter().filter(|r| r.valid).count();
    let _ = writeln!(out, "\n{passed}/{} file(s) passed", results.len());
    out
}

fn output_human(results: &[FileResult], model: ModelFamily) {
    println!("{}", "vistune validate".bold().cyan());
    println!("  Model family: {model}");
    println!();

    for result in results {
        if result.valid {
            println!("  {} {} ({} samples)", "✓".green().bold(), result.file.dimmed(), result.samples);
        } else {
            println!("  {} {}", "✗".red().bold(), result.file);
            if let Some(message) = &result.message {
                println!("    {}: {}", "Error".red(), message.dimmed());
            }
        }
    }

    let invalid = results.iter().filter(|r| !r.valid).count();
    println!();
    if invalid == 0 {
        println!("{}", "✓ All datasets are valid".green().bold());
    } else {
        println!("{}", format!("✗ {invalid} dataset(s) failed validation").red().bold());
    }
}
