//! Integration tests for the `vistune metrics` command.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

const METRICS: &str = "step_number,epoch_number,training_loss\n\
1,0,2.0\n2,0,1.6\n3,0,1.2\n4,0,1.1\n5,1,0.9\n6,1,0.8\n7,1,0.85\n8,1,0.7\n9,1,9.5\n";

fn write_metrics(temp: &TempDir) -> std::path::PathBuf {
    let path = temp.path().join("step_wise_training_metrics.csv");
    fs::write(&path, METRICS).unwrap();
    path
}

#[test]
fn test_metrics_human_output() {
    let temp = TempDir::new().unwrap();
    let path = write_metrics(&temp);

    Command::cargo_bin("vistune-cli")
        .unwrap()
        .current_dir(temp.path())
        .arg("metrics")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Training metrics"))
        .stdout(predicate::str::contains("Mean loss"))
        .stdout(predicate::str::contains("outliers removed: 1"));
}

#[test]
fn test_metrics_json() {
    let temp = TempDir::new().unwrap();
    let path = write_metrics(&temp);

    let output = Command::cargo_bin("vistune-cli")
        .unwrap()
        .current_dir(temp.path())
        .args(["metrics", "--json", "--buckets", "4"])
        .arg(&path)
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["total_steps"], 9);
    assert_eq!(report["epochs"].as_array().unwrap().len(), 2);
    assert_eq!(report["epochs"][0]["first_step"], 1);
    assert_eq!(report["epochs"][1]["min_step"], 8);
    assert_eq!(report["outliers_removed"], 1);
    assert_eq!(report["histogram"].as_array().unwrap().len(), 4);
    assert_eq!(report["deltas"].as_array().unwrap().len(), 8);
}

#[test]
fn test_metrics_include_outliers() {
    let temp = TempDir::new().unwrap();
    let path = write_metrics(&temp);

    let output = Command::cargo_bin("vistune-cli")
        .unwrap()
        .current_dir(temp.path())
        .args(["metrics", "--json", "--include-outliers"])
        .arg(&path)
        .output()
        .unwrap();

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["outliers_removed"], 0);
    assert!(report["outlier_bounds"].is_null());
}

#[test]
fn test_metrics_missing_file() {
    let temp = TempDir::new().unwrap();

    Command::cargo_bin("vistune-cli")
        .unwrap()
        .current_dir(temp.path())
        .args(["metrics", "nope.csv"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read nope.csv"));
}
