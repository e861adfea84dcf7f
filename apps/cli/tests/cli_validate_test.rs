//! Integration tests for the `vistune validate` command.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use vistune_training::{build_record, RecordBuilder};

fn vistune(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("vistune-cli").unwrap();
    cmd.current_dir(dir).env_remove("RUST_LOG");
    cmd
}

/// Write `n` converse-valid records.
fn write_dataset(dir: &Path, name: &str, n: usize) -> PathBuf {
    let builder = RecordBuilder::new();
    let mut body = String::new();
    for i in 0..n {
        let record = builder.build(&format!("inv{i}.png"), "ACME Trading Co", &format!("s3://invoices/images/inv{i}.png"), "111122223333");
        writeln!(body, "{}", record.to_json_line().unwrap()).unwrap();
    }
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    path
}

#[test]
fn test_validate_valid_dataset() {
    let temp = TempDir::new().unwrap();
    let path = write_dataset(temp.path(), "train_data.jsonl", 8);

    vistune(temp.path())
        .arg("validate")
        .arg(&path)
        .arg("--record-checks")
        .assert()
        .success()
        .stdout(predicate::str::contains("All datasets are valid"));
}

#[test]
fn test_validate_too_few_samples_fails() {
    let temp = TempDir::new().unwrap();
    let path = write_dataset(temp.path(), "train_data.jsonl", 3);

    vistune(temp.path())
        .arg("validate")
        .arg(&path)
        .assert()
        .failure()
        .stdout(predicate::str::contains("Number of samples 3 out of bounds between 8 and 20000 for lite"));
}

#[test]
fn test_validate_reports_problematic_samples_as_json() {
    let temp = TempDir::new().unwrap();
    let path = write_dataset(temp.path(), "train_data.jsonl", 8);

    // Unscheme'd URI and `jpg` format are rejected by the converse rules.
    let bad = build_record("scan.jpg", "ACME", "invoices/images/scan.jpg", "1");
    let mut body = fs::read_to_string(&path).unwrap();
    writeln!(body, "{}", bad.to_json_line().unwrap()).unwrap();
    fs::write(&path, body).unwrap();

    let output = vistune(temp.path()).arg("validate").arg(&path).arg("--json").output().unwrap();
    assert_eq!(output.status.code(), Some(1));

    let results: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(results[0]["valid"], false);
    assert_eq!(results[0]["samples"], 9);
    let message = results[0]["message"].as_str().unwrap();
    assert!(message.contains("Problematic samples: [8]"));
    assert!(message.contains("must start with 's3://'"));
}

#[test]
fn test_validate_directory_writes_report() {
    let temp = TempDir::new().unwrap();
    let data = temp.path().join("data");
    fs::create_dir(&data).unwrap();
    write_dataset(&data, "train_data.jsonl", 10);
    write_dataset(&data, "test_data.jsonl", 2);
    fs::write(data.join("notes.txt"), "ignored").unwrap();
    let report = temp.path().join("validation_report.txt");

    vistune(temp.path())
        .arg("validate")
        .arg("--dir")
        .arg(&data)
        .arg("--report")
        .arg(&report)
        .assert()
        .failure()
        .stdout(predicate::str::contains("1 dataset(s) failed validation"));

    let text = fs::read_to_string(&report).unwrap();
    assert!(text.contains("train_data.jsonl: PASSED (10 samples)"));
    assert!(text.contains("test_data.jsonl: FAILED (2 samples)"));
    assert!(text.contains("1/2 file(s) passed"));
}

#[test]
fn test_validate_rejects_non_jsonl_extension() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("dataset.json");
    fs::write(&path, "{}\n").unwrap();

    vistune(temp.path())
        .arg("validate")
        .arg(&path)
        .assert()
        .failure()
        .stdout(predicate::str::contains("File is not jsonl"));
}

#[test]
fn test_validate_unknown_model_family() {
    let temp = TempDir::new().unwrap();
    let path = write_dataset(temp.path(), "train_data.jsonl", 8);

    vistune(temp.path())
        .args(["validate", "--model", "sonnet"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown model family"));
}
