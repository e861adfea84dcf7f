//! `vistune upload --dry-run` runs offline: file discovery and logging only.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn vistune(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("vistune-cli").unwrap();
    cmd.current_dir(dir);
    for key in ["RUST_LOG", "S3_BUCKET", "AWS_REGION", "S3_PREFIX_TRAINING", "NO_COLOR"] {
        cmd.env_remove(key);
    }
    cmd
}

fn workspace(with_test_file: bool) -> TempDir {
    let temp = TempDir::new().unwrap();
    let out = temp.path().join("out");
    fs::create_dir(&out).unwrap();
    fs::write(out.join("train_data.jsonl"), "{}\n").unwrap();
    if with_test_file {
        fs::write(out.join("test_data.jsonl"), "{}\n").unwrap();
    }
    fs::write(
        temp.path().join("vistune.toml"),
        "[aws]\nbucket = \"invoices\"\n\n[paths]\noutput_dir = \"out\"\n\n[s3]\ntraining_prefix = \"nova/training\"\n",
    )
    .unwrap();
    temp
}

#[test]
fn test_dry_run_finds_default_train_and_test_files() {
    let temp = workspace(true);

    vistune(temp.path())
        .args(["upload", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Dry run: nothing uploaded."))
        .stderr(predicate::str::contains("dry run: would upload"))
        .stderr(predicate::str::contains("s3://invoices/nova/training/train_data.jsonl"))
        .stderr(predicate::str::contains("s3://invoices/nova/training/test_data.jsonl"));
}

#[test]
fn test_dry_run_without_test_file_uploads_train_only() {
    let temp = workspace(false);

    vistune(temp.path())
        .args(["upload", "--dry-run", "--prefix", "custom"])
        .assert()
        .success()
        .stderr(predicate::str::contains("s3://invoices/custom/train_data.jsonl"))
        .stderr(predicate::str::contains("test_data.jsonl").not());
}

#[test]
fn test_dry_run_warns_about_missing_explicit_test_file() {
    let temp = workspace(false);

    vistune(temp.path())
        .args(["upload", "--dry-run", "--test", "out/holdout.jsonl"])
        .assert()
        .success()
        .stderr(predicate::str::contains("test file not found, skipping"))
        .stderr(predicate::str::contains("s3://invoices/nova/training/train_data.jsonl"));
}

#[test]
fn test_missing_train_file_fails() {
    let temp = workspace(false);
    fs::remove_file(temp.path().join("out").join("train_data.jsonl")).unwrap();

    vistune(temp.path())
        .args(["upload", "--dry-run"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Training file not found"));
}
