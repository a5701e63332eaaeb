use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const RECEIPT: &str = "WALMART\nDate: 11/25/2025\nTOTAL $11.08\nTAX $0.82\n";

/// Write a config that keeps the database and uploads inside `dir`.
fn write_config(dir: &Path) -> PathBuf {
    let config = serde_json::json!({
        "storage": {
            "database_path": dir.join("finscan.db"),
            "upload_dir": dir.join("uploads"),
        },
        "pipeline": {
            "max_retries": 0,
            "retry_backoff_secs": 0,
            "workers": 1,
        },
    });
    let path = dir.join("config.json");
    fs::write(&path, serde_json::to_string_pretty(&config).unwrap()).unwrap();
    path
}

fn finscan(config: &Path) -> Command {
    let mut cmd = Command::cargo_bin("finscan").unwrap();
    cmd.arg("-c").arg(config);
    cmd
}

#[test]
fn test_parse_text_receipt_as_json() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path());
    let receipt = dir.path().join("receipt.txt");
    fs::write(&receipt, RECEIPT).unwrap();

    finscan(&config)
        .arg("parse")
        .arg(&receipt)
        .assert()
        .success()
        .stdout(predicate::str::contains("11.08"))
        .stdout(predicate::str::contains("WALMART"))
        .stdout(predicate::str::contains("2025-11-25"));
}

#[test]
fn test_parse_missing_file_fails() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path());

    finscan(&config)
        .arg("parse")
        .arg(dir.path().join("nope.pdf"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Input file not found"));
}

#[test]
fn test_config_path_reports_explicit_file() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path());

    finscan(&config)
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.json"))
        .stdout(predicate::str::contains("exists"));
}

#[test]
fn test_config_get_reads_nested_key() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path());

    finscan(&config)
        .args(["config", "get", "pipeline.max_retries"])
        .assert()
        .success()
        .stdout(predicate::str::contains("0"));
}

#[test]
fn test_rules_add_then_list() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path());

    finscan(&config)
        .args(["rules", "add", "--pattern", "(?i)walmart", "--category", "Groceries", "--priority", "5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Added rule"));

    finscan(&config)
        .args(["rules", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("(?i)walmart"))
        .stdout(predicate::str::contains("active"));
}

#[test]
fn test_rules_add_unknown_category_fails() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path());

    finscan(&config)
        .args(["rules", "add", "--pattern", "x", "--category", "Nonexistent Things"])
        .assert()
        .failure();
}

#[test]
fn test_transactions_list_empty() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path());

    finscan(&config)
        .args(["transactions", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No transactions."));
}

#[test]
fn test_ingest_reports_failed_and_rejected_files() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path());
    let inbox = dir.path().join("inbox");
    fs::create_dir_all(&inbox).unwrap();
    fs::write(inbox.join("broken.pdf"), b"definitely not a pdf").unwrap();
    fs::write(inbox.join("notes.txt"), RECEIPT).unwrap();

    finscan(&config)
        .arg("ingest")
        .arg(format!("{}/*", inbox.display()))
        .assert()
        .success()
        .stdout(predicate::str::contains("1 failed"))
        .stdout(predicate::str::contains("1 rejected"));

    finscan(&config)
        .args(["documents", "list", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"failed\""));
}
