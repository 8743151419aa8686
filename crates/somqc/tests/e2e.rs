//! End-to-end CLI integration tests.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn somqc() -> Command {
    let mut cmd = Command::cargo_bin("somqc").expect("binary not found");
    cmd.env_remove("SOMQC_INPUT")
        .env_remove("SOMQC_MIN_NEURONS")
        .env_remove("RUST_LOG")
        .env("NO_COLOR", "1");
    cmd
}

const WORKBOOK: &str = r#"{
  "sheets": [
    {
      "name": "strong",
      "categories": ["A", "B"],
      "counts": [[40, 2], [35, 1], [1, 50], [0, 45], [3, 30]]
    },
    {
      "name": "weak",
      "categories": ["A", "B"],
      "counts": [[20, 15], [18, 14], [12, 16], [10, 13], [9, 9]]
    },
    {
      "name": "empty",
      "categories": ["A", "B"],
      "counts": [[0, 0], [0, 0], [0, 0], [0, 0], [0, 0]]
    }
  ]
}"#;

fn workbook(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("book.json");
    fs::write(&path, WORKBOOK).unwrap();
    path
}

fn write_csv(dir: &Path, name: &str, rows: &[&str]) {
    let mut text = String::from("neuron,A,B,C\n");
    for row in rows {
        text.push_str(row);
        text.push('\n');
    }
    fs::write(dir.join(name), text).unwrap();
}

#[test]
fn help_flag() {
    somqc()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("SOM"));
}

#[test]
fn version_flag() {
    somqc()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("somqc"));
}

#[test]
fn completion_needs_no_input() {
    somqc()
        .args(["--completion", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("somqc"));
}

#[test]
fn json_workbook_text_report() {
    let dir = TempDir::new().unwrap();
    somqc()
        .arg(workbook(&dir))
        .assert()
        .success()
        .stdout(predicate::str::contains("=== strong ==="))
        .stdout(predicate::str::contains("Ranking by accuracy"))
        .stdout(predicate::str::contains("Processed 2, skipped 1"))
        .stderr(predicate::str::contains("skipped empty"));
}

#[test]
fn quiet_mode_prints_one_line_per_sheet() {
    let dir = TempDir::new().unwrap();
    somqc()
        .arg(workbook(&dir))
        .args(["-q", "--sheet", "strong"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("strong\t"))
        .stdout(predicate::str::contains("\t96.62"));
}

#[test]
fn json_report_on_stdout_is_ranked() {
    let dir = TempDir::new().unwrap();
    let output = somqc()
        .arg(workbook(&dir))
        .args(["--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let rows: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let rows = rows.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["sheet_name"], "strong");
    assert_eq!(rows[0]["rank"], 1);
    assert_eq!(rows[1]["sheet_name"], "weak");
    assert_eq!(rows[1]["rank"], 2);
}

#[test]
fn csv_directory_to_report_file() {
    let dir = TempDir::new().unwrap();
    let sheets = dir.path().join("sheets");
    fs::create_dir(&sheets).unwrap();
    write_csv(
        &sheets,
        "run1.csv",
        &["n1,30,1,2", "n2,2,28,1", "n3,1,3,25", "n4,20,2,2", "n5,1,1,22"],
    );
    write_csv(
        &sheets,
        "run2.csv",
        &["n1,10,8,7", "n2,9,10,8", "n3,8,7,10", "n4,7,9,9", "n5,10,9,8"],
    );
    let report = dir.path().join("report.csv");

    somqc()
        .arg(&sheets)
        .args(["--format", "csv", "-q", "--output"])
        .arg(&report)
        .assert()
        .success();

    let csv = fs::read_to_string(&report).unwrap();
    let mut lines = csv.lines();
    assert!(lines.next().unwrap().starts_with("rank,"));
    assert!(lines.next().unwrap().starts_with("1,run1,"));
    assert!(lines.next().unwrap().starts_with("2,run2,"));
}

#[test]
fn unknown_sheet_is_skipped() {
    let dir = TempDir::new().unwrap();
    somqc()
        .arg(workbook(&dir))
        .args(["--sheet", "strong", "--sheet", "missing"])
        .assert()
        .success()
        .stderr(predicate::str::contains("no such sheet"));
}

#[test]
fn no_usable_sheet_exits_with_no_results() {
    let dir = TempDir::new().unwrap();
    somqc()
        .arg(workbook(&dir))
        .args(["--sheet", "empty"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Processed 0, skipped 1"));
}

#[test]
fn missing_input_is_a_config_error() {
    let dir = TempDir::new().unwrap();
    somqc()
        .arg(dir.path().join("absent.json"))
        .assert()
        .code(4)
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn malformed_workbook_is_a_config_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.json");
    fs::write(&path, "{\"sheets\": 3}").unwrap();
    somqc().arg(&path).assert().code(4);
}

#[test]
fn input_from_environment() {
    let dir = TempDir::new().unwrap();
    somqc()
        .env("SOMQC_INPUT", workbook(&dir))
        .args(["-q", "--sheet", "weak"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("weak\t"));
}
