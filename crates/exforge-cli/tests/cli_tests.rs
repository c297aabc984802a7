//! CLI integration tests using assert_cmd.

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// The binary, isolated from any config in the working or home directory.
fn exforge(dir: &Path) -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("exforge").unwrap();
    cmd.current_dir(dir)
        .env("HOME", dir)
        .env_remove("EXFORGE_SEED")
        .env_remove("EXFORGE_RETRY_CAP");
    cmd
}

const SHEET: &str = r#"
[[attempts]]
exercise = "coordinates"
[attempts.answers]
a = 1
b = 3

[[attempts]]
exercise = "addition"
[attempts.answers]
sum = "5"
"#;

fn write_sheet(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("answers.toml");
    std::fs::write(&path, SHEET).unwrap();
    path
}

#[test]
fn list_shows_catalog() {
    let dir = TempDir::new().unwrap();
    exforge(dir.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("addition"))
        .stdout(predicate::str::contains("multiple-of-seven"))
        .stdout(predicate::str::contains("7 exercise(s)"));
}

#[test]
fn list_with_filter() {
    let dir = TempDir::new().unwrap();
    exforge(dir.path())
        .args(["list", "--filter", "arithmetic"])
        .assert()
        .success()
        .stdout(predicate::str::contains("3 exercise(s)"));
}

#[test]
fn filter_matching_nothing_is_an_error() {
    let dir = TempDir::new().unwrap();
    exforge(dir.path())
        .args(["list", "--filter", "no-such-exercise"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error: no exercises match the filter"));
}

#[test]
fn self_tests_pass() {
    let dir = TempDir::new().unwrap();
    exforge(dir.path())
        .args(["test", "--seed", "42"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ok   addition::"))
        .stdout(predicate::str::contains(", 0 failed"));
}

#[test]
fn validate_catalog() {
    let dir = TempDir::new().unwrap();
    exforge(dir.path())
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("Catalog: 7 exercises"))
        .stdout(predicate::str::contains("All exercises valid"));
}

#[test]
fn validate_reports_answer_sheet_problems() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("answers.toml");
    std::fs::write(
        &path,
        "[[attempts]]\nexercise = \"nope\"\n\n[[attempts]]\nexercise = \"addition\"\n[attempts.answers]\nsum = \"five\"\n",
    )
    .unwrap();

    exforge(dir.path())
        .arg("validate")
        .arg("--answers")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("[nope] unknown exercise"))
        .stdout(predicate::str::contains("[addition.sum] answer will be rejected"))
        .stdout(predicate::str::contains("2 warning(s) found"));
}

#[test]
fn validate_nonexistent_sheet() {
    let dir = TempDir::new().unwrap();
    exforge(dir.path())
        .args(["validate", "--answers", "nonexistent.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn run_answer_sheet_prints_summaries() {
    let dir = TempDir::new().unwrap();
    let sheet = write_sheet(&dir);

    exforge(dir.path())
        .args(["run", "--filter", "coordinates,addition", "--seed", "3", "--answers"])
        .arg(&sheet)
        .assert()
        .success()
        .stdout(predicate::str::contains("== Point on a line (coordinates) [completed] =="))
        .stdout(predicate::str::contains("total score: 1/2"))
        .stdout(predicate::str::contains("total score: 1/1"))
        .stderr(predicate::str::contains("2 completed, 0 cancelled, 0 failed; total 2/3"));
}

#[test]
fn run_answer_sheet_as_json() {
    let dir = TempDir::new().unwrap();
    let sheet = write_sheet(&dir);

    let output = exforge(dir.path())
        .args(["run", "--filter", "coordinates", "--format", "json", "--answers"])
        .arg(&sheet)
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let records = report["records"].as_array().unwrap();
    assert_eq!(records.len(), 1);
}

#[test]
fn run_saves_records_to_output_dir() {
    let dir = TempDir::new().unwrap();
    let sheet = write_sheet(&dir);
    let out = dir.path().join("results");

    exforge(dir.path())
        .args(["run", "--filter", "addition", "--answers"])
        .arg(&sheet)
        .arg("--output")
        .arg(&out)
        .assert()
        .success()
        .stderr(predicate::str::contains("Results saved to"));

    let names: Vec<String> = std::fs::read_dir(&out)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names.len(), 2);
    assert!(names.iter().any(|n| n.starts_with("session-")));
    assert!(names.iter().any(|n| n.starts_with("addition-")));
}

#[test]
fn run_interactive_reads_stdin() {
    let dir = TempDir::new().unwrap();
    exforge(dir.path())
        .args(["run", "--filter", "addition", "--seed", "1"])
        .write_stdin("five\n5\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("[1/1] 2 + 3 = (whole number): "))
        .stdout(predicate::str::contains("'five' is not a whole number (try 2)"))
        .stdout(predicate::str::contains("total score: 1/1"));
}

#[test]
fn run_interactive_fails_when_input_closes() {
    let dir = TempDir::new().unwrap();
    exforge(dir.path())
        .args(["run", "--filter", "addition"])
        .write_stdin("")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error: attempt at 'addition' failed"));
}

#[test]
fn run_rejects_zero_retry_cap() {
    let dir = TempDir::new().unwrap();
    exforge(dir.path())
        .args(["run", "--retry-cap", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("retry cap must be at least 1"));
}

#[test]
fn run_rejects_unknown_format() {
    let dir = TempDir::new().unwrap();
    exforge(dir.path())
        .args(["run", "--format", "xml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown format 'xml'"));
}

#[test]
fn run_with_missing_config() {
    let dir = TempDir::new().unwrap();
    exforge(dir.path())
        .args(["run", "--config", "nonexistent.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("config file not found"));
}

#[test]
fn init_creates_files() {
    let dir = TempDir::new().unwrap();

    exforge(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created exforge.toml"))
        .stdout(predicate::str::contains("Created answers/example.toml"));

    assert!(dir.path().join("exforge.toml").exists());
    assert!(dir.path().join("answers/example.toml").exists());

    // The starter files are usable as-is.
    exforge(dir.path())
        .args(["validate", "--answers", "answers/example.toml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("All exercises valid"));
}

#[test]
fn init_skips_existing_files() {
    let dir = TempDir::new().unwrap();

    exforge(dir.path()).arg("init").assert().success();
    exforge(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("exforge.toml already exists, skipping."));
}

#[test]
fn help_flag() {
    let dir = TempDir::new().unwrap();
    exforge(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Interactive exercises"));
}
