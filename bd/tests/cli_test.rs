//! Binary smoke tests

use std::io::Write;

use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn test_help_lists_commands() {
    Command::cargo_bin("bd")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_config_prints_effective_yaml() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "processor:\n  rate-limit-ms: 1234").unwrap();

    Command::cargo_bin("bd")
        .unwrap()
        .args(["config", "--config"])
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("rate-limit-ms: 1234"))
        .stdout(predicate::str::contains("batch-size: 3"));
}

#[test]
fn test_config_missing_file_fails() {
    let dir = tempfile::TempDir::new().unwrap();

    Command::cargo_bin("bd")
        .unwrap()
        .args(["config", "--config"])
        .arg(dir.path().join("missing.yml"))
        .assert()
        .failure();
}
