//! Integration tests for the git-pr binary

#![allow(deprecated)] // cargo_bin is the standard way to test CLI binaries

use assert_cmd::Command;
use predicates::prelude::*;

// =============================================================================
// CLI Tests
// =============================================================================

#[test]
fn test_cli_help() {
    let mut cmd = Command::cargo_bin("git-pr").unwrap();
    cmd.arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Land stacked GitHub pull requests"));
}

#[test]
fn test_cli_version() {
    let mut cmd = Command::cargo_bin("git-pr").unwrap();
    cmd.arg("--version");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_land_help_lists_options() {
    let mut cmd = Command::cargo_bin("git-pr").unwrap();
    cmd.args(["land", "--help"]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("--dry-run"))
        .stdout(predicate::str::contains("--interactive"))
        .stdout(predicate::str::contains("--strategy"))
        .stdout(predicate::str::contains("--no-delete-branch"));
}

#[test]
fn test_status_help() {
    let mut cmd = Command::cargo_bin("git-pr").unwrap();
    cmd.args(["status", "--help"]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("--include-other-authors"));
}

#[test]
fn test_yes_and_no_sync_conflict() {
    let mut cmd = Command::cargo_bin("git-pr").unwrap();
    cmd.args(["land", "--yes", "--no-sync"]);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}

#[test]
fn test_missing_subcommand_fails() {
    let mut cmd = Command::cargo_bin("git-pr").unwrap();

    cmd.assert().failure();
}

#[test]
fn test_missing_repository_fails() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("does-not-exist");

    let mut cmd = Command::cargo_bin("git-pr").unwrap();
    cmd.arg("-C").arg(&missing).arg("status");

    cmd.assert().failure();
}
