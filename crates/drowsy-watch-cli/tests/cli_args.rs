//! CLI argument validation tests.
//!
//! Tests command-line argument parsing, validation, and error handling.

#![allow(clippy::unwrap_used)]
#![allow(deprecated)] // cargo_bin deprecation

use assert_cmd::Command;
use predicates::prelude::*;

fn cli() -> Command {
    let mut cmd = Command::cargo_bin("drowsy-watch").unwrap();
    // Keep the user's XDG config out of the way.
    let isolated = std::env::temp_dir().join("drowsy-watch-cli-args");
    cmd.env("XDG_CONFIG_HOME", &isolated);
    cmd
}

#[test]
fn test_subcommand_required() {
    cli().assert().failure().stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_monitor_requires_paths() {
    cli()
        .arg("monitor")
        .assert()
        .failure()
        .stderr(predicate::str::contains("required").or(predicate::str::contains("PATHS")));
}

#[test]
fn test_analyze_requires_images() {
    cli()
        .arg("analyze")
        .assert()
        .failure()
        .stderr(predicate::str::contains("IMAGES"));
}

#[test]
fn test_invalid_format_rejected() {
    cli()
        .args(["monitor", "--format", "xml", "frames"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("json").or(predicate::str::contains("jsonl")));
}

#[test]
fn test_openness_threshold_range_checked() {
    cli()
        .args(["monitor", "--low-openness", "1.5", "frames"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("1.5 is not in 0.0..=1.0"));
}

#[test]
fn test_zero_frame_count_rejected() {
    cli()
        .args(["monitor", "--critical-frames", "0", "frames"])
        .assert()
        .failure();
}

#[test]
fn test_non_positive_fps_rejected() {
    cli()
        .args(["monitor", "--fps", "0", "frames"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("must be a finite number >= 0.001"));
}

#[test]
fn test_vanishing_fps_rejected() {
    cli()
        .args(["monitor", "--fps", "1e-300", "frames"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains(">= 0.001"));
}

#[test]
fn test_inconsistent_thresholds_exit_with_error() {
    let temp_dir = tempfile::tempdir().unwrap();
    cli()
        .args(["monitor", "--critical-openness", "0.7", "--low-openness", "0.4"])
        .arg("--models-dir")
        .arg(temp_dir.path())
        .arg(temp_dir.path())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("critical_openness"));
}

#[test]
fn test_models_path_honors_override() {
    let temp_dir = tempfile::tempdir().unwrap();
    cli()
        .args(["models", "path", "--models-dir"])
        .arg(temp_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains(temp_dir.path().to_string_lossy().as_ref()));
}

#[test]
fn test_models_list_reports_missing() {
    let temp_dir = tempfile::tempdir().unwrap();
    cli()
        .args(["models", "list", "--models-dir"])
        .arg(temp_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("0/3 models installed"))
        .stdout(predicate::str::contains("eye_openness.safetensors"));
}

#[test]
fn test_models_list_counts_installed() {
    let temp_dir = tempfile::tempdir().unwrap();
    drowsy_watch_test_support::write_model_dir(temp_dir.path(), 0.5).unwrap();
    cli()
        .args(["models", "list", "--models-dir"])
        .arg(temp_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("2/3 models installed"))
        .stdout(predicate::str::contains("Copy the missing files").not());
}

#[test]
fn test_help_lists_commands() {
    cli()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("monitor"))
        .stdout(predicate::str::contains("analyze"))
        .stdout(predicate::str::contains("models"));
}
