//! CLI smoke tests.

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

fn scratch_dir(tag: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!("qssim-test-{}-{}", tag, std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn list_models() {
    Command::cargo_bin("qssim")
        .unwrap()
        .arg("--list")
        .assert()
        .success()
        .stdout(predicate::str::contains("achilles"))
        .stdout(predicate::str::contains("exponential_decay"));
}

#[test]
fn unknown_model_fails() {
    Command::cargo_bin("qssim")
        .unwrap()
        .arg("no_such_model")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown model"));
}

#[test]
fn decay_run_writes_streams() {
    let dir = scratch_dir("decay");
    Command::cargo_bin("qssim")
        .unwrap()
        .current_dir(&dir)
        .args(&[
            "exponential_decay",
            "--qss",
            "QSS1",
            "--tend",
            "0.1",
            "--out",
            "xqrs",
            "--loglevel",
            "Off",
        ])
        .assert()
        .success();
    let x_out = std::fs::read_to_string(dir.join("x.x.out")).unwrap();
    let q_out = std::fs::read_to_string(dir.join("x.q.out")).unwrap();
    assert!(x_out.lines().count() > 2);
    assert!(q_out.lines().count() > 2);
    // Tab-separated time/value records.
    let first = x_out.lines().next().unwrap();
    assert_eq!(first.split('\t').count(), 2);
}
