//! CLI integration tests

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;

fn jsplit() -> Command {
    Command::cargo_bin("jsplit").expect("binary")
}

#[test]
fn plan_prints_table_for_small_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("data.json");
    fs::write(&input, br#"[{"a":1},{"a":2}]"#).expect("write");

    jsplit()
        .arg("plan")
        .arg(&input)
        .args(["--path", "$[*]"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 partition(s)"))
        .stdout(predicate::str::contains("data.json"));
}

#[test]
fn plan_emits_json_lines() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("data.json");
    fs::write(&input, br#"[{"a":1},{"a":2}]"#).expect("write");

    let output = jsplit()
        .arg("plan")
        .arg(&input)
        .args(["--path", "$[*]", "--format", "json"])
        .output()
        .expect("run");
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).expect("utf8");
    let first: serde_json::Value =
        serde_json::from_str(stdout.lines().next().expect("one line")).expect("json");
    assert_eq!(first["id"], 0);
    assert_eq!(first["start"], 0);
    assert_eq!(first["startLevel"], 0);
}

#[test]
fn plan_splits_with_small_buckets() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("records.json");
    let mut data = Vec::new();
    data.push(b'[');
    for i in 0..50 {
        if i > 0 {
            data.push(b',');
        }
        data.extend_from_slice(format!("{{\"id\":{i},\"text\":\"row {i}\"}}").as_bytes());
    }
    data.push(b']');
    fs::write(&input, &data).expect("write");

    let output = jsplit()
        .arg("plan")
        .arg(&input)
        .args([
            "--path",
            "$[*]",
            "--format",
            "json",
            "--min-partition-bytes",
            "200",
            "--max-partition-bytes",
            "200",
        ])
        .output()
        .expect("run");
    assert!(output.status.success());
    let lines = String::from_utf8(output.stdout).expect("utf8");
    assert!(lines.lines().count() > 2, "expected several partitions");
}

#[test]
fn stats_writes_output_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("data.json");
    let stats_path = dir.path().join("stats.json");
    fs::write(&input, br#"[{"user":"a"},{"user":"b"}]"#).expect("write");

    jsplit()
        .arg("stats")
        .arg(&input)
        .args(["--path", "$[*].user"])
        .arg("--output")
        .arg(&stats_path)
        .assert()
        .success()
        .stderr(predicate::str::contains("distinct keys"));

    let stats: serde_json::Value =
        serde_json::from_slice(&fs::read(&stats_path).expect("read")).expect("json");
    assert!(stats["keys"]["user"].is_object());
}

#[test]
fn speculative_without_anchors_fails() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("data.json");
    // "k" appears at two levels: no single-level anchor candidates.
    fs::write(&input, br#"{"k":{"k":1}}"#).expect("write");

    jsplit()
        .arg("plan")
        .arg(&input)
        .args(["--path", "$.k", "--strategy", "speculative"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("speculation impossible"));
}

#[test]
fn speculative_falls_back_when_asked() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("data.json");
    fs::write(&input, br#"{"k":{"k":1}}"#).expect("write");

    jsplit()
        .arg("plan")
        .arg(&input)
        .args([
            "--path",
            "$.k",
            "--strategy",
            "speculative",
            "--fallback-full-pass",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 partition(s)"));
}

#[test]
fn invalid_projection_is_reported() {
    jsplit()
        .arg("plan")
        .arg("whatever.json")
        .args(["--path", "a.b"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid projection"));
}
