// Integration tests for `callcost replay`
#![allow(deprecated)] // suppress assert_cmd::Command::cargo_bin deprecation in tests

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;
use tempfile::NamedTempFile;

const EVENTS: &str = r#"{"at": 0, "op": "begin", "call_id": "App&onCreate", "subject": "application_lifecycle"}
{"at": 5, "op": "begin", "call_id": "Feed&load"}
{"at": 30, "op": "end", "call_id": "Feed&load", "threshold": 16}
{"at": 31, "op": "begin", "call_id": "Feed&bind"}
{"at": 33, "op": "end", "call_id": "Feed&bind", "threshold": 16}
{"at": 120, "op": "end", "call_id": "App&onCreate", "subject": "application_lifecycle"}
{"at": 200, "op": "begin", "call_id": "Leak&never"}
"#;

fn write_temp(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_replay_text_output() {
    let events = write_temp(EVENTS);
    let mut cmd = Command::cargo_bin("callcost").unwrap();
    cmd.arg("replay").arg(events.path()).arg("--threshold").arg("100");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("================callcost================"))
        .stdout(predicate::str::contains(
            "methodName===>Feed&load  threadName==>main  thresholdTime===>16   costTime===>25",
        ))
        .stdout(predicate::str::contains("methodName===>App&onCreate"))
        .stdout(predicate::str::contains("Feed&bind").not());
}

#[test]
fn test_replay_default_threshold_from_config() {
    let events = write_temp(EVENTS);
    // Default threshold is 1000, so the onCreate event (120) stays quiet
    let mut cmd = Command::cargo_bin("callcost").unwrap();
    cmd.arg("replay").arg(events.path());

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Feed&load"))
        .stdout(predicate::str::contains("App&onCreate").not());
}

#[test]
fn test_replay_json_output() {
    let events = write_temp(EVENTS);
    let mut cmd = Command::cargo_bin("callcost").unwrap();
    cmd.arg("replay").arg(events.path()).arg("--format").arg("json");

    let output = cmd.output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<_> = stdout.lines().collect();
    assert_eq!(lines.len(), 1);
    let report: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(report["call_id"], "Feed&load");
    assert_eq!(report["elapsed"], 25);
    assert_eq!(report["threshold"], 16);
}

#[test]
fn test_replay_config_file() {
    let events = write_temp(EVENTS);
    let config = write_temp("default_threshold = 50\nformat = \"json\"\n");
    let mut cmd = Command::cargo_bin("callcost").unwrap();
    cmd.arg("replay")
        .arg(events.path())
        .arg("--config")
        .arg(config.path());

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("\"call_id\":\"App&onCreate\""))
        .stdout(predicate::str::contains("\"elapsed\":120"));
}

#[test]
fn test_replay_disabled_config_reports_nothing() {
    let events = write_temp(EVENTS);
    let config = write_temp("enabled = false\n");
    let mut cmd = Command::cargo_bin("callcost").unwrap();
    cmd.arg("replay")
        .arg(events.path())
        .arg("--config")
        .arg(config.path());

    cmd.assert().success().stdout(predicate::str::is_empty());
}

#[test]
fn test_replay_summary() {
    let events = write_temp(EVENTS);
    let mut cmd = Command::cargo_bin("callcost").unwrap();
    cmd.arg("replay")
        .arg(events.path())
        .arg("--threshold")
        .arg("100")
        .arg("--summary");

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("Slow Call Summary"))
        .stderr(predicate::str::contains(
            "7 events, 2 slow calls, 1 unmatched begins",
        ));
}

#[test]
fn test_replay_malformed_log_fails() {
    let events = write_temp("{\"at\": 0, \"op\": \"begin\", \"call_id\": \"A&a\"}\nnot json\n");
    let mut cmd = Command::cargo_bin("callcost").unwrap();
    cmd.arg("replay").arg(events.path());

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("line 2"));
}

#[test]
fn test_replay_missing_file_fails() {
    let mut cmd = Command::cargo_bin("callcost").unwrap();
    cmd.arg("replay").arg("/nonexistent/events.jsonl");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Failed to replay"));
}
