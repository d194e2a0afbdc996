//! CLI E2E tests for the traffic-comparator binary.
//!
//! Validates:
//! - `available-reports` lists the built-in reports
//! - `run` correlates captures, displays and exports reports, exit codes
//! - `stream` and `stream-report` over stdin/stdout
//! - config errors and unknown report names map to their exit codes
//! - malformed capture lines are skipped and logged with their line number
//! - a failed export exits 12 without losing the other reports

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tempfile::tempdir;

// ============================================================================
// Helpers
// ============================================================================

fn traffic_comparator() -> Command {
    let mut cmd = cargo_bin_cmd!("traffic-comparator");
    cmd.timeout(Duration::from_secs(60));
    cmd.env_remove("RUST_LOG");
    cmd.env_remove("TRAFFIC_COMPARATOR_CONFIG");
    // Keep a developer's own config file out of the way.
    cmd.env(
        "XDG_CONFIG_HOME",
        std::env::temp_dir().join("traffic-comparator-e2e-no-config"),
    );
    cmd
}

fn pair_line(ts: i64, uri: &str, status: u16, body: Value, latency: i64) -> String {
    json!({
        "request": {"timestamp": ts, "method": "GET", "uri": uri},
        "response": {"status": status, "headers": {"Date": format!("t{ts}")}, "body": body, "latency": latency}
    })
    .to_string()
}

fn write_captures(dir: &Path, shadow_second_body: Value) -> (String, String) {
    let primary = dir.join("primary.jsonl");
    let shadow = dir.join("shadow.jsonl");
    fs::write(
        &primary,
        [
            pair_line(1, "/a", 200, json!({"took": 3, "hits": 1}), 10),
            pair_line(2, "/b", 200, json!({"hits": 2}), 20),
            pair_line(3, "/never", 200, json!({}), 30),
        ]
        .join("\n"),
    )
    .unwrap();
    fs::write(
        &shadow,
        [
            pair_line(2, "/a", 200, json!({"took": 9, "hits": 1}), 11),
            pair_line(4, "/b", 200, shadow_second_body, 21),
        ]
        .join("\n"),
    )
    .unwrap();
    (
        primary.to_string_lossy().into_owned(),
        shadow.to_string_lossy().into_owned(),
    )
}

// ============================================================================
// available-reports
// ============================================================================

#[test]
fn available_reports_lists_builtins() {
    traffic_comparator()
        .arg("available-reports")
        .assert()
        .success()
        .stdout(predicate::str::contains("DiffReport:"))
        .stdout(predicate::str::contains("PerformanceReport:"));
}

// ============================================================================
// run
// ============================================================================

#[test]
fn run_with_identical_matches_exits_clean() {
    let dir = tempdir().unwrap();
    let (primary, shadow) = write_captures(dir.path(), json!({"hits": 2}));
    traffic_comparator()
        .args(["run", "--primary-log-file", primary.as_str(), "--shadow-log-file", shadow.as_str()])
        .args(["--display-reports", "DiffReport"])
        .assert()
        .code(0)
        .stdout(predicate::str::contains("2 responses were compared."))
        .stdout(predicate::str::contains("match rate of 100.00%"))
        .stdout(predicate::str::contains("1 requests were not matched."));
}

#[test]
fn run_with_mismatch_exits_one_and_exports() {
    let dir = tempdir().unwrap();
    let (primary, shadow) = write_captures(dir.path(), json!({"hits": 5}));
    let export = dir.path().join("diff.json");
    let export_arg = format!("DiffReport={}", export.display());

    traffic_comparator()
        .args(["run", "--primary-log-file", primary.as_str(), "--shadow-log-file", shadow.as_str()])
        .args(["--export-reports", export_arg.as_str()])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("DiffReport was exported to"));

    let exported: Value = serde_json::from_str(&fs::read_to_string(&export).unwrap()).unwrap();
    assert_eq!(exported["data"]["identical"], json!(1));
    assert_eq!(exported["data"]["unmatched_requests"], json!(1));
    let mismatch = &exported["data"]["mismatches"][0];
    assert_eq!(mismatch["uri"], json!("/b"));
    assert_eq!(
        mismatch["body_diff"]["value_changed"]["root['hits']"],
        json!({"old_value": 2, "new_value": 5})
    );
}

#[test]
fn run_reads_captures_and_reports_from_config() {
    let dir = tempdir().unwrap();
    let (primary, shadow) = write_captures(dir.path(), json!({"hits": 2}));
    let config = dir.path().join("config.json");
    fs::write(
        &config,
        json!({
            "primary_log_file": primary,
            "shadow_log_file": shadow,
            "reports": [{"report_name": "PerformanceReport", "display": true}]
        })
        .to_string(),
    )
    .unwrap();

    traffic_comparator()
        .args(["--config", config.to_str().unwrap(), "run"])
        .assert()
        .code(0)
        .stdout(predicate::str::contains("PerformanceReport:"))
        .stdout(predicate::str::contains("==Stats for primary cluster=="));
}

#[test]
fn run_without_captures_is_a_config_error() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("empty.json");
    fs::write(&config, "{}").unwrap();
    traffic_comparator()
        .args(["--config", config.to_str().unwrap(), "run"])
        .assert()
        .code(10)
        .stderr(predicate::str::contains("--primary-log-file"));
}

#[test]
fn unknown_report_fails_only_that_report() {
    let dir = tempdir().unwrap();
    let (primary, shadow) = write_captures(dir.path(), json!({"hits": 2}));
    traffic_comparator()
        .args(["run", "--primary-log-file", primary.as_str(), "--shadow-log-file", shadow.as_str()])
        .args(["--display-reports", "NoSuchReport", "--display-reports", "DiffReport"])
        .assert()
        .code(12)
        .stderr(predicate::str::contains("NoSuchReport"))
        .stdout(predicate::str::contains("2 responses were compared."));
}

#[test]
fn run_skips_malformed_capture_lines() {
    let dir = tempdir().unwrap();
    let (_, shadow) = write_captures(dir.path(), json!({"hits": 2}));
    let primary = dir.path().join("primary-with-bad-lines.jsonl");
    let mut bytes = pair_line(1, "/a", 200, json!({"took": 3, "hits": 1}), 10).into_bytes();
    bytes.extend_from_slice(b"\nnot json\n\xff\xfe\n");
    bytes.extend_from_slice(pair_line(2, "/b", 200, json!({"hits": 2}), 20).as_bytes());
    fs::write(&primary, bytes).unwrap();

    traffic_comparator()
        .args(["--log-format", "json", "run"])
        .args(["--primary-log-file", primary.to_str().unwrap(), "--shadow-log-file", shadow.as_str()])
        .args(["--display-reports", "DiffReport"])
        .assert()
        .code(0)
        .stdout(predicate::str::contains("2 responses were compared."))
        .stdout(predicate::str::contains("not matched").not())
        .stderr(predicate::str::contains("skipping malformed record"))
        .stderr(predicate::str::contains("\"line\":2"))
        .stderr(predicate::str::contains("\"line\":3"));
}

#[test]
fn failed_export_exits_twelve_and_keeps_other_reports() {
    let dir = tempdir().unwrap();
    let (primary, shadow) = write_captures(dir.path(), json!({"hits": 5}));
    let bad_export = format!("DiffReport={}", dir.path().join("missing/diff.json").display());
    let perf = dir.path().join("perf.json");
    let good_export = format!("PerformanceReport={}", perf.display());

    traffic_comparator()
        .args(["run", "--primary-log-file", primary.as_str(), "--shadow-log-file", shadow.as_str()])
        .args(["--display-reports", "DiffReport"])
        .args(["--export-reports", bad_export.as_str(), "--export-reports", good_export.as_str()])
        .assert()
        .code(12)
        .stdout(predicate::str::contains("2 responses were compared."))
        .stdout(predicate::str::contains("PerformanceReport was exported to"))
        .stderr(predicate::str::contains("DiffReport"));
    assert!(perf.exists());
}

#[test]
fn invalid_config_file_exits_ten() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("bad.json");
    fs::write(&config, "{ nope").unwrap();
    traffic_comparator()
        .args(["--config", config.to_str().unwrap(), "stream"])
        .write_stdin("")
        .assert()
        .code(10);
}

#[test]
fn missing_capture_file_is_an_io_error() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("missing.jsonl");
    let missing = missing.to_str().unwrap();
    traffic_comparator()
        .args(["run", "--primary-log-file", missing, "--shadow-log-file", missing])
        .assert()
        .code(13);
}

// ============================================================================
// stream / stream-report
// ============================================================================

fn matched_line(shadow_status: u16) -> String {
    json!({
        "request": {"method": "GET", "uri": "/"},
        "primaryResponse": {"status": 200, "body": {"tagline": "a", "v": 1}},
        "shadowResponse": {"status": shadow_status, "body": {"tagline": "b", "v": 1}}
    })
    .to_string()
}

#[test]
fn stream_emits_one_line_per_pair() {
    let input = format!("{}\ngarbage\n{}\n", matched_line(200), matched_line(200));
    let output = traffic_comparator()
        .arg("stream")
        .write_stdin(input)
        .assert()
        .code(0)
        .get_output()
        .stdout
        .clone();

    let text = String::from_utf8(output).unwrap();
    let lines: Vec<Value> = text
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["_body_diff"], json!({}));
}

#[test]
fn stream_then_stream_report() {
    let dir = tempdir().unwrap();
    let comparisons = dir.path().join("comparisons.jsonl");
    let input = format!("{}\n{}\n", matched_line(200), matched_line(503));

    traffic_comparator()
        .args(["stream", "--output", comparisons.to_str().unwrap()])
        .write_stdin(input)
        .assert()
        .code(1);

    let export = dir.path().join("perf.json");
    traffic_comparator()
        .args(["stream-report", "--input", comparisons.to_str().unwrap()])
        .args(["--display-reports", "DiffReport"])
        .arg("--export-reports")
        .arg(format!("PerformanceReport={}", export.display()))
        .assert()
        .code(1)
        .stdout(predicate::str::contains("== Final snapshot"))
        .stdout(predicate::str::contains("The status codes matched in 50.00% of responses."));

    let exported: Value = serde_json::from_str(&fs::read_to_string(&export).unwrap()).unwrap();
    assert_eq!(exported["report"], json!("PerformanceReport"));
}

#[test]
fn stream_report_defaults_to_diff_report() {
    let line = json!({
        "primary_response": {"status": 200},
        "shadow_response": {"status": 200},
        "original_request": {},
        "_status_code_diff": {},
        "_headers_diff": {},
        "_body_diff": {}
    })
    .to_string();
    traffic_comparator()
        .arg("stream-report")
        .write_stdin(line)
        .assert()
        .code(0)
        .stdout(predicate::str::contains("DiffReport:"))
        .stdout(predicate::str::contains("1 responses were compared."));
}

#[test]
fn zero_snapshot_interval_is_rejected_by_clap() {
    traffic_comparator()
        .args(["stream-report", "--snapshot-interval-secs", "0"])
        .write_stdin("")
        .assert()
        .failure()
        .stderr(predicate::str::contains("snapshot-interval-secs"));
}

#[test]
fn stream_skips_non_utf8_lines() {
    let mut input = format!("{}\n", matched_line(200)).into_bytes();
    input.extend_from_slice(b"{\"bad\":\"\xff\xfe\"}\n");
    input.extend_from_slice(matched_line(500).as_bytes());

    let output = traffic_comparator()
        .arg("stream")
        .write_stdin(input)
        .assert()
        .code(1)
        .get_output()
        .stdout
        .clone();
    assert_eq!(String::from_utf8(output).unwrap().lines().count(), 2);
}

#[test]
fn json_logs_go_to_stderr() {
    traffic_comparator()
        .args(["-vv", "--log-format", "json", "stream"])
        .write_stdin(matched_line(200))
        .assert()
        .code(0)
        .stderr(predicate::str::contains("\"level\""));
}
