//! Integration tests for the `recur` CLI binary.
//!
//! These use `assert_cmd` and `predicates` to drive the validate, expand, next and
//! month subcommands through the real binary, including configuration layering.

// `Command::cargo_bin` was deprecated in assert_cmd 2.1.2 in favor of
// `cargo::cargo_bin_cmd!`. Allow it until we migrate.
#![allow(deprecated)]

use assert_cmd::Command;
use predicates::prelude::*;

/// Helper: path to the march.json snapshot fixture.
fn march_json_path() -> &'static str {
    concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/march.json")
}

/// Helper: path to the limits.toml config fixture.
fn limits_toml_path() -> &'static str {
    concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/limits.toml")
}

fn recur() -> Command {
    let mut cmd = Command::cargo_bin("recur").unwrap();
    cmd.env_remove("RUST_LOG")
        .env_remove("RECUR_MONTHLY_MAX_INSTANCES")
        .env_remove("RECUR_RANGE_MAX_INSTANCES")
        .env_remove("RECUR_LOOKAHEAD_MONTHS");
    cmd
}

fn month_json(output: &[u8]) -> serde_json::Value {
    serde_json::from_slice(output).expect("month output should be valid JSON")
}

// ─────────────────────────────────────────────────────────────────────────────
// validate
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn validate_prints_canonical_form() {
    recur()
        .args(["validate", "byday=MO;freq=weekly;interval=1"])
        .assert()
        .success()
        .stdout("valid: FREQ=WEEKLY;BYDAY=MO\n");
}

#[test]
fn validate_rejects_unknown_key() {
    recur()
        .args(["validate", "FREQ=WEEKLY;XYZ=1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown key 'XYZ'"));
}

#[test]
fn validate_rejects_unsupported_frequency() {
    recur()
        .args(["validate", "FREQ=FORTNIGHTLY"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unsupported frequency"));
}

// ─────────────────────────────────────────────────────────────────────────────
// expand / next
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn expand_weekly_mondays() {
    recur()
        .args([
            "expand",
            "--rule",
            "FREQ=WEEKLY;BYDAY=MO",
            "--anchor",
            "2024-01-01T09:00:00",
            "--from",
            "2024-01-01",
            "--to",
            "2024-01-31T23:59:59",
        ])
        .assert()
        .success()
        .stdout(
            "2024-01-01T09:00:00\n\
             2024-01-08T09:00:00\n\
             2024-01-15T09:00:00\n\
             2024-01-22T09:00:00\n\
             2024-01-29T09:00:00\n",
        );
}

#[test]
fn expand_reports_truncation_on_stderr() {
    recur()
        .args([
            "expand",
            "--rule",
            "FREQ=DAILY",
            "--anchor",
            "2024-01-01T09:00",
            "--from",
            "2024-01-01",
            "--to",
            "2024-01-31",
            "--max",
            "3",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("2024-01-03T09:00:00"))
        .stdout(predicate::str::contains("2024-01-04").not())
        .stderr(predicate::str::contains("truncated at 3 instances"));
}

#[test]
fn expand_rejects_bad_timestamp() {
    recur()
        .args([
            "expand",
            "--rule",
            "FREQ=DAILY",
            "--anchor",
            "yesterday",
            "--from",
            "2024-01-01",
            "--to",
            "2024-01-31",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid timestamp: 'yesterday'"));
}

#[test]
fn next_prints_following_occurrence() {
    recur()
        .args([
            "next",
            "--rule",
            "FREQ=MONTHLY;BYDAY=3SA",
            "--anchor",
            "2024-01-20T10:00:00",
            "--after",
            "2024-02-01T00:00:00",
        ])
        .assert()
        .success()
        .stdout("2024-02-17T10:00:00\n");
}

#[test]
fn next_prints_none_past_the_horizon() {
    recur()
        .args([
            "next",
            "--rule",
            "FREQ=YEARLY",
            "--anchor",
            "2024-02-29T09:00:00",
            "--after",
            "2024-03-01T00:00:00",
        ])
        .assert()
        .success()
        .stdout("none\n");
}

#[test]
fn lookahead_comes_from_environment() {
    recur()
        .env("RECUR_LOOKAHEAD_MONTHS", "48")
        .args([
            "next",
            "--rule",
            "FREQ=YEARLY",
            "--anchor",
            "2024-02-29T09:00:00",
            "--after",
            "2024-03-01T00:00:00",
        ])
        .assert()
        .success()
        .stdout("2028-02-29T09:00:00\n");
}

// ─────────────────────────────────────────────────────────────────────────────
// month
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn month_view_from_file() {
    let output = recur()
        .args([
            "month", "-i", march_json_path(), "--owner", "1", "--year", "2024", "--month", "3",
        ])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let view = month_json(&output);
    let items = view["items"].as_array().expect("items array");
    assert_eq!(items.len(), 5);

    let titles: Vec<&str> = items.iter().map(|i| i["title"].as_str().unwrap()).collect();
    assert_eq!(
        titles,
        vec!["Team sync", "Dentist", "Team sync", "Team sync", "Team sync"]
    );
    assert!(items[1]["virtual_id"].is_null());
    assert_eq!(items[1]["category_name"], "Health");
    assert_eq!(items[0]["category_name"], "Work");
    assert_eq!(items[0]["virtual_id"]["template_id"], 2);

    let diagnostics = view["diagnostics"].as_array().expect("diagnostics array");
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0]["kind"], "rule_rejected");
    assert_eq!(diagnostics[0]["template_id"], 3);
}

#[test]
fn month_view_from_stdin() {
    let snapshot = std::fs::read_to_string(march_json_path()).expect("fixture must exist");

    recur()
        .args(["month", "--owner", "2", "--year", "2024", "--month", "3"])
        .write_stdin(snapshot)
        .assert()
        .success()
        .stdout(predicate::str::contains("Someone else's"))
        .stdout(predicate::str::contains("Dentist").not());
}

#[test]
fn month_view_rejects_impossible_month() {
    recur()
        .args([
            "month", "-i", march_json_path(), "--owner", "1", "--year", "2024", "--month", "13",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid calendar month: 2024-13"));
}

#[test]
fn month_view_rejects_malformed_snapshot() {
    recur()
        .args(["month", "--owner", "1", "--year", "2024", "--month", "3"])
        .write_stdin("{ not json")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse template snapshot"));
}

#[test]
fn config_file_caps_month_view() {
    let output = recur()
        .args([
            "--config",
            limits_toml_path(),
            "month",
            "-i",
            march_json_path(),
            "--owner",
            "1",
            "--year",
            "2024",
            "--month",
            "3",
        ])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let view = month_json(&output);
    // Dentist plus the first two Team sync occurrences.
    assert_eq!(view["items"].as_array().unwrap().len(), 3);
    let truncated = view["diagnostics"]
        .as_array()
        .unwrap()
        .iter()
        .any(|d| d["kind"] == "truncated" && d["template_id"] == 2 && d["limit"] == 2);
    assert!(truncated);
}

#[test]
fn environment_overrides_config_file() {
    let output = recur()
        .env("RECUR_MONTHLY_MAX_INSTANCES", "100")
        .args([
            "--config",
            limits_toml_path(),
            "month",
            "-i",
            march_json_path(),
            "--owner",
            "1",
            "--year",
            "2024",
            "--month",
            "3",
        ])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    assert_eq!(month_json(&output)["items"].as_array().unwrap().len(), 5);
}

#[test]
fn missing_config_file_is_an_error() {
    recur()
        .args(["--config", "/nonexistent/limits.toml", "validate", "FREQ=DAILY"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load configuration"));
}
