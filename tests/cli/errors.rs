//! Tests for error reporting.

use crate::support::*;
use predicates::prelude::*;

#[test]
fn test_unknown_context_hints_contexts() {
    let t = Test::new();

    let output = t.show("nope", "staging", &[]);
    assert_failure(&output);
    assert_stderr_contains(&output, "no vault configured for nope/staging");
    assert_stderr_contains(&output, "kvt contexts");
}

#[test]
fn test_unparseable_operation() {
    let t = Test::new();

    let output = t.apply("frontend", "staging", &["frobnicate X"]);
    assert_failure(&output);
    assert_stderr_contains(&output, "invalid operation 'frobnicate X'");
}

#[test]
fn test_unknown_backend_value() {
    let t = Test::new();

    let output = t
        .cmd()
        .args(["--backend", "gcp", "contexts"])
        .output()
        .unwrap();
    assert_failure(&output);
    assert_stderr_contains(&output, "gcp");
}

#[test]
fn test_invalid_config_is_reported() {
    let t = Test::with_config("[store]\nbackend = \"s3\"\n");

    let output = t.contexts();
    assert_failure(&output);
    assert_stderr_contains(&output, "config");
}

#[test]
fn test_apply_requires_an_operation() {
    let t = Test::new();

    let output = t
        .cmd()
        .args(["apply", "frontend", "staging", "--yes"])
        .output()
        .unwrap();
    assert_failure(&output);
}

#[test]
fn test_completions() {
    let t = Test::new();

    t.cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("kvt"));
}

#[test]
fn test_verbose_logs_to_stderr() {
    let t = Test::new();

    t.cmd()
        .args(["--verbose", "show", "frontend", "staging"])
        .assert()
        .success()
        .stdout(predicate::str::contains("API_KEY"))
        .stderr(predicate::str::contains("opened session"))
        .stderr(predicate::str::contains("sk-staging").not());
}
