//! Tests for `kvt show`.

use crate::support::*;

#[test]
fn test_show_lists_entries() {
    let t = Test::new();

    let output = t.show("frontend", "staging", &[]);
    assert_success(&output);
    assert_stdout_contains(&output, "frontend/staging");
    assert_stdout_contains(&output, "API_KEY");
    assert_stdout_contains(&output, "sk-staging-aAbBcCdDeEfF");
    assert_stdout_contains(&output, "[3 entries]");
}

#[test]
fn test_memory_override_shows_demo_vault_for_configured_context() {
    let t = Test::with_config(AZURE_CONFIG);

    let output = t
        .cmd()
        .args(["--backend", "memory", "show", "frontend", "production"])
        .output()
        .unwrap();
    assert_success(&output);
    assert_stdout_contains(&output, "SENTRY_DSN");
    assert_stdout_contains(&output, "sk-live-4fGhJ8kLmNpQrStUvWxYz");
}

#[test]
fn test_filter_matches_key_or_value() {
    let t = Test::new();

    let output = t.show("frontend", "staging", &["--filter", "api"]);
    assert_success(&output);
    assert_stdout_contains(&output, "API_KEY");
    assert_stdout_contains(&output, "API_BASE_URL");
    assert_stdout_excludes(&output, "FEATURE_FLAGS");

    let output = t.show("frontend", "staging", &["--filter", "darkmode"]);
    assert_success(&output);
    assert_stdout_contains(&output, "FEATURE_FLAGS");
    assert_stdout_excludes(&output, "API_KEY");
}

#[test]
fn test_filter_without_matches_warns() {
    let t = Test::new();

    let output = t.show("frontend", "staging", &["--filter", "no-such-thing"]);
    assert_success(&output);
    assert_stdout_contains(&output, "no matching entries");
}

#[test]
fn test_show_blob_entries() {
    let t = Test::new();

    let output = t.show("frontend", "staging", &["--blob", "DOTENV"]);
    assert_success(&output);
    assert_stdout_contains(&output, "NODE_ENV");
    assert_stdout_contains(&output, "3000");
    assert_stdout_excludes(&output, "API_KEY");
}

#[test]
fn test_show_blob_on_plain_value_fails() {
    let t = Test::new();

    let output = t.show("frontend", "staging", &["--blob", "DEBUG"]);
    assert_failure(&output);
    assert_stderr_contains(&output, "not a multiline blob: DEBUG");

    let output = t.show("frontend", "staging", &["--blob", "MISSING"]);
    assert_failure(&output);
    assert_stderr_contains(&output, "unknown key: MISSING");
}

#[test]
fn test_show_json() {
    let t = Test::new();

    let output = t.show("frontend", "staging", &["--json", "--filter", "DOTENV"]);
    assert_success(&output);

    let items: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(items[0]["key"], "DOTENV");
    assert_eq!(items[0]["blob"], true);
}
