//! Tests for `kvt apply`.

use crate::support::*;

#[test]
fn test_apply_commits_and_reports() {
    let t = Test::new();

    let output = t.apply(
        "frontend",
        "staging",
        &["edit DEBUG=false", "rename CDN_URL=ASSET_URL", "add NEW_FLAG=on"],
    );
    assert_success(&output);
    assert_stdout_contains(&output, "Pending changes for frontend/staging");
    assert_stdout_contains(&output, "* DEBUG");
    assert_stdout_contains(&output, "~ CDN_URL → ASSET_URL");
    assert_stdout_contains(&output, "+ NEW_FLAG");
    assert_stdout_contains(&output, "✓ committed DEBUG");
    assert_stdout_contains(&output, "✓ committed ASSET_URL");
}

#[test]
fn test_rename_onto_deleted_key_is_one_change() {
    let t = Test::new();

    let output = t.apply(
        "frontend",
        "staging",
        &["delete APP_ENV", "rename API_KEY=APP_ENV"],
    );
    assert_success(&output);
    assert_stdout_contains(&output, "* API_KEY → APP_ENV");
    assert_stdout_contains(&output, "✓ committed APP_ENV");
    assert_stdout_excludes(&output, "- APP_ENV");
    assert_stdout_excludes(&output, "committed API_KEY");
}

#[test]
fn test_diff_never_prints_values() {
    let t = Test::new();

    let output = t.apply("frontend", "staging", &["edit API_KEY=sk-rotated-123"]);
    assert_success(&output);
    assert_stdout_excludes(&output, "sk-rotated-123");
    assert_stdout_excludes(&output, "sk-staging-aAbBcCdDeEfF");
}

#[test]
fn test_net_zero_changes_commit_nothing() {
    let t = Test::new();

    let output = t.apply("frontend", "staging", &["add TEMP=1", "delete TEMP"]);
    assert_success(&output);
    assert_stdout_contains(&output, "nothing to commit");
    assert_stdout_excludes(&output, "Pending changes");
}

#[test]
fn test_undo_drops_last_operation() {
    let t = Test::new();

    let output = t.apply("frontend", "staging", &["edit DEBUG=false", "add A=1", "undo"]);
    assert_success(&output);
    assert_stdout_contains(&output, "* DEBUG");
    assert_stdout_excludes(&output, "+ A");
}

#[test]
fn test_undo_with_empty_history_warns() {
    let t = Test::new();

    let output = t.apply("frontend", "staging", &["undo"]);
    assert_success(&output);
    assert_stdout_contains(&output, "nothing to undo");
    assert_stdout_contains(&output, "nothing to commit");
}

#[test]
fn test_blob_prefix_edits_inner_entry() {
    let t = Test::new();

    let output = t.apply("frontend", "staging", &["DOTENV: edit PORT=4000"]);
    assert_success(&output);
    assert_stdout_contains(&output, "* DOTENV");
    assert_stdout_contains(&output, "    * PORT");
    assert_stdout_contains(&output, "✓ committed DOTENV");
}

#[test]
fn test_json_report() {
    let t = Test::new();

    let output = t.apply_json(
        "frontend",
        "staging",
        &["rename API_KEY=API_TOKEN", "DOTENV: add LOG_LEVEL=debug"],
    );
    assert_success(&output);
    assert_stdout_excludes(&output, "sk-staging-aAbBcCdDeEfF");

    let report: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(report["committed"], true);
    assert_eq!(report["changes"][0]["kind"], "renamed");
    assert_eq!(report["changes"][0]["key"], "API_TOKEN");
    assert_eq!(report["changes"][0]["old_key"], "API_KEY");
    assert_eq!(report["changes"][1]["kind"], "edited");
    assert_eq!(report["changes"][1]["nested"][0]["kind"], "added");
    assert_eq!(report["changes"][1]["nested"][0]["key"], "LOG_LEVEL");
    assert_eq!(
        report["succeeded"],
        serde_json::json!(["API_TOKEN", "DOTENV"])
    );
    assert_eq!(report["failed"], serde_json::json!({}));
}

#[test]
fn test_json_nothing_to_commit() {
    let t = Test::new();

    let output = t.apply_json("frontend", "staging", &["edit DEBUG=true"]);
    assert_success(&output);

    let report: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(report["committed"], false);
    assert_eq!(report["changes"], serde_json::json!([]));
}

#[test]
fn test_requires_confirmation_without_terminal() {
    let t = Test::new();

    let output = t
        .cmd()
        .args(["apply", "frontend", "staging", "edit DEBUG=false"])
        .output()
        .unwrap();
    assert_failure(&output);
    assert_stderr_contains(&output, "pass --yes");
}

#[test]
fn test_rejected_operation_fails_before_commit() {
    let t = Test::new();

    let output = t.apply("frontend", "staging", &["edit DEBUG=false", "add API_KEY=dup"]);
    assert_failure(&output);
    assert_stderr_contains(&output, "key already exists: API_KEY");
    assert_stdout_excludes(&output, "committed");
}

#[test]
fn test_invalid_blob_value_is_rejected() {
    let t = Test::new();

    let output = t.apply("frontend", "staging", &["DOTENV: add BAD KEY=1"]);
    assert_failure(&output);
    assert_stderr_contains(&output, "invalid key 'BAD KEY'");
}
