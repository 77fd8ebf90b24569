//! Tests for `kvt contexts`.

use crate::support::*;

#[test]
fn test_memory_backend_lists_demo_contexts() {
    let t = Test::new();

    let output = t.contexts();
    assert_success(&output);
    assert_stdout_contains(&output, "Contexts (memory)");
    assert_stdout_contains(&output, "frontend/staging");
    assert_stdout_contains(&output, "backend/production");
}

#[test]
fn test_configured_projects_are_listed() {
    let t = Test::with_config(AZURE_CONFIG);

    let output = t.contexts();
    assert_success(&output);
    assert_stdout_contains(&output, "Contexts (azure)");
    assert_stdout_contains(&output, "frontend/production");
    assert_stdout_excludes(&output, "frontend/staging");
}

#[test]
fn test_json_output() {
    let t = Test::with_config(AZURE_CONFIG);

    let output = t.cmd().args(["contexts", "--json"]).output().unwrap();
    assert_success(&output);

    let items: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(
        items,
        serde_json::json!([{ "project": "frontend", "environment": "production" }])
    );
}

#[test]
fn test_backend_flag_overrides_config() {
    let t = Test::unconfigured();

    let output = t
        .cmd()
        .args(["--backend", "memory", "contexts"])
        .output()
        .unwrap();
    assert_success(&output);
    assert_stdout_contains(&output, "frontend/staging");
}

#[test]
fn test_backend_env_overrides_config() {
    let t = Test::unconfigured();

    let output = t
        .cmd()
        .env("KVT_BACKEND", "mock")
        .arg("contexts")
        .output()
        .unwrap();
    assert_success(&output);
    assert_stdout_contains(&output, "frontend/staging");
}

#[test]
fn test_missing_config_is_bootstrapped() {
    let t = Test::unconfigured();

    let output = t.contexts();
    assert_success(&output);
    assert_stdout_contains(&output, "no contexts configured");
    assert!(t.config_path().exists());
}
