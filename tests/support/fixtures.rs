//! Test fixtures and constants.

use kvt::core::domain::{Entry, Scope, ScopeHandle};

/// Memory backend, no projects: the built-in demo vaults are used.
pub const MEMORY_CONFIG: &str = "[store]\nbackend = \"memory\"\n";

/// Azure backend with one configured project.
pub const AZURE_CONFIG: &str = r#"
[store]
backend = "azure"

[projects.frontend.production]
vault_name = "kv-frontend-prod"
subscription_id = "00000000-0000-0000-0000-000000000000"
"#;

/// A blob value in newline form without a trailing terminator.
pub const DB_BLOB: &str = "host=localhost\nport=5432";

/// Standard entries used by library-level tests.
pub fn standard_entries() -> Vec<Entry> {
    vec![
        Entry::new("APP_ENV", "staging"),
        Entry::new("API_KEY", "sk-staging-aAbBcCdDeEfF"),
        Entry::new("DEBUG", "true"),
        Entry::new("DB", DB_BLOB),
    ]
}

/// Scope addressing a throwaway vault.
pub fn test_scope() -> Scope {
    Scope::new("app", "test", ScopeHandle::new("kv-app-test", None))
}
