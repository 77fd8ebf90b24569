//! Entry type.
//!
//! Represents a single plaintext key/value secret.

use crate::core::blob;
use crate::core::types::{SecretKey, SecretValue};

/// A key/value secret, either top-level in a vault or inside a blob.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Entry {
    key: SecretKey,
    value: SecretValue,
}

impl Entry {
    /// Create a new entry.
    pub fn new(key: impl Into<SecretKey>, value: impl Into<SecretValue>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Entry's key name.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Plaintext value.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Consume the entry, returning `(key, value)`.
    pub fn into_parts(self) -> (SecretKey, SecretValue) {
        (self.key, self.value)
    }

    /// Whether the value encodes a multiline `KEY=value` blob.
    pub fn is_blob(&self) -> bool {
        blob::is_blob(&self.value)
    }

    /// Case-insensitive substring match on key or value.
    pub fn matches(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        self.key.to_lowercase().contains(&query) || self.value.to_lowercase().contains(&query)
    }
}

impl From<(String, String)> for Entry {
    fn from((key, value): (String, String)) -> Self {
        Self { key, value }
    }
}

impl std::fmt::Debug for Entry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Entry")
            .field("key", &self.key)
            .field("value_len", &self.value.len())
            .finish()
    }
}

impl std::fmt::Display for Entry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key)
    }
}
