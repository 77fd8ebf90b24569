//! Error types.
//!
//! Each area of the crate owns an error enum; [`Error`] wraps them so the
//! command layer can propagate everything with `?`.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Stage(#[from] StagedChangeError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("prompt failed: {0}")]
    Prompt(#[from] dialoguer::Error),

    #[error("failed to encode output: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

/// Errors raised while staging a change.
///
/// Staging is all-or-nothing: when one of these is returned the effective
/// view and the undo stack are exactly as they were before the call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StagedChangeError {
    #[error("key already exists: {0}")]
    DuplicateKey(String),

    #[error("unknown key: {0}")]
    UnknownKey(String),

    #[error("not a multiline blob: {0}")]
    NotABlob(String),

    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

/// Errors reported by a secret store backend.
///
/// Commit-time errors are recorded per key, so this type is cloneable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("transient store failure: {0}")]
    Transient(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("secret not found: {0}")]
    NotFound(String),

    #[error("store error: {0}")]
    Unknown(String),
}

impl StoreError {
    /// Whether retrying the same call may succeed without operator action.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Transient(_))
    }
}

/// Configuration loading and resolution errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not determine a configuration directory")]
    NoConfigDir,

    #[error("failed to read {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("unknown backend: {0} (expected \"azure\" or \"memory\")")]
    UnknownBackend(String),

    #[error("no vault configured for {project}/{environment}")]
    UnknownContext {
        project: String,
        environment: String,
    },
}

/// Session lifecycle errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("{0} uncommitted change(s) would be lost")]
    UncommittedChanges(usize),
}

/// Input validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("key cannot be empty")]
    EmptyKey,

    #[error("invalid key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },

    #[error("invalid value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },
}

pub type Result<T> = std::result::Result<T, Error>;
