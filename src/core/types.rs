//! Type aliases for domain concepts.
//!
//! Provides semantic type aliases to make function signatures more descriptive.

/// A secret key name (e.g., DATABASE_URL, api-token).
///
/// Case-sensitive and unique within its owning scope.
pub type SecretKey = String;

/// A plaintext secret value. May itself encode a multiline blob.
pub type SecretValue = String;

/// A project name from the configuration file (e.g., "frontend").
pub type ProjectName = String;

/// An environment name within a project (e.g., "staging").
pub type EnvironmentName = String;
