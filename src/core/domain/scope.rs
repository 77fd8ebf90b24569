//! Scope type.
//!
//! A `(project, environment)` coordinate plus the opaque handle a secret
//! store uses to address it.

use crate::core::types::{EnvironmentName, ProjectName};

/// Opaque vault address produced by configuration.
///
/// Only store backends look inside; staging, diffing, and reconciliation
/// pass it through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeHandle {
    vault: String,
    subscription: Option<String>,
}

impl ScopeHandle {
    /// Create a handle for a vault, optionally pinned to a subscription.
    pub fn new(vault: impl Into<String>, subscription: Option<String>) -> Self {
        Self {
            vault: vault.into(),
            subscription,
        }
    }

    pub(crate) fn vault(&self) -> &str {
        &self.vault
    }

    pub(crate) fn subscription(&self) -> Option<&str> {
        self.subscription.as_deref()
    }
}

/// Where a set of entries lives.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Scope {
    project: ProjectName,
    environment: EnvironmentName,
    handle: ScopeHandle,
}

impl Scope {
    /// Create a scope from its coordinate and resolved handle.
    pub fn new(
        project: impl Into<ProjectName>,
        environment: impl Into<EnvironmentName>,
        handle: ScopeHandle,
    ) -> Self {
        Self {
            project: project.into(),
            environment: environment.into(),
            handle,
        }
    }

    /// Project name.
    pub fn project(&self) -> &str {
        &self.project
    }

    /// Environment name.
    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// Store-facing handle.
    pub fn handle(&self) -> &ScopeHandle {
        &self.handle
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.project, self.environment)
    }
}
