//! Change algebra.
//!
//! Each operation carries the values it needs to be reversed, so its
//! inverse can be computed without consulting any other state.

use crate::core::types::{SecretKey, SecretValue};

/// A single staged mutation.
#[derive(Clone, PartialEq, Eq)]
pub enum Operation {
    Add {
        key: SecretKey,
        value: SecretValue,
    },
    Edit {
        key: SecretKey,
        old_value: SecretValue,
        new_value: SecretValue,
    },
    Rename {
        old_key: SecretKey,
        new_key: SecretKey,
        value: SecretValue,
    },
    Delete {
        key: SecretKey,
        last_value: SecretValue,
    },
}

impl Operation {
    /// The operation that undoes this one.
    pub fn inverse(&self) -> Operation {
        match self {
            Operation::Add { key, value } => Operation::Delete {
                key: key.clone(),
                last_value: value.clone(),
            },
            Operation::Delete { key, last_value } => Operation::Add {
                key: key.clone(),
                value: last_value.clone(),
            },
            Operation::Edit {
                key,
                old_value,
                new_value,
            } => Operation::Edit {
                key: key.clone(),
                old_value: new_value.clone(),
                new_value: old_value.clone(),
            },
            Operation::Rename {
                old_key,
                new_key,
                value,
            } => Operation::Rename {
                old_key: new_key.clone(),
                new_key: old_key.clone(),
                value: value.clone(),
            },
        }
    }

    /// Short label used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Operation::Add { .. } => "add",
            Operation::Edit { .. } => "edit",
            Operation::Rename { .. } => "rename",
            Operation::Delete { .. } => "delete",
        }
    }

    /// Keys this operation touches, in the order it touches them.
    pub fn keys(&self) -> Vec<&str> {
        match self {
            Operation::Add { key, .. }
            | Operation::Edit { key, .. }
            | Operation::Delete { key, .. } => vec![key.as_str()],
            Operation::Rename {
                old_key, new_key, ..
            } => vec![old_key.as_str(), new_key.as_str()],
        }
    }
}

impl std::fmt::Debug for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Rename {
                old_key, new_key, ..
            } => write!(f, "Rename({} -> {})", old_key, new_key),
            other => write!(f, "{}({})", other.kind(), other.keys()[0]),
        }
    }
}
