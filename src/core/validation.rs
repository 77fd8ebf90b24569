//! Input validation for staged changes.
//!
//! Validates vault keys, blob inner keys, and blob inner values.

use crate::error::ValidationError;

type Result<T> = std::result::Result<T, ValidationError>;

/// Validate a top-level secret key.
///
/// Vault keys are case-sensitive and otherwise free-form, but must:
/// - Not be empty
/// - Not contain whitespace or control characters
///
/// # Errors
///
/// Returns `ValidationError` if the key is invalid.
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(ValidationError::EmptyKey);
    }

    for (i, ch) in key.chars().enumerate() {
        if ch.is_whitespace() || ch.is_control() {
            return Err(ValidationError::InvalidKey {
                key: key.to_string(),
                reason: format!(
                    "whitespace or control character at position {}",
                    i + 1
                ),
            });
        }
    }

    Ok(())
}

/// Check whether `key` is an identifier-like blob key.
///
/// Blob keys start with an ASCII letter or underscore, followed by ASCII
/// alphanumerics, underscores, dots, or dashes.
pub fn is_blob_key(key: &str) -> bool {
    let mut chars = key.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '_' | '.' | '-'))
}

/// Validate a key inside a multiline blob.
///
/// # Errors
///
/// Returns `ValidationError` if the key is empty or not identifier-like.
pub fn validate_blob_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(ValidationError::EmptyKey);
    }

    if !is_blob_key(key) {
        return Err(ValidationError::InvalidKey {
            key: key.to_string(),
            reason: "blob keys must start with a letter or underscore and contain only \
                     letters, digits, '_', '.', or '-'"
                .to_string(),
        });
    }

    Ok(())
}

/// Validate a value inside a multiline blob.
///
/// Inner values are single-line: they cannot contain a real newline or
/// the blob's own line separator.
///
/// # Errors
///
/// Returns `ValidationError::InvalidValue` if the value would split the line.
pub fn validate_blob_value(key: &str, value: &str, separator: &str) -> Result<()> {
    if value.contains('\n') || value.contains(separator) {
        return Err(ValidationError::InvalidValue {
            key: key.to_string(),
            reason: "blob values must fit on a single line".to_string(),
        });
    }

    Ok(())
}
