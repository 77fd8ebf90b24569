//! Secret store backends.
//!
//! A [`SecretStore`] is the only thing in the crate that reaches a remote
//! vault. Staging and diffing never call it; the session loads snapshots
//! through `list` and the reconciler writes through `set` and `delete`.
//!
//! ## Adding a New Backend
//!
//! 1. Implement the `SecretStore` trait in a new file
//! 2. Add a variant to [`Backend`](crate::core::config::Backend)
//! 3. Construct it in [`open`]

use std::time::Duration;

use tracing::debug;
use zeroize::Zeroizing;

use crate::core::config::{Backend, StoreSettings};
use crate::core::domain::{Entry, ScopeHandle};
use crate::error::{Result, StoreError};

mod azure;
pub mod fixture;
mod memory;

pub use azure::AzureCliStore;
pub use memory::{MemoryStore, StoreCall};

/// Remote key/value capability, addressed by an opaque scope handle.
///
/// Implementations must bound every call in time; a timeout is reported
/// as [`StoreError::Transient`].
pub trait SecretStore: Send + Sync {
    /// All secrets in the scope, with their values.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the scope cannot be read.
    fn list(&self, scope: &ScopeHandle) -> std::result::Result<Vec<Entry>, StoreError>;

    /// Current value of one secret.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the key does not exist.
    fn get(&self, scope: &ScopeHandle, key: &str)
        -> std::result::Result<Zeroizing<String>, StoreError>;

    /// Create or overwrite a secret.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the write was not accepted.
    fn set(&self, scope: &ScopeHandle, key: &str, value: &str)
        -> std::result::Result<(), StoreError>;

    /// Remove a secret.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the key does not exist.
    fn delete(&self, scope: &ScopeHandle, key: &str) -> std::result::Result<(), StoreError>;
}

/// Construct the backend selected by configuration.
///
/// # Errors
///
/// Returns `StoreError` if the live backend's CLI cannot be found.
pub fn open(settings: &StoreSettings) -> Result<Box<dyn SecretStore>> {
    debug!(backend = %settings.backend, "opening secret store");
    match settings.backend {
        Backend::Memory => Ok(Box::new(MemoryStore::seeded())),
        Backend::Azure => {
            let store = AzureCliStore::locate(Duration::from_secs(settings.timeout_secs))?;
            Ok(Box::new(store))
        }
    }
}
