//! In-memory secret store.
//!
//! Holds one ordered entry list per scope handle. Failures can be injected
//! per key, which is how partial commits are exercised without a vault.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use tracing::trace;
use zeroize::Zeroizing;

use super::{fixture, SecretStore};
use crate::core::domain::{Entry, ScopeHandle};
use crate::core::types::SecretKey;
use crate::error::StoreError;

type Result<T> = std::result::Result<T, StoreError>;

/// A call observed by a [`MemoryStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    List,
    Get(SecretKey),
    Set(SecretKey),
    Delete(SecretKey),
}

#[derive(Default)]
struct State {
    vaults: HashMap<ScopeHandle, Vec<Entry>>,
    failures: HashMap<SecretKey, StoreError>,
    calls: Vec<StoreCall>,
}

/// Thread-safe in-memory store.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding the built-in demo vaults.
    pub fn seeded() -> Self {
        let store = Self::new();
        if let Ok(mut state) = store.state() {
            for (project, environment, secrets) in fixture::VAULTS {
                state.vaults.insert(
                    fixture::handle(project, environment),
                    secrets.iter().map(|(k, v)| Entry::new(*k, *v)).collect(),
                );
            }
        }
        store
    }

    /// Replace the contents of one scope.
    pub fn insert(&self, scope: &ScopeHandle, entries: Vec<Entry>) {
        if let Ok(mut state) = self.state() {
            state.vaults.insert(scope.clone(), entries);
        }
    }

    /// Make every call touching `key` fail with `error`.
    pub fn fail_key(&self, key: &str, error: StoreError) {
        if let Ok(mut state) = self.state() {
            state.failures.insert(key.to_string(), error);
        }
    }

    /// Stop failing calls for `key`.
    pub fn heal_key(&self, key: &str) {
        if let Ok(mut state) = self.state() {
            state.failures.remove(key);
        }
    }

    /// Calls seen so far, in order.
    pub fn calls(&self) -> Vec<StoreCall> {
        self.state().map(|s| s.calls.clone()).unwrap_or_default()
    }

    /// Current contents of one scope.
    pub fn entries(&self, scope: &ScopeHandle) -> Vec<Entry> {
        self.state()
            .ok()
            .and_then(|s| s.vaults.get(scope).cloned())
            .unwrap_or_default()
    }

    fn state(&self) -> Result<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| StoreError::Unknown("memory store lock poisoned".to_string()))
    }
}

impl State {
    fn check(&self, key: &str) -> Result<()> {
        match self.failures.get(key) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

impl SecretStore for MemoryStore {
    fn list(&self, scope: &ScopeHandle) -> Result<Vec<Entry>> {
        let mut state = self.state()?;
        state.calls.push(StoreCall::List);
        Ok(state.vaults.get(scope).cloned().unwrap_or_default())
    }

    fn get(&self, scope: &ScopeHandle, key: &str) -> Result<Zeroizing<String>> {
        let mut state = self.state()?;
        state.calls.push(StoreCall::Get(key.to_string()));
        state.check(key)?;

        state
            .vaults
            .get(scope)
            .and_then(|entries| entries.iter().find(|e| e.key() == key))
            .map(|e| Zeroizing::new(e.value().to_string()))
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    fn set(&self, scope: &ScopeHandle, key: &str, value: &str) -> Result<()> {
        let mut state = self.state()?;
        state.calls.push(StoreCall::Set(key.to_string()));
        state.check(key)?;
        trace!(key, value_len = value.len(), "memory set");

        let entries = state.vaults.entry(scope.clone()).or_default();
        match entries.iter_mut().find(|e| e.key() == key) {
            Some(entry) => *entry = Entry::new(key, value),
            None => entries.push(Entry::new(key, value)),
        }
        Ok(())
    }

    fn delete(&self, scope: &ScopeHandle, key: &str) -> Result<()> {
        let mut state = self.state()?;
        state.calls.push(StoreCall::Delete(key.to_string()));
        state.check(key)?;
        trace!(key, "memory delete");

        let entries = state
            .vaults
            .get_mut(scope)
            .ok_or_else(|| StoreError::NotFound(key.to_string()))?;
        let before = entries.len();
        entries.retain(|e| e.key() != key);
        if entries.len() == before {
            return Err(StoreError::NotFound(key.to_string()));
        }
        Ok(())
    }
}
