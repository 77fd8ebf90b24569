//! Commit reconciliation.
//!
//! Turns a [`DiffReport`] into store calls. Diff entries never share a
//! remote key, so each one is an independent unit: units run on up to
//! `max_in_flight` scoped threads, and one unit failing never stops or
//! rolls back another.
//!
//! A rename is a single unit: the new key is written before the old key is
//! deleted, so a failure part-way leaves the value reachable. The same
//! holds for an edit that absorbed a renamed slot.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use tracing::{debug, info, warn};

use crate::core::diff::{DiffEntry, DiffKind, DiffReport};
use crate::core::domain::{Scope, ScopeHandle};
use crate::core::store::SecretStore;
use crate::core::types::SecretKey;
use crate::error::StoreError;

type Outcomes = BTreeMap<usize, Result<(), StoreError>>;

/// Cooperative cancellation for an in-progress commit.
///
/// Once cancelled, no further units start. Calls already in flight finish
/// and their outcomes are recorded.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Per-entry outcome of a commit, keyed by the entry's effective key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitResult {
    pub succeeded: BTreeSet<SecretKey>,
    pub failed: BTreeMap<SecretKey, StoreError>,
    /// Entries never attempted because the commit was cancelled.
    pub skipped: BTreeSet<SecretKey>,
}

impl CommitResult {
    /// Whether every entry was committed.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty() && self.skipped.is_empty()
    }

    /// Keys still staged after this commit.
    pub fn pending(&self) -> BTreeSet<SecretKey> {
        self.failed
            .keys()
            .chain(self.skipped.iter())
            .cloned()
            .collect()
    }
}

/// Executes diff entries against a store with bounded fan-out.
#[derive(Debug, Clone, Copy)]
pub struct Reconciler {
    max_in_flight: usize,
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new(crate::core::constants::DEFAULT_MAX_IN_FLIGHT)
    }
}

impl Reconciler {
    /// Allow up to `max_in_flight` units at once (at least one).
    pub fn new(max_in_flight: usize) -> Self {
        Self {
            max_in_flight: max_in_flight.max(1),
        }
    }

    /// One unit at a time, on the calling thread.
    pub fn sequential() -> Self {
        Self::new(1)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight
    }

    /// Commit every entry of `report` to `scope`.
    ///
    /// Never fails as a whole; per-entry errors land in
    /// [`CommitResult::failed`].
    pub fn commit(
        &self,
        store: &dyn SecretStore,
        scope: &Scope,
        report: &DiffReport,
        cancel: &CancelToken,
    ) -> CommitResult {
        let entries = report.entries();
        let workers = self.max_in_flight.min(entries.len());
        info!(scope = %scope, units = entries.len(), workers, "committing");

        let next = AtomicUsize::new(0);
        let outcomes: Mutex<Outcomes> = Mutex::new(BTreeMap::new());
        let handle = scope.handle();

        let work = || loop {
            if cancel.is_cancelled() {
                break;
            }
            let idx = next.fetch_add(1, Ordering::SeqCst);
            let Some(entry) = entries.get(idx) else {
                break;
            };
            record_outcome(&outcomes, idx, execute(store, handle, entry));
        };

        if workers <= 1 {
            work();
        } else {
            thread::scope(|s| {
                for _ in 0..workers {
                    s.spawn(&work);
                }
            });
        }

        let mut outcomes = outcomes.into_inner().unwrap_or_else(|e| e.into_inner());
        let mut result = CommitResult::default();

        for (idx, entry) in entries.iter().enumerate() {
            let key = entry.key().to_string();
            match outcomes.remove(&idx) {
                Some(Ok(())) => {
                    result.succeeded.insert(key);
                }
                Some(Err(err)) => {
                    warn!(key = %key, kind = ?entry.kind(), error = %err, "commit failed");
                    result.failed.insert(key, err);
                }
                None => {
                    result.skipped.insert(key);
                }
            }
        }

        info!(
            succeeded = result.succeeded.len(),
            failed = result.failed.len(),
            skipped = result.skipped.len(),
            "commit finished"
        );
        result
    }
}

fn execute(store: &dyn SecretStore, scope: &ScopeHandle, entry: &DiffEntry) -> Result<(), StoreError> {
    let key = entry.key();
    let value = entry.new_value().unwrap_or_default();
    debug!(key, kind = ?entry.kind(), "committing entry");

    match entry.kind() {
        DiffKind::Added => store.set(scope, key, value),
        DiffKind::Removed => delete(store, scope, key),
        DiffKind::Edited | DiffKind::Renamed => {
            store.set(scope, key, value)?;
            match entry.old_key() {
                Some(old_key) => delete(store, scope, old_key),
                None => Ok(()),
            }
        }
    }
}

/// A call that ran is always recorded, even if another worker panicked.
fn record_outcome(outcomes: &Mutex<Outcomes>, idx: usize, outcome: Result<(), StoreError>) {
    outcomes
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .insert(idx, outcome);
}

/// Delete, treating an already-missing key as done.
fn delete(store: &dyn SecretStore, scope: &ScopeHandle, key: &str) -> Result<(), StoreError> {
    match store.delete(scope, key) {
        Err(StoreError::NotFound(_)) => {
            debug!(key, "already deleted");
            Ok(())
        }
        other => other,
    }
}
