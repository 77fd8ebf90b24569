//! Staged changes.
//!
//! A [`StagedChangeSet`] holds a snapshot of a scope (or of one blob's
//! inner entries) plus an append-only log of operations against it. The
//! effective view is always the snapshot with the log replayed on top;
//! nothing in this module talks to a secret store.
//!
//! Blob values are edited through a second change set parented to the
//! outer entry's view slot, so it follows the entry through renames. Every
//! inner operation re-encodes the blob and records an
//! `Edit` of the outer entry, so the outer view stays a pure function of
//! its own log.

mod operation;
mod undo;
mod view;

use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::debug;

pub use operation::Operation;
pub use undo::{UndoRecord, UndoStack};
pub use view::{EffectiveView, Provenance};

use crate::core::blob::{self, Blob, BlobFormat};
use crate::core::diff::{DiffEntry, DiffKind, DiffReport};
use crate::core::domain::Entry;
use crate::core::types::{SecretKey, SecretValue};
use crate::core::validation;
use crate::error::StagedChangeError;

type Result<T> = std::result::Result<T, StagedChangeError>;

/// Which entry set an operation applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// The scope's top-level entries.
    Root,
    /// The inner entries of the blob stored under this key.
    Blob(SecretKey),
}

/// A change request, before the current values are filled in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    Add { key: SecretKey, value: SecretValue },
    Edit { key: SecretKey, value: SecretValue },
    Rename { from: SecretKey, to: SecretKey },
    Delete { key: SecretKey },
}

/// An operation as it sits in the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub operation: Operation,
    pub provenance: Provenance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Level {
    Root,
    Blob(BlobFormat),
}

#[derive(Debug, Clone)]
pub(crate) struct NestedStage {
    /// Outer value the child was opened from.
    pub base: SecretValue,
    pub stage: StagedChangeSet,
}

impl NestedStage {
    /// Outer value this stage currently encodes to.
    ///
    /// An untouched blob keeps its original bytes, blank lines included.
    pub fn value(&self) -> String {
        if self.stage.effective_view() == self.stage.snapshot() {
            self.base.clone()
        } else {
            self.stage.encode()
        }
    }
}

/// Snapshot plus operation log, with a cached effective view.
#[derive(Debug, Clone)]
pub struct StagedChangeSet {
    level: Level,
    snapshot: Vec<Entry>,
    log: Vec<LogRecord>,
    view: EffectiveView,
    /// Keys in the order they were first touched.
    touched: Vec<SecretKey>,
    touch_rank: HashMap<SecretKey, usize>,
    /// Nested stages by view slot.
    nested: BTreeMap<usize, NestedStage>,
    /// Stages detached by an outer edit or delete, most recent last.
    retired: Vec<(usize, NestedStage)>,
}

impl StagedChangeSet {
    /// Start staging against a top-level snapshot.
    pub fn new(snapshot: Vec<Entry>) -> Self {
        Self::with_level(Level::Root, snapshot)
    }

    /// Start staging against the inner entries of a blob.
    pub fn for_blob(blob: Blob) -> Self {
        let format = blob.format();
        Self::with_level(Level::Blob(format), blob.into_entries())
    }

    fn with_level(level: Level, snapshot: Vec<Entry>) -> Self {
        let view = EffectiveView::from_snapshot(&snapshot);
        Self {
            level,
            snapshot,
            log: Vec::new(),
            view,
            touched: Vec::new(),
            touch_rank: HashMap::new(),
            nested: BTreeMap::new(),
            retired: Vec::new(),
        }
    }

    /// The entries staging started from.
    pub fn snapshot(&self) -> &[Entry] {
        &self.snapshot
    }

    /// Every operation applied since the snapshot, including undos.
    pub fn log(&self) -> &[LogRecord] {
        &self.log
    }

    /// Cached effective view.
    pub fn view(&self) -> &EffectiveView {
        &self.view
    }

    /// Effective entries in view order.
    pub fn effective_view(&self) -> Vec<Entry> {
        self.view.entries()
    }

    /// Rebuild the effective view from the snapshot and log.
    ///
    /// Always equal to [`view`](Self::view); exposed so callers can check
    /// that invariant.
    ///
    /// # Errors
    ///
    /// Only fails if the log was corrupted.
    pub fn replay(&self) -> Result<EffectiveView> {
        EffectiveView::replay(
            &self.snapshot,
            self.log.iter().map(|r| (&r.operation, r.provenance)),
        )
    }

    /// Effective value of a key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.view.get(key)
    }

    /// Effective entries whose key or value matches `query`.
    pub fn filter(&self, query: &str) -> Vec<Entry> {
        self.view
            .entries()
            .into_iter()
            .filter(|e| e.matches(query))
            .collect()
    }

    /// Keys in first-touched order.
    pub fn touched(&self) -> &[SecretKey] {
        &self.touched
    }

    /// Blob format when this set stages a blob's inner entries.
    pub fn blob_format(&self) -> Option<BlobFormat> {
        match self.level {
            Level::Root => None,
            Level::Blob(format) => Some(format),
        }
    }

    /// Current inner entries of a blob entry, staged edits included.
    ///
    /// Returns `None` when the key is absent or its value is not a blob.
    pub fn blob(&self, key: &str) -> Option<Blob> {
        let current = self.view.get(key)?;
        match self.nested_stage(key) {
            Some(child) if child.value() == current => Some(Blob::from_entries(
                child.stage.effective_view(),
                child.stage.blob_format().unwrap_or_default(),
            )),
            _ => blob::classify(current).ok(),
        }
    }

    /// Serialize the effective view as a blob value.
    pub fn encode(&self) -> String {
        let entries = self.view.entries();
        match self.level {
            Level::Blob(format) => Blob::from_entries(entries, format).encode(),
            Level::Root => blob::serialize(&entries),
        }
    }

    /// Net difference between the snapshot and the effective view.
    pub fn build_diff(&self) -> DiffReport {
        DiffReport::build(self)
    }

    /// Whether any net change is pending.
    pub fn is_dirty(&self) -> bool {
        !self.build_diff().is_empty()
    }

    /// Stage a change request.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateKey`, `UnknownKey`, or `Invalid`; the set is left
    /// unchanged on error.
    pub fn stage(&mut self, change: Change) -> Result<Operation> {
        let op = self.plan(change)?;
        self.record(op.clone(), Provenance::Staged, false)?;
        debug!(op = ?op, pending = self.log.len(), "staged");
        Ok(op)
    }

    /// Stage a new entry.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateKey` if `key` is already in the effective view.
    pub fn stage_add(&mut self, key: &str, value: &str) -> Result<Operation> {
        self.stage(Change::Add {
            key: key.to_string(),
            value: value.to_string(),
        })
    }

    /// Stage a new value for an existing entry.
    ///
    /// # Errors
    ///
    /// Returns `UnknownKey` if `key` is not in the effective view.
    pub fn stage_edit(&mut self, key: &str, new_value: &str) -> Result<Operation> {
        self.stage(Change::Edit {
            key: key.to_string(),
            value: new_value.to_string(),
        })
    }

    /// Stage a key rename.
    ///
    /// # Errors
    ///
    /// Returns `UnknownKey` if `old_key` is absent, `DuplicateKey` if
    /// `new_key` is taken by another entry.
    pub fn stage_rename(&mut self, old_key: &str, new_key: &str) -> Result<Operation> {
        self.stage(Change::Rename {
            from: old_key.to_string(),
            to: new_key.to_string(),
        })
    }

    /// Stage removal of an entry.
    ///
    /// # Errors
    ///
    /// Returns `UnknownKey` if `key` is not in the effective view.
    pub fn stage_delete(&mut self, key: &str) -> Result<Operation> {
        self.stage(Change::Delete {
            key: key.to_string(),
        })
    }

    /// Stage a change inside the blob stored under `blob_key`.
    ///
    /// Returns the inner operation. The outer entry receives a matching
    /// `Edit` carrying the re-encoded blob.
    ///
    /// # Errors
    ///
    /// Returns `UnknownKey` if `blob_key` is absent, `NotABlob` if its value
    /// does not classify as a blob, or any error from the inner change.
    pub fn stage_nested(&mut self, blob_key: &str, change: Change) -> Result<Operation> {
        let slot = self.open_nested(blob_key, true)?;
        let inner = match self.nested.get_mut(&slot) {
            Some(child) => child.stage.stage(change)?,
            None => return Err(StagedChangeError::NotABlob(blob_key.to_string())),
        };
        self.sync_nested(blob_key, slot, Provenance::Staged)?;
        Ok(inner)
    }

    /// Apply the inverse of a top-level operation.
    ///
    /// # Errors
    ///
    /// Returns an error if the inverse no longer fits the view.
    pub fn revert(&mut self, inverse: &Operation) -> Result<()> {
        self.record(inverse.clone(), Provenance::Undo, false)
    }

    /// Apply the inverse of an inner blob operation.
    ///
    /// # Errors
    ///
    /// Returns an error if the blob entry is gone or the inverse no longer
    /// fits its inner view.
    pub fn revert_nested(&mut self, blob_key: &str, inverse: &Operation) -> Result<()> {
        let slot = self.open_nested(blob_key, false)?;
        match self.nested.get_mut(&slot) {
            Some(child) => child.stage.record(inverse.clone(), Provenance::Undo, true)?,
            None => return Err(StagedChangeError::NotABlob(blob_key.to_string())),
        }
        self.sync_nested(blob_key, slot, Provenance::Undo)
    }

    /// Drop every staged operation.
    pub fn discard(&mut self) {
        let level = self.level;
        let snapshot = std::mem::take(&mut self.snapshot);
        *self = Self::with_level(level, snapshot);
    }

    /// Replace the snapshot, dropping every staged operation.
    pub fn reset(&mut self, snapshot: Vec<Entry>) {
        *self = Self::with_level(self.level, snapshot);
    }

    /// Fold committed entries into the snapshot and restage the rest.
    ///
    /// Entries of `report` whose key is in `committed` become part of the
    /// new snapshot. Every other entry is staged again as its net
    /// operations, so the effective view is unchanged.
    ///
    /// # Errors
    ///
    /// Only fails if `report` was not built from this set.
    pub fn rebase(&mut self, report: &DiffReport, committed: &BTreeSet<SecretKey>) -> Result<()> {
        let mut snapshot = self.snapshot.clone();
        for entry in report
            .entries()
            .iter()
            .filter(|e| committed.contains(e.key()))
        {
            fold_into(&mut snapshot, entry);
        }

        let mut next = Self::with_level(self.level, snapshot);
        for entry in report
            .entries()
            .iter()
            .filter(|e| !committed.contains(e.key()))
        {
            for op in entry.pending_operations() {
                next.record(op, Provenance::Staged, false)?;
            }
        }

        debug!(
            committed = committed.len(),
            pending = next.log.len(),
            "rebased staged changes"
        );
        *self = next;
        Ok(())
    }

    pub(crate) fn nested_stage(&self, key: &str) -> Option<&NestedStage> {
        self.view.slot_of(key).and_then(|slot| self.nested.get(&slot))
    }

    pub(crate) fn touch_rank(&self, key: &str) -> Option<usize> {
        self.touch_rank.get(key).copied()
    }

    fn plan(&self, change: Change) -> Result<Operation> {
        match change {
            Change::Add { key, value } => {
                self.validate_key(&key)?;
                self.validate_value(&key, &value)?;
                if self.view.contains(&key) {
                    return Err(StagedChangeError::DuplicateKey(key));
                }
                Ok(Operation::Add { key, value })
            }
            Change::Edit { key, value } => {
                let old_value = self.current(&key)?;
                self.validate_value(&key, &value)?;
                Ok(Operation::Edit {
                    key,
                    old_value,
                    new_value: value,
                })
            }
            Change::Rename { from, to } => {
                let value = self.current(&from)?;
                self.validate_key(&to)?;
                if from != to && self.view.contains(&to) {
                    return Err(StagedChangeError::DuplicateKey(to));
                }
                Ok(Operation::Rename {
                    old_key: from,
                    new_key: to,
                    value,
                })
            }
            Change::Delete { key } => {
                let last_value = self.current(&key)?;
                Ok(Operation::Delete { key, last_value })
            }
        }
    }

    fn current(&self, key: &str) -> Result<SecretValue> {
        self.view
            .get(key)
            .map(str::to_string)
            .ok_or_else(|| StagedChangeError::UnknownKey(key.to_string()))
    }

    fn validate_key(&self, key: &str) -> Result<()> {
        match self.level {
            Level::Root => validation::validate_key(key)?,
            Level::Blob(_) => validation::validate_blob_key(key)?,
        }
        Ok(())
    }

    fn validate_value(&self, key: &str, value: &str) -> Result<()> {
        if let Level::Blob(format) = self.level {
            validation::validate_blob_value(key, value, format.separator.token())?;
        }
        Ok(())
    }

    fn record(&mut self, op: Operation, provenance: Provenance, keep_nested: bool) -> Result<()> {
        // A new outer value invalidates the slot's nested stage.
        let replaced = match &op {
            Operation::Edit { key, .. } | Operation::Delete { key, .. } => self.view.slot_of(key),
            Operation::Add { .. } | Operation::Rename { .. } => None,
        };
        self.view.apply(&op, provenance)?;

        for key in op.keys() {
            if !self.touch_rank.contains_key(key) {
                self.touch_rank.insert(key.to_string(), self.touched.len());
                self.touched.push(key.to_string());
            }
        }

        if let Some(slot) = replaced {
            if !keep_nested {
                if let Some(child) = self.nested.remove(&slot) {
                    self.retire(slot, child);
                }
            }
            let view = &self.view;
            self.retired.retain(|(s, _)| view.is_revivable(*s));
        }

        self.log.push(LogRecord {
            operation: op,
            provenance,
        });
        Ok(())
    }

    /// Make sure a nested stage exists and matches the outer value, and
    /// return the slot it is filed under.
    ///
    /// With `strict`, a fresh stage is only opened on values that classify
    /// as blobs; otherwise the value is parsed leniently.
    fn open_nested(&mut self, blob_key: &str, strict: bool) -> Result<usize> {
        if self.level != Level::Root {
            return Err(StagedChangeError::NotABlob(blob_key.to_string()));
        }

        let current = self.current(blob_key)?;
        let slot = self
            .view
            .slot_of(blob_key)
            .ok_or_else(|| StagedChangeError::UnknownKey(blob_key.to_string()))?;
        if let Some(child) = self.nested.get(&slot) {
            if child.value() == current {
                return Ok(slot);
            }
        }

        // An undone outer edit brings back the value a detached stage encodes.
        if let Some(pos) = self
            .retired
            .iter()
            .rposition(|(s, child)| *s == slot && child.value() == current)
        {
            let (_, child) = self.retired.remove(pos);
            debug!(key = blob_key, "restored nested stage");
            self.attach_nested(slot, child);
            return Ok(slot);
        }

        let blob = if strict {
            blob::classify(&current)
                .map_err(|_| StagedChangeError::NotABlob(blob_key.to_string()))?
        } else {
            Blob::parse(&current)
        };

        debug!(key = blob_key, entries = blob.len(), "opened nested stage");
        self.attach_nested(
            slot,
            NestedStage {
                base: current,
                stage: StagedChangeSet::for_blob(blob),
            },
        );
        Ok(slot)
    }

    fn attach_nested(&mut self, slot: usize, child: NestedStage) {
        if let Some(stale) = self.nested.insert(slot, child) {
            self.retire(slot, stale);
        }
    }

    /// Keep a detached stage in case an undo brings its value back.
    ///
    /// Stages of slots that can never come back are pruned in `record`.
    fn retire(&mut self, slot: usize, child: NestedStage) {
        self.retired.push((slot, child));
    }

    /// Copy a nested stage's encoded value into the outer entry.
    fn sync_nested(&mut self, blob_key: &str, slot: usize, provenance: Provenance) -> Result<()> {
        let new_value = match self.nested.get(&slot) {
            Some(child) => child.value(),
            None => return Err(StagedChangeError::NotABlob(blob_key.to_string())),
        };
        let old_value = self.current(blob_key)?;
        if new_value == old_value {
            return Ok(());
        }

        self.record(
            Operation::Edit {
                key: blob_key.to_string(),
                old_value,
                new_value,
            },
            provenance,
            true,
        )
    }
}

fn fold_into(snapshot: &mut Vec<Entry>, entry: &DiffEntry) {
    let new_value = entry.new_value().unwrap_or_default();
    match entry.kind() {
        DiffKind::Added => snapshot.push(Entry::new(entry.key(), new_value)),
        DiffKind::Removed => snapshot.retain(|e| e.key() != entry.key()),
        DiffKind::Edited | DiffKind::Renamed => {
            // A moved slot keeps its origin's position; the key it lands on
            // loses its own.
            let position = match entry.old_key() {
                Some(old_key) => {
                    if entry.kind() == DiffKind::Edited {
                        snapshot.retain(|e| e.key() != entry.key());
                    }
                    old_key
                }
                None => entry.key(),
            };
            if let Some(slot) = snapshot.iter_mut().find(|e| e.key() == position) {
                *slot = Entry::new(entry.key(), new_value);
            }
        }
    }
}
