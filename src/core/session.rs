//! Editing session.
//!
//! A [`Session`] ties one scope to a secret store: it loads the snapshot,
//! stages changes with undo, and commits the net diff through a
//! [`Reconciler`]. Switching scope or reloading is refused while changes
//! are pending unless the caller forces it.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::core::diff::DiffReport;
use crate::core::domain::{Entry, Scope};
use crate::core::reconcile::{CancelToken, CommitResult, Reconciler};
use crate::core::stage::{Change, Operation, StagedChangeSet, Target, UndoRecord, UndoStack};
use crate::core::store::SecretStore;
use crate::error::{Result, SessionError};

/// Staged editing of one scope.
pub struct Session {
    store: Arc<dyn SecretStore>,
    scope: Scope,
    changes: StagedChangeSet,
    undo: UndoStack,
}

impl Session {
    /// Load `scope` from `store` and start with nothing staged.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the scope cannot be listed.
    pub fn open(store: Arc<dyn SecretStore>, scope: Scope) -> Result<Self> {
        let snapshot = store.list(scope.handle())?;
        info!(scope = %scope, entries = snapshot.len(), "opened session");

        Ok(Self {
            store,
            scope,
            changes: StagedChangeSet::new(snapshot),
            undo: UndoStack::new(),
        })
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// The staged change set.
    pub fn changes(&self) -> &StagedChangeSet {
        &self.changes
    }

    pub fn undo_stack(&self) -> &UndoStack {
        &self.undo
    }

    /// Effective entries, staged changes applied.
    pub fn effective_view(&self) -> Vec<Entry> {
        self.changes.effective_view()
    }

    /// Net pending changes.
    pub fn build_diff(&self) -> DiffReport {
        self.changes.build_diff()
    }

    /// Whether any net change is pending.
    pub fn is_dirty(&self) -> bool {
        self.changes.is_dirty()
    }

    /// Stage a change and record its inverse for undo.
    ///
    /// # Errors
    ///
    /// Returns `StagedChangeError`; nothing changes on error.
    pub fn stage(&mut self, target: Target, change: Change) -> Result<Operation> {
        let op = match &target {
            Target::Root => self.changes.stage(change)?,
            Target::Blob(key) => self.changes.stage_nested(key, change)?,
        };
        let inverse = op.inverse();
        self.undo.push(target, op.clone(), inverse);
        Ok(op)
    }

    /// Stage a new entry.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateKey` if `key` already exists.
    pub fn stage_add(&mut self, target: Target, key: &str, value: &str) -> Result<Operation> {
        self.stage(
            target,
            Change::Add {
                key: key.to_string(),
                value: value.to_string(),
            },
        )
    }

    /// Stage a new value.
    ///
    /// # Errors
    ///
    /// Returns `UnknownKey` if `key` does not exist.
    pub fn stage_edit(&mut self, target: Target, key: &str, value: &str) -> Result<Operation> {
        self.stage(
            target,
            Change::Edit {
                key: key.to_string(),
                value: value.to_string(),
            },
        )
    }

    /// Stage a rename.
    ///
    /// # Errors
    ///
    /// Returns `UnknownKey` or `DuplicateKey`.
    pub fn stage_rename(&mut self, target: Target, from: &str, to: &str) -> Result<Operation> {
        self.stage(
            target,
            Change::Rename {
                from: from.to_string(),
                to: to.to_string(),
            },
        )
    }

    /// Stage a removal.
    ///
    /// # Errors
    ///
    /// Returns `UnknownKey` if `key` does not exist.
    pub fn stage_delete(&mut self, target: Target, key: &str) -> Result<Operation> {
        self.stage(target, Change::Delete { key: key.to_string() })
    }

    /// Revert the most recent staged operation.
    ///
    /// Returns `None` when there is nothing to undo.
    ///
    /// # Errors
    ///
    /// Returns `StagedChangeError` if the inverse no longer applies; the
    /// record stays on the stack.
    pub fn undo(&mut self) -> Result<Option<UndoRecord>> {
        let Some(record) = self.undo.pop() else {
            debug!("nothing to undo");
            return Ok(None);
        };

        let reverted = match &record.target {
            Target::Root => self.changes.revert(&record.inverse),
            Target::Blob(key) => self.changes.revert_nested(key, &record.inverse),
        };

        if let Err(err) = reverted {
            self.undo
                .push(record.target, record.operation, record.inverse);
            return Err(err.into());
        }

        debug!(op = ?record.operation, remaining = self.undo.len(), "undone");
        Ok(Some(record))
    }

    /// Drop every staged change and the undo history.
    pub fn discard(&mut self) {
        self.changes.discard();
        self.undo.clear();
    }

    /// Commit the net diff.
    ///
    /// Committed entries are folded into the snapshot; failed and skipped
    /// entries stay staged for a retry. The undo history is cleared either
    /// way, since it describes a snapshot that no longer exists.
    pub fn commit(&mut self, reconciler: &Reconciler, cancel: &CancelToken) -> CommitResult {
        let report = self.build_diff();
        if report.is_empty() {
            debug!("nothing to commit");
            return CommitResult::default();
        }

        let result = reconciler.commit(self.store.as_ref(), &self.scope, &report, cancel);

        if let Err(err) = self.changes.rebase(&report, &result.succeeded) {
            warn!(error = %err, "rebase failed, keeping staged changes");
            return result;
        }
        self.undo.clear();
        result
    }

    /// Move to another scope.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::UncommittedChanges` if changes are pending
    /// and `force` is false, or `StoreError` if the new scope cannot be
    /// listed.
    pub fn switch(&mut self, scope: Scope, force: bool) -> Result<()> {
        self.guard(force)?;
        let snapshot = self.store.list(scope.handle())?;
        info!(from = %self.scope, to = %scope, "switching scope");

        self.scope = scope;
        self.changes = StagedChangeSet::new(snapshot);
        self.undo.clear();
        Ok(())
    }

    /// Re-read the current scope from the store.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::UncommittedChanges` if changes are pending.
    pub fn reload(&mut self) -> Result<()> {
        self.guard(false)?;
        let snapshot = self.store.list(self.scope.handle())?;
        debug!(scope = %self.scope, entries = snapshot.len(), "reloaded");

        self.changes.reset(snapshot);
        self.undo.clear();
        Ok(())
    }

    fn guard(&self, force: bool) -> Result<()> {
        if force {
            return Ok(());
        }
        let pending = self.build_diff().len();
        if pending > 0 {
            return Err(SessionError::UncommittedChanges(pending).into());
        }
        Ok(())
    }
}
