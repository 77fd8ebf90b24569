//! Undo stack.
//!
//! Session-local LIFO of applied operations and their inverses. Nothing
//! here ever reaches the secret store.

use super::operation::Operation;
use super::Target;

/// An applied operation paired with the operation that reverses it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndoRecord {
    pub target: Target,
    pub operation: Operation,
    pub inverse: Operation,
}

/// Strict LIFO of undo records.
#[derive(Debug, Clone, Default)]
pub struct UndoStack {
    records: Vec<UndoRecord>,
}

impl UndoStack {
    /// Create an empty stack.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an applied operation and its inverse.
    pub fn push(&mut self, target: Target, operation: Operation, inverse: Operation) {
        self.records.push(UndoRecord {
            target,
            operation,
            inverse,
        });
    }

    /// Take the most recent record. `None` once the stack is exhausted.
    pub fn pop(&mut self) -> Option<UndoRecord> {
        self.records.pop()
    }

    /// The record `pop` would return.
    pub fn peek(&self) -> Option<&UndoRecord> {
        self.records.last()
    }

    /// Number of undoable operations.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether there is nothing to undo.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Drop all history.
    pub fn clear(&mut self) {
        self.records.clear();
    }
}
