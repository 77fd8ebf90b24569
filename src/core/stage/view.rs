//! Effective view.
//!
//! The read-through projection of a snapshot plus an operation log. Every
//! entry lives in a slot that remembers the snapshot key it started from,
//! which is what lets the diff builder tell a rename from an add plus a
//! delete.

use std::collections::{BTreeMap, HashMap};

use super::operation::Operation;
use crate::core::domain::Entry;
use crate::core::types::{SecretKey, SecretValue};
use crate::error::StagedChangeError;

/// How an operation entered the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    /// Requested by the operator.
    Staged,
    /// The inverse of an earlier operation, applied by undo.
    Undo,
}

/// One position in the view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Slot {
    /// Snapshot key this slot was loaded from; `None` for staged adds.
    pub origin: Option<SecretKey>,
    pub key: SecretKey,
    pub value: SecretValue,
    pub live: bool,
}

/// Key/value projection with rename lineage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EffectiveView {
    slots: Vec<Slot>,
    /// Live key -> slot index.
    index: HashMap<SecretKey, usize>,
    /// Slots removed by staged deletes, most recent last.
    graveyard: Vec<usize>,
}

impl EffectiveView {
    /// View of an untouched snapshot.
    pub fn from_snapshot(snapshot: &[Entry]) -> Self {
        let mut view = Self::default();
        for entry in snapshot {
            view.index.insert(entry.key().to_string(), view.slots.len());
            view.slots.push(Slot {
                origin: Some(entry.key().to_string()),
                key: entry.key().to_string(),
                value: entry.value().to_string(),
                live: true,
            });
        }
        view
    }

    /// Rebuild a view from scratch by replaying a log over a snapshot.
    ///
    /// # Errors
    ///
    /// Returns the first precondition failure in the log.
    pub fn replay<'a>(
        snapshot: &[Entry],
        log: impl IntoIterator<Item = (&'a Operation, Provenance)>,
    ) -> Result<Self, StagedChangeError> {
        let mut view = Self::from_snapshot(snapshot);
        for (op, provenance) in log {
            view.apply(op, provenance)?;
        }
        Ok(view)
    }

    /// Apply one operation.
    ///
    /// Preconditions are checked before anything changes, so a failed call
    /// leaves the view untouched.
    ///
    /// # Errors
    ///
    /// Returns `UnknownKey` or `DuplicateKey` when the operation does not fit
    /// the current view.
    pub fn apply(&mut self, op: &Operation, provenance: Provenance) -> Result<(), StagedChangeError> {
        match op {
            Operation::Add { key, value } => {
                if self.contains(key) {
                    return Err(StagedChangeError::DuplicateKey(key.clone()));
                }
                let revived = match provenance {
                    Provenance::Undo => self.take_grave(key),
                    Provenance::Staged => None,
                };
                let idx = match revived {
                    Some(idx) => {
                        let slot = &mut self.slots[idx];
                        slot.value = value.clone();
                        slot.live = true;
                        idx
                    }
                    None => {
                        self.slots.push(Slot {
                            origin: None,
                            key: key.clone(),
                            value: value.clone(),
                            live: true,
                        });
                        self.slots.len() - 1
                    }
                };
                self.index.insert(key.clone(), idx);
            }
            Operation::Edit { key, new_value, .. } => {
                let idx = self.live_index(key)?;
                self.slots[idx].value = new_value.clone();
            }
            Operation::Rename {
                old_key, new_key, ..
            } => {
                let idx = self.live_index(old_key)?;
                if old_key == new_key {
                    return Ok(());
                }
                if self.contains(new_key) {
                    return Err(StagedChangeError::DuplicateKey(new_key.clone()));
                }
                self.index.remove(old_key);
                self.index.insert(new_key.clone(), idx);
                self.slots[idx].key = new_key.clone();
            }
            Operation::Delete { key, .. } => {
                let idx = self.live_index(key)?;
                self.index.remove(key);
                self.slots[idx].live = false;
                if provenance == Provenance::Staged {
                    self.graveyard.push(idx);
                }
            }
        }
        Ok(())
    }

    /// Current value for a key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.index.get(key).map(|&idx| self.slots[idx].value.as_str())
    }

    /// Whether a key is present.
    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Live entries in view order.
    pub fn entries(&self) -> Vec<Entry> {
        self.live_slots()
            .map(|s| Entry::new(s.key.clone(), s.value.clone()))
            .collect()
    }

    /// Live entries as a sorted map.
    pub fn to_map(&self) -> BTreeMap<SecretKey, SecretValue> {
        self.live_slots()
            .map(|s| (s.key.clone(), s.value.clone()))
            .collect()
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Whether there are no live entries.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub(crate) fn live_slots(&self) -> impl Iterator<Item = &Slot> {
        self.slots.iter().filter(|s| s.live)
    }

    /// Slot holding a live key.
    pub(crate) fn slot_of(&self, key: &str) -> Option<usize> {
        self.index.get(key).copied()
    }

    /// Whether a slot is live or could be revived by undoing its delete.
    pub(crate) fn is_revivable(&self, idx: usize) -> bool {
        self.slots.get(idx).is_some_and(|s| s.live) || self.graveyard.contains(&idx)
    }

    fn live_index(&self, key: &str) -> Result<usize, StagedChangeError> {
        self.index
            .get(key)
            .copied()
            .ok_or_else(|| StagedChangeError::UnknownKey(key.to_string()))
    }

    fn take_grave(&mut self, key: &str) -> Option<usize> {
        let pos = self
            .graveyard
            .iter()
            .rposition(|&idx| self.slots[idx].key == key)?;
        Some(self.graveyard.remove(pos))
    }
}
