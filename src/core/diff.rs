//! Net diff.
//!
//! A [`DiffReport`] compares a change set's effective view against its
//! snapshot. Intermediate states are collapsed: add-then-delete vanishes,
//! chains of renames become one rename, and each remote key shows up in at
//! most one entry, so entries can be committed independently.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::Serialize;

use crate::core::blob;
use crate::core::domain::Entry;
use crate::core::stage::{Operation, StagedChangeSet};
use crate::core::types::{SecretKey, SecretValue};

/// Kind of net change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffKind {
    Added,
    Removed,
    Renamed,
    Edited,
}

impl DiffKind {
    /// One-character marker used in listings.
    pub fn marker(self) -> char {
        match self {
            DiffKind::Added => '+',
            DiffKind::Removed => '-',
            DiffKind::Renamed => '~',
            DiffKind::Edited => '*',
        }
    }
}

/// One net change.
///
/// `key` is the effective key, or the removed key for `Removed`. Values
/// are never serialized.
///
/// An `Edited` entry can also carry an `old_key`: the slot that now sits
/// under `key` was moved there from `old_key` after the original `key`
/// was deleted. Writing `key` and removing `old_key` are then one unit.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct DiffEntry {
    kind: DiffKind,
    key: SecretKey,
    #[serde(skip_serializing_if = "Option::is_none")]
    old_key: Option<SecretKey>,
    #[serde(skip)]
    old_value: Option<SecretValue>,
    #[serde(skip)]
    new_value: Option<SecretValue>,
    /// Snapshot value of `old_key`, for edits that absorbed a moved slot.
    #[serde(skip)]
    origin_value: Option<SecretValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    nested: Option<DiffReport>,
}

impl DiffEntry {
    pub fn kind(&self) -> DiffKind {
        self.kind
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Previous key of a renamed entry, or the key whose slot moved onto an
    /// edited one.
    pub fn old_key(&self) -> Option<&str> {
        self.old_key.as_deref()
    }

    pub fn old_value(&self) -> Option<&str> {
        self.old_value.as_deref()
    }

    pub fn new_value(&self) -> Option<&str> {
        self.new_value.as_deref()
    }

    /// Inner changes when the value is a blob.
    pub fn nested(&self) -> Option<&DiffReport> {
        self.nested.as_ref()
    }

    /// Remote keys this entry writes or deletes.
    pub fn remote_keys(&self) -> Vec<&str> {
        match &self.old_key {
            Some(old) => vec![old.as_str(), self.key.as_str()],
            None => vec![self.key.as_str()],
        }
    }

    /// Operations that take the snapshot to this entry's effective state.
    pub fn pending_operations(&self) -> Vec<Operation> {
        let old = self.old_value.clone().unwrap_or_default();
        let new = self.new_value.clone().unwrap_or_default();

        match self.kind {
            DiffKind::Added => vec![Operation::Add {
                key: self.key.clone(),
                value: new,
            }],
            DiffKind::Removed => vec![Operation::Delete {
                key: self.key.clone(),
                last_value: old,
            }],
            DiffKind::Edited => match &self.old_key {
                Some(from) => {
                    let mut ops = vec![Operation::Delete {
                        key: self.key.clone(),
                        last_value: old,
                    }];
                    let moved = self.origin_value.clone().unwrap_or_default();
                    ops.extend(self.moved_from(from, moved, new));
                    ops
                }
                None => vec![Operation::Edit {
                    key: self.key.clone(),
                    old_value: old,
                    new_value: new,
                }],
            },
            DiffKind::Renamed => {
                let from = self.old_key.clone().unwrap_or_default();
                self.moved_from(&from, old, new)
            }
        }
    }

    fn moved_from(&self, from: &str, value: SecretValue, new: SecretValue) -> Vec<Operation> {
        let mut ops = vec![Operation::Rename {
            old_key: from.to_string(),
            new_key: self.key.clone(),
            value: value.clone(),
        }];
        if value != new {
            ops.push(Operation::Edit {
                key: self.key.clone(),
                old_value: value,
                new_value: new,
            });
        }
        ops
    }
}

impl fmt::Debug for DiffEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiffEntry")
            .field("kind", &self.kind)
            .field("key", &self.key)
            .field("old_key", &self.old_key)
            .field("nested", &self.nested)
            .finish()
    }
}

/// Ordered list of net changes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DiffReport {
    entries: Vec<DiffEntry>,
}

/// A live position in the current state, with the original key it
/// descends from.
struct Current<'a> {
    origin: Option<&'a str>,
    key: &'a str,
    value: &'a str,
}

impl DiffReport {
    /// Net changes of a staged change set.
    ///
    /// Entries are ordered by the first time their key was touched.
    pub fn build(set: &StagedChangeSet) -> Self {
        let current = set
            .view()
            .live_slots()
            .map(|slot| Current {
                origin: slot.origin.as_deref(),
                key: &slot.key,
                value: &slot.value,
            })
            .collect();

        compute(
            set.snapshot(),
            current,
            |key| set.touch_rank(key),
            |key, old, new| {
                let child = set.nested_stage(key).filter(|child| {
                    Some(child.base.as_str()) == old && child.value() == new
                });
                match child {
                    Some(child) => Some(child.stage.build_diff()),
                    None => nested_between(old, new),
                }
            },
        )
    }

    /// Key-based diff between two entry lists.
    ///
    /// Without lineage, a renamed key shows up as a removal plus an add.
    pub fn between(old: &[Entry], new: &[Entry]) -> Self {
        let old_keys: HashSet<&str> = old.iter().map(|e| e.key()).collect();
        let new_rank: HashMap<&str, usize> = new
            .iter()
            .enumerate()
            .map(|(i, e)| (e.key(), i))
            .collect();
        let old_rank: HashMap<&str, usize> = old
            .iter()
            .enumerate()
            .map(|(i, e)| (e.key(), new.len() + i))
            .collect();

        let current = new
            .iter()
            .map(|e| Current {
                origin: old_keys.get(e.key()).copied(),
                key: e.key(),
                value: e.value(),
            })
            .collect();

        compute(
            old,
            current,
            |key| new_rank.get(key).or_else(|| old_rank.get(key)).copied(),
            |_, _, _| None,
        )
    }

    /// All entries in order.
    pub fn entries(&self) -> &[DiffEntry] {
        &self.entries
    }

    pub fn added(&self) -> impl Iterator<Item = &DiffEntry> {
        self.of_kind(DiffKind::Added)
    }

    pub fn removed(&self) -> impl Iterator<Item = &DiffEntry> {
        self.of_kind(DiffKind::Removed)
    }

    pub fn renamed(&self) -> impl Iterator<Item = &DiffEntry> {
        self.of_kind(DiffKind::Renamed)
    }

    pub fn edited(&self) -> impl Iterator<Item = &DiffEntry> {
        self.of_kind(DiffKind::Edited)
    }

    /// Entry whose key is `key`.
    pub fn get(&self, key: &str) -> Option<&DiffEntry> {
        self.entries.iter().find(|e| e.key == key)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no net changes.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn of_kind(&self, kind: DiffKind) -> impl Iterator<Item = &DiffEntry> {
        self.entries.iter().filter(move |e| e.kind == kind)
    }
}

fn compute<'a>(
    original: &'a [Entry],
    current: Vec<Current<'a>>,
    rank: impl Fn(&str) -> Option<usize>,
    nested: impl Fn(&str, Option<&str>, &str) -> Option<DiffReport>,
) -> DiffReport {
    let before: HashMap<&str, &str> = original.iter().map(|e| (e.key(), e.value())).collect();
    let after: HashSet<&str> = current.iter().map(|c| c.key).collect();
    let rank_of = |key: &str| rank(key).unwrap_or(usize::MAX);

    let mut ranked: Vec<(usize, DiffEntry)> = Vec::new();
    let mut renamed_from: HashSet<&str> = HashSet::new();

    for c in &current {
        match before.get(c.key) {
            Some(&old) => {
                // A slot renamed onto a deleted key still has to clear its origin.
                let moved = c.origin.filter(|o| *o != c.key && !after.contains(o));
                if old != c.value || moved.is_some() {
                    let mut edited =
                        entry(DiffKind::Edited, c.key, moved, Some(old), Some(c.value), &nested);
                    let mut rank = rank_of(c.key);
                    if let Some(origin) = moved {
                        renamed_from.insert(origin);
                        edited.origin_value = before.get(origin).map(|v| v.to_string());
                        rank = rank.min(rank_of(origin));
                    }
                    ranked.push((rank, edited));
                }
            }
            None => match c.origin.filter(|o| !after.contains(o)) {
                Some(origin) => {
                    renamed_from.insert(origin);
                    let old = before.get(origin).copied();
                    ranked.push((
                        rank_of(c.key).min(rank_of(origin)),
                        entry(DiffKind::Renamed, c.key, Some(origin), old, Some(c.value), &nested),
                    ));
                }
                None => ranked.push((
                    rank_of(c.key),
                    entry(DiffKind::Added, c.key, None, None, Some(c.value), &nested),
                )),
            },
        }
    }

    for e in original {
        if !after.contains(e.key()) && !renamed_from.contains(e.key()) {
            ranked.push((
                rank_of(e.key()),
                entry(DiffKind::Removed, e.key(), None, Some(e.value()), None, &nested),
            ));
        }
    }

    ranked.sort_by_key(|(rank, _)| *rank);
    DiffReport {
        entries: ranked.into_iter().map(|(_, e)| e).collect(),
    }
}

fn entry(
    kind: DiffKind,
    key: &str,
    old_key: Option<&str>,
    old_value: Option<&str>,
    new_value: Option<&str>,
    nested: &impl Fn(&str, Option<&str>, &str) -> Option<DiffReport>,
) -> DiffEntry {
    let nested = new_value
        .and_then(|new| nested(key, old_value, new))
        .filter(|report| !report.is_empty());

    DiffEntry {
        kind,
        key: key.to_string(),
        old_key: old_key.map(str::to_string),
        old_value: old_value.map(str::to_string),
        new_value: new_value.map(str::to_string),
        origin_value: None,
        nested,
    }
}

/// Inner diff for a blob value that has no nested stage.
fn nested_between(old: Option<&str>, new: &str) -> Option<DiffReport> {
    let new = blob::classify(new).ok()?;
    let old = old
        .and_then(|raw| blob::classify(raw).ok())
        .map(|b| b.into_entries())
        .unwrap_or_default();
    Some(DiffReport::between(&old, new.entries()))
}
