//! Last-write-wins collection merge.
//!
//! Given a local and a remote record set, produces the converged set:
//!
//! 1. `force_download` with a non-empty remote: the remote set, verbatim.
//! 2. Empty remote: the local set, verbatim.
//! 3. Otherwise start from local keyed by id; remote-only ids are added, and a
//!    shared id takes the remote record only if its `updatedAt` is strictly
//!    greater. Ties keep the local record.
//!
//! The outcome keeps tombstones (they must reach other devices); callers that
//! hand records to domain code use [`MergeOutcome::visible`].
//!
//! This is record-level LWW, not field-level merge: concurrent edits to
//! different fields of one record do not both survive.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use stocksync_types::{Millis, Record, RecordId};

/// Which input a record was taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeSide {
    Local,
    Remote,
}

/// An id present on both sides with differing content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeConflict {
    pub id: RecordId,
    pub local_updated_at: Option<Millis>,
    pub remote_updated_at: Option<Millis>,
    pub winner: MergeSide,
}

/// Result of a merge.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeOutcome {
    /// Converged, tombstone-inclusive records.
    pub records: Vec<Record>,
    /// Diverging ids and how each was resolved.
    pub conflicts: Vec<MergeConflict>,
}

impl MergeOutcome {
    /// The converged records without tombstones.
    pub fn visible(&self) -> Vec<Record> {
        visible(&self.records)
    }

    /// Consumes the outcome, returning the records without tombstones.
    pub fn into_visible(self) -> Vec<Record> {
        self.records.into_iter().filter(|r| !r.deleted).collect()
    }
}

/// Records keyed by id, preserving first-insertion order.
#[derive(Debug, Default)]
struct RecordIndex {
    records: Vec<Record>,
    positions: HashMap<RecordId, usize>,
}

impl RecordIndex {
    fn from_records(records: &[Record]) -> Self {
        let mut index = Self::default();
        for record in records {
            index.upsert(record.clone());
        }
        index
    }

    fn get(&self, id: &str) -> Option<&Record> {
        self.positions.get(id).map(|&pos| &self.records[pos])
    }

    /// Replaces in place when the id is known, appends otherwise.
    fn upsert(&mut self, record: Record) {
        match self.positions.get(&record.id) {
            Some(&pos) => self.records[pos] = record,
            None => {
                self.positions.insert(record.id.clone(), self.records.len());
                self.records.push(record);
            }
        }
    }

    fn into_records(self) -> Vec<Record> {
        self.records
    }
}

/// Merges `remote` into `local`.
pub fn merge(local: &[Record], remote: &[Record], force_download: bool) -> MergeOutcome {
    if force_download && !remote.is_empty() {
        return MergeOutcome {
            records: remote.to_vec(),
            conflicts: Vec::new(),
        };
    }
    if remote.is_empty() {
        return MergeOutcome {
            records: local.to_vec(),
            conflicts: Vec::new(),
        };
    }

    let mut index = RecordIndex::from_records(local);
    let mut conflicts = Vec::new();

    for incoming in remote {
        let Some(existing) = index.get(&incoming.id) else {
            index.upsert(incoming.clone());
            continue;
        };

        let remote_wins = incoming.updated_at_or_zero() > existing.updated_at_or_zero();
        if existing != incoming {
            conflicts.push(MergeConflict {
                id: incoming.id.clone(),
                local_updated_at: existing.updated_at,
                remote_updated_at: incoming.updated_at,
                winner: if remote_wins {
                    MergeSide::Remote
                } else {
                    MergeSide::Local
                },
            });
        }
        if remote_wins {
            index.upsert(incoming.clone());
        }
    }

    MergeOutcome {
        records: index.into_records(),
        conflicts,
    }
}

/// Merges and drops tombstones from the result.
pub fn merge_visible(local: &[Record], remote: &[Record], force_download: bool) -> Vec<Record> {
    merge(local, remote, force_download).into_visible()
}

/// Returns `records` without tombstones.
pub fn visible(records: &[Record]) -> Vec<Record> {
    records.iter().filter(|r| !r.deleted).cloned().collect()
}

/// Override merge: every local record replaces its remote counterpart
/// regardless of timestamps, restamped with `now` and `device_id`. Remote-only
/// ids are kept. The result is tombstone-inclusive.
pub fn override_merge(
    local: &[Record],
    remote: &[Record],
    now: Millis,
    device_id: &str,
) -> Vec<Record> {
    let mut index = RecordIndex::from_records(remote);
    for record in local {
        let mut owned = record.clone();
        owned.restamp(now, device_id);
        index.upsert(owned);
    }
    index.into_records()
}
