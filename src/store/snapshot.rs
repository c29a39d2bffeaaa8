//! Point-in-time copy of all four partitions

use std::collections::{BTreeMap, BTreeSet};

/// An immutable copy of the engine's live data.
///
/// Keys, hash fields and set members are ordered so serialized output is deterministic.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Snapshot {
    pub strings: BTreeMap<String, String>,
    pub hashes: BTreeMap<String, BTreeMap<String, String>>,
    pub lists: BTreeMap<String, Vec<String>>,
    pub sets: BTreeMap<String, BTreeSet<String>>,
}

impl Snapshot {
    /// Total number of keys across all partitions
    pub fn key_count(&self) -> usize {
        self.strings.len() + self.hashes.len() + self.lists.len() + self.sets.len()
    }

    /// Check if the snapshot holds no data
    pub fn is_empty(&self) -> bool {
        self.key_count() == 0
    }
}
