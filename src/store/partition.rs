//! Typed partition guarded by its own reader/writer lock
//!
//! Lazy expiration is enforced here so every engine operation gets the same
//! discipline: writers purge under the exclusive lock they already hold, and
//! readers never mutate under the shared lock.

use super::entry::Entry;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use siphasher::sip::SipHasher13;
use std::collections::HashMap;
use std::hash::BuildHasherDefault;
use tracing::debug;

/// Type alias for a partition map with SipHasher
pub type PartitionMap<T> = HashMap<String, Entry<T>, BuildHasherDefault<SipHasher13>>;

/// One typed keyspace (strings, hashes, lists or sets)
pub struct Partition<T> {
    /// Partition name, used in logs
    name: &'static str,

    /// The entries
    map: RwLock<PartitionMap<T>>,
}

impl<T: Clone> Partition<T> {
    /// Create an empty partition
    pub fn new(name: &'static str) -> Self {
        Partition {
            name,
            map: RwLock::new(PartitionMap::default()),
        }
    }

    /// Acquire the shared lock with `key` guaranteed not to be an expired entry.
    ///
    /// If an expired entry is observed, the shared guard is released, the
    /// exclusive lock taken, expiry re-checked (the key may have been refreshed
    /// meanwhile) and the entry purged only if still dead. The exclusive guard
    /// is then downgraded so the caller reads the now-current state.
    pub fn read_live(&self, key: &str) -> RwLockReadGuard<'_, PartitionMap<T>> {
        let map = self.map.read();
        if !map.get(key).is_some_and(Entry::is_expired) {
            return map;
        }
        drop(map);

        let mut map = self.map.write();
        self.purge_if_expired(&mut map, key);
        RwLockWriteGuard::downgrade(map)
    }

    /// Acquire the exclusive lock with `key` purged if it had expired.
    ///
    /// The guard is held for the whole mutation, purge included.
    pub fn write_live(&self, key: &str) -> RwLockWriteGuard<'_, PartitionMap<T>> {
        let mut map = self.map.write();
        self.purge_if_expired(&mut map, key);
        map
    }

    /// Copy every entry that is alive at the moment of the copy.
    ///
    /// The shared lock is held for the whole copy so no write is observed half-applied.
    pub fn copy_live(&self) -> Vec<(String, T)> {
        let map = self.map.read();
        map.iter()
            .filter(|(_, entry)| !entry.is_expired())
            .map(|(key, entry)| (key.clone(), entry.value.clone()))
            .collect()
    }

    /// Number of stored entries, including expired ones not yet purged
    pub fn len(&self) -> usize {
        self.map.read().len()
    }

    /// Check if the partition holds no entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every entry
    pub fn clear(&self) {
        self.map.write().clear();
    }

    fn purge_if_expired(&self, map: &mut PartitionMap<T>, key: &str) {
        if map.get(key).is_some_and(Entry::is_expired) {
            map.remove(key);
            debug!("Purged expired key '{}' from {} partition", key, self.name);
        }
    }
}
