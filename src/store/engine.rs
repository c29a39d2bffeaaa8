//! Storage engine: four typed partitions with lazy per-key expiration
//!
//! A key name may exist independently in every partition at once; each
//! partition is its own namespace with its own TTL.

use super::entry::Entry;
use super::partition::Partition;
use super::snapshot::Snapshot;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use tracing::debug;

/// In-memory storage engine
///
/// Every public operation is its own synchronization boundary: mutations hold
/// the partition's exclusive lock for their whole duration, reads hold the
/// shared lock.
pub struct StorageEngine {
    strings: Partition<String>,
    hashes: Partition<HashMap<String, String>>,
    lists: Partition<VecDeque<String>>,
    sets: Partition<HashSet<String>>,
}

impl StorageEngine {
    /// Create an empty engine
    pub fn new() -> Self {
        StorageEngine {
            strings: Partition::new("string"),
            hashes: Partition::new("hash"),
            lists: Partition::new("list"),
            sets: Partition::new("set"),
        }
    }

    // ----- strings -----

    /// Set a string value, clearing any previous expiry
    pub fn set(&self, key: &str, value: impl Into<String>) {
        let mut map = self.strings.write_live(key);
        map.insert(key.to_string(), Entry::new(value.into()));
    }

    /// Get a string value, `None` if missing or expired
    pub fn get(&self, key: &str) -> Option<String> {
        let map = self.strings.read_live(key);
        map.get(key).map(|entry| entry.value.clone())
    }

    /// Increment by one. Missing or non-numeric values restart at 1.
    pub fn incr(&self, key: &str) -> i64 {
        self.add(key, 1)
    }

    /// Decrement by one. Missing or non-numeric values restart at -1.
    pub fn decr(&self, key: &str) -> i64 {
        self.add(key, -1)
    }

    /// Increment by `increment`. Missing or non-numeric values restart at `increment`.
    pub fn incrby(&self, key: &str, increment: i64) -> i64 {
        self.add(key, increment)
    }

    fn add(&self, key: &str, delta: i64) -> i64 {
        let mut map = self.strings.write_live(key);

        if let Some(entry) = map.get_mut(key) {
            if let Ok(current) = entry.value.trim().parse::<i64>() {
                let next = current.wrapping_add(delta);
                entry.value = next.to_string();
                return next;
            }
            debug!("Value of '{}' is not an integer, resetting to {}", key, delta);
        }

        // Absent or unparsable: the key restarts at the operation's identity result
        map.insert(key.to_string(), Entry::new(delta.to_string()));
        delta
    }

    // ----- hashes -----

    /// Set a hash field, creating the hash on first use.
    /// Returns true if the field is new.
    pub fn hset(&self, key: &str, field: &str, value: impl Into<String>) -> bool {
        let mut map = self.hashes.write_live(key);
        let entry = map
            .entry(key.to_string())
            .or_insert_with(|| Entry::new(HashMap::new()));
        entry.value.insert(field.to_string(), value.into()).is_none()
    }

    /// Get a hash field
    pub fn hget(&self, key: &str, field: &str) -> Option<String> {
        let map = self.hashes.read_live(key);
        map.get(key)
            .and_then(|entry| entry.value.get(field))
            .cloned()
    }

    /// Get all fields of a hash, ordered by field name
    pub fn hgetall(&self, key: &str) -> Vec<(String, String)> {
        let map = self.hashes.read_live(key);
        let mut fields: Vec<(String, String)> = map
            .get(key)
            .map(|entry| {
                entry
                    .value
                    .iter()
                    .map(|(f, v)| (f.clone(), v.clone()))
                    .collect()
            })
            .unwrap_or_default();
        fields.sort();
        fields
    }

    // ----- lists -----

    /// Push values onto the head of a list.
    ///
    /// The given left-to-right order becomes the head order: after
    /// `lpush(k, [a, b, c])` the list starts `a, b, c`. Returns the new length.
    pub fn lpush<S: AsRef<str>>(&self, key: &str, values: &[S]) -> usize {
        let mut map = self.lists.write_live(key);
        if values.is_empty() {
            return map.get(key).map_or(0, |entry| entry.value.len());
        }

        let entry = map
            .entry(key.to_string())
            .or_insert_with(|| Entry::new(VecDeque::new()));
        for value in values.iter().rev() {
            entry.value.push_front(as_str(value).to_string());
        }
        entry.value.len()
    }

    /// Pop the tail element. An emptied list is removed.
    pub fn rpop(&self, key: &str) -> Option<String> {
        let mut map = self.lists.write_live(key);
        let entry = map.get_mut(key)?;
        let value = entry.value.pop_back();
        if entry.value.is_empty() {
            map.remove(key);
        }
        value
    }

    /// Inclusive range with negative-index wraparound.
    ///
    /// Negative bounds are offset by the list size, then both bounds are
    /// clamped to `[0, size - 1]`; `start > end` yields an empty range.
    pub fn lrange(&self, key: &str, start: i64, end: i64) -> Vec<String> {
        let map = self.lists.read_live(key);
        let list = match map.get(key) {
            Some(entry) if !entry.value.is_empty() => &entry.value,
            _ => return Vec::new(),
        };

        let size = list.len() as i64;
        let clamp = |index: i64| {
            let index = if index < 0 { index + size } else { index };
            index.clamp(0, size - 1)
        };
        let (start, end) = (clamp(start), clamp(end));
        if start > end {
            return Vec::new();
        }

        list.range(start as usize..=end as usize).cloned().collect()
    }

    // ----- sets -----

    /// Add members to a set. Returns how many were not already present.
    pub fn sadd<S: AsRef<str>>(&self, key: &str, members: &[S]) -> usize {
        let mut map = self.sets.write_live(key);
        if members.is_empty() {
            return 0;
        }

        let entry = map
            .entry(key.to_string())
            .or_insert_with(|| Entry::new(HashSet::new()));
        members
            .iter()
            .filter(|member| entry.value.insert(as_str(*member).to_string()))
            .count()
    }

    /// Remove members from a set. Returns how many were present. An emptied set is removed.
    pub fn srem<S: AsRef<str>>(&self, key: &str, members: &[S]) -> usize {
        let mut map = self.sets.write_live(key);
        let Some(entry) = map.get_mut(key) else {
            return 0;
        };

        let removed = members
            .iter()
            .filter(|member| entry.value.remove(as_str(*member)))
            .count();
        if entry.value.is_empty() {
            map.remove(key);
        }
        removed
    }

    /// Check set membership
    pub fn sismember(&self, key: &str, member: &str) -> bool {
        let map = self.sets.read_live(key);
        map.get(key)
            .is_some_and(|entry| entry.value.contains(member))
    }

    /// All members of a set, sorted
    pub fn smembers(&self, key: &str) -> Vec<String> {
        let map = self.sets.read_live(key);
        let mut members: Vec<String> = map
            .get(key)
            .map(|entry| entry.value.iter().cloned().collect())
            .unwrap_or_default();
        members.sort();
        members
    }

    /// Number of members in a set
    pub fn scard(&self, key: &str) -> usize {
        let map = self.sets.read_live(key);
        map.get(key).map_or(0, |entry| entry.value.len())
    }

    // ----- expiration -----

    /// Set a TTL on the first partition holding `key`, scanning
    /// strings, hashes, lists, then sets. Returns whether any partition held it.
    pub fn expire(&self, key: &str, seconds: i64) -> bool {
        expire_in(&self.strings, key, seconds)
            || expire_in(&self.hashes, key, seconds)
            || expire_in(&self.lists, key, seconds)
            || expire_in(&self.sets, key, seconds)
    }

    /// Remaining TTL of `key` in whole seconds, scanning partitions in the same
    /// order as [`expire`](Self::expire).
    /// Returns:
    /// - n >= 0: remaining seconds
    /// - -1: key exists without expiration
    /// - -2: key does not exist (expired entries met on the way are purged)
    pub fn ttl(&self, key: &str) -> i64 {
        ttl_in(&self.strings, key)
            .or_else(|| ttl_in(&self.hashes, key))
            .or_else(|| ttl_in(&self.lists, key))
            .or_else(|| ttl_in(&self.sets, key))
            .unwrap_or(-2)
    }

    // ----- whole-engine operations -----

    /// Copy all live data.
    ///
    /// Partitions are copied one at a time in the fixed order strings, hashes,
    /// lists, sets, each under its own shared lock. Each partition copy is
    /// consistent; the four copies may reflect slightly different instants.
    pub fn snapshot(&self) -> Snapshot {
        let strings = self.strings.copy_live().into_iter().collect();
        let hashes = self
            .hashes
            .copy_live()
            .into_iter()
            .map(|(key, fields)| (key, fields.into_iter().collect::<BTreeMap<_, _>>()))
            .collect();
        let lists = self
            .lists
            .copy_live()
            .into_iter()
            .map(|(key, values)| (key, values.into_iter().collect::<Vec<_>>()))
            .collect();
        let sets = self
            .sets
            .copy_live()
            .into_iter()
            .map(|(key, members)| (key, members.into_iter().collect::<BTreeSet<_>>()))
            .collect();

        Snapshot {
            strings,
            hashes,
            lists,
            sets,
        }
    }

    /// Remove every key from every partition
    pub fn flush_all(&self) {
        self.strings.clear();
        self.hashes.clear();
        self.lists.clear();
        self.sets.clear();
    }

    /// Key counts per partition (expired entries not yet purged included)
    pub fn stats(&self) -> EngineStats {
        EngineStats {
            strings: self.strings.len(),
            hashes: self.hashes.len(),
            lists: self.lists.len(),
            sets: self.sets.len(),
        }
    }
}

impl Default for StorageEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn as_str<S: AsRef<str>>(value: &S) -> &str {
    value.as_ref()
}

fn expire_in<T: Clone>(partition: &Partition<T>, key: &str, seconds: i64) -> bool {
    let mut map = partition.write_live(key);
    match map.get_mut(key) {
        Some(entry) => {
            entry.set_expiration(seconds);
            true
        }
        None => false,
    }
}

fn ttl_in<T: Clone>(partition: &Partition<T>, key: &str) -> Option<i64> {
    let map = partition.read_live(key);
    map.get(key).map(Entry::ttl_seconds)
}

/// Key counts per partition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EngineStats {
    pub strings: usize,
    pub hashes: usize,
    pub lists: usize,
    pub sets: usize,
}

impl EngineStats {
    /// Total keys across partitions
    pub fn total(&self) -> usize {
        self.strings + self.hashes + self.lists + self.sets
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_basic_set_get() {
        let engine = StorageEngine::new();
        engine.set("key1", "value1");
        assert_eq!(engine.get("key1").as_deref(), Some("value1"));
        assert_eq!(engine.get("missing"), None);
    }

    #[test]
    fn test_set_clears_expiry() {
        let engine = StorageEngine::new();
        engine.set("k", "v");
        assert!(engine.expire("k", 100));
        engine.set("k", "v2");
        assert_eq!(engine.ttl("k"), -1);
    }

    #[test]
    fn test_ttl_lifecycle() {
        let engine = StorageEngine::new();
        engine.set("k", "v");
        assert_eq!(engine.ttl("k"), -1);

        assert!(engine.expire("k", 5));
        let ttl = engine.ttl("k");
        assert!((0..=5).contains(&ttl), "ttl was {}", ttl);

        assert_eq!(engine.ttl("missing"), -2);
        assert!(!engine.expire("missing", 5));
    }

    #[test]
    fn test_expire_with_largest_ttl() {
        let engine = StorageEngine::new();
        engine.set("k", "v");

        assert!(engine.expire("k", i64::MAX));
        assert!(engine.ttl("k") > 0);
        assert_eq!(engine.get("k"), Some("v".to_string()));
    }

    #[test]
    fn test_expiration() {
        let engine = StorageEngine::new();
        engine.set("k", "v");
        engine.expire("k", 1);
        assert_eq!(engine.get("k").as_deref(), Some("v"));

        // Wait for expiration
        thread::sleep(Duration::from_millis(1100));

        assert_eq!(engine.ttl("k"), -2);
        assert_eq!(engine.get("k"), None);
        assert_eq!(engine.stats().strings, 0);
    }

    #[test]
    fn test_ttl_purges_expired_entry() {
        let engine = StorageEngine::new();
        engine.hset("h", "f", "v");
        engine.expire("h", 0);
        assert_eq!(engine.stats().hashes, 1);

        assert_eq!(engine.ttl("h"), -2);
        assert_eq!(engine.stats().hashes, 0);
    }

    #[test]
    fn test_expire_hits_first_partition_only() {
        let engine = StorageEngine::new();
        engine.hset("shared", "f", "v");
        engine.sadd("shared", &["m"]);
        engine.set("shared", "s");

        assert!(engine.expire("shared", 0));

        // The string entry is dead, the hash and set entries are untouched
        assert_eq!(engine.get("shared"), None);
        assert_eq!(engine.hget("shared", "f").as_deref(), Some("v"));
        assert!(engine.sismember("shared", "m"));
        assert_eq!(engine.ttl("shared"), -1);
    }

    #[test]
    fn test_incr_decr_incrby() {
        let engine = StorageEngine::new();
        assert_eq!(engine.incr("counter"), 1);
        assert_eq!(engine.incr("counter"), 2);
        assert_eq!(engine.incr("counter"), 3);
        assert_eq!(engine.decr("counter"), 2);
        assert_eq!(engine.incrby("counter", 10), 12);

        assert_eq!(engine.decr("fresh_down"), -1);
        assert_eq!(engine.incrby("fresh_by", 42), 42);
        assert_eq!(engine.get("fresh_by").as_deref(), Some("42"));
    }

    #[test]
    fn test_incr_on_non_numeric_resets() {
        let engine = StorageEngine::new();
        engine.set("k", "hello");
        assert_eq!(engine.incr("k"), 1);

        engine.set("k", "hello");
        assert_eq!(engine.decr("k"), -1);

        engine.set("k", "hello");
        assert_eq!(engine.incrby("k", 7), 7);
        assert_eq!(engine.get("k").as_deref(), Some("7"));
    }

    #[test]
    fn test_incr_keeps_expiry() {
        let engine = StorageEngine::new();
        engine.set("k", "1");
        engine.expire("k", 100);
        engine.incr("k");
        assert!(engine.ttl("k") >= 0);
    }

    #[test]
    fn test_hash_operations() {
        let engine = StorageEngine::new();
        assert!(engine.hset("user", "name", "alice"));
        assert!(engine.hset("user", "age", "30"));
        assert!(!engine.hset("user", "age", "31"));

        assert_eq!(engine.hget("user", "age").as_deref(), Some("31"));
        assert_eq!(engine.hget("user", "missing"), None);
        assert_eq!(
            engine.hgetall("user"),
            vec![
                ("age".to_string(), "31".to_string()),
                ("name".to_string(), "alice".to_string()),
            ]
        );
        assert!(engine.hgetall("nohash").is_empty());
    }

    #[test]
    fn test_lpush_preserves_argument_order_at_head() {
        let engine = StorageEngine::new();
        assert_eq!(engine.lpush("list", &["x", "y"]), 2);
        assert_eq!(engine.lpush("list", &["a", "b", "c"]), 5);
        assert_eq!(engine.lrange("list", 0, -1), vec!["a", "b", "c", "x", "y"]);
    }

    #[test]
    fn test_rpop() {
        let engine = StorageEngine::new();
        engine.lpush("list", &["a", "b"]);
        assert_eq!(engine.rpop("list").as_deref(), Some("b"));
        assert_eq!(engine.rpop("list").as_deref(), Some("a"));
        assert_eq!(engine.rpop("list"), None);
        assert_eq!(engine.rpop("missing"), None);
        assert_eq!(engine.stats().lists, 0);
    }

    #[test]
    fn test_lrange() {
        let engine = StorageEngine::new();
        engine.lpush("list", &["a", "b", "c", "d", "e"]);

        assert_eq!(engine.lrange("list", 1, 3), vec!["b", "c", "d"]);
        assert_eq!(engine.lrange("list", -2, -1), vec!["d", "e"]);
        assert!(engine.lrange("list", 3, 1).is_empty());
        assert!(engine.lrange("missing", 0, -1).is_empty());

        // Out-of-range bounds are clamped onto the list
        assert_eq!(engine.lrange("list", -100, 100).len(), 5);
        assert_eq!(engine.lrange("list", 10, 20), vec!["e"]);
    }

    #[test]
    fn test_set_operations() {
        let engine = StorageEngine::new();
        assert_eq!(engine.sadd("s", &["x", "y"]), 2);
        assert_eq!(engine.sadd("s", &["x", "y"]), 0);
        assert_eq!(engine.sadd("s", &["z", "z"]), 1);
        assert_eq!(engine.scard("s"), 3);

        assert!(engine.sismember("s", "x"));
        assert!(!engine.sismember("s", "w"));
        assert_eq!(engine.smembers("s"), vec!["x", "y", "z"]);

        assert_eq!(engine.srem("s", &["x", "w"]), 1);
        assert_eq!(engine.scard("s"), 2);
        assert_eq!(engine.srem("s", &["y", "z"]), 2);
        assert_eq!(engine.scard("s"), 0);
        assert_eq!(engine.stats().sets, 0);
    }

    #[test]
    fn test_independent_namespaces() {
        let engine = StorageEngine::new();
        engine.set("k", "string");
        engine.hset("k", "f", "hash");
        engine.lpush("k", &["list"]);
        engine.sadd("k", &["set"]);

        assert_eq!(engine.get("k").as_deref(), Some("string"));
        assert_eq!(engine.hget("k", "f").as_deref(), Some("hash"));
        assert_eq!(engine.lrange("k", 0, -1), vec!["list"]);
        assert!(engine.sismember("k", "set"));
        assert_eq!(engine.stats().total(), 4);
    }

    #[test]
    fn test_concurrent_incr_has_no_lost_updates() {
        let engine = Arc::new(StorageEngine::new());
        let threads = 8;
        let per_thread = 250;

        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let engine = engine.clone();
                thread::spawn(move || {
                    for _ in 0..per_thread {
                        engine.incr("counter");
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let expected = (threads * per_thread).to_string();
        assert_eq!(engine.get("counter"), Some(expected));
    }

    #[test]
    fn test_snapshot_never_observes_torn_writes() {
        let engine = Arc::new(StorageEngine::new());
        engine.set("pair", "0:0");

        let writer = {
            let engine = engine.clone();
            thread::spawn(move || {
                for i in 1..=1000 {
                    engine.set("pair", format!("{}:{}", i, i));
                }
            })
        };

        for _ in 0..200 {
            let snapshot = engine.snapshot();
            let value = &snapshot.strings["pair"];
            let (left, right) = value.split_once(':').unwrap();
            assert_eq!(left, right);
        }
        writer.join().unwrap();
    }

    #[test]
    fn test_snapshot_contents() {
        let engine = StorageEngine::new();
        engine.set("s", "1");
        engine.set("dead", "x");
        engine.expire("dead", 0);
        engine.hset("h", "f", "v");
        engine.lpush("l", &["a", "b"]);
        engine.sadd("set", &["m"]);

        let snapshot = engine.snapshot();
        assert_eq!(snapshot.strings.len(), 1);
        assert_eq!(snapshot.hashes["h"]["f"], "v");
        assert_eq!(snapshot.lists["l"], vec!["a", "b"]);
        assert!(snapshot.sets["set"].contains("m"));
        assert_eq!(snapshot.key_count(), 4);
    }

    #[test]
    fn test_flush_all() {
        let engine = StorageEngine::new();
        engine.set("a", "1");
        engine.sadd("b", &["x"]);
        engine.flush_all();
        assert_eq!(engine.stats().total(), 0);
    }
}
