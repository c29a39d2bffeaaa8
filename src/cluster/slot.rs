//! Hash slot calculation
//!
//! Keys map onto 16384 fixed slots with a djb2-style hash; a slot maps onto
//! the node registry by position.

/// Number of hash slots
pub const HASH_SLOTS: u16 = 16384;

/// Calculate the hash slot for a key
///
/// `hash = 5381; hash = hash * 33 + byte` over the key bytes with 64-bit
/// wrapping arithmetic, then `hash % 16384`.
pub fn calculate_hash_slot(key: &str) -> u16 {
    let hash = key.bytes().fold(5381u64, |hash, byte| {
        hash.wrapping_mul(33).wrapping_add(u64::from(byte))
    });

    (hash % u64::from(HASH_SLOTS)) as u16
}

/// Index of the node owning `slot` in a registry of `node_count` nodes
pub fn node_index_for_slot(slot: u16, node_count: usize) -> Option<usize> {
    if node_count == 0 {
        return None;
    }
    Some(usize::from(slot) % node_count)
}
