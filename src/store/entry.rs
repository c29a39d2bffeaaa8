//! Entry structure for partition values

use std::time::{Duration, Instant};

/// Longest TTL an entry can carry (100 years)
pub const MAX_TTL_SECONDS: u64 = 100 * 365 * 24 * 60 * 60;

/// A single value held in a partition, with its optional expiration
#[derive(Debug, Clone, PartialEq)]
pub struct Entry<T> {
    /// The payload (string, hash, list or set depending on the partition)
    pub value: T,

    /// Optional expiration time (absolute). `None` means the entry never expires.
    pub expire_at: Option<Instant>,
}

impl<T> Entry<T> {
    /// Create a new entry without expiration
    pub fn new(value: T) -> Self {
        Entry {
            value,
            expire_at: None,
        }
    }

    /// Check if the entry has expired
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    /// Check if the entry is expired at the given instant
    pub fn is_expired_at(&self, now: Instant) -> bool {
        match self.expire_at {
            Some(expire_at) => now >= expire_at,
            None => false,
        }
    }

    /// Set expiration time (TTL in seconds)
    ///
    /// A non-positive TTL makes the entry dead immediately; it is purged on next touch.
    /// TTLs beyond [`MAX_TTL_SECONDS`] are clamped to it.
    pub fn set_expiration(&mut self, ttl_seconds: i64) {
        let now = Instant::now();
        self.expire_at = if ttl_seconds > 0 {
            let ttl = (ttl_seconds as u64).min(MAX_TTL_SECONDS);
            now.checked_add(Duration::from_secs(ttl))
        } else {
            Some(now)
        };
    }

    /// Get remaining TTL in seconds
    /// Returns:
    /// - n >= 0: remaining whole seconds
    /// - -1: no expiration
    pub fn ttl_seconds(&self) -> i64 {
        match self.expire_at {
            Some(expire_at) => expire_at
                .saturating_duration_since(Instant::now())
                .as_secs() as i64,
            None => -1,
        }
    }
}
