//! Cache interface and the in-process implementation.
//!
//! The dedup index is cache-implementation-agnostic: it talks to this
//! trait whether the entries live in a process-local map or in a shared
//! cache service. [`LocalCache`] is the in-process layer and doubles as
//! the test stand-in for the shared one.

use std::time::{Duration, Instant};

use dashmap::DashMap;

/// Minimal key/value cache with per-entry TTL.
pub trait Cache: Send + Sync {
    /// Look up a live entry.
    fn get(&self, key: &str) -> Option<String>;

    /// Insert or replace an entry with a time-to-live.
    fn set(&self, key: &str, value: &str, ttl: Duration);

    /// Remove an entry. Returns whether it existed.
    fn delete(&self, key: &str) -> bool;

    /// Remove every entry whose key starts with `prefix`.
    /// Returns the number of entries removed.
    fn delete_prefix(&self, prefix: &str) -> usize;

    /// Number of live entries.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Clone, Debug)]
struct CacheEntry {
    value: String,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Process-local cache backed by a concurrent map.
///
/// Expired entries are dropped lazily on access and during `len`.
#[derive(Default)]
pub struct LocalCache {
    entries: DashMap<String, CacheEntry>,
}

impl LocalCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count live entries under a key prefix.
    pub fn count_prefix(&self, prefix: &str) -> usize {
        self.purge_expired();
        self.entries
            .iter()
            .filter(|entry| entry.key().starts_with(prefix))
            .count()
    }

    fn purge_expired(&self) {
        self.entries.retain(|_, entry| !entry.is_expired());
    }
}

impl Cache for LocalCache {
    fn get(&self, key: &str) -> Option<String> {
        if let Some(entry) = self.entries.get(key) {
            if !entry.is_expired() {
                return Some(entry.value.clone());
            }
        }
        // Expired (or missing): make sure the corpse is gone
        self.entries.remove_if(key, |_, entry| entry.is_expired());
        None
    }

    fn set(&self, key: &str, value: &str, ttl: Duration) {
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                value: value.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
    }

    fn delete(&self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    fn delete_prefix(&self, prefix: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| !key.starts_with(prefix));
        before - self.entries.len()
    }

    fn len(&self) -> usize {
        self.purge_expired();
        self.entries.len()
    }
}
