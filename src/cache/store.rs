//! Cache Store Module
//!
//! The expiring key-value store that holds memoized results, and its
//! HashMap-backed default implementation.

use std::collections::HashMap;

use crate::cache::CacheEntry;

// == Expiring Store Contract ==
/// A TTL map from string keys to values.
///
/// Implementations need not be thread-safe: the engine serializes every call
/// behind its own lock. Expired entries must behave as absent for
/// `contains`, `get`, `entries` and `count`, whether or not they have been
/// swept yet.
pub trait ExpiringStore<V>: Send {
    /// Returns true if a live entry exists for `key`.
    fn contains(&self, key: &str) -> bool;

    /// Returns the live value for `key`.
    fn get(&self, key: &str) -> Option<V>;

    /// Stores `value`, replacing any previous entry and resetting its TTL.
    fn set(&mut self, key: String, value: V, ttl_seconds: u64);

    /// Removes the entry for `key`. Returns false if nothing live was removed.
    fn remove(&mut self, key: &str) -> bool;

    /// Returns every live `(key, value)` pair.
    fn entries(&self) -> Vec<(String, V)>;

    /// Returns the number of live entries.
    fn count(&self) -> usize;

    /// Removes every entry and returns the keys of those that were still live.
    fn clear(&mut self) -> Vec<String>;

    /// Drops expired entries. Returns how many were dropped.
    fn purge_expired(&mut self) -> usize;
}

// == Memory Store ==
/// In-process expiring store backed by a HashMap.
#[derive(Debug)]
pub struct MemoryStore<V> {
    entries: HashMap<String, CacheEntry<V>>,
}

impl<V> MemoryStore<V> {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    fn live(&self, key: &str) -> Option<&CacheEntry<V>> {
        self.entries.get(key).filter(|entry| !entry.is_expired())
    }
}

impl<V> Default for MemoryStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone + Send> ExpiringStore<V> for MemoryStore<V> {
    fn contains(&self, key: &str) -> bool {
        self.live(key).is_some()
    }

    fn get(&self, key: &str) -> Option<V> {
        self.live(key).map(|entry| entry.value.clone())
    }

    fn set(&mut self, key: String, value: V, ttl_seconds: u64) {
        self.entries.insert(key, CacheEntry::new(value, ttl_seconds));
    }

    fn remove(&mut self, key: &str) -> bool {
        match self.entries.remove(key) {
            Some(entry) => !entry.is_expired(),
            None => false,
        }
    }

    fn entries(&self) -> Vec<(String, V)> {
        self.entries
            .iter()
            .filter(|(_, entry)| !entry.is_expired())
            .map(|(key, entry)| (key.clone(), entry.value.clone()))
            .collect()
    }

    fn count(&self) -> usize {
        self.entries
            .values()
            .filter(|entry| !entry.is_expired())
            .count()
    }

    fn clear(&mut self) -> Vec<String> {
        self.entries
            .drain()
            .filter(|(_, entry)| !entry.is_expired())
            .map(|(key, _)| key)
            .collect()
    }

    fn purge_expired(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired());
        before - self.entries.len()
    }
}
