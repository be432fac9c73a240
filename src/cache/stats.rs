//! Memo Statistics Module
//!
//! Tracks memoization metrics including hits, misses and removals.

use serde::Serialize;

// == Memo Stats ==
/// Tracks memoization metrics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MemoStats {
    /// Number of resolves answered from the store
    pub hits: u64,
    /// Number of resolves that ran the computation
    pub misses: u64,
    /// Number of computations that produced no value and were not stored
    pub uncached_nulls: u64,
    /// Number of entries removed explicitly (remove or bust)
    pub removals: u64,
    /// Current number of live entries in the store
    pub total_entries: usize,
}

impl MemoStats {
    // == Constructor ==
    /// Creates a new MemoStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Returns hits / (hits + misses), or 0.0 if nothing was resolved yet.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_uncached_null(&mut self) {
        self.uncached_nulls += 1;
    }

    pub fn record_removals(&mut self, count: usize) {
        self.removals += count as u64;
    }

    pub fn set_total_entries(&mut self, count: usize) {
        self.total_entries = count;
    }
}
