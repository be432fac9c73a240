//! Cache Module
//!
//! Provides the expiring store that memoized results live in.

mod entry;
mod stats;
mod store;

// Re-export public types
pub use entry::CacheEntry;
pub use stats::MemoStats;
pub use store::{ExpiringStore, MemoryStore};
