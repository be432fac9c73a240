//! Cache Entry Module
//!
//! Defines the structure for individual stored results with TTL support.

use std::time::{Duration, Instant};

// == Cache Entry ==
/// Represents a single stored result with its expiry deadline.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// The stored value
    pub value: V,
    /// Monotonic expiry deadline, `None` when the TTL reaches past what the
    /// clock can represent
    pub expires_at: Option<Instant>,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates a new entry that expires `ttl_seconds` from now.
    ///
    /// A TTL too large for the monotonic clock, such as `u64::MAX`, never
    /// expires.
    pub fn new(value: V, ttl_seconds: u64) -> Self {
        Self {
            value,
            expires_at: Instant::now().checked_add(Duration::from_secs(ttl_seconds)),
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// Boundary condition: an entry is expired once the current time is greater
    /// than or equal to its deadline, so a zero TTL is never observable.
    pub fn is_expired(&self) -> bool {
        self.expires_at
            .is_some_and(|deadline| Instant::now() >= deadline)
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn test_entry_creation_with_ttl() {
        let entry = CacheEntry::new("test_value".to_string(), 60);

        assert_eq!(entry.value, "test_value");
        assert!(!entry.is_expired());
        assert!(entry.expires_at.is_some());
    }

    #[test]
    fn test_entry_expiration() {
        let entry = CacheEntry::new(7u32, 1);

        assert!(!entry.is_expired());

        // Wait for expiration
        sleep(Duration::from_millis(1100));

        assert!(entry.is_expired());
    }

    #[test]
    fn test_zero_ttl_is_expired_immediately() {
        let entry = CacheEntry::new("gone", 0);
        assert!(entry.is_expired(), "Entry should be expired at boundary");
    }

    #[test]
    fn test_max_ttl_never_expires() {
        let entry = CacheEntry::new("forever", u64::MAX);

        assert!(entry.expires_at.is_none());
        assert!(!entry.is_expired());
    }
}
