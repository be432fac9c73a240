//! Key Lock Table
//!
//! One async mutex per in-use lock slot. A slot is created on first acquire
//! and dropped from the table when its last holder or waiter lets go.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type Slot = Arc<AsyncMutex<()>>;

#[derive(Debug, Default)]
pub(crate) struct KeyLocks {
    table: Mutex<HashMap<String, Slot>>,
}

impl KeyLocks {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Waits until `slot` is free and holds it until the guard is dropped.
    pub(crate) async fn acquire(&self, slot: &str) -> SlotGuard<'_> {
        // Created before waiting so a cancelled acquire still cleans up the slot
        let mut pending = SlotGuard {
            locks: self,
            slot: slot.to_string(),
            guard: None,
        };
        let lock = self.table().entry(slot.to_string()).or_default().clone();
        pending.guard = Some(lock.lock_owned().await);
        pending
    }

    /// Number of slots currently held or awaited.
    #[allow(dead_code)]
    pub(crate) fn active(&self) -> usize {
        self.table().len()
    }

    // Nothing panics while the table lock is held, so a poisoned table is
    // still consistent.
    fn table(&self) -> MutexGuard<'_, HashMap<String, Slot>> {
        self.table.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Holds one lock slot. Releasing it wakes the next waiter, if any.
pub(crate) struct SlotGuard<'a> {
    locks: &'a KeyLocks,
    slot: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());

        // Waiters clone the slot under the table lock, so a count of one
        // means only the table still refers to it.
        let mut table = self.locks.table();
        if table
            .get(&self.slot)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            table.remove(&self.slot);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_slot_removed_after_release() {
        let locks = KeyLocks::new();

        {
            let _guard = locks.acquire("a").await;
            assert_eq!(locks.active(), 1);
        }

        assert_eq!(locks.active(), 0);
    }

    #[tokio::test]
    async fn test_same_slot_is_exclusive() {
        let locks = Arc::new(KeyLocks::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let locks = locks.clone();
            let inside = inside.clone();
            let peak = peak.clone();
            handles.push(tokio::spawn(async move {
                let _guard = locks.acquire("shared").await;
                let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                inside.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(peak.load(Ordering::SeqCst), 1);
        assert_eq!(locks.active(), 0);
    }

    #[tokio::test]
    async fn test_distinct_slots_do_not_block() {
        let locks = KeyLocks::new();

        let _a = locks.acquire("a").await;
        let b = tokio::time::timeout(Duration::from_millis(100), locks.acquire("b")).await;

        assert!(b.is_ok(), "Unrelated slot should be acquired immediately");
    }
}
