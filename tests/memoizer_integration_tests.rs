//! Integration Tests for the Memoization Engine
//!
//! Exercises resolve, remove, keys and bust through the public API, including
//! expiry and concurrent callers.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use call_memo::memo::SerdeCloner;
use call_memo::{call, Arg, CallDescriptor, Config, LockStrategy, MemoError, Memoizer};
use serde::{Deserialize, Serialize};

// == Helper Functions ==

struct Accounts;

fn balance(id: i64) -> CallDescriptor {
    call!(Accounts => balance(id)).unwrap()
}

fn memoizer(lock_strategy: LockStrategy) -> Memoizer {
    Memoizer::from_config(&Config {
        lock_strategy,
        ..Config::default()
    })
}

// == Miss Then Hit ==

#[tokio::test]
async fn test_counting_compute_runs_once_per_key() {
    let memo = Memoizer::new();
    let counter = AtomicUsize::new(0);
    let count = || async { Ok(Some(counter.fetch_add(1, Ordering::SeqCst) + 1)) };

    let first = memo.resolve(&balance(1), 60, count).await.unwrap();
    let second = memo.resolve(&balance(1), 60, count).await.unwrap();
    let other = memo.resolve(&balance(2), 60, count).await.unwrap();

    assert_eq!(first, Some(1));
    assert_eq!(second, Some(1));
    assert_eq!(other, Some(2));
    assert_eq!(counter.load(Ordering::SeqCst), 2);
}

// == Expiry ==

#[tokio::test]
async fn test_expired_entry_is_recomputed() {
    let memo = Memoizer::new();
    let counter = AtomicUsize::new(0);
    let count = || async { Ok(Some(counter.fetch_add(1, Ordering::SeqCst))) };

    memo.resolve(&balance(1), 1, count).await.unwrap();
    memo.resolve(&balance(1), 1, count).await.unwrap();
    assert_eq!(counter.load(Ordering::SeqCst), 1);

    tokio::time::sleep(Duration::from_millis(1100)).await;

    assert_eq!(memo.total_keys().await, 0);
    let value = memo.resolve(&balance(1), 1, count).await.unwrap();
    assert_eq!(value, Some(1));
    assert_eq!(counter.load(Ordering::SeqCst), 2);
}

// == Null Non-Caching ==

#[tokio::test]
async fn test_none_result_leaves_keys_unchanged() {
    let memo = Memoizer::new();
    memo.resolve(&balance(1), 60, || async { Ok(Some(10)) })
        .await
        .unwrap();

    let before: Vec<String> = memo.keys().await.collect();
    let missing: Option<i32> = memo
        .resolve(&balance(404), 60, || async { Ok(None) })
        .await
        .unwrap();
    let after: Vec<String> = memo.keys().await.collect();

    assert!(missing.is_none());
    assert_eq!(before, after);
}

// == Clone Isolation ==

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Statement {
    lines: Vec<String>,
}

#[tokio::test]
async fn test_mutating_result_does_not_touch_stored_value() {
    let memo = Memoizer::new();
    let d = call!(Accounts => statement(7)).unwrap();
    let compute = || async {
        Ok(Some(Statement {
            lines: vec!["opening".to_string()],
        }))
    };

    let mut first = memo.resolve(&d, 60, compute).await.unwrap().unwrap();
    first.lines.push("tampered".to_string());

    let second = memo.resolve(&d, 60, compute).await.unwrap().unwrap();
    assert_eq!(second.lines, vec!["opening".to_string()]);

    let mut third = memo
        .resolve_with(&d, 60, &SerdeCloner, compute)
        .await
        .unwrap()
        .unwrap();
    third.lines.clear();

    let fourth = memo.resolve(&d, 60, compute).await.unwrap().unwrap();
    assert_eq!(fourth, second);
}

// == Symmetric Removal ==

#[tokio::test]
async fn test_remove_then_resolve_recomputes() {
    let memo = Memoizer::new();
    let counter = AtomicUsize::new(0);
    let count = || async { Ok(Some(counter.fetch_add(1, Ordering::SeqCst))) };

    memo.resolve(&balance(3), 60, count).await.unwrap();

    assert!(memo.remove(&balance(3)).await.unwrap());
    assert!(!memo.remove(&balance(3)).await.unwrap());

    memo.resolve(&balance(3), 60, count).await.unwrap();
    assert_eq!(counter.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_remove_by_listed_key() {
    let memo = Memoizer::new();
    memo.resolve(&balance(5), 60, || async { Ok(Some(5)) })
        .await
        .unwrap();

    let key = memo.keys().await.next().unwrap();
    assert_eq!(key, "Accounts.balance(5)");
    assert!(memo.remove_key(&key).await);
    assert!(!memo.remove_key(&key).await);
}

// == Bust ==

#[tokio::test]
async fn test_bust_removes_everything_it_reports() {
    let memo = Memoizer::new();
    for id in 0..5 {
        memo.resolve(&balance(id), 60, || async { Ok(Some(id)) })
            .await
            .unwrap();
    }
    let d = CallDescriptor::builder("Ledger", "balance")
        .arg(0)
        .build()
        .unwrap();
    memo.resolve(&d, 60, || async { Ok(Some(0)) }).await.unwrap();

    let before = memo.total_keys().await;
    let removed = memo.bust().await;

    assert_eq!(before, 6);
    assert_eq!(removed.len(), before);
    assert_eq!(memo.total_keys().await, 0);
    assert_eq!(memo.keys().await.count(), 0);
}

// == Region Isolation ==

#[tokio::test]
async fn test_same_call_in_two_regions_is_two_entries() {
    let memo = Memoizer::new();
    let accounts = call!(Accounts => balance(1)).unwrap();
    let ledger = call!("Ledger" => balance(1)).unwrap();

    memo.resolve(&accounts, 60, || async { Ok(Some("a")) })
        .await
        .unwrap();
    let value = memo.resolve(&ledger, 60, || async { Ok(Some("l")) })
        .await
        .unwrap();

    assert_eq!(value, Some("l"));
    let mut keys: Vec<String> = memo.keys().await.collect();
    keys.sort();
    assert_eq!(keys, vec!["Accounts.balance(1)", "Ledger.balance(1)"]);
}

// == Descriptor Errors ==

#[tokio::test]
async fn test_invalid_descriptor_is_rejected_before_compute() {
    let result = CallDescriptor::builder("Accounts", "balance(1)").build();
    assert!(matches!(result, Err(MemoError::Descriptor(_))));

    let memo = Memoizer::new();
    let removed = memo.remove_call("Accounts", "", &[Arg::from(1)]).await;
    assert!(matches!(removed, Err(MemoError::Descriptor(_))));
}

// == Concurrency ==

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_resolves_compute_once_per_key() {
    for strategy in [LockStrategy::PerKey, LockStrategy::Global] {
        let memo = Arc::new(memoizer(strategy));
        let counter = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let memo = memo.clone();
            let counter = counter.clone();
            handles.push(tokio::spawn(async move {
                memo.resolve(&balance(1), 60, || async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    Ok(Some(42))
                })
                .await
                .unwrap()
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap(), Some(42));
        }
        assert_eq!(counter.load(Ordering::SeqCst), 1, "{strategy:?}");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_per_key_lets_unrelated_keys_run_concurrently() {
    let memo = Arc::new(memoizer(LockStrategy::PerKey));
    let (started_tx, started_rx) = tokio::sync::oneshot::channel::<()>();
    let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();

    let slow = {
        let memo = memo.clone();
        tokio::spawn(async move {
            memo.resolve(&balance(1), 60, || async move {
                let _ = started_tx.send(());
                let _ = release_rx.await;
                Ok(Some(1))
            })
            .await
        })
    };
    started_rx.await.unwrap();

    // Another key resolves while the first computation is still running
    let fast = tokio::time::timeout(
        Duration::from_millis(500),
        memo.resolve(&balance(2), 60, || async { Ok(Some(2)) }),
    )
    .await;
    assert_eq!(fast.unwrap().unwrap(), Some(2));

    release_tx.send(()).unwrap();
    assert_eq!(slow.await.unwrap().unwrap(), Some(1));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_global_lock_blocks_unrelated_keys_during_compute() {
    let memo = Arc::new(memoizer(LockStrategy::Global));
    let (started_tx, started_rx) = tokio::sync::oneshot::channel::<()>();
    let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();

    let slow = {
        let memo = memo.clone();
        tokio::spawn(async move {
            memo.resolve(&balance(1), 60, || async move {
                let _ = started_tx.send(());
                let _ = release_rx.await;
                Ok(Some(1))
            })
            .await
        })
    };
    started_rx.await.unwrap();

    let blocked = tokio::time::timeout(
        Duration::from_millis(200),
        memo.resolve(&balance(2), 60, || async { Ok(Some(2)) }),
    )
    .await;
    assert!(blocked.is_err(), "Global strategy should serialize all keys");

    release_tx.send(()).unwrap();
    assert_eq!(slow.await.unwrap().unwrap(), Some(1));
    let after = memo.resolve(&balance(2), 60, || async { Ok(Some(2)) }).await;
    assert_eq!(after.unwrap(), Some(2));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_remove_waits_for_in_flight_resolve() {
    let memo = Arc::new(memoizer(LockStrategy::PerKey));
    let (started_tx, started_rx) = tokio::sync::oneshot::channel::<()>();

    let resolving = {
        let memo = memo.clone();
        tokio::spawn(async move {
            memo.resolve(&balance(9), 60, || async move {
                let _ = started_tx.send(());
                tokio::time::sleep(Duration::from_millis(100)).await;
                Ok(Some(9))
            })
            .await
        })
    };
    started_rx.await.unwrap();

    // Issued after the resolve began, so it must evict what that resolve stores
    assert!(memo.remove(&balance(9)).await.unwrap());
    assert_eq!(resolving.await.unwrap().unwrap(), Some(9));
    assert_eq!(memo.total_keys().await, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_per_key_bust_does_not_wait_for_in_flight_compute() {
    let memo = Arc::new(memoizer(LockStrategy::PerKey));
    let (started_tx, started_rx) = tokio::sync::oneshot::channel::<()>();
    let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();

    let resolving = {
        let memo = memo.clone();
        tokio::spawn(async move {
            memo.resolve(&balance(11), 60, || async move {
                let _ = started_tx.send(());
                let _ = release_rx.await;
                Ok(Some(11))
            })
            .await
        })
    };
    started_rx.await.unwrap();

    // Returns at once with nothing stored yet
    let busted = tokio::time::timeout(Duration::from_millis(500), memo.bust()).await;
    assert_eq!(busted.unwrap(), Vec::<String>::new());

    release_tx.send(()).unwrap();
    assert_eq!(resolving.await.unwrap().unwrap(), Some(11));

    // The computation stored its result after the bust
    assert_eq!(memo.total_keys().await, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_global_bust_waits_for_in_flight_compute() {
    let memo = Arc::new(memoizer(LockStrategy::Global));
    let (started_tx, started_rx) = tokio::sync::oneshot::channel::<()>();
    let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();

    let resolving = {
        let memo = memo.clone();
        tokio::spawn(async move {
            memo.resolve(&balance(12), 60, || async move {
                let _ = started_tx.send(());
                let _ = release_rx.await;
                Ok(Some(12))
            })
            .await
        })
    };
    started_rx.await.unwrap();

    let busting = {
        let memo = memo.clone();
        tokio::spawn(async move { memo.bust().await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!busting.is_finished(), "Bust should wait for the global slot");

    release_tx.send(()).unwrap();
    assert_eq!(resolving.await.unwrap().unwrap(), Some(12));
    assert_eq!(busting.await.unwrap(), vec!["Accounts.balance(12)"]);
    assert_eq!(memo.total_keys().await, 0);
}
