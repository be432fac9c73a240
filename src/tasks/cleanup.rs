//! TTL Cleanup Task
//!
//! Background task that periodically drops expired memoized results.

use std::ops::Deref;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::ExpiringStore;
use crate::memo::{Memoizer, StoredValue};

/// Spawns a background task that periodically sweeps expired entries.
///
/// Expired entries already read as absent; the sweep only reclaims their
/// memory. The task runs until aborted through the returned handle.
///
/// Accepts an `Arc<Memoizer>` or the `&'static` process-wide engine.
///
/// # Example
/// ```ignore
/// let cleanup_handle = spawn_cleanup_task(Memoizer::global(), 1);
/// // Later, during shutdown:
/// cleanup_handle.abort();
/// ```
pub fn spawn_cleanup_task<M, S>(memoizer: M, cleanup_interval_secs: u64) -> JoinHandle<()>
where
    M: Deref<Target = Memoizer<S>> + Send + 'static,
    S: ExpiringStore<StoredValue> + 'static,
{
    let interval = Duration::from_secs(cleanup_interval_secs.max(1));

    tokio::spawn(async move {
        info!(
            "Starting TTL cleanup task with interval of {} seconds",
            interval.as_secs()
        );

        loop {
            tokio::time::sleep(interval).await;

            let removed = memoizer.purge_expired().await;

            if removed > 0 {
                info!("TTL cleanup: removed {} expired entries", removed);
            } else {
                debug!("TTL cleanup: no expired entries found");
            }
        }
    })
}
