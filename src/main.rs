//! Call Memo - demo run
//!
//! Memoizes a few calls of a small catalog service, then lists, invalidates
//! and busts them.

use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Result;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use call_memo::{call, spawn_cleanup_task, Arg, Config, Memoizer, RegionCache};

#[derive(Debug, Clone, Serialize)]
struct Filter {
    colour: String,
    max_price: u32,
}

/// A catalog whose lookups are expensive enough to memoize.
struct Catalog {
    cache: RegionCache<'static, Catalog>,
    lookups: AtomicUsize,
}

impl Catalog {
    fn new(memoizer: &'static Memoizer) -> Self {
        Self {
            cache: RegionCache::new(memoizer),
            lookups: AtomicUsize::new(0),
        }
    }

    async fn product_name(&self, id: u32) -> Result<Option<String>> {
        let name = self
            .cache
            .resolve("product_name", &[Arg::from(id)], 300, || async {
                self.lookups.fetch_add(1, Ordering::SeqCst);
                Ok(Some(format!("product-{id}")))
            })
            .await?;
        Ok(name)
    }

    async fn search(&self, page: u32, filter: &Filter) -> Result<Option<Vec<u32>>> {
        let descriptor = self.cache.call("search").arg(page).object(filter).build()?;
        let hits = Memoizer::global()
            .resolve(&descriptor, 60, || async {
                self.lookups.fetch_add(1, Ordering::SeqCst);
                Ok(Some(vec![page, filter.max_price]))
            })
            .await?;
        Ok(hits)
    }
}

/// Main entry point for the demo.
///
/// # Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Start background TTL cleanup task on the process-wide engine
/// 4. Memoize, list, remove and bust a handful of calls
/// 5. Stop the cleanup task
#[tokio::main]
async fn main() -> Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "call_memo=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    info!(
        "Configuration loaded: lock_strategy={:?}, cleanup_interval={}s, escape_delimiters={}",
        config.lock_strategy, config.cleanup_interval, config.key_policy.escape_delimiters
    );

    let memoizer = Memoizer::global();
    info!("Engine ready: lock_strategy={:?}", memoizer.lock_strategy());
    let cleanup_handle = spawn_cleanup_task(memoizer, config.cleanup_interval);

    let catalog = Catalog::new(memoizer);
    let filter = Filter {
        colour: "red".to_string(),
        max_price: 40,
    };

    for _ in 0..3 {
        catalog.product_name(7).await?;
        catalog.search(1, &filter).await?;
    }
    let total_keys = memoizer.total_keys().await;
    info!(
        "Six calls, {} lookups, {} keys",
        catalog.lookups.load(Ordering::SeqCst),
        total_keys
    );

    for key in memoizer.keys().await {
        info!("Cached: {}", key);
    }

    let descriptor = call!(Catalog => product_name(7u32))?;
    let key = memoizer.key_for(&descriptor)?;
    let removed = memoizer.remove(&descriptor).await?;
    info!("Removed {}: {}", key, removed);

    let busted = memoizer.bust().await;
    let stats = memoizer.stats().await;
    info!("Busted {} keys, hit rate {:.2}", busted.len(), stats.hit_rate());

    cleanup_handle.abort();
    info!("Demo finished");
    Ok(())
}
