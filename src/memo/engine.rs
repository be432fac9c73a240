//! Memoization Engine
//!
//! Resolves described calls against the expiring store: returns the stored
//! result while it is live, otherwise runs the computation once and stores
//! what it produced.

use std::any::Any;
use std::future::Future;
use std::sync::{Arc, OnceLock};

use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::cache::{ExpiringStore, MemoStats, MemoryStore};
use crate::config::{Config, KeyPolicy, LockStrategy};
use crate::error::{MemoError, Result};
use crate::memo::canonical::{canonicalize, JsonStringify, Stringify};
use crate::memo::key::{self, CacheKey};
use crate::memo::locks::{KeyLocks, SlotGuard};
use crate::memo::{Arg, CallDescriptor, CloneCloner, ValueCloner};

/// Type-erased stored result. Results of every region share one store.
pub type StoredValue = Arc<dyn Any + Send + Sync>;

/// Lock slot shared by every operation under [`LockStrategy::Global`].
const GLOBAL_SLOT: &str = "";

tokio::task_local! {
    /// Engines whose global slot the current task holds. Calls made from
    /// inside a computation reenter the slot instead of waiting on it.
    static HELD_GLOBAL_SLOTS: Vec<usize>;
}

// == Engine State ==
struct Inner<S> {
    store: S,
    stats: MemoStats,
}

// == Memoizer ==
/// The memoization engine.
///
/// Under [`LockStrategy::PerKey`] at most one computation runs per key and
/// unrelated keys proceed concurrently. Under [`LockStrategy::Global`] every
/// operation, computation included, runs under one store-wide lock.
pub struct Memoizer<S = MemoryStore<StoredValue>> {
    inner: Mutex<Inner<S>>,
    locks: KeyLocks,
    lock_strategy: LockStrategy,
    key_policy: KeyPolicy,
    stringify: Box<dyn Stringify>,
}

impl Memoizer {
    /// Creates an engine over an in-memory store with default configuration.
    pub fn new() -> Self {
        Self::from_config(&Config::default())
    }

    /// Creates an engine over an in-memory store.
    pub fn from_config(config: &Config) -> Self {
        Self::with_store(MemoryStore::new(), config)
    }

    /// Returns the process-wide engine, configured from the environment on
    /// first use.
    pub fn global() -> &'static Memoizer {
        static GLOBAL: OnceLock<Memoizer> = OnceLock::new();
        GLOBAL.get_or_init(|| Memoizer::from_config(&Config::from_env()))
    }
}

impl Default for Memoizer {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: ExpiringStore<StoredValue>> Memoizer<S> {
    /// Creates an engine over a caller-supplied store.
    pub fn with_store(store: S, config: &Config) -> Self {
        Self {
            inner: Mutex::new(Inner {
                store,
                stats: MemoStats::new(),
            }),
            locks: KeyLocks::new(),
            lock_strategy: config.lock_strategy,
            key_policy: config.key_policy.clone(),
            stringify: Box::new(JsonStringify),
        }
    }

    /// Replaces the capability used to render object arguments.
    pub fn with_stringify(mut self, stringify: impl Stringify + 'static) -> Self {
        self.stringify = Box::new(stringify);
        self
    }

    /// The lock scope this engine was configured with.
    pub fn lock_strategy(&self) -> LockStrategy {
        self.lock_strategy
    }

    // == Key Derivation ==
    /// Derives the cache key for `descriptor` without touching the store.
    pub fn key_for(&self, descriptor: &CallDescriptor) -> Result<CacheKey> {
        self.encode(descriptor.region(), descriptor.method(), descriptor.arguments())
    }

    fn encode(&self, region: &str, method: &str, arguments: &[Arg]) -> Result<CacheKey> {
        let tokens = canonicalize(arguments, self.stringify.as_ref(), &self.key_policy)?;
        Ok(key::encode(
            region,
            method,
            &tokens,
            self.key_policy.escape_delimiters,
        ))
    }

    // == Resolve ==
    /// Returns a copy of the live result for `descriptor`, computing and
    /// storing it for `ttl_seconds` on a miss.
    ///
    /// A computation yielding `None` is returned as-is and never stored, so the
    /// next resolve computes again. A failed computation stores nothing and its
    /// error comes back as [`MemoError::Compute`].
    pub async fn resolve<T, F, Fut>(
        &self,
        descriptor: &CallDescriptor,
        ttl_seconds: u64,
        compute: F,
    ) -> Result<Option<T>>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<Option<T>>>,
    {
        self.resolve_with(descriptor, ttl_seconds, &CloneCloner, compute)
            .await
    }

    /// Like [`resolve`](Self::resolve), copying the result with `cloner`.
    pub async fn resolve_with<T, C, F, Fut>(
        &self,
        descriptor: &CallDescriptor,
        ttl_seconds: u64,
        cloner: &C,
        compute: F,
    ) -> Result<Option<T>>
    where
        T: Send + Sync + 'static,
        C: ValueCloner<T>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<Option<T>>>,
    {
        match self.resolve_shared(descriptor, ttl_seconds, compute).await? {
            Some(stored) => cloner.clone_value(&*stored).map(Some),
            None => Ok(None),
        }
    }

    /// Like [`resolve`](Self::resolve) without copying: returns the stored
    /// snapshot itself, shared with every other caller.
    pub async fn resolve_shared<T, F, Fut>(
        &self,
        descriptor: &CallDescriptor,
        ttl_seconds: u64,
        compute: F,
    ) -> Result<Option<Arc<T>>>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<Option<T>>>,
    {
        let key = self.key_for(descriptor)?;
        let _slot = self.lock_key(key.as_str()).await;

        {
            let mut inner = self.inner.lock().await;
            if let Some(stored) = inner.store.get(key.as_str()) {
                let value = stored
                    .downcast::<T>()
                    .map_err(|_| MemoError::TypeMismatch(key.to_string()))?;
                inner.stats.record_hit();
                debug!("Memo hit: {}", key);
                return Ok(Some(value));
            }
            inner.stats.record_miss();
        }

        debug!("Memo miss: {}, computing", key);
        let computed = self
            .holding_slot(compute())
            .await
            .map_err(MemoError::Compute)?;

        let mut inner = self.inner.lock().await;
        match computed {
            Some(value) => {
                let value = Arc::new(value);
                let stored: StoredValue = value.clone();
                inner.store.set(key.into_string(), stored, ttl_seconds);
                Ok(Some(value))
            }
            None => {
                inner.stats.record_uncached_null();
                debug!("Memo computation for {} returned nothing, not stored", key);
                Ok(None)
            }
        }
    }

    // == Remove ==
    /// Removes the entry `descriptor` maps to. Returns whether one was live.
    ///
    /// Waits for an in-flight computation of the same key, so a remove issued
    /// after a resolve always evicts what that resolve stored.
    pub async fn remove(&self, descriptor: &CallDescriptor) -> Result<bool> {
        let key = self.key_for(descriptor)?;
        Ok(self.remove_key(key.as_str()).await)
    }

    /// Removes the entry for `region.method(arguments)`.
    pub async fn remove_call(&self, region: &str, method: &str, arguments: &[Arg]) -> Result<bool> {
        let descriptor = CallDescriptor::builder(region, method)
            .args(arguments.iter().cloned())
            .build()?;
        self.remove(&descriptor).await
    }

    /// Removes an entry by its literal key, as listed by [`keys`](Self::keys).
    pub async fn remove_key(&self, key: &str) -> bool {
        let _slot = self.lock_key(key).await;
        let mut inner = self.inner.lock().await;

        let removed = inner.store.remove(key);
        if removed {
            inner.stats.record_removals(1);
            debug!("Memo removed: {}", key);
        }
        removed
    }

    // == Keys ==
    /// Lists the keys of every live entry, across all regions.
    ///
    /// The listing is taken when called; entries stored or removed afterwards
    /// do not show up in it. Call again for a fresh listing.
    pub async fn keys(&self) -> Keys {
        let _slot = self.lock_store().await;
        let inner = self.inner.lock().await;

        let keys: Vec<String> = inner
            .store
            .entries()
            .into_iter()
            .map(|(key, _)| key)
            .collect();
        Keys {
            inner: keys.into_iter(),
        }
    }

    /// Returns whether a live result is stored for `descriptor`.
    pub async fn is_cached(&self, descriptor: &CallDescriptor) -> Result<bool> {
        let key = self.key_for(descriptor)?;
        Ok(self.inner.lock().await.store.contains(key.as_str()))
    }

    /// Number of live entries, across all regions.
    pub async fn total_keys(&self) -> usize {
        self.inner.lock().await.store.count()
    }

    // == Bust ==
    /// Removes every entry in the store and returns the removed keys.
    pub async fn bust(&self) -> Vec<String> {
        let _slot = self.lock_store().await;
        let mut inner = self.inner.lock().await;

        let removed = inner.store.clear();
        inner.stats.record_removals(removed.len());
        info!("Memo bust: removed {} entries", removed.len());
        removed
    }

    // == Maintenance ==
    /// Drops expired entries from the store. Returns how many were dropped.
    pub async fn purge_expired(&self) -> usize {
        self.inner.lock().await.store.purge_expired()
    }

    /// Returns current statistics.
    pub async fn stats(&self) -> MemoStats {
        let inner = self.inner.lock().await;
        let mut stats = inner.stats.clone();
        stats.set_total_entries(inner.store.count());
        stats
    }

    // == Locking ==
    async fn lock_key(&self, key: &str) -> Option<SlotGuard<'_>> {
        match self.lock_strategy {
            LockStrategy::PerKey => Some(self.locks.acquire(key).await),
            LockStrategy::Global => self.lock_global().await,
        }
    }

    /// Store-wide operations only serialize against computations under the
    /// global strategy; per key they just take the store lock.
    async fn lock_store(&self) -> Option<SlotGuard<'_>> {
        match self.lock_strategy {
            LockStrategy::PerKey => None,
            LockStrategy::Global => self.lock_global().await,
        }
    }

    /// Takes the global slot, or nothing if this task already holds it.
    async fn lock_global(&self) -> Option<SlotGuard<'_>> {
        let id = self.id();
        let held = HELD_GLOBAL_SLOTS
            .try_with(|held| held.contains(&id))
            .unwrap_or(false);
        if held {
            return None;
        }
        Some(self.locks.acquire(GLOBAL_SLOT).await)
    }

    /// Runs `fut` marked as holding this engine's global slot.
    async fn holding_slot<Fut: Future>(&self, fut: Fut) -> Fut::Output {
        match self.lock_strategy {
            LockStrategy::PerKey => fut.await,
            LockStrategy::Global => {
                let mut held = HELD_GLOBAL_SLOTS
                    .try_with(|held| held.clone())
                    .unwrap_or_default();
                held.push(self.id());
                HELD_GLOBAL_SLOTS.scope(held, fut).await
            }
        }
    }

    fn id(&self) -> usize {
        self as *const Self as usize
    }
}

// == Keys ==
/// A finite listing of cache keys taken at one point in time.
#[derive(Debug, Clone)]
pub struct Keys {
    inner: std::vec::IntoIter<String>,
}

impl Iterator for Keys {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for Keys {}
