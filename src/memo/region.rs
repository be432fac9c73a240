//! Region Cache
//!
//! A handle that scopes memoized calls to the region named after type `R`.
//! Regions share the underlying store; only their keys differ.

use std::future::Future;
use std::marker::PhantomData;

use crate::cache::{ExpiringStore, MemoryStore};
use crate::error::Result;
use crate::memo::descriptor::region_name;
use crate::memo::{Arg, CallDescriptor, CallDescriptorBuilder, Memoizer, StoredValue};

pub struct RegionCache<'a, R: ?Sized, S = MemoryStore<StoredValue>> {
    memoizer: &'a Memoizer<S>,
    _region: PhantomData<fn() -> Box<R>>,
}

impl<R: ?Sized> RegionCache<'static, R> {
    /// Binds region `R` to the process-wide engine.
    pub fn global() -> Self {
        Self::new(Memoizer::global())
    }
}

impl<'a, R: ?Sized, S: ExpiringStore<StoredValue>> RegionCache<'a, R, S> {
    pub fn new(memoizer: &'a Memoizer<S>) -> Self {
        Self {
            memoizer,
            _region: PhantomData,
        }
    }

    /// The region name folded into every key of this handle.
    pub fn region(&self) -> &'static str {
        region_name::<R>()
    }

    /// Starts a descriptor for `method` in this region.
    pub fn call(&self, method: impl Into<String>) -> CallDescriptorBuilder {
        CallDescriptor::for_region::<R>(method)
    }

    /// Resolves `method(arguments)` in this region. See [`Memoizer::resolve`].
    pub async fn resolve<T, F, Fut>(
        &self,
        method: &str,
        arguments: &[Arg],
        ttl_seconds: u64,
        compute: F,
    ) -> Result<Option<T>>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<Option<T>>>,
    {
        let descriptor = self.call(method).args(arguments.iter().cloned()).build()?;
        self.memoizer.resolve(&descriptor, ttl_seconds, compute).await
    }

    /// Removes the entry for `method(arguments)` in this region.
    pub async fn remove(&self, method: &str, arguments: &[Arg]) -> Result<bool> {
        self.memoizer
            .remove_call(self.region(), method, arguments)
            .await
    }

    /// Runs `compute` without reading or writing the cache.
    pub async fn no_cache<T, F, Fut>(&self, compute: F) -> anyhow::Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        compute().await
    }

    /// Number of live entries in the shared store, across all regions.
    pub async fn total_keys(&self) -> usize {
        self.memoizer.total_keys().await
    }

    /// The keys in the shared store that belong to this region.
    pub async fn keys(&self) -> Vec<String> {
        let prefix = format!("{}.", self.region());
        self.memoizer
            .keys()
            .await
            .filter(|key| key.starts_with(&prefix))
            .collect()
    }
}
