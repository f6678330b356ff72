//! Read-through cache facade with negative caching

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::{Serialize, de::DeserializeOwned};

use super::config::StampedeConfig;
use super::stampedeless::{Fetched, StampedelessCache};
use crate::domain::cache::{Cache, CacheKey, CachedValue, Lookup, LookupPolicy};
use crate::infrastructure::observability::{
    record_cache_compute, record_cache_lookup, record_store_error,
};

/// Get-or-compute over a [`StampedelessCache`]
///
/// Empty results are stored as a negative sentinel with their own TTL so
/// repeated misses do not hit the source. The facade never fails because
/// of the store: read errors count as a miss and write errors are dropped,
/// so an unavailable store degrades to computing on every call.
#[derive(Debug, Clone)]
pub struct ReadThroughCache {
    inner: StampedelessCache,
}

impl ReadThroughCache {
    pub fn new(store: Arc<dyn Cache>, config: StampedeConfig) -> Self {
        Self::from_stampedeless(StampedelessCache::with_config(store, config))
    }

    pub fn from_stampedeless(inner: StampedelessCache) -> Self {
        Self { inner }
    }

    pub fn stampedeless(&self) -> &StampedelessCache {
        &self.inner
    }

    /// Reads `key` without computing
    ///
    /// A `Miss` on an entry past its refresh point leaves this caller holding
    /// `{key}_lock` until it expires; [`get_or_compute`](Self::get_or_compute)
    /// releases it after regenerating.
    pub async fn lookup<T>(&self, key: &CacheKey) -> Lookup<T>
    where
        T: DeserializeOwned + Send,
    {
        self.read(key).await.0
    }

    /// The lookup plus whether this caller took the regeneration lock
    async fn read<T>(&self, key: &CacheKey) -> (Lookup<T>, bool)
    where
        T: DeserializeOwned + Send,
    {
        let (lookup, locked) = match self.inner.fetch::<CachedValue<T>>(key).await {
            Ok(Fetched::Fresh(CachedValue::Found(value))) => (Lookup::Hit(value), false),
            Ok(Fetched::Fresh(CachedValue::NotFound)) => (Lookup::NegativeHit, false),
            Ok(Fetched::Regenerate) => (Lookup::Miss, true),
            Ok(Fetched::Missing) => (Lookup::Miss, false),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Cache read failed, treating as miss");
                record_store_error("get");
                (Lookup::Miss, false)
            }
        };

        record_cache_lookup(key.group(), lookup.outcome());
        (lookup, locked)
    }

    /// Stores a positive value, or the negative sentinel for `None`, with a
    /// TTL sampled from the matching half of `policy`
    ///
    /// Positive entries are regenerated early only inside the jitter window,
    /// never before `policy.positive.base`. Negative entries are served until
    /// they expire. The regeneration lock is left alone.
    ///
    /// Returns the TTL written, or `None` when the store rejected the write.
    pub async fn store<T>(
        &self,
        key: &CacheKey,
        value: Option<&T>,
        policy: &LookupPolicy,
    ) -> Option<Duration>
    where
        T: Serialize + Send + Sync,
    {
        let ttl_policy = policy.for_outcome(value.is_some());
        let ttl = ttl_policy.sample();
        let cached = CachedValue::from(value);
        let floor = if cached.is_not_found() {
            ttl
        } else {
            ttl_policy.base
        };

        let written = self
            .inner
            .set_with_refresh_floor(key, &cached, ttl, floor)
            .await;

        match written {
            Ok(()) => {
                tracing::debug!(
                    key = %key,
                    ttl_ms = ttl.as_millis() as u64,
                    negative = cached.is_not_found(),
                    "Cached lookup result"
                );
                Some(ttl)
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Cache write failed, result not cached");
                record_store_error("set");
                None
            }
        }
    }

    /// Returns the cached answer for `key`, computing and caching it on a miss
    ///
    /// `None` from `compute` is the empty result: it is cached as a negative
    /// and reported as "not found" until `policy.negative` elapses.
    pub async fn get_or_compute<T, F, Fut>(
        &self,
        key: &CacheKey,
        policy: &LookupPolicy,
        compute: F,
    ) -> Option<T>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Option<T>>,
    {
        let (lookup, locked) = self.read(key).await;

        match lookup {
            Lookup::Hit(value) => return Some(value),
            Lookup::NegativeHit => return None,
            Lookup::Miss => {}
        }

        record_cache_compute(key.group());
        let value = compute().await;

        self.store(key, value.as_ref(), policy).await;
        if locked {
            self.release_lock(key).await;
        }

        value
    }

    /// Like [`get_or_compute`](Self::get_or_compute) for fallible sources
    ///
    /// An error is logged and reported as "not found" but nothing is cached,
    /// so the next caller retries the source.
    pub async fn get_or_try_compute<T, E, F, Fut>(
        &self,
        key: &CacheKey,
        policy: &LookupPolicy,
        compute: F,
    ) -> Option<T>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
        E: Display,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<T>, E>>,
    {
        let (lookup, locked) = self.read(key).await;

        match lookup {
            Lookup::Hit(value) => return Some(value),
            Lookup::NegativeHit => return None,
            Lookup::Miss => {}
        }

        record_cache_compute(key.group());

        let value = match compute().await {
            Ok(value) => {
                self.store(key, value.as_ref(), policy).await;
                value
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Lookup source failed, result not cached");
                None
            }
        };

        if locked {
            self.release_lock(key).await;
        }

        value
    }

    /// Deletes the entry and its lock key; returns whether the entry existed
    pub async fn invalidate(&self, key: &CacheKey) -> bool {
        match self.inner.delete(key).await {
            Ok(deleted) => deleted,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Cache delete failed");
                record_store_error("delete");
                false
            }
        }
    }

    async fn release_lock(&self, key: &CacheKey) {
        if let Err(e) = self.inner.release_lock(key).await {
            tracing::debug!(key = %key, error = %e, "Failed to release regeneration lock");
        }
    }
}
