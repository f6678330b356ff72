//! Stampede-less decorator over a cache store

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use super::config::StampedeConfig;
use crate::domain::DomainError;
use crate::domain::cache::{Cache, CacheExt, CacheKey, TtlPolicy};

/// Stored form of a value written through [`StampedelessCache`]
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StampedeEnvelope<T> {
    value: T,
    /// Millis since epoch after which one caller regenerates; 0 = never
    refresh_at_ms: u64,
}

/// Outcome of [`StampedelessCache::fetch`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fetched<V> {
    /// Entry served as stored
    Fresh(V),
    /// Entry is past its refresh point and this caller now holds `{key}_lock`
    Regenerate,
    Missing,
}

impl<V> Fetched<V> {
    pub fn into_option(self) -> Option<V> {
        match self {
            Fetched::Fresh(value) => Some(value),
            Fetched::Regenerate | Fetched::Missing => None,
        }
    }

    /// Whether the caller must release the regeneration lock when done
    pub fn holds_lock(&self) -> bool {
        matches!(self, Fetched::Regenerate)
    }
}

fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Adds randomized expiration and an advisory regeneration lock to a store
///
/// Each entry records a refresh point shortly before its real expiry, never
/// earlier than the entry's base expiration. The first reader past that
/// point that wins the `{key}_lock` key gets a miss and regenerates; everyone
/// else keeps reading the still-valid value. The lock only narrows the window
/// for duplicate work, it does not close it.
#[derive(Debug, Clone)]
pub struct StampedelessCache {
    store: Arc<dyn Cache>,
    config: StampedeConfig,
}

impl StampedelessCache {
    pub fn new(store: Arc<dyn Cache>) -> Self {
        Self::with_config(store, StampedeConfig::default())
    }

    pub fn with_config(store: Arc<dyn Cache>, config: StampedeConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &Arc<dyn Cache> {
        &self.store
    }

    pub fn config(&self) -> &StampedeConfig {
        &self.config
    }

    /// Stores a value for `expiration` plus up to `expiration * jitter_ratio`
    pub async fn set<V>(
        &self,
        key: &CacheKey,
        value: &V,
        expiration: Duration,
    ) -> Result<Duration, DomainError>
    where
        V: Serialize + Send + Sync,
    {
        let policy = TtlPolicy::new(expiration, expiration.mul_f64(self.config.jitter_ratio));
        let ttl = policy.sample();

        self.set_with_refresh_floor(key, value, ttl, expiration).await?;
        Ok(ttl)
    }

    /// Stores a value with an exact TTL; a zero TTL uses the store default
    /// and never triggers early regeneration
    pub async fn set_with_ttl<V>(
        &self,
        key: &CacheKey,
        value: &V,
        ttl: Duration,
    ) -> Result<(), DomainError>
    where
        V: Serialize + Send + Sync,
    {
        self.set_with_refresh_floor(key, value, ttl, Duration::ZERO)
            .await
    }

    /// Stores a value with an exact TTL whose early regeneration starts no
    /// sooner than `floor` after the write
    ///
    /// A floor at or past `ttl` disables early regeneration for the entry.
    pub async fn set_with_refresh_floor<V>(
        &self,
        key: &CacheKey,
        value: &V,
        ttl: Duration,
        floor: Duration,
    ) -> Result<(), DomainError>
    where
        V: Serialize + Send + Sync,
    {
        let envelope = StampedeEnvelope {
            value,
            refresh_at_ms: self.refresh_at_ms(ttl, floor),
        };

        self.store.set(key, &envelope, ttl).await
    }

    fn refresh_at_ms(&self, ttl: Duration, floor: Duration) -> u64 {
        if ttl.is_zero() {
            return 0;
        }

        let early = ttl.mul_f64(self.config.early_refresh_ratio.clamp(0.0, 1.0));
        let refresh_after = ttl.saturating_sub(early).max(floor);

        if refresh_after >= ttl {
            0
        } else {
            now_millis() + refresh_after.as_millis() as u64
        }
    }

    /// Reads a value; `None` also tells the one caller that won the
    /// regeneration lock to recompute
    pub async fn get<V>(&self, key: &CacheKey) -> Result<Option<V>, DomainError>
    where
        V: DeserializeOwned + Send,
    {
        Ok(self.fetch(key).await?.into_option())
    }

    /// Reads a value and reports whether this caller took the regeneration lock
    pub async fn fetch<V>(&self, key: &CacheKey) -> Result<Fetched<V>, DomainError>
    where
        V: DeserializeOwned + Send,
    {
        let envelope: Option<StampedeEnvelope<V>> = self.store.get(key).await?;

        let Some(envelope) = envelope else {
            return Ok(Fetched::Missing);
        };

        let due = envelope.refresh_at_ms != 0 && now_millis() >= envelope.refresh_at_ms;

        if due && self.try_lock(key).await? {
            tracing::debug!(key = %key, "Entry near expiry, regenerating early");
            return Ok(Fetched::Regenerate);
        }

        Ok(Fetched::Fresh(envelope.value))
    }

    /// Reads a value without ever taking the regeneration lock
    pub async fn peek<V>(&self, key: &CacheKey) -> Result<Option<V>, DomainError>
    where
        V: DeserializeOwned + Send,
    {
        let envelope: Option<StampedeEnvelope<V>> = self.store.get(key).await?;
        Ok(envelope.map(|envelope| envelope.value))
    }

    /// Takes the advisory regeneration lock for `key`
    pub async fn try_lock(&self, key: &CacheKey) -> Result<bool, DomainError> {
        self.store
            .set_nx(&key.lock_key(), &now_millis(), self.config.lock_ttl)
            .await
    }

    pub async fn release_lock(&self, key: &CacheKey) -> Result<bool, DomainError> {
        self.store.delete_key(&key.lock_key()).await
    }

    /// Deletes the entry and its lock key; returns whether the entry existed
    pub async fn delete(&self, key: &CacheKey) -> Result<bool, DomainError> {
        let deleted = self.store.delete_key(key).await?;
        self.release_lock(key).await?;
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cache::MockCache;
    use crate::infrastructure::cache::InMemoryCache;

    fn key() -> CacheKey {
        CacheKey::new("posts", "recent")
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let cache = StampedelessCache::new(Arc::new(InMemoryCache::new()));

        cache
            .set(&key(), &vec![1u64, 2, 3], Duration::from_secs(60))
            .await
            .unwrap();

        let value: Option<Vec<u64>> = cache.get(&key()).await.unwrap();
        assert_eq!(value, Some(vec![1, 2, 3]));
    }

    #[tokio::test]
    async fn test_set_applies_bounded_jitter() {
        let store = Arc::new(MockCache::new());
        let config = StampedeConfig::default().with_jitter_ratio(0.5);
        let cache = StampedelessCache::with_config(store.clone(), config);
        let expiration = Duration::from_secs(100);

        for i in 0..50 {
            let key = CacheKey::new("posts", format!("k{}", i));
            let ttl = cache.set(&key, &i, expiration).await.unwrap();

            assert_eq!(store.written_ttl(&key), Some(ttl));
            assert!(ttl >= expiration);
            assert!(ttl <= Duration::from_secs(150));
        }
    }

    #[tokio::test]
    async fn test_single_caller_regenerates_near_expiry() {
        let store: Arc<dyn Cache> = Arc::new(InMemoryCache::new());
        let config = StampedeConfig::default().with_early_refresh_ratio(0.5);
        let cache = StampedelessCache::with_config(store, config);

        cache
            .set_with_ttl(&key(), &"cached", Duration::from_millis(400))
            .await
            .unwrap();

        // Past the refresh point (200ms) but before expiry (400ms)
        tokio::time::sleep(Duration::from_millis(250)).await;

        let first: Option<String> = cache.get(&key()).await.unwrap();
        let second: Option<String> = cache.get(&key()).await.unwrap();
        let third: Option<String> = cache.get(&key()).await.unwrap();

        assert_eq!(first, None);
        assert_eq!(second, Some("cached".to_string()));
        assert_eq!(third, Some("cached".to_string()));
    }

    #[tokio::test]
    async fn test_refresh_waits_for_floor() {
        let store: Arc<dyn Cache> = Arc::new(InMemoryCache::new());
        let config = StampedeConfig::default().with_early_refresh_ratio(0.5);
        let cache = StampedelessCache::with_config(store, config);

        cache
            .set_with_refresh_floor(
                &key(),
                &1u8,
                Duration::from_millis(400),
                Duration::from_millis(300),
            )
            .await
            .unwrap();

        // Past ttl * (1 - ratio) but before the floor
        tokio::time::sleep(Duration::from_millis(250)).await;

        let fetched: Fetched<u8> = cache.fetch(&key()).await.unwrap();
        assert_eq!(fetched, Fetched::Fresh(1));
    }

    #[tokio::test]
    async fn test_regenerate_reports_lock_ownership() {
        let store: Arc<dyn Cache> = Arc::new(InMemoryCache::new());
        let config = StampedeConfig::default().with_early_refresh_ratio(0.5);
        let cache = StampedelessCache::with_config(store, config);

        cache
            .set_with_refresh_floor(
                &key(),
                &1u8,
                Duration::from_millis(400),
                Duration::from_millis(100),
            )
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(250)).await;

        let winner: Fetched<u8> = cache.fetch(&key()).await.unwrap();
        let other: Fetched<u8> = cache.fetch(&key()).await.unwrap();

        assert!(winner.holds_lock());
        assert_eq!(other, Fetched::Fresh(1));
        assert!(!other.holds_lock());
    }

    #[tokio::test]
    async fn test_set_never_refreshes_before_expiration() {
        let store: Arc<dyn Cache> = Arc::new(InMemoryCache::new());
        let config = StampedeConfig::default()
            .with_early_refresh_ratio(0.5)
            .with_jitter_ratio(0.0);
        let cache = StampedelessCache::with_config(store, config);

        cache.set(&key(), &1u8, Duration::from_millis(400)).await.unwrap();

        tokio::time::sleep(Duration::from_millis(250)).await;

        let fetched: Fetched<u8> = cache.fetch(&key()).await.unwrap();
        assert_eq!(fetched, Fetched::Fresh(1));
    }

    #[tokio::test]
    async fn test_peek_ignores_refresh_point() {
        let store = Arc::new(InMemoryCache::new());
        let config = StampedeConfig::default().with_early_refresh_ratio(0.5);
        let cache = StampedelessCache::with_config(store.clone(), config);

        cache
            .set_with_ttl(&key(), &1u8, Duration::from_millis(400))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(250)).await;

        let value: Option<u8> = cache.peek(&key()).await.unwrap();
        assert_eq!(value, Some(1));
        assert!(!store.exists(&key().lock_key().storage_key()).await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_entry_takes_no_lock() {
        let store = Arc::new(MockCache::new());
        let cache = StampedelessCache::new(store.clone());

        let fetched: Fetched<u8> = cache.fetch(&key()).await.unwrap();

        assert_eq!(fetched, Fetched::Missing);
        assert!(store.raw(&key().lock_key()).is_none());
    }

    #[tokio::test]
    async fn test_no_early_refresh_when_disabled() {
        let store: Arc<dyn Cache> = Arc::new(InMemoryCache::new());
        let config = StampedeConfig::default().without_early_refresh();
        let cache = StampedelessCache::with_config(store, config);

        cache
            .set_with_ttl(&key(), &1u8, Duration::from_millis(300))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(150)).await;

        let value: Option<u8> = cache.get(&key()).await.unwrap();
        assert_eq!(value, Some(1));
    }

    #[tokio::test]
    async fn test_delete_removes_lock_key() {
        let store = Arc::new(MockCache::new());
        let cache = StampedelessCache::new(store.clone());

        cache.set(&key(), &1u8, Duration::from_secs(60)).await.unwrap();
        assert!(cache.try_lock(&key()).await.unwrap());
        assert!(store.raw(&key().lock_key()).is_some());

        assert!(cache.delete(&key()).await.unwrap());

        assert!(store.raw(&key()).is_none());
        assert!(store.raw(&key().lock_key()).is_none());
    }

    #[tokio::test]
    async fn test_lock_is_exclusive_until_released() {
        let cache = StampedelessCache::new(Arc::new(InMemoryCache::new()));

        assert!(cache.try_lock(&key()).await.unwrap());
        assert!(!cache.try_lock(&key()).await.unwrap());

        cache.release_lock(&key()).await.unwrap();
        assert!(cache.try_lock(&key()).await.unwrap());
    }

    #[tokio::test]
    async fn test_store_errors_propagate() {
        let cache = StampedelessCache::new(Arc::new(MockCache::new().with_error("down")));

        let result: Result<Option<u8>, _> = cache.get(&key()).await;
        assert!(result.is_err());
    }
}
