//! In-memory cache implementation using moka

use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::Expiry;
use moka::future::Cache as MokaCache;

use super::glob_regex;
use crate::domain::DomainError;
use crate::domain::cache::Cache;

/// Configuration for in-memory cache
#[derive(Debug, Clone)]
pub struct InMemoryCacheConfig {
    /// Maximum number of entries
    pub max_capacity: u64,
    /// TTL used when a write passes a zero TTL
    pub default_ttl: Duration,
    /// Entries not accessed for this duration are evicted
    pub time_to_idle: Option<Duration>,
}

impl Default for InMemoryCacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: 10_000,
            default_ttl: Duration::from_secs(3600),
            time_to_idle: None,
        }
    }
}

impl InMemoryCacheConfig {
    pub fn with_max_capacity(mut self, capacity: u64) -> Self {
        self.max_capacity = capacity;
        self
    }

    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    pub fn with_time_to_idle(mut self, tti: Duration) -> Self {
        self.time_to_idle = Some(tti);
        self
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    /// Serialized JSON value
    data: String,
    ttl: Duration,
    /// Expiration timestamp (millis since epoch)
    expires_at: u64,
}

/// Per-entry expiry so each write keeps its own (jittered) TTL
struct EntryExpiry;

impl Expiry<String, CacheEntry> for EntryExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CacheEntry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &CacheEntry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// Thread-safe in-memory object cache
///
/// Features:
/// - TTL per entry
/// - Capacity-bounded eviction
/// - Atomic set-if-absent through moka's entry API
#[derive(Debug, Clone)]
pub struct InMemoryCache {
    cache: MokaCache<String, CacheEntry>,
    config: InMemoryCacheConfig,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::with_config(InMemoryCacheConfig::default())
    }

    pub fn with_config(config: InMemoryCacheConfig) -> Self {
        let mut builder = MokaCache::builder()
            .max_capacity(config.max_capacity)
            .expire_after(EntryExpiry);

        if let Some(tti) = config.time_to_idle {
            builder = builder.time_to_idle(tti);
        }

        Self {
            cache: builder.build(),
            config,
        }
    }

    fn current_time_millis() -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }

    fn is_expired(entry: &CacheEntry) -> bool {
        Self::current_time_millis() >= entry.expires_at
    }

    fn entry(&self, value: &str, ttl: Duration) -> CacheEntry {
        let ttl = if ttl.is_zero() {
            self.config.default_ttl
        } else {
            ttl
        };

        CacheEntry {
            data: value.to_string(),
            ttl,
            expires_at: Self::current_time_millis() + ttl.as_millis() as u64,
        }
    }

    async fn live_entry(&self, key: &str) -> Option<CacheEntry> {
        let entry = self.cache.get(key).await?;

        if Self::is_expired(&entry) {
            self.cache.remove(key).await;
            return None;
        }

        Some(entry)
    }
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Cache for InMemoryCache {
    async fn get_raw(&self, key: &str) -> Result<Option<String>, DomainError> {
        Ok(self.live_entry(key).await.map(|entry| entry.data))
    }

    async fn set_raw(&self, key: &str, value: &str, ttl: Duration) -> Result<(), DomainError> {
        let entry = self.entry(value, ttl);
        self.cache.insert(key.to_string(), entry).await;
        Ok(())
    }

    async fn set_nx_raw(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, DomainError> {
        // Clears a logically expired entry so the insert below can win
        self.live_entry(key).await;

        let entry = self.entry(value, ttl);
        let stored = self
            .cache
            .entry(key.to_string())
            .or_insert_with(async move { entry })
            .await;

        Ok(stored.is_fresh())
    }

    async fn delete(&self, key: &str) -> Result<bool, DomainError> {
        let existed = self.live_entry(key).await.is_some();
        self.cache.remove(key).await;
        Ok(existed)
    }

    async fn delete_pattern(&self, pattern: &str) -> Result<usize, DomainError> {
        let regex = glob_regex(pattern)?;

        self.cache.run_pending_tasks().await;

        let keys_to_delete: Vec<String> = self
            .cache
            .iter()
            .filter(|(k, _)| regex.is_match(k.as_str()))
            .map(|(k, _)| k.to_string())
            .collect();

        let mut deleted = 0;

        for key in keys_to_delete {
            if self.cache.remove(&key).await.is_some() {
                deleted += 1;
            }
        }

        Ok(deleted)
    }

    async fn exists(&self, key: &str) -> Result<bool, DomainError> {
        Ok(self.live_entry(key).await.is_some())
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, DomainError> {
        Ok(self.live_entry(key).await.map(|entry| {
            let now = Self::current_time_millis();
            Duration::from_millis(entry.expires_at.saturating_sub(now))
        }))
    }

    async fn clear(&self) -> Result<(), DomainError> {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "in_memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cache::{CacheExt, CacheKey};

    fn key(name: &str) -> CacheKey {
        CacheKey::new("test", name)
    }

    #[tokio::test]
    async fn test_set_and_get() {
        let cache = InMemoryCache::new();

        cache
            .set(&key("key1"), &"value1", Duration::from_secs(60))
            .await
            .unwrap();

        let result: Option<String> = cache.get(&key("key1")).await.unwrap();
        assert_eq!(result, Some("value1".to_string()));
    }

    #[tokio::test]
    async fn test_get_missing() {
        let cache = InMemoryCache::new();

        let result: Option<String> = cache.get(&key("missing")).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_delete() {
        let cache = InMemoryCache::new();

        cache
            .set(&key("key1"), &"value1", Duration::from_secs(60))
            .await
            .unwrap();

        assert!(cache.delete_key(&key("key1")).await.unwrap());
        assert!(!cache.delete_key(&key("key1")).await.unwrap());

        let result: Option<String> = cache.get(&key("key1")).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_ttl_expiration() {
        let cache = InMemoryCache::new();

        cache
            .set(&key("key1"), &"value1", Duration::from_millis(50))
            .await
            .unwrap();

        assert!(cache.exists(&key("key1").storage_key()).await.unwrap());

        tokio::time::sleep(Duration::from_millis(100)).await;

        let result: Option<String> = cache.get(&key("key1")).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_long_ttl_outlives_default_ttl() {
        let config = InMemoryCacheConfig::default().with_default_ttl(Duration::from_millis(50));
        let cache = InMemoryCache::with_config(config);

        cache
            .set(&key("long"), &1u32, Duration::from_secs(60))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;

        let result: Option<u32> = cache.get(&key("long")).await.unwrap();
        assert_eq!(result, Some(1));
    }

    #[tokio::test]
    async fn test_zero_ttl_uses_default() {
        let config = InMemoryCacheConfig::default().with_default_ttl(Duration::from_secs(120));
        let cache = InMemoryCache::with_config(config);

        cache.set(&key("k"), &1u32, Duration::ZERO).await.unwrap();

        let remaining = cache.ttl_of(&key("k")).await.unwrap().unwrap();
        assert!(remaining > Duration::from_secs(110));
        assert!(remaining <= Duration::from_secs(120));
    }

    #[tokio::test]
    async fn test_ttl_remaining() {
        let cache = InMemoryCache::new();

        cache
            .set(&key("key1"), &"value1", Duration::from_secs(60))
            .await
            .unwrap();

        let remaining = cache.ttl_of(&key("key1")).await.unwrap().unwrap();
        assert!(remaining.as_secs() > 50 && remaining.as_secs() <= 60);
    }

    #[tokio::test]
    async fn test_set_nx() {
        let cache = InMemoryCache::new();

        assert!(
            cache
                .set_nx(&key("key1"), &"value1", Duration::from_secs(60))
                .await
                .unwrap()
        );
        assert!(
            !cache
                .set_nx(&key("key1"), &"value2", Duration::from_secs(60))
                .await
                .unwrap()
        );

        let value: Option<String> = cache.get(&key("key1")).await.unwrap();
        assert_eq!(value, Some("value1".to_string()));
    }

    #[tokio::test]
    async fn test_set_nx_after_expiry() {
        let cache = InMemoryCache::new();

        cache
            .set_nx(&key("lock"), &1u8, Duration::from_millis(30))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(80)).await;

        assert!(
            cache
                .set_nx(&key("lock"), &2u8, Duration::from_secs(60))
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_clear() {
        let cache = InMemoryCache::new();

        cache.set(&key("a"), &1u8, Duration::from_secs(60)).await.unwrap();
        cache.set(&key("b"), &2u8, Duration::from_secs(60)).await.unwrap();

        cache.clear().await.unwrap();

        assert!(!cache.exists(&key("a").storage_key()).await.unwrap());
        assert!(!cache.exists(&key("b").storage_key()).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_pattern() {
        let cache = InMemoryCache::new();

        for name in ["user:1:profile", "user:2:profile", "other:key"] {
            cache
                .set_raw(name, "\"data\"", Duration::from_secs(60))
                .await
                .unwrap();
        }

        let deleted = cache.delete_pattern("user:*:profile").await.unwrap();
        assert_eq!(deleted, 2);

        assert!(cache.exists("other:key").await.unwrap());
        assert!(!cache.exists("user:1:profile").await.unwrap());
    }

    #[tokio::test]
    async fn test_config() {
        let config = InMemoryCacheConfig::default()
            .with_max_capacity(100)
            .with_default_ttl(Duration::from_secs(300))
            .with_time_to_idle(Duration::from_secs(60));

        let cache = InMemoryCache::with_config(config);

        assert_eq!(cache.config.max_capacity, 100);
        assert_eq!(cache.config.default_ttl, Duration::from_secs(300));
        assert_eq!(cache.config.time_to_idle, Some(Duration::from_secs(60)));
    }
}
