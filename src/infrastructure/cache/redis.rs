//! Redis cache implementation

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};

use crate::domain::DomainError;
use crate::domain::cache::Cache;

/// Configuration for Redis cache
#[derive(Debug, Clone)]
pub struct RedisCacheConfig {
    /// Redis connection URL (e.g., "redis://127.0.0.1:6379")
    pub url: String,
    /// TTL used when a write passes a zero TTL
    pub default_ttl: Duration,
    /// Key prefix for namespacing
    pub key_prefix: Option<String>,
    pub connection_timeout: Duration,
}

impl Default for RedisCacheConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            default_ttl: Duration::from_secs(3600),
            key_prefix: None,
            connection_timeout: Duration::from_secs(5),
        }
    }
}

impl RedisCacheConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    fn prefix_key(&self, key: &str) -> String {
        match &self.key_prefix {
            Some(prefix) => format!("{}:{}", prefix, key),
            None => key.to_string(),
        }
    }

    /// Millisecond TTL sent to Redis; zero maps to the default TTL
    fn ttl_millis(&self, ttl: Duration) -> u64 {
        let ttl = if ttl.is_zero() { self.default_ttl } else { ttl };
        (ttl.as_millis() as u64).max(1)
    }
}

/// Redis cache implementation
///
/// Features:
/// - Millisecond TTLs (`SET PX`), so sub-second jitter survives
/// - Atomic `SET NX PX` for advisory locks
/// - SCAN based pattern deletion
/// - Connection pooling via ConnectionManager
#[derive(Clone)]
pub struct RedisCache {
    connection: ConnectionManager,
    config: RedisCacheConfig,
}

impl fmt::Debug for RedisCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisCache")
            .field("config", &self.config)
            .field("connection", &"<ConnectionManager>")
            .finish()
    }
}

impl RedisCache {
    pub async fn new(config: RedisCacheConfig) -> Result<Self, DomainError> {
        let client = Client::open(config.url.as_str())
            .map_err(|e| DomainError::cache(format!("Failed to create Redis client: {}", e)))?;

        let connection =
            tokio::time::timeout(config.connection_timeout, ConnectionManager::new(client))
                .await
                .map_err(|_| {
                    DomainError::cache(format!(
                        "Timed out connecting to Redis after {:?}",
                        config.connection_timeout
                    ))
                })?
                .map_err(|e| DomainError::cache(format!("Failed to connect to Redis: {}", e)))?;

        tracing::info!(url = %config.url, prefix = ?config.key_prefix, "Connected to Redis cache");

        Ok(Self { connection, config })
    }

    pub async fn with_url(url: impl Into<String>) -> Result<Self, DomainError> {
        Self::new(RedisCacheConfig::new(url)).await
    }

    async fn scan(&self, pattern: &str, batch: usize) -> Result<Vec<String>, DomainError> {
        let mut conn = self.connection.clone();
        let mut cursor = 0u64;
        let mut found = Vec::new();

        loop {
            let (new_cursor, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(batch)
                .query_async(&mut conn)
                .await
                .map_err(|e| {
                    DomainError::cache(format!(
                        "Failed to scan keys with pattern '{}': {}",
                        pattern, e
                    ))
                })?;

            found.extend(keys);
            cursor = new_cursor;

            if cursor == 0 {
                break;
            }
        }

        Ok(found)
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn get_raw(&self, key: &str) -> Result<Option<String>, DomainError> {
        let prefixed_key = self.config.prefix_key(key);
        let mut conn = self.connection.clone();

        conn.get(&prefixed_key)
            .await
            .map_err(|e| DomainError::cache(format!("Failed to get key '{}': {}", key, e)))
    }

    async fn set_raw(&self, key: &str, value: &str, ttl: Duration) -> Result<(), DomainError> {
        let prefixed_key = self.config.prefix_key(key);
        let mut conn = self.connection.clone();

        let _: () = redis::cmd("SET")
            .arg(&prefixed_key)
            .arg(value)
            .arg("PX")
            .arg(self.config.ttl_millis(ttl))
            .query_async(&mut conn)
            .await
            .map_err(|e| DomainError::cache(format!("Failed to set key '{}': {}", key, e)))?;

        Ok(())
    }

    async fn set_nx_raw(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, DomainError> {
        let prefixed_key = self.config.prefix_key(key);
        let mut conn = self.connection.clone();

        let result: Option<String> = redis::cmd("SET")
            .arg(&prefixed_key)
            .arg(value)
            .arg("NX")
            .arg("PX")
            .arg(self.config.ttl_millis(ttl))
            .query_async(&mut conn)
            .await
            .map_err(|e| DomainError::cache(format!("Failed to set_nx key '{}': {}", key, e)))?;

        // "OK" when set, nil when the key already existed
        Ok(result.is_some())
    }

    async fn delete(&self, key: &str) -> Result<bool, DomainError> {
        let prefixed_key = self.config.prefix_key(key);
        let mut conn = self.connection.clone();

        let deleted: i32 = conn
            .del(&prefixed_key)
            .await
            .map_err(|e| DomainError::cache(format!("Failed to delete key '{}': {}", key, e)))?;

        Ok(deleted > 0)
    }

    async fn delete_pattern(&self, pattern: &str) -> Result<usize, DomainError> {
        let keys = self.scan(&self.config.prefix_key(pattern), 100).await?;

        if keys.is_empty() {
            return Ok(0);
        }

        let mut conn = self.connection.clone();
        let deleted: i64 = conn
            .del(&keys)
            .await
            .map_err(|e| DomainError::cache(format!("Failed to delete keys: {}", e)))?;

        Ok(deleted as usize)
    }

    async fn exists(&self, key: &str) -> Result<bool, DomainError> {
        let prefixed_key = self.config.prefix_key(key);
        let mut conn = self.connection.clone();

        conn.exists(&prefixed_key).await.map_err(|e| {
            DomainError::cache(format!("Failed to check existence of key '{}': {}", key, e))
        })
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, DomainError> {
        let prefixed_key = self.config.prefix_key(key);
        let mut conn = self.connection.clone();

        let ttl_ms: i64 = conn
            .pttl(&prefixed_key)
            .await
            .map_err(|e| DomainError::cache(format!("Failed to get TTL for key '{}': {}", key, e)))?;

        // -2 when the key doesn't exist, -1 when it has no TTL
        if ttl_ms < 0 {
            Ok(None)
        } else {
            Ok(Some(Duration::from_millis(ttl_ms as u64)))
        }
    }

    async fn clear(&self) -> Result<(), DomainError> {
        match &self.config.key_prefix {
            Some(_) => {
                self.delete_pattern("*").await?;
            }
            None => {
                let mut conn = self.connection.clone();
                redis::cmd("FLUSHDB")
                    .query_async::<()>(&mut conn)
                    .await
                    .map_err(|e| DomainError::cache(format!("Failed to flush database: {}", e)))?;
            }
        }

        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cache::{CacheExt, CacheKey};

    // Require a running Redis instance: cargo test -- --ignored

    fn get_test_config() -> RedisCacheConfig {
        RedisCacheConfig::new("redis://127.0.0.1:6379")
            .with_key_prefix("stampedeless-test")
            .with_default_ttl(Duration::from_secs(60))
    }

    #[tokio::test]
    #[ignore = "Requires running Redis instance"]
    async fn test_redis_set_and_get() {
        let cache = RedisCache::new(get_test_config()).await.unwrap();
        let key = CacheKey::new("posts", "key1");

        cache
            .set(&key, &"value1", Duration::from_secs(60))
            .await
            .unwrap();

        let result: Option<String> = cache.get(&key).await.unwrap();
        assert_eq!(result, Some("value1".to_string()));

        cache.delete_key(&key).await.unwrap();
    }

    #[tokio::test]
    #[ignore = "Requires running Redis instance"]
    async fn test_redis_set_nx() {
        let cache = RedisCache::new(get_test_config()).await.unwrap();
        let key = CacheKey::new("posts", "nx_key").lock_key();

        assert!(cache.set_nx(&key, &1u8, Duration::from_secs(60)).await.unwrap());
        assert!(!cache.set_nx(&key, &2u8, Duration::from_secs(60)).await.unwrap());

        cache.delete_key(&key).await.unwrap();
    }

    #[tokio::test]
    #[ignore = "Requires running Redis instance"]
    async fn test_redis_millisecond_ttl() {
        let cache = RedisCache::new(get_test_config()).await.unwrap();
        let key = CacheKey::new("posts", "ttl_key");

        cache
            .set(&key, &"value1", Duration::from_millis(61_500))
            .await
            .unwrap();

        let ttl = cache.ttl_of(&key).await.unwrap().unwrap();
        assert!(ttl > Duration::from_secs(60));

        cache.delete_key(&key).await.unwrap();
    }

    #[test]
    fn test_key_prefix() {
        let config = RedisCacheConfig::new("redis://localhost").with_key_prefix("myapp");
        assert_eq!(config.prefix_key("default:abc"), "myapp:default:abc");

        let bare = RedisCacheConfig::new("redis://localhost");
        assert_eq!(bare.prefix_key("default:abc"), "default:abc");
    }

    #[test]
    fn test_zero_ttl_maps_to_default() {
        let config = RedisCacheConfig::default().with_default_ttl(Duration::from_secs(90));

        assert_eq!(config.ttl_millis(Duration::ZERO), 90_000);
        assert_eq!(config.ttl_millis(Duration::from_millis(1500)), 1500);
    }
}
