//! Cache factory for runtime selection

use std::sync::Arc;
use std::time::Duration;

use crate::domain::DomainError;
use crate::domain::cache::Cache;

use super::in_memory::{InMemoryCache, InMemoryCacheConfig};
use super::layered::{LayeredCache, LayeredCacheConfig};
use super::null::NullCache;
use super::redis::{RedisCache, RedisCacheConfig};

/// Supported cache backends
#[derive(Debug, Clone, Default, PartialEq)]
pub enum CacheType {
    /// In-memory cache using moka
    #[default]
    InMemory,
    /// Redis cache
    Redis,
    /// Local moka level in front of Redis
    Layered,
    /// Caching disabled
    Null,
}

impl std::fmt::Display for CacheType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheType::InMemory => write!(f, "in_memory"),
            CacheType::Redis => write!(f, "redis"),
            CacheType::Layered => write!(f, "layered"),
            CacheType::Null => write!(f, "null"),
        }
    }
}

impl std::str::FromStr for CacheType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "in_memory" | "inmemory" | "memory" => Ok(CacheType::InMemory),
            "redis" => Ok(CacheType::Redis),
            "layered" => Ok(CacheType::Layered),
            "null" | "none" | "disabled" => Ok(CacheType::Null),
            _ => Err(DomainError::configuration(format!(
                "Unknown cache type: {}. Valid types: in_memory, redis, layered, null",
                s
            ))),
        }
    }
}

/// Configuration for cache factory
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub cache_type: CacheType,
    /// Redis URL (required for Redis and layered types)
    pub redis_url: Option<String>,
    /// Key prefix for namespacing (Redis only)
    pub key_prefix: Option<String>,
    /// TTL used for writes that pass a zero TTL
    pub default_ttl: Duration,
    /// Maximum capacity (in-memory only)
    pub max_capacity: Option<u64>,
    /// Time to idle (in-memory only)
    pub time_to_idle: Option<Duration>,
    /// Capacity of the local level (layered only)
    pub local_capacity: u64,
    /// Local TTL cap (layered only)
    pub local_ttl: Duration,
    /// Fall back to [`NullCache`] when Redis is unreachable
    pub fail_open: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_type: CacheType::InMemory,
            redis_url: None,
            key_prefix: None,
            default_ttl: Duration::from_secs(3600),
            max_capacity: Some(10_000),
            time_to_idle: None,
            local_capacity: 1_000,
            local_ttl: Duration::from_secs(60),
            fail_open: true,
        }
    }
}

impl CacheConfig {
    pub fn in_memory() -> Self {
        Self {
            cache_type: CacheType::InMemory,
            ..Default::default()
        }
    }

    pub fn redis(url: impl Into<String>) -> Self {
        Self {
            cache_type: CacheType::Redis,
            redis_url: Some(url.into()),
            ..Default::default()
        }
    }

    pub fn layered(url: impl Into<String>) -> Self {
        Self {
            cache_type: CacheType::Layered,
            redis_url: Some(url.into()),
            ..Default::default()
        }
    }

    pub fn disabled() -> Self {
        Self {
            cache_type: CacheType::Null,
            ..Default::default()
        }
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    pub fn with_max_capacity(mut self, capacity: u64) -> Self {
        self.max_capacity = Some(capacity);
        self
    }

    pub fn with_time_to_idle(mut self, tti: Duration) -> Self {
        self.time_to_idle = Some(tti);
        self
    }

    pub fn with_fail_open(mut self, fail_open: bool) -> Self {
        self.fail_open = fail_open;
        self
    }
}

/// Factory for creating cache instances
#[derive(Debug, Default)]
pub struct CacheFactory;

impl CacheFactory {
    pub fn new() -> Self {
        Self
    }

    /// Creates a cache instance based on configuration
    pub async fn create(&self, config: &CacheConfig) -> Result<Arc<dyn Cache>, DomainError> {
        let cache: Arc<dyn Cache> = match config.cache_type {
            CacheType::InMemory => self.create_in_memory_with_config(self.in_memory_config(config)),
            CacheType::Null => Arc::new(NullCache::new()),
            CacheType::Redis => match self.connect_redis(config).await {
                Ok(redis) => Arc::new(redis),
                Err(e) => self.fail_open(config, e)?,
            },
            CacheType::Layered => match self.connect_redis(config).await {
                Ok(redis) => {
                    let layered_config = LayeredCacheConfig::default()
                        .with_local_capacity(config.local_capacity)
                        .with_local_ttl(config.local_ttl);
                    Arc::new(LayeredCache::with_config(Arc::new(redis), layered_config))
                }
                Err(e) => self.fail_open(config, e)?,
            },
        };

        tracing::info!(
            requested = %config.cache_type,
            backend = cache.backend_name(),
            "Cache backend created"
        );

        Ok(cache)
    }

    pub fn create_in_memory(&self) -> Arc<dyn Cache> {
        Arc::new(InMemoryCache::new())
    }

    pub fn create_in_memory_with_config(&self, config: InMemoryCacheConfig) -> Arc<dyn Cache> {
        Arc::new(InMemoryCache::with_config(config))
    }

    fn in_memory_config(&self, config: &CacheConfig) -> InMemoryCacheConfig {
        let mut in_memory_config =
            InMemoryCacheConfig::default().with_default_ttl(config.default_ttl);

        if let Some(capacity) = config.max_capacity {
            in_memory_config = in_memory_config.with_max_capacity(capacity);
        }

        if let Some(tti) = config.time_to_idle {
            in_memory_config = in_memory_config.with_time_to_idle(tti);
        }

        in_memory_config
    }

    async fn connect_redis(&self, config: &CacheConfig) -> Result<RedisCache, DomainError> {
        let url = config.redis_url.clone().ok_or_else(|| {
            DomainError::configuration(format!(
                "Redis URL is required for {} cache type",
                config.cache_type
            ))
        })?;

        let mut redis_config = RedisCacheConfig::new(url).with_default_ttl(config.default_ttl);

        if let Some(prefix) = &config.key_prefix {
            redis_config = redis_config.with_key_prefix(prefix.clone());
        }

        RedisCache::new(redis_config).await
    }

    /// Missing configuration is always fatal; an unreachable store is not
    /// when `fail_open` is set.
    fn fail_open(
        &self,
        config: &CacheConfig,
        error: DomainError,
    ) -> Result<Arc<dyn Cache>, DomainError> {
        if !config.fail_open || matches!(error, DomainError::Configuration { .. }) {
            return Err(error);
        }

        tracing::warn!(
            cache_type = %config.cache_type,
            error = %error,
            "Cache store unavailable, continuing without cache"
        );

        Ok(Arc::new(NullCache::new()))
    }
}
