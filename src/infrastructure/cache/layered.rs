//! Two-level cache: process-local L1 in front of a shared L2

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::in_memory::{InMemoryCache, InMemoryCacheConfig};
use crate::domain::DomainError;
use crate::domain::cache::Cache;

/// Configuration for the local level of a [`LayeredCache`]
#[derive(Debug, Clone)]
pub struct LayeredCacheConfig {
    /// Maximum number of locally held entries
    pub local_capacity: u64,
    /// Upper bound on how long a value is served locally without asking L2
    pub local_ttl: Duration,
}

impl Default for LayeredCacheConfig {
    fn default() -> Self {
        Self {
            local_capacity: 1_000,
            local_ttl: Duration::from_secs(60),
        }
    }
}

impl LayeredCacheConfig {
    pub fn with_local_capacity(mut self, capacity: u64) -> Self {
        self.local_capacity = capacity;
        self
    }

    pub fn with_local_ttl(mut self, ttl: Duration) -> Self {
        self.local_ttl = ttl;
        self
    }
}

/// Reads fill L1 from L2; writes and deletes go to both levels
///
/// `set_nx` (advisory locks) always goes to L2 only, since a lock held
/// locally means nothing to other processes.
#[derive(Debug)]
pub struct LayeredCache {
    local: InMemoryCache,
    remote: Arc<dyn Cache>,
    config: LayeredCacheConfig,
}

impl LayeredCache {
    pub fn new(remote: Arc<dyn Cache>) -> Self {
        Self::with_config(remote, LayeredCacheConfig::default())
    }

    pub fn with_config(remote: Arc<dyn Cache>, config: LayeredCacheConfig) -> Self {
        let local = InMemoryCache::with_config(
            InMemoryCacheConfig::default()
                .with_max_capacity(config.local_capacity)
                .with_default_ttl(config.local_ttl),
        );

        Self {
            local,
            remote,
            config,
        }
    }

    fn local_ttl(&self, ttl: Duration) -> Duration {
        if ttl.is_zero() {
            self.config.local_ttl
        } else {
            ttl.min(self.config.local_ttl)
        }
    }
}

#[async_trait]
impl Cache for LayeredCache {
    async fn get_raw(&self, key: &str) -> Result<Option<String>, DomainError> {
        if let Some(value) = self.local.get_raw(key).await? {
            return Ok(Some(value));
        }

        let Some(data) = self.remote.get_raw(key).await? else {
            return Ok(None);
        };

        // L1 never outlives the L2 entry; unknown remaining time skips the fill
        match self.remote.ttl(key).await {
            Ok(Some(remaining)) if !remaining.is_zero() => {
                let ttl = remaining.min(self.config.local_ttl);
                self.local.set_raw(key, &data, ttl).await?;
            }
            _ => {}
        }

        Ok(Some(data))
    }

    async fn set_raw(&self, key: &str, value: &str, ttl: Duration) -> Result<(), DomainError> {
        self.remote.set_raw(key, value, ttl).await?;
        self.local.set_raw(key, value, self.local_ttl(ttl)).await
    }

    async fn set_nx_raw(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, DomainError> {
        let acquired = self.remote.set_nx_raw(key, value, ttl).await?;
        self.local.delete(key).await?;
        Ok(acquired)
    }

    async fn delete(&self, key: &str) -> Result<bool, DomainError> {
        let local = self.local.delete(key).await?;
        let remote = self.remote.delete(key).await?;
        Ok(local || remote)
    }

    async fn delete_pattern(&self, pattern: &str) -> Result<usize, DomainError> {
        self.local.delete_pattern(pattern).await?;
        self.remote.delete_pattern(pattern).await
    }

    async fn exists(&self, key: &str) -> Result<bool, DomainError> {
        if self.local.exists(key).await? {
            return Ok(true);
        }

        self.remote.exists(key).await
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, DomainError> {
        self.remote.ttl(key).await
    }

    async fn clear(&self) -> Result<(), DomainError> {
        self.local.clear().await?;
        self.remote.clear().await
    }

    /// Drops every locally held entry without touching L2
    async fn reset_local(&self) -> Result<(), DomainError> {
        tracing::debug!(remote = self.remote.backend_name(), "Resetting local cache level");
        self.local.clear().await
    }

    fn backend_name(&self) -> &'static str {
        "layered"
    }
}
