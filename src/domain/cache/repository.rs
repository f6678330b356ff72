//! Cache store port

use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};

use super::key::CacheKey;
use crate::domain::DomainError;

/// Key-value object cache with TTL support
///
/// Keys are flat storage keys (see [`CacheKey::storage_key`]). Values are
/// JSON strings so the trait stays dyn-compatible; use [`CacheExt`] for
/// typed, group-aware access. A zero TTL means "backend default TTL".
#[async_trait]
pub trait Cache: Send + Sync + Debug {
    /// Gets a raw JSON value
    async fn get_raw(&self, key: &str) -> Result<Option<String>, DomainError>;

    /// Sets a raw JSON value with a TTL
    async fn set_raw(&self, key: &str, value: &str, ttl: Duration) -> Result<(), DomainError>;

    /// Sets a value only if the key doesn't exist
    async fn set_nx_raw(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, DomainError> {
        if self.exists(key).await? {
            Ok(false)
        } else {
            self.set_raw(key, value, ttl).await?;
            Ok(true)
        }
    }

    /// Deletes a value, returning whether it existed
    async fn delete(&self, key: &str) -> Result<bool, DomainError>;

    /// Deletes keys matching a pattern (`*` wildcard)
    async fn delete_pattern(&self, pattern: &str) -> Result<usize, DomainError>;

    async fn exists(&self, key: &str) -> Result<bool, DomainError> {
        Ok(self.get_raw(key).await?.is_some())
    }

    /// Remaining TTL of a key
    async fn ttl(&self, key: &str) -> Result<Option<Duration>, DomainError>;

    async fn clear(&self) -> Result<(), DomainError>;

    /// Drops state held only by this process; shared entries are untouched
    async fn reset_local(&self) -> Result<(), DomainError> {
        Ok(())
    }

    /// Backend name for logs
    fn backend_name(&self) -> &'static str;
}

/// Typed, group-aware operations over any [`Cache`]
pub trait CacheExt: Cache {
    fn get<'a, V>(
        &'a self,
        key: &'a CacheKey,
    ) -> impl std::future::Future<Output = Result<Option<V>, DomainError>> + Send
    where
        V: DeserializeOwned + Send,
    {
        async move {
            match self.get_raw(&key.storage_key()).await? {
                Some(data) => {
                    let value: V = serde_json::from_str(&data).map_err(|e| {
                        DomainError::serialization(format!(
                            "Failed to deserialize cache value for '{}': {}",
                            key, e
                        ))
                    })?;
                    Ok(Some(value))
                }
                None => Ok(None),
            }
        }
    }

    fn set<'a, V>(
        &'a self,
        key: &'a CacheKey,
        value: &'a V,
        ttl: Duration,
    ) -> impl std::future::Future<Output = Result<(), DomainError>> + Send
    where
        V: Serialize + Send + Sync,
    {
        async move {
            let data = serde_json::to_string(value).map_err(|e| {
                DomainError::serialization(format!("Failed to serialize cache value: {}", e))
            })?;
            self.set_raw(&key.storage_key(), &data, ttl).await
        }
    }

    fn set_nx<'a, V>(
        &'a self,
        key: &'a CacheKey,
        value: &'a V,
        ttl: Duration,
    ) -> impl std::future::Future<Output = Result<bool, DomainError>> + Send
    where
        V: Serialize + Send + Sync,
    {
        async move {
            let data = serde_json::to_string(value).map_err(|e| {
                DomainError::serialization(format!("Failed to serialize cache value: {}", e))
            })?;
            self.set_nx_raw(&key.storage_key(), &data, ttl).await
        }
    }

    fn delete_key<'a>(
        &'a self,
        key: &'a CacheKey,
    ) -> impl std::future::Future<Output = Result<bool, DomainError>> + Send {
        async move { self.delete(&key.storage_key()).await }
    }

    fn ttl_of<'a>(
        &'a self,
        key: &'a CacheKey,
    ) -> impl std::future::Future<Output = Result<Option<Duration>, DomainError>> + Send {
        async move { self.ttl(&key.storage_key()).await }
    }
}

impl<T: Cache + ?Sized> CacheExt for T {}
