//! Null cache - stores nothing

use std::time::Duration;

use async_trait::async_trait;

use crate::domain::DomainError;
use crate::domain::cache::Cache;

/// Cache that accepts every write and never returns a value
///
/// Used when caching is disabled or when the configured store could not be
/// reached at startup; every read-through lookup then recomputes.
#[derive(Debug, Clone, Default)]
pub struct NullCache;

impl NullCache {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Cache for NullCache {
    async fn get_raw(&self, _key: &str) -> Result<Option<String>, DomainError> {
        Ok(None)
    }

    async fn set_raw(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<(), DomainError> {
        Ok(())
    }

    // Always "acquired": with no shared store nobody else can hold the lock
    async fn set_nx_raw(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<bool, DomainError> {
        Ok(true)
    }

    async fn delete(&self, _key: &str) -> Result<bool, DomainError> {
        Ok(false)
    }

    async fn delete_pattern(&self, _pattern: &str) -> Result<usize, DomainError> {
        Ok(0)
    }

    async fn exists(&self, _key: &str) -> Result<bool, DomainError> {
        Ok(false)
    }

    async fn ttl(&self, _key: &str) -> Result<Option<Duration>, DomainError> {
        Ok(None)
    }

    async fn clear(&self) -> Result<(), DomainError> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "null"
    }
}
