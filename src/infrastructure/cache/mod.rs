//! Cache infrastructure - store backends

mod factory;
mod in_memory;
mod layered;
mod null;
mod redis;

pub use factory::{CacheConfig, CacheFactory, CacheType};
pub use in_memory::{InMemoryCache, InMemoryCacheConfig};
pub use layered::{LayeredCache, LayeredCacheConfig};
pub use null::NullCache;
pub use redis::{RedisCache, RedisCacheConfig};

use crate::domain::DomainError;

/// Anchored regex for a Redis-style glob (`*` matches any run of characters)
fn glob_regex(pattern: &str) -> Result<regex::Regex, DomainError> {
    let escaped = regex::escape(pattern).replace(r"\*", ".*");

    regex::Regex::new(&format!("^{}$", escaped))
        .map_err(|e| DomainError::cache(format!("Invalid pattern '{}': {}", pattern, e)))
}
