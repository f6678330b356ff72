//! Stampede-less read-through cache
//!
//! A caching facade over a key-value object store with:
//! - Get-or-compute with negative caching of empty results
//! - Randomized TTL jitter so keys written together expire apart
//! - Advisory `{key}_lock` keys so one caller regenerates a hot entry early
//! - Fail-open behavior when the store is unavailable
//! - Ordered invalidation chains driven by content events
//!
//! ```no_run
//! use std::sync::Arc;
//! use stampedeless_cache::domain::cache::{CacheKey, presets};
//! use stampedeless_cache::infrastructure::cache::InMemoryCache;
//! use stampedeless_cache::infrastructure::stampede::{ReadThroughCache, StampedeConfig};
//!
//! # async fn demo() {
//! let cache = ReadThroughCache::new(Arc::new(InMemoryCache::new()), StampedeConfig::default());
//! let key = CacheKey::new("url_to_postid", "home");
//!
//! let id = cache
//!     .get_or_compute(&key, &presets::URL_TO_POST_ID, || async { Some(42u64) })
//!     .await;
//! # let _ = id;
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;
pub use domain::DomainError;
pub use domain::cache::{Cache, CacheExt, CacheKey, CachedValue, Lookup, LookupPolicy, TtlPolicy};
pub use infrastructure::cache::{CacheConfig, CacheFactory, CacheType};
pub use infrastructure::invalidation::{InvalidationChain, InvalidationReport};
pub use infrastructure::stampede::{ReadThroughCache, StampedeConfig, StampedelessCache};
