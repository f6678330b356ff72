//! Cache domain - store port, key derivation, sentinels and TTL policies

mod key;
mod repository;
mod ttl;
mod value;

pub use key::{
    CacheKey, CacheKeyGenerator, CacheKeyParams, DEFAULT_GROUP, HashedKeyGenerator,
    PlainKeyGenerator, digest, digest_json,
};
pub use repository::{Cache, CacheExt};
pub use ttl::{LookupPolicy, TtlPolicy, jitter, presets};
pub use value::{CachedValue, Lookup};

#[cfg(test)]
pub use repository::mock::MockCache;
