//! Domain layer - cache model, lookup entities and invalidation events

pub mod cache;
pub mod error;
pub mod invalidation;
pub mod lookup;

pub use cache::{
    Cache, CacheExt, CacheKey, CacheKeyGenerator, CacheKeyParams, CachedValue, HashedKeyGenerator,
    Lookup, LookupPolicy, TtlPolicy,
};
pub use error::DomainError;
pub use invalidation::{ContentEvent, HookControl, InvalidationHook};
pub use lookup::{
    AdjacentPostQuery, PageSource, PostCountSource, PostQuerySource, PostSnapshot, Term,
    TermField, TermSource, UrlSource,
};
