//! Observability infrastructure - cache metrics

mod metrics;

pub use self::metrics::{
    record_cache_compute, record_cache_lookup, record_invalidation, record_store_error,
};
