//! Cached previous/next post queries

use std::sync::Arc;

use crate::domain::cache::{
    CacheKey, CacheKeyGenerator, CacheKeyParams, HashedKeyGenerator, presets,
};
use crate::domain::lookup::{AdjacentPostQuery, PostQuerySource};
use crate::infrastructure::stampede::ReadThroughCache;

const ADJACENT_POST_KEY_PREFIX: &str = "adjacent_post_";

/// Key derived from every field of the query
pub fn adjacent_post_key(query: &AdjacentPostQuery) -> CacheKey {
    // Serializing a struct of plain fields cannot fail
    let params = CacheKeyParams::from_serializable(query).unwrap_or_default();

    HashedKeyGenerator::new()
        .with_prefix(ADJACENT_POST_KEY_PREFIX)
        .generate_in_group("", &params)
}

/// Adjacent post lookups; misses are kept briefly so new posts show up
/// as neighbours soon after publishing
#[derive(Clone)]
pub struct AdjacentPostService {
    cache: ReadThroughCache,
    source: Arc<dyn PostQuerySource>,
}

impl AdjacentPostService {
    pub fn new(cache: ReadThroughCache, source: Arc<dyn PostQuerySource>) -> Self {
        Self { cache, source }
    }

    pub async fn adjacent_post(&self, query: &AdjacentPostQuery) -> Option<u64> {
        let source = &self.source;

        self.cache
            .get_or_try_compute(&adjacent_post_key(query), &presets::ADJACENT_POST, || async move {
                source.adjacent_post(query).await
            })
            .await
    }
}
