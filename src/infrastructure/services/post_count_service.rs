//! Cached author post counts

use std::sync::Arc;

use crate::domain::cache::{CacheKey, digest_json, presets};
use crate::domain::lookup::PostCountSource;
use crate::infrastructure::stampede::ReadThroughCache;

pub const USER_POSTS_COUNT_GROUP: &str = "user_posts_count";

/// Key for a count; public-only counts get their own key
pub fn user_posts_count_key(user_id: u64, post_types: &[String], public_only: bool) -> CacheKey {
    let mut key = format!("vip_{}_{}", digest_json(post_types), user_id);

    if public_only {
        key.push_str("_public");
    }

    CacheKey::new(USER_POSTS_COUNT_GROUP, key)
}

#[derive(Clone)]
pub struct PostCountService {
    cache: ReadThroughCache,
    source: Arc<dyn PostCountSource>,
}

impl PostCountService {
    pub fn new(cache: ReadThroughCache, source: Arc<dyn PostCountSource>) -> Self {
        Self { cache, source }
    }

    /// Number of posts of the given types written by `user_id`
    ///
    /// User id 0 is never a real author and counts 0 without a lookup. A
    /// failing source also counts 0 and is retried on the next call.
    pub async fn count_user_posts(
        &self,
        user_id: u64,
        post_types: &[String],
        public_only: bool,
    ) -> u64 {
        if user_id == 0 {
            return 0;
        }

        let key = user_posts_count_key(user_id, post_types, public_only);
        let source = &self.source;

        self.cache
            .get_or_try_compute(&key, &presets::USER_POSTS_COUNT, || async move {
                source
                    .count_user_posts(user_id, post_types, public_only)
                    .await
                    .map(Some)
            })
            .await
            .unwrap_or(0)
    }
}
