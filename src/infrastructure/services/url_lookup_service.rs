//! Cached URL to post id resolution

use std::sync::Arc;

use crate::domain::cache::{CacheKey, digest, presets};
use crate::domain::invalidation::{ContentEvent, InvalidationHook};
use crate::domain::lookup::{PUBLISH_STATUS, UrlSource};
use crate::infrastructure::stampede::ReadThroughCache;

pub const URL_GROUP: &str = "url_to_postid";

pub fn url_cache_key(url: &str) -> CacheKey {
    CacheKey::new(URL_GROUP, digest(url))
}

#[derive(Clone)]
pub struct UrlLookupService {
    cache: ReadThroughCache,
    source: Arc<dyn UrlSource>,
}

impl UrlLookupService {
    pub fn new(cache: ReadThroughCache, source: Arc<dyn UrlSource>) -> Self {
        Self { cache, source }
    }

    /// Post id behind a permalink; URLs that resolve to nothing are cached
    /// as not found for as long as hits are
    pub async fn url_to_post_id(&self, url: &str) -> Option<u64> {
        let source = &self.source;

        self.cache
            .get_or_try_compute(&url_cache_key(url), &presets::URL_TO_POST_ID, || async move {
                source.url_to_post_id(url).await
            })
            .await
    }
}

/// Drops the URL lookup of a post's permalink when it enters or leaves
/// the published state
#[derive(Debug, Default)]
pub struct PermalinkInvalidator;

impl InvalidationHook<ContentEvent> for PermalinkInvalidator {
    fn name(&self) -> &str {
        "permalink"
    }

    fn keys_for(&self, event: &ContentEvent) -> Vec<CacheKey> {
        match event {
            ContentEvent::PostStatusChanged {
                post,
                old_status,
                new_status,
            } if old_status == PUBLISH_STATUS || new_status == PUBLISH_STATUS => {
                vec![url_cache_key(&post.permalink)]
            }
            _ => Vec::new(),
        }
    }
}
