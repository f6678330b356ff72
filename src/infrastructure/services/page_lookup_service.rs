//! Cached page lookups by title and by path

use std::sync::Arc;

use crate::domain::cache::{CacheKey, presets};
use crate::domain::invalidation::{ContentEvent, InvalidationHook};
use crate::domain::lookup::{PUBLISH_STATUS, PageSource, PostSnapshot, sanitize_key};
use crate::infrastructure::stampede::ReadThroughCache;

pub const PAGE_BY_TITLE_GROUP: &str = "get_page_by_title";
pub const PAGE_BY_PATH_GROUP: &str = "get_page_by_path";

/// `{post_type}_{sanitized title}` in the title group
pub fn page_by_title_key(title: &str, post_type: &str) -> CacheKey {
    CacheKey::new(
        PAGE_BY_TITLE_GROUP,
        format!("{}_{}", post_type, sanitize_key(title)),
    )
}

/// `{post_type}_{sanitized path}` in the path group
pub fn page_by_path_key(path: &str, post_type: &str) -> CacheKey {
    CacheKey::new(
        PAGE_BY_PATH_GROUP,
        format!("{}_{}", post_type, sanitize_key(path)),
    )
}

#[derive(Clone)]
pub struct PageLookupService {
    cache: ReadThroughCache,
    source: Arc<dyn PageSource>,
}

impl PageLookupService {
    pub fn new(cache: ReadThroughCache, source: Arc<dyn PageSource>) -> Self {
        Self { cache, source }
    }

    pub async fn page_by_title(&self, title: &str, post_type: &str) -> Option<u64> {
        let source = &self.source;

        self.cache
            .get_or_try_compute(
                &page_by_title_key(title, post_type),
                &presets::PAGE_LOOKUP,
                || async move { source.page_by_title(title, post_type).await },
            )
            .await
    }

    pub async fn page_by_path(&self, path: &str, post_type: &str) -> Option<u64> {
        let source = &self.source;

        self.cache
            .get_or_try_compute(
                &page_by_path_key(path, post_type),
                &presets::PAGE_LOOKUP,
                || async move { source.page_by_path(path, post_type).await },
            )
            .await
    }
}

/// The post of a status change that enters or leaves `publish`
fn publish_transition(event: &ContentEvent) -> Option<&PostSnapshot> {
    match event {
        ContentEvent::PostStatusChanged {
            post,
            old_status,
            new_status,
        } if old_status == PUBLISH_STATUS || new_status == PUBLISH_STATUS => Some(post),
        _ => None,
    }
}

/// Drops the title lookup of a page entering or leaving `publish`
#[derive(Debug, Default)]
pub struct PageByTitleInvalidator;

impl InvalidationHook<ContentEvent> for PageByTitleInvalidator {
    fn name(&self) -> &str {
        "page_by_title"
    }

    fn keys_for(&self, event: &ContentEvent) -> Vec<CacheKey> {
        publish_transition(event)
            .map(|post| vec![page_by_title_key(&post.title, &post.post_type)])
            .unwrap_or_default()
    }
}

/// Drops the path lookup of a page entering or leaving `publish`
#[derive(Debug, Default)]
pub struct PageByPathInvalidator;

impl InvalidationHook<ContentEvent> for PageByPathInvalidator {
    fn name(&self) -> &str {
        "page_by_path"
    }

    fn keys_for(&self, event: &ContentEvent) -> Vec<CacheKey> {
        publish_transition(event)
            .map(|post| vec![page_by_path_key(&post.path, &post.post_type)])
            .unwrap_or_default()
    }
}
