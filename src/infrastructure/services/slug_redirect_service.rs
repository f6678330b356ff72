//! Cached redirects for retired post slugs

use std::sync::Arc;

use crate::domain::cache::{CacheKey, presets};
use crate::domain::invalidation::{ContentEvent, InvalidationHook};
use crate::domain::lookup::PostQuerySource;
use crate::infrastructure::stampede::ReadThroughCache;

/// Request paths that embed a full URL; crawlers generate these and they
/// never match a retired slug
const URL_IN_PATH_PREFIXES: [&str; 2] = ["/http:", "/https:"];

pub fn old_slug_cache_key(slug: &str) -> CacheKey {
    CacheKey::in_default_group(format!("old_slug{}", slug))
}

/// Whether a request should skip the old-slug lookup altogether
pub fn skips_old_slug_lookup(request_path: &str) -> bool {
    URL_IN_PATH_PREFIXES
        .iter()
        .any(|prefix| request_path.starts_with(prefix))
}

#[derive(Clone)]
pub struct SlugRedirectService {
    cache: ReadThroughCache,
    source: Arc<dyn PostQuerySource>,
}

impl SlugRedirectService {
    pub fn new(cache: ReadThroughCache, source: Arc<dyn PostQuerySource>) -> Self {
        Self { cache, source }
    }

    /// Where a request for a missing `slug` should be redirected, if the
    /// slug used to belong to a post
    pub async fn redirect_for(&self, request_path: &str, slug: &str) -> Option<String> {
        if skips_old_slug_lookup(request_path) {
            tracing::debug!(request_path, "Skipping old slug lookup for URL-like path");
            return None;
        }

        let source = &self.source;

        self.cache
            .get_or_try_compute(&old_slug_cache_key(slug), &presets::OLD_SLUG_REDIRECT, || async move {
                source.old_slug_redirect(slug).await
            })
            .await
    }
}

/// Drops redirect lookups for every slug a post was or now is reachable at
///
/// Only runs when the slug or date changed, for posts that are publicly
/// visible and not hierarchical.
#[derive(Debug, Default)]
pub struct OldSlugInvalidator;

impl InvalidationHook<ContentEvent> for OldSlugInvalidator {
    fn name(&self) -> &str {
        "old_slug"
    }

    fn keys_for(&self, event: &ContentEvent) -> Vec<CacheKey> {
        let ContentEvent::PostUpdated {
            post,
            before,
            old_slugs,
        } = event
        else {
            return Vec::new();
        };

        if post.slug == before.slug && post.date == before.date {
            return Vec::new();
        }

        if !post.is_publicly_visible() || post.hierarchical {
            return Vec::new();
        }

        old_slugs
            .iter()
            .chain(std::iter::once(&post.slug))
            .map(|slug| old_slug_cache_key(slug))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::lookup::{MockPostQuerySource, PostSnapshot};
    use crate::infrastructure::cache::InMemoryCache;
    use crate::infrastructure::stampede::StampedeConfig;

    fn service(source: MockPostQuerySource) -> SlugRedirectService {
        let cache = ReadThroughCache::new(Arc::new(InMemoryCache::new()), StampedeConfig::default());
        SlugRedirectService::new(cache, Arc::new(source))
    }

    fn post(slug: &str, status: &str) -> PostSnapshot {
        PostSnapshot {
            id: 40,
            post_type: "post".to_string(),
            slug: slug.to_string(),
            title: slug.to_string(),
            path: slug.to_string(),
            status: status.to_string(),
            date: "2024-03-01 10:00:00".to_string(),
            permalink: format!("https://example.com/{}/", slug),
            hierarchical: false,
        }
    }

    fn updated(post: PostSnapshot, before: PostSnapshot) -> ContentEvent {
        ContentEvent::PostUpdated {
            post,
            before,
            old_slugs: vec!["first-title".to_string(), "second-title".to_string()],
        }
    }

    #[test]
    fn test_skips_url_like_paths() {
        assert!(skips_old_slug_lookup("/http://spam.example/x"));
        assert!(skips_old_slug_lookup("/https:/spam.example/x"));
        assert!(!skips_old_slug_lookup("/2024/03/hello/"));
    }

    #[tokio::test]
    async fn test_redirect_is_cached() {
        let mut source = MockPostQuerySource::new();
        source
            .expect_old_slug_redirect()
            .withf(|slug| slug == "first-title")
            .times(1)
            .returning(|_| Ok(Some("https://example.com/hello/".to_string())));

        let service = service(source);

        for _ in 0..2 {
            assert_eq!(
                service.redirect_for("/first-title/", "first-title").await,
                Some("https://example.com/hello/".to_string())
            );
        }
    }

    #[tokio::test]
    async fn test_url_like_path_never_queries() {
        let mut source = MockPostQuerySource::new();
        source.expect_old_slug_redirect().never();

        let service = service(source);

        assert!(
            service
                .redirect_for("/https://spam.example/", "spam")
                .await
                .is_none()
        );
    }

    #[test]
    fn test_invalidator_on_slug_change() {
        let event = updated(post("hello", "publish"), post("first-title", "publish"));
        let keys = OldSlugInvalidator.keys_for(&event);

        assert_eq!(
            keys,
            vec![
                old_slug_cache_key("first-title"),
                old_slug_cache_key("second-title"),
                old_slug_cache_key("hello"),
            ]
        );
    }

    #[test]
    fn test_invalidator_skips_unchanged_or_private_posts() {
        let unchanged = updated(post("hello", "publish"), post("hello", "publish"));
        assert!(OldSlugInvalidator.keys_for(&unchanged).is_empty());

        let draft = updated(post("hello", "draft"), post("first-title", "draft"));
        assert!(OldSlugInvalidator.keys_for(&draft).is_empty());

        let mut page = post("about", "publish");
        page.hierarchical = true;
        let hierarchical = updated(page, post("about-us", "publish"));
        assert!(OldSlugInvalidator.keys_for(&hierarchical).is_empty());
    }
}
