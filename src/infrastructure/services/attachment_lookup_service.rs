//! Cached attachment URL to id resolution

use std::sync::Arc;

use crate::domain::DomainError;
use crate::domain::cache::{CacheKey, digest, presets};
use crate::domain::invalidation::{ContentEvent, InvalidationHook};
use crate::domain::lookup::UrlSource;
use crate::infrastructure::stampede::ReadThroughCache;

const ATTACHMENT_KEY_PREFIX: &str = "attachment_url_post_id_";

pub fn attachment_cache_key(url: &str) -> CacheKey {
    CacheKey::in_default_group(format!("{}{}", ATTACHMENT_KEY_PREFIX, digest(url)))
}

/// The URL of the `-scaled` copy generated for large uploads:
/// `dir/name.ext` becomes `dir/name-scaled.ext`
///
/// `None` when the last path segment has no extension.
pub fn scaled_variant(url: &str) -> Option<String> {
    let (dir, file) = url.rsplit_once('/')?;
    let (stem, ext) = file.rsplit_once('.')?;

    if stem.is_empty() || ext.is_empty() {
        return None;
    }

    Some(format!("{}/{}-scaled.{}", dir, stem, ext))
}

#[derive(Clone)]
pub struct AttachmentLookupService {
    cache: ReadThroughCache,
    source: Arc<dyn UrlSource>,
}

impl AttachmentLookupService {
    pub fn new(cache: ReadThroughCache, source: Arc<dyn UrlSource>) -> Self {
        Self { cache, source }
    }

    /// Attachment id for a media URL, falling back to its scaled copy
    pub async fn attachment_url_to_post_id(&self, url: &str) -> Option<u64> {
        self.cache
            .get_or_try_compute(
                &attachment_cache_key(url),
                &presets::ATTACHMENT_URL,
                || self.resolve(url),
            )
            .await
    }

    async fn resolve(&self, url: &str) -> Result<Option<u64>, DomainError> {
        if let Some(id) = self.source.attachment_url_to_post_id(url).await? {
            return Ok(Some(id));
        }

        let Some(scaled) = scaled_variant(url) else {
            return Ok(None);
        };

        tracing::debug!(url, scaled = %scaled, "Retrying attachment lookup with scaled URL");
        self.source.attachment_url_to_post_id(&scaled).await
    }
}

/// Drops the URL lookup of a deleted attachment
#[derive(Debug, Default)]
pub struct AttachmentInvalidator;

impl InvalidationHook<ContentEvent> for AttachmentInvalidator {
    fn name(&self) -> &str {
        "attachment_url"
    }

    fn keys_for(&self, event: &ContentEvent) -> Vec<CacheKey> {
        match event {
            ContentEvent::AttachmentDeleted { url, .. } => vec![attachment_cache_key(url)],
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cache::MockCache;
    use crate::domain::lookup::MockUrlSource;
    use crate::infrastructure::stampede::StampedeConfig;
    use mockall::Sequence;
    use std::time::Duration;

    const URL: &str = "https://example.com/uploads/2024/03/photo.jpg";
    const SCALED: &str = "https://example.com/uploads/2024/03/photo-scaled.jpg";

    #[test]
    fn test_scaled_variant() {
        assert_eq!(scaled_variant(URL).as_deref(), Some(SCALED));
        assert_eq!(
            scaled_variant("https://example.com/archive.tar.gz").as_deref(),
            Some("https://example.com/archive.tar-scaled.gz")
        );
        assert_eq!(scaled_variant("https://example.com/uploads/README"), None);
    }

    #[tokio::test]
    async fn test_falls_back_to_scaled_url() {
        let mut seq = Sequence::new();
        let mut source = MockUrlSource::new();
        source
            .expect_attachment_url_to_post_id()
            .withf(|url| url == URL)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(None));
        source
            .expect_attachment_url_to_post_id()
            .withf(|url| url == SCALED)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(Some(77)));

        let store = Arc::new(MockCache::new());
        let cache = ReadThroughCache::new(store.clone(), StampedeConfig::default());
        let service = AttachmentLookupService::new(cache, Arc::new(source));

        assert_eq!(service.attachment_url_to_post_id(URL).await, Some(77));
        assert_eq!(service.attachment_url_to_post_id(URL).await, Some(77));

        let ttl = store.written_ttl(&attachment_cache_key(URL)).unwrap();
        assert!(ttl >= Duration::from_secs(24 * 3600));
        assert!(ttl <= Duration::from_secs(36 * 3600));
    }

    #[tokio::test]
    async fn test_not_found_uses_negative_ttl() {
        let mut source = MockUrlSource::new();
        source
            .expect_attachment_url_to_post_id()
            .times(2)
            .returning(|_| Ok(None));

        let store = Arc::new(MockCache::new());
        let cache = ReadThroughCache::new(store.clone(), StampedeConfig::default());
        let service = AttachmentLookupService::new(cache, Arc::new(source));

        assert_eq!(service.attachment_url_to_post_id(URL).await, None);
        assert_eq!(service.attachment_url_to_post_id(URL).await, None);

        let ttl = store.written_ttl(&attachment_cache_key(URL)).unwrap();
        assert!(ttl >= Duration::from_secs(12 * 3600));
        assert!(ttl <= Duration::from_secs(16 * 3600));
    }

    #[test]
    fn test_invalidator_targets_deleted_url() {
        let event = ContentEvent::AttachmentDeleted {
            attachment_id: 77,
            url: URL.to_string(),
        };

        assert_eq!(
            AttachmentInvalidator.keys_for(&event),
            vec![attachment_cache_key(URL)]
        );
    }
}
