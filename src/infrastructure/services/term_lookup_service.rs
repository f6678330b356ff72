//! Cached term lookups by slug or name

use std::sync::Arc;

use crate::domain::DomainError;
use crate::domain::cache::{CacheKey, digest, presets};
use crate::domain::invalidation::{ContentEvent, InvalidationHook};
use crate::domain::lookup::{Term, TermField, TermSource};
use crate::infrastructure::stampede::ReadThroughCache;

/// Cache group for term lookups
pub const TERM_GROUP: &str = "get_term_by";

/// Taxonomy navigation menus are stored in
pub const NAV_MENU_TAXONOMY: &str = "nav_menu";

/// Key for a term looked up by `field`; the value is hashed since names
/// may contain anything
pub fn term_cache_key(field: TermField, value: &str, taxonomy: &str) -> CacheKey {
    CacheKey::new(
        TERM_GROUP,
        format!("{}|{}|{}", field, taxonomy, digest(value)),
    )
}

/// Term lookups with the term id cached per field value
///
/// Only the id is cached. A hit re-reads the full term by id, which the
/// source answers cheaply, so edits to other term fields are never served
/// stale. Lookups by id skip the cache entirely.
#[derive(Clone)]
pub struct TermLookupService {
    cache: ReadThroughCache,
    source: Arc<dyn TermSource>,
}

impl TermLookupService {
    pub fn new(cache: ReadThroughCache, source: Arc<dyn TermSource>) -> Self {
        Self { cache, source }
    }

    pub async fn term_by(&self, field: TermField, value: &str, taxonomy: &str) -> Option<Term> {
        if field == TermField::Id {
            let id = value.trim().parse::<u64>().ok()?;
            return self.load_by_id(id, taxonomy).await;
        }

        let key = term_cache_key(field, value, taxonomy);
        let source = &self.source;
        let mut fetched = None;
        let slot = &mut fetched;

        let term_id = self
            .cache
            .get_or_try_compute(&key, &presets::TERM_BY_FIELD, || async move {
                let term = source.find_term(field, value, taxonomy).await?;
                let id = term.as_ref().map(|t| t.id);
                *slot = term;
                Ok::<_, DomainError>(id)
            })
            .await?;

        match fetched {
            Some(term) => Some(term),
            None => self.load_by_id(term_id, taxonomy).await,
        }
    }

    /// Navigation menu by id, slug or name, tried in that order
    pub async fn nav_menu(&self, menu: &str) -> Option<Term> {
        if menu.trim().is_empty() {
            return None;
        }

        for field in [TermField::Id, TermField::Slug, TermField::Name] {
            if let Some(term) = self.term_by(field, menu, NAV_MENU_TAXONOMY).await {
                return Some(term);
            }
        }

        None
    }

    async fn load_by_id(&self, id: u64, taxonomy: &str) -> Option<Term> {
        match self.source.term_by_id(id, taxonomy).await {
            Ok(term) => term,
            Err(e) => {
                tracing::warn!(term_id = id, taxonomy, error = %e, "Term lookup by id failed");
                None
            }
        }
    }
}

/// Drops the cached slug and name lookups of a saved term
#[derive(Debug, Default)]
pub struct TermCacheInvalidator;

impl InvalidationHook<ContentEvent> for TermCacheInvalidator {
    fn name(&self) -> &str {
        "term_cache"
    }

    fn keys_for(&self, event: &ContentEvent) -> Vec<CacheKey> {
        let ContentEvent::TermSaved { term } = event else {
            return Vec::new();
        };

        TermField::CACHED
            .iter()
            .map(|field| term_cache_key(*field, &term.field_value(*field), &term.taxonomy))
            .collect()
    }
}
