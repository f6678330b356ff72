//! Infrastructure services - cached lookups and their invalidation hooks

mod adjacent_post_service;
mod attachment_lookup_service;
mod page_lookup_service;
mod post_count_service;
mod slug_redirect_service;
mod term_lookup_service;
mod url_lookup_service;

use std::sync::Arc;

pub use adjacent_post_service::{AdjacentPostService, adjacent_post_key};
pub use attachment_lookup_service::{
    AttachmentInvalidator, AttachmentLookupService, attachment_cache_key, scaled_variant,
};
pub use page_lookup_service::{
    PAGE_BY_PATH_GROUP, PAGE_BY_TITLE_GROUP, PageByPathInvalidator, PageByTitleInvalidator,
    PageLookupService, page_by_path_key, page_by_title_key,
};
pub use post_count_service::{PostCountService, USER_POSTS_COUNT_GROUP, user_posts_count_key};
pub use slug_redirect_service::{
    OldSlugInvalidator, SlugRedirectService, old_slug_cache_key, skips_old_slug_lookup,
};
pub use term_lookup_service::{
    NAV_MENU_TAXONOMY, TERM_GROUP, TermCacheInvalidator, TermLookupService, term_cache_key,
};
pub use url_lookup_service::{PermalinkInvalidator, URL_GROUP, UrlLookupService, url_cache_key};

use crate::domain::invalidation::ContentEvent;
use crate::infrastructure::invalidation::InvalidationChain;
use crate::infrastructure::stampede::StampedelessCache;

/// Priority of the default hooks
pub const DEFAULT_HOOK_PRIORITY: i32 = 10;

/// Old-slug flushing runs after the other post hooks
pub const OLD_SLUG_HOOK_PRIORITY: i32 = 13;

/// Chain with every lookup's invalidation hook registered
pub fn default_invalidation_chain(cache: StampedelessCache) -> InvalidationChain<ContentEvent> {
    InvalidationChain::new(cache)
        .with_hook(DEFAULT_HOOK_PRIORITY, Arc::new(TermCacheInvalidator))
        .with_hook(DEFAULT_HOOK_PRIORITY, Arc::new(PageByTitleInvalidator))
        .with_hook(DEFAULT_HOOK_PRIORITY, Arc::new(PageByPathInvalidator))
        .with_hook(DEFAULT_HOOK_PRIORITY, Arc::new(PermalinkInvalidator))
        .with_hook(DEFAULT_HOOK_PRIORITY, Arc::new(AttachmentInvalidator))
        .with_hook(OLD_SLUG_HOOK_PRIORITY, Arc::new(OldSlugInvalidator))
}
