//! Invalidation domain - content events and the hooks that map them to keys

use crate::domain::cache::CacheKey;
use crate::domain::lookup::{PostSnapshot, Term};

/// Content mutations that can make cached lookups stale
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentEvent {
    /// A term was created or edited
    TermSaved { term: Term },
    /// A post moved between statuses
    PostStatusChanged {
        post: PostSnapshot,
        old_status: String,
        new_status: String,
    },
    /// A post was updated; `old_slugs` are the slugs it was reachable at
    PostUpdated {
        post: PostSnapshot,
        before: PostSnapshot,
        old_slugs: Vec<String>,
    },
    /// An attachment was deleted
    AttachmentDeleted { attachment_id: u64, url: String },
}

impl ContentEvent {
    /// Label used for logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            ContentEvent::TermSaved { .. } => "term_saved",
            ContentEvent::PostStatusChanged { .. } => "post_status_changed",
            ContentEvent::PostUpdated { .. } => "post_updated",
            ContentEvent::AttachmentDeleted { .. } => "attachment_deleted",
        }
    }
}

/// Whether later hooks in a chain still run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HookControl {
    #[default]
    Continue,
    Stop,
}

/// Maps an event to every cache key derivable from the mutated fields
pub trait InvalidationHook<E>: Send + Sync {
    fn name(&self) -> &str;

    fn keys_for(&self, event: &E) -> Vec<CacheKey>;

    /// Consulted after this hook's keys are deleted
    fn control(&self, _event: &E) -> HookControl {
        HookControl::Continue
    }
}
