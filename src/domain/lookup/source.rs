//! Uncached data sources the lookups sit in front of

use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

use super::types::{AdjacentPostQuery, Term, TermField};
use crate::domain::DomainError;

/// Term storage
#[cfg_attr(test, automock)]
#[async_trait]
pub trait TermSource: Send + Sync {
    /// Finds a term by field value
    async fn find_term(
        &self,
        field: TermField,
        value: &str,
        taxonomy: &str,
    ) -> Result<Option<Term>, DomainError>;

    /// Loads a term by id; id lookups are cheap and never cached here
    async fn term_by_id(&self, id: u64, taxonomy: &str) -> Result<Option<Term>, DomainError>;
}

/// Resolves public URLs to post ids
#[cfg_attr(test, automock)]
#[async_trait]
pub trait UrlSource: Send + Sync {
    /// Post id a permalink points at
    async fn url_to_post_id(&self, url: &str) -> Result<Option<u64>, DomainError>;

    /// Attachment id a media file URL belongs to
    async fn attachment_url_to_post_id(&self, url: &str) -> Result<Option<u64>, DomainError>;
}

/// Author post counts
#[cfg_attr(test, automock)]
#[async_trait]
pub trait PostCountSource: Send + Sync {
    async fn count_user_posts(
        &self,
        user_id: u64,
        post_types: &[String],
        public_only: bool,
    ) -> Result<u64, DomainError>;
}

/// Retired slugs and adjacent-post queries
#[cfg_attr(test, automock)]
#[async_trait]
pub trait PostQuerySource: Send + Sync {
    /// Current permalink of the post that used to live at `slug`
    async fn old_slug_redirect(&self, slug: &str) -> Result<Option<String>, DomainError>;

    /// Id of the post adjacent to the query's start point
    async fn adjacent_post(&self, query: &AdjacentPostQuery) -> Result<Option<u64>, DomainError>;
}

/// Page storage, addressed by title or by hierarchical path
#[cfg_attr(test, automock)]
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn page_by_title(&self, title: &str, post_type: &str) -> Result<Option<u64>, DomainError>;

    async fn page_by_path(&self, path: &str, post_type: &str) -> Result<Option<u64>, DomainError>;
}
