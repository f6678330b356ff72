//! Entities the cached lookups resolve

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// Status a post must have (before or after a transition) to affect
/// public lookups
pub const PUBLISH_STATUS: &str = "publish";

/// Field a term is looked up by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TermField {
    Id,
    Slug,
    Name,
}

impl TermField {
    pub fn as_str(&self) -> &'static str {
        match self {
            TermField::Id => "id",
            TermField::Slug => "slug",
            TermField::Name => "name",
        }
    }

    /// Fields whose lookups go through the cache
    pub const CACHED: [TermField; 2] = [TermField::Name, TermField::Slug];
}

impl fmt::Display for TermField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TermField {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "id" | "term_id" => Ok(TermField::Id),
            "slug" => Ok(TermField::Slug),
            "name" => Ok(TermField::Name),
            _ => Err(DomainError::validation(format!(
                "Unknown term field: {}. Valid fields: id, slug, name",
                s
            ))),
        }
    }
}

/// A taxonomy term
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Term {
    pub id: u64,
    pub taxonomy: String,
    pub slug: String,
    pub name: String,
}

impl Term {
    /// Value of the given field as used in lookup keys
    pub fn field_value(&self, field: TermField) -> String {
        match field {
            TermField::Id => self.id.to_string(),
            TermField::Slug => self.slug.clone(),
            TermField::Name => self.name.clone(),
        }
    }
}

/// Snapshot of a post as seen by invalidation hooks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostSnapshot {
    pub id: u64,
    pub post_type: String,
    pub slug: String,
    pub title: String,
    /// Hierarchical page path, e.g. `about/team`
    pub path: String,
    pub status: String,
    /// Publication date as stored (`YYYY-MM-DD HH:MM:SS`)
    pub date: String,
    pub permalink: String,
    pub hierarchical: bool,
}

impl PostSnapshot {
    pub fn is_published(&self) -> bool {
        self.status == PUBLISH_STATUS
    }

    /// Attachments are public while their status is `inherit`
    pub fn is_publicly_visible(&self) -> bool {
        self.is_published() || (self.post_type == "attachment" && self.status == "inherit")
    }
}

/// Reduces text to lowercase alphanumerics, `_` and `-`, as used in
/// title and path lookup keys
pub fn sanitize_key(input: &str) -> String {
    input
        .chars()
        .map(|ch| ch.to_ascii_lowercase())
        .filter(|ch| ch.is_ascii_alphanumeric() || *ch == '_' || *ch == '-')
        .collect()
}

/// Query for the post adjacent to a given one
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjacentPostQuery {
    pub post_type: String,
    /// Date of the post the search starts from
    pub current_post_date: String,
    /// Previous (older) when true, next (newer) otherwise
    pub previous: bool,
    /// Restrict to posts sharing this term
    pub term_id: Option<u64>,
    pub taxonomy: String,
    pub excluded_terms: Vec<u64>,
}

impl AdjacentPostQuery {
    /// Query for the post before or after `post`
    ///
    /// When `same_term_candidates` is non-empty the search is restricted to a
    /// single shared term: the last candidate that is not excluded.
    pub fn for_post(
        post: &PostSnapshot,
        previous: bool,
        taxonomy: impl Into<String>,
        same_term_candidates: &[u64],
        excluded_terms: Vec<u64>,
    ) -> Self {
        let term_id = same_term_candidates
            .iter()
            .rev()
            .find(|id| !excluded_terms.contains(*id))
            .copied();

        Self {
            post_type: post.post_type.clone(),
            current_post_date: post.date.clone(),
            previous,
            term_id,
            taxonomy: taxonomy.into(),
            excluded_terms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_term_field_from_str() {
        assert_eq!("slug".parse::<TermField>().unwrap(), TermField::Slug);
        assert_eq!("NAME".parse::<TermField>().unwrap(), TermField::Name);
        assert_eq!("term_id".parse::<TermField>().unwrap(), TermField::Id);
        assert!("title".parse::<TermField>().is_err());
    }

    fn post() -> PostSnapshot {
        PostSnapshot {
            id: 3,
            post_type: "post".to_string(),
            slug: "hello".to_string(),
            title: "hello".to_string(),
            path: "hello".to_string(),
            status: PUBLISH_STATUS.to_string(),
            date: "2024-03-01 10:00:00".to_string(),
            permalink: "https://example.com/hello/".to_string(),
            hierarchical: false,
        }
    }

    #[test]
    fn test_adjacent_query_picks_last_allowed_term() {
        let query = AdjacentPostQuery::for_post(&post(), true, "category", &[4, 5, 6], vec![6]);

        assert_eq!(query.term_id, Some(5));
        assert_eq!(query.current_post_date, "2024-03-01 10:00:00");
        assert!(query.previous);
    }

    #[test]
    fn test_adjacent_query_without_allowed_terms() {
        let query = AdjacentPostQuery::for_post(&post(), false, "category", &[6], vec![6]);
        assert_eq!(query.term_id, None);

        let query = AdjacentPostQuery::for_post(&post(), false, "category", &[], Vec::new());
        assert_eq!(query.term_id, None);
    }

    #[test]
    fn test_sanitize_key() {
        assert_eq!(sanitize_key("About Us"), "aboutus");
        assert_eq!(sanitize_key("company/team-2024"), "companyteam-2024");
        assert_eq!(sanitize_key("Café_Menu!"), "caf_menu");
    }

    #[test]
    fn test_attachment_inherit_is_visible() {
        let post = PostSnapshot {
            id: 9,
            post_type: "attachment".to_string(),
            slug: "logo".to_string(),
            title: "logo".to_string(),
            path: "logo".to_string(),
            status: "inherit".to_string(),
            date: "2024-01-01 00:00:00".to_string(),
            permalink: "https://example.com/logo/".to_string(),
            hierarchical: false,
        };

        assert!(!post.is_published());
        assert!(post.is_publicly_visible());
    }
}
