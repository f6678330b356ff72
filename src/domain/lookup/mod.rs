//! Lookup domain - entities and source ports behind the cached lookups

mod source;
mod types;

pub use source::{PageSource, PostCountSource, PostQuerySource, TermSource, UrlSource};
pub use types::{AdjacentPostQuery, PUBLISH_STATUS, PostSnapshot, Term, TermField, sanitize_key};

#[cfg(test)]
pub use source::{
    MockPageSource, MockPostCountSource, MockPostQuerySource, MockTermSource, MockUrlSource,
};
