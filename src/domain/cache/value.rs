//! Cached payloads and the negative-result sentinel

use serde::{Deserialize, Serialize};

/// What the read-through layer stores for a key
///
/// `NotFound` is the negative sentinel. The tagged encoding keeps it apart
/// from positive values that are themselves "empty" (`0`, `""`, `[]`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum CachedValue<T> {
    Found(T),
    NotFound,
}

impl<T> CachedValue<T> {
    pub fn is_not_found(&self) -> bool {
        matches!(self, CachedValue::NotFound)
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            CachedValue::Found(value) => Some(value),
            CachedValue::NotFound => None,
        }
    }
}

impl<T> From<Option<T>> for CachedValue<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => CachedValue::Found(v),
            None => CachedValue::NotFound,
        }
    }
}

/// Result of reading a key without computing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<T> {
    /// A positive value is cached
    Hit(T),
    /// The negative sentinel is cached
    NegativeHit,
    /// Nothing usable is cached
    Miss,
}

impl<T> Lookup<T> {
    pub fn is_miss(&self) -> bool {
        matches!(self, Lookup::Miss)
    }

    /// Collapses to the caller-facing answer; a miss and a negative hit are
    /// both "not found".
    pub fn into_option(self) -> Option<T> {
        match self {
            Lookup::Hit(value) => Some(value),
            Lookup::NegativeHit | Lookup::Miss => None,
        }
    }

    /// Label used for logs and metrics
    pub fn outcome(&self) -> &'static str {
        match self {
            Lookup::Hit(_) => "hit",
            Lookup::NegativeHit => "negative_hit",
            Lookup::Miss => "miss",
        }
    }
}
