//! Cache key derivation

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use sha2::{Digest, Sha256};

/// Group used when a caller passes an empty group
pub const DEFAULT_GROUP: &str = "default";

/// Number of hex characters kept from a digest
const DIGEST_LEN: usize = 32;

/// Suffix of the advisory lock key stored next to an entry
const LOCK_SUFFIX: &str = "_lock";

/// A key inside a cache group
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    group: String,
    key: String,
}

impl CacheKey {
    /// Creates a key in the given group. An empty group maps to `default`.
    pub fn new(group: impl Into<String>, key: impl Into<String>) -> Self {
        let group = group.into();
        let group = if group.is_empty() {
            DEFAULT_GROUP.to_string()
        } else {
            group
        };

        Self {
            group,
            key: key.into(),
        }
    }

    /// Creates a key in the `default` group
    pub fn in_default_group(key: impl Into<String>) -> Self {
        Self::new(DEFAULT_GROUP, key)
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Flat key handed to store backends: `{group}:{key}`
    ///
    /// Separator and glob characters in the group are percent-encoded, so the
    /// first `:` always ends the group.
    pub fn storage_key(&self) -> String {
        format!("{}:{}", encode_group(&self.group), self.key)
    }

    /// Pattern matching every storage key of `group`
    pub fn group_pattern(group: &str) -> String {
        let group = if group.is_empty() { DEFAULT_GROUP } else { group };
        format!("{}:*", encode_group(group))
    }

    /// The advisory lock key that guards regeneration of this entry
    pub fn lock_key(&self) -> CacheKey {
        CacheKey {
            group: self.group.clone(),
            key: format!("{}{}", self.key, LOCK_SUFFIX),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", encode_group(&self.group), self.key)
    }
}

fn encode_group(group: &str) -> Cow<'_, str> {
    const RESERVED: [char; 7] = ['%', ':', '*', '?', '[', ']', '\\'];

    if !group.contains(RESERVED) {
        return Cow::Borrowed(group);
    }

    let mut encoded = String::with_capacity(group.len() + 8);
    for ch in group.chars() {
        if RESERVED.contains(&ch) {
            encoded.push_str(&format!("%{:02X}", ch as u32));
        } else {
            encoded.push(ch);
        }
    }

    Cow::Owned(encoded)
}

/// Hex digest of an arbitrary input, used to keep keys short and free of
/// characters that backends treat specially.
pub fn digest(input: &str) -> String {
    let hash = Sha256::digest(input.as_bytes());
    let mut hex = hex::encode(hash);
    hex.truncate(DIGEST_LEN);
    hex
}

/// Digest of the JSON encoding of a value.
///
/// Falls back to the digest of `null` when the value cannot be encoded, so
/// a broken input still maps to a stable key.
pub fn digest_json<T: Serialize + ?Sized>(value: &T) -> String {
    let json = serde_json::to_string(value).unwrap_or_else(|_| "null".to_string());
    digest(&json)
}

/// Trait for generating cache keys from input data
pub trait CacheKeyGenerator: Send + Sync + fmt::Debug {
    /// Generates the key text from the given components
    fn generate(&self, params: &CacheKeyParams) -> String;

    /// Generates a key inside a group
    fn generate_in_group(&self, group: &str, params: &CacheKeyParams) -> CacheKey {
        CacheKey::new(group, self.generate(params))
    }
}

/// Parameters for cache key generation
#[derive(Debug, Clone, Default)]
pub struct CacheKeyParams {
    /// Primary identifier
    pub primary: String,
    /// Secondary components (sorted for consistency)
    pub components: BTreeMap<String, String>,
}

impl CacheKeyParams {
    pub fn new(primary: impl Into<String>) -> Self {
        Self {
            primary: primary.into(),
            components: BTreeMap::new(),
        }
    }

    pub fn with_component(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.components.insert(key.into(), value.into());
        self
    }

    /// Creates parameters from a serializable value
    pub fn from_serializable<T: Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        let json = serde_json::to_string(value)?;
        Ok(Self::new(json))
    }

    fn combined(&self) -> String {
        let mut parts = vec![self.primary.clone()];

        for (k, v) in &self.components {
            parts.push(format!("{}={}", k, v));
        }

        parts.join("|")
    }
}

/// Readable keys: `primary|a=1|b=2`
#[derive(Debug, Clone, Default)]
pub struct PlainKeyGenerator;

impl CacheKeyGenerator for PlainKeyGenerator {
    fn generate(&self, params: &CacheKeyParams) -> String {
        params.combined()
    }
}

/// Hash-based keys with an optional literal prefix: `{prefix}{digest}`
#[derive(Debug, Clone, Default)]
pub struct HashedKeyGenerator {
    prefix: String,
}

impl HashedKeyGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }
}

impl CacheKeyGenerator for HashedKeyGenerator {
    fn generate(&self, params: &CacheKeyParams) -> String {
        format!("{}{}", self.prefix, digest(&params.combined()))
    }
}
