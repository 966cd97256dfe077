//! Post identity types.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Host used when building canonical post URLs.
pub const CANONICAL_HOST: &str = "https://x.com";

/// Resolved reference to the post behind a clicked element.
///
/// Produced once by the identity resolver and only cloned afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    /// Post identifier (numeric string).
    pub id: String,
    /// Author handle without the leading `@`.
    pub author: String,
    /// Canonical URL of the post.
    pub canonical_url: String,
    /// Name of the strategy (and sub-method) that produced this identity.
    pub resolution_method: String,
    /// Confidence in `[0, 1]`.
    pub confidence: f64,
    /// Free-form diagnostics.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub meta: BTreeMap<String, String>,
}

impl Identity {
    /// Creates an identity with a canonical URL derived from author and id.
    ///
    /// Confidence is clamped into `[0, 1]`.
    pub fn new(
        id: impl Into<String>,
        author: impl Into<String>,
        resolution_method: impl Into<String>,
        confidence: f64,
    ) -> Self {
        let id = id.into();
        let author = author.into();
        let canonical_url = canonical_post_url(&author, &id);
        Self {
            id,
            author,
            canonical_url,
            resolution_method: resolution_method.into(),
            confidence: confidence.clamp(0.0, 1.0),
            meta: BTreeMap::new(),
        }
    }

    /// Adds a diagnostic entry.
    #[must_use]
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    /// Returns the cache key for results extracted for this post.
    pub fn cache_key(&self) -> String {
        format!("post:{}", self.id)
    }

    /// Returns true if the id is a usable post id.
    ///
    /// Ids must be non-empty, purely numeric and not the `unknown` sentinel.
    pub fn is_valid(&self) -> bool {
        is_valid_post_id(&self.id)
    }
}

/// Builds the canonical URL for a post.
pub fn canonical_post_url(author: &str, id: &str) -> String {
    format!("{CANONICAL_HOST}/{author}/status/{id}")
}

/// Returns true if `id` looks like a post id.
pub fn is_valid_post_id(id: &str) -> bool {
    !id.is_empty() && id != "unknown" && id.bytes().all(|b| b.is_ascii_digit())
}
