//! Extraction results and request options.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use super::identity::Identity;
use super::media::MediaItem;

// ============================================================================
// Source Kind
// ============================================================================

/// Which data source produced an extraction result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    /// Platform data API.
    Api,
    /// Live DOM elements read directly.
    DomFallback,
    /// Parsed `background-image` declarations.
    CssFallback,
    /// Synthesized by the strategy chain when nothing was attempted.
    StrategyChain,
    /// Served from the result cache. `strategy_name` still names the
    /// strategy that produced the stored result.
    Cache,
}

impl SourceKind {
    /// Returns the wire name of this source.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Api => "api",
            Self::DomFallback => "dom-fallback",
            Self::CssFallback => "css-fallback",
            Self::StrategyChain => "strategy-chain",
            Self::Cache => "cache",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Extraction Meta
// ============================================================================

/// Bookkeeping attached to every extraction result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionMeta {
    /// Data source of the result.
    pub source_kind: SourceKind,
    /// Name of the strategy that produced the result.
    pub strategy_name: String,
    /// When the result was produced.
    pub resolved_at: DateTime<Utc>,
    /// Wall time spent by the whole extraction.
    pub total_processing_time_ms: u64,
    /// Initial try plus every retry across the chain.
    pub attempts: u32,
    /// Retries across the chain.
    pub retries: u32,
    /// Whether the result was served from the cache.
    pub cache_hit: bool,
    /// Failure reason, set on unsuccessful results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Strategies attempted, in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attempted_strategies: Vec<String>,
}

impl ExtractionMeta {
    /// Creates meta for a fresh result.
    pub fn new(source_kind: SourceKind, strategy_name: impl Into<String>) -> Self {
        Self {
            source_kind,
            strategy_name: strategy_name.into(),
            resolved_at: Utc::now(),
            total_processing_time_ms: 0,
            attempts: 1,
            retries: 0,
            cache_hit: false,
            error: None,
            attempted_strategies: Vec::new(),
        }
    }
}

// ============================================================================
// Extraction Result
// ============================================================================

/// Outcome of an extraction; returned to callers and stored in the cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    /// Whether at least one media item was resolved.
    pub success: bool,
    /// Resolved media, in post order.
    pub media_items: Vec<MediaItem>,
    /// Index of the item the user interacted with.
    pub clicked_index: usize,
    /// Bookkeeping.
    pub meta: ExtractionMeta,
    /// Identity the result belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<Identity>,
}

impl ExtractionResult {
    /// Creates a successful result.
    ///
    /// `clicked_index` is clamped into the item range. An empty item list
    /// yields a failure instead, so `success` always implies items.
    pub fn success(
        media_items: Vec<MediaItem>,
        clicked_index: usize,
        source_kind: SourceKind,
        strategy_name: impl Into<String>,
    ) -> Self {
        let strategy_name = strategy_name.into();
        if media_items.is_empty() {
            return Self::failure(source_kind, strategy_name, "No media items found");
        }
        let clicked_index = clicked_index.min(media_items.len() - 1);
        Self {
            success: true,
            media_items,
            clicked_index,
            meta: ExtractionMeta::new(source_kind, strategy_name),
            identity: None,
        }
    }

    /// Creates a failed result carrying a reason.
    pub fn failure(
        source_kind: SourceKind,
        strategy_name: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        let mut meta = ExtractionMeta::new(source_kind, strategy_name);
        meta.error = Some(error.into());
        Self {
            success: false,
            media_items: Vec::new(),
            clicked_index: 0,
            meta,
            identity: None,
        }
    }

    /// Attaches the identity.
    #[must_use]
    pub fn with_identity(mut self, identity: Option<Identity>) -> Self {
        self.identity = identity;
        self
    }

    /// Returns the item the user clicked, if any.
    pub fn clicked_item(&self) -> Option<&MediaItem> {
        self.media_items.get(self.clicked_index)
    }

    /// Returns the failure reason, if any.
    pub fn error(&self) -> Option<&str> {
        self.meta.error.as_deref()
    }
}

// ============================================================================
// Extraction Options
// ============================================================================

/// Options recognised by the extraction entry point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionOptions {
    /// Bounds the whole operation.
    #[serde(default, with = "duration_ms_opt")]
    pub timeout: Option<Duration>,
    /// When false the result cache is bypassed entirely.
    #[serde(default = "default_true")]
    pub enable_cache: bool,
}

fn default_true() -> bool {
    true
}

impl Default for ExtractionOptions {
    fn default() -> Self {
        Self {
            timeout: None,
            enable_cache: true,
        }
    }
}

impl ExtractionOptions {
    /// Sets the overall timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Bypasses the result cache.
    #[must_use]
    pub fn without_cache(mut self) -> Self {
        self.enable_cache = false;
        self
    }
}

mod duration_ms_opt {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    #[allow(clippy::ref_option)]
    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => s.serialize_some(&u64::try_from(d.as_millis()).unwrap_or(u64::MAX)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(d)?.map(Duration::from_millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MediaKind;

    #[test]
    fn test_success_without_items_is_failure() {
        let result = ExtractionResult::success(Vec::new(), 0, SourceKind::Api, "twitter-api");
        assert!(!result.success);
        assert_eq!(result.error(), Some("No media items found"));
    }

    #[test]
    fn test_clicked_index_is_clamped() {
        let items = vec![
            MediaItem::new("a", "https://video.twimg.com/a.mp4", MediaKind::Video, "a.mp4"),
            MediaItem::new("b", "https://video.twimg.com/b.mp4", MediaKind::Video, "b.mp4"),
        ];
        let result = ExtractionResult::success(items, 7, SourceKind::DomFallback, "dom-fallback");
        assert!(result.success);
        assert_eq!(result.clicked_index, 1);
        assert_eq!(result.clicked_item().map(|i| i.id.as_str()), Some("b"));
    }

    #[test]
    fn test_options_json_uses_milliseconds() {
        let options = ExtractionOptions::default().with_timeout(Duration::from_millis(1500));
        let json = serde_json::to_value(&options).unwrap();
        assert_eq!(json["timeout"], 1500);
        assert_eq!(json["enableCache"], true);

        let parsed: ExtractionOptions = serde_json::from_str(r#"{"enableCache":false}"#).unwrap();
        assert_eq!(parsed.timeout, None);
        assert!(!parsed.enable_cache);
    }

    #[test]
    fn test_source_kind_wire_names() {
        assert_eq!(
            serde_json::to_string(&SourceKind::DomFallback).unwrap(),
            r#""dom-fallback""#
        );
        assert_eq!(SourceKind::CssFallback.as_str(), "css-fallback");
    }
}
