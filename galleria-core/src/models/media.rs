//! Media item types.

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Media Kind
// ============================================================================

/// The kind of a resolved media resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MediaKind {
    /// Still image.
    Image,
    /// Video with audio track.
    Video,
    /// Looping animated image (served as a silent mp4).
    AnimatedImage,
}

impl MediaKind {
    /// Returns the wire name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::AnimatedImage => "animated-image",
        }
    }

    /// Default file extension used when the URL does not carry one.
    pub fn default_extension(&self) -> &'static str {
        match self {
            Self::Image => "jpg",
            Self::Video | Self::AnimatedImage => "mp4",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Media Meta
// ============================================================================

/// Observability data attached to a media item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaMeta {
    /// Quality tier the item URL resolves to (e.g. `orig`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_label: Option<String>,
    /// Tier declared by the winning candidate before normalization.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_tier: Option<String>,
    /// Number of raw candidate URLs considered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub candidate_count: Option<usize>,
    /// Where inside the page the item was found (`img-element`, `background-image`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Position of the item in the platform API response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_index: Option<usize>,
}

// ============================================================================
// Media Item
// ============================================================================

/// A single resolved media resource.
///
/// `url` always points at the best-quality variant known for the asset;
/// `original_url` keeps the URL as it was found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaItem {
    /// Stable identifier within one extraction result.
    pub id: String,
    /// Best-quality URL.
    pub url: String,
    /// URL as discovered.
    pub original_url: String,
    /// Kind of media.
    pub kind: MediaKind,
    /// Suggested download filename.
    pub filename: String,
    /// Preview image, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    /// Pixel width, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    /// Pixel height, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    /// Observability metadata.
    #[serde(default)]
    pub meta: MediaMeta,
}

impl MediaItem {
    /// Creates an item whose best URL equals the discovered URL.
    pub fn new(
        id: impl Into<String>,
        url: impl Into<String>,
        kind: MediaKind,
        filename: impl Into<String>,
    ) -> Self {
        let url = url.into();
        Self {
            id: id.into(),
            original_url: url.clone(),
            url,
            kind,
            filename: filename.into(),
            thumbnail_url: None,
            width: None,
            height: None,
            meta: MediaMeta::default(),
        }
    }

    /// Sets the URL the item was discovered under.
    #[must_use]
    pub fn with_original_url(mut self, original_url: impl Into<String>) -> Self {
        self.original_url = original_url.into();
        self
    }

    /// Sets the preview URL.
    #[must_use]
    pub fn with_thumbnail(mut self, thumbnail_url: impl Into<String>) -> Self {
        self.thumbnail_url = Some(thumbnail_url.into());
        self
    }

    /// Sets pixel dimensions.
    #[must_use]
    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    /// Sets the discovery source label.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.meta.source = Some(source.into());
        self
    }
}
