//! Syndication response parsing.
//!
//! The endpoint answers with a post object whose `mediaDetails` array lists
//! each attachment:
//!
//! ```json
//! {
//!   "mediaDetails": [
//!     { "type": "photo", "id_str": "1", "media_url_https": "https://pbs.twimg.com/media/A.jpg",
//!       "original_info": { "width": 1200, "height": 800 } },
//!     { "type": "video", "id_str": "2", "media_url_https": "https://pbs.twimg.com/ext_tw_video_thumb/2/pu/img/B.jpg",
//!       "video_info": { "variants": [ { "content_type": "video/mp4", "bitrate": 832000, "url": "..." } ] } }
//!   ]
//! }
//! ```

use galleria_core::MediaKind;
use galleria_core::media_url::{ORIGINAL_TIER, with_quality_tier};
use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;
use tracing::{debug, warn};

use super::error::ApiError;

static IMAGE_EXTENSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.(jpe?g|png|webp|gif)$").expect("Invalid regex"));

// ============================================================================
// Response Types
// ============================================================================

/// Top-level syndication response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostResponse {
    /// Attachments in post order.
    #[serde(default, rename = "mediaDetails")]
    pub media_details: Vec<MediaDetail>,
}

/// One attachment entry.
#[derive(Debug, Clone, Deserialize)]
pub struct MediaDetail {
    /// `photo`, `video` or `animated_gif`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Attachment id.
    #[serde(default)]
    pub id_str: Option<String>,
    /// Photo URL, or the still frame of a video.
    #[serde(default)]
    pub media_url_https: Option<String>,
    /// Source dimensions.
    #[serde(default)]
    pub original_info: Option<OriginalInfo>,
    /// Playable variants for videos and GIFs.
    #[serde(default)]
    pub video_info: Option<VideoInfo>,
}

/// Source dimensions of an attachment.
#[derive(Debug, Clone, Deserialize)]
pub struct OriginalInfo {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// Video payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VideoInfo {
    /// Encodings on offer.
    #[serde(default)]
    pub variants: Vec<VideoVariant>,
}

/// One encoding of a video.
#[derive(Debug, Clone, Deserialize)]
pub struct VideoVariant {
    /// MIME type, `video/mp4` or a playlist type.
    #[serde(default)]
    pub content_type: String,
    /// Variant URL.
    pub url: String,
    /// Bitrate; absent on playlists.
    #[serde(default)]
    pub bitrate: Option<u64>,
}

// ============================================================================
// Normalized Media
// ============================================================================

/// One attachment as the API strategy consumes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiMedia {
    /// Position in the post.
    pub index: usize,
    /// Attachment id, when present.
    pub media_id: Option<String>,
    /// Media kind.
    pub kind: MediaKind,
    /// Best-quality URL to download.
    pub download_url: String,
    /// URL shown in the timeline.
    pub preview_url: String,
    /// Source width.
    pub width: Option<u32>,
    /// Source height.
    pub height: Option<u32>,
}

/// Original-quality form of a photo URL from the API.
///
/// `.../A.jpg` becomes `.../A?format=jpg&name=orig`; URLs that already carry
/// a format parameter only get their tier rewritten.
pub fn original_photo_url(media_url: &str) -> String {
    if media_url.contains("format=") {
        return with_quality_tier(media_url, ORIGINAL_TIER);
    }
    match IMAGE_EXTENSION_RE.captures(media_url) {
        Some(caps) => {
            let ext = caps.get(1).map_or("jpg", |m| m.as_str());
            let stem = &media_url[..media_url.len() - ext.len() - 1];
            format!("{stem}?format={ext}&name={ORIGINAL_TIER}")
        }
        None => with_quality_tier(media_url, ORIGINAL_TIER),
    }
}

/// Highest-bitrate mp4 variant.
pub fn best_mp4_variant(info: &VideoInfo) -> Option<&VideoVariant> {
    info.variants
        .iter()
        .filter(|variant| variant.content_type == "video/mp4" && !variant.url.is_empty())
        .max_by_key(|variant| variant.bitrate.unwrap_or(0))
}

fn normalize(index: usize, detail: &MediaDetail) -> Option<ApiMedia> {
    let preview = detail.media_url_https.clone().filter(|url| !url.is_empty())?;
    let (width, height) = detail
        .original_info
        .as_ref()
        .map_or((None, None), |info| (Some(info.width), Some(info.height)));

    let (kind, download_url) = match detail.kind.as_str() {
        "photo" => (MediaKind::Image, original_photo_url(&preview)),
        "video" | "animated_gif" => {
            let kind = if detail.kind == "video" {
                MediaKind::Video
            } else {
                MediaKind::AnimatedImage
            };
            let variant = detail.video_info.as_ref().and_then(best_mp4_variant);
            let Some(variant) = variant else {
                warn!(index, "Video entry without an mp4 variant, skipping");
                return None;
            };
            (kind, variant.url.clone())
        }
        other => {
            debug!(index, kind = other, "Unsupported media type, skipping");
            return None;
        }
    };

    Some(ApiMedia {
        index,
        media_id: detail.id_str.clone(),
        kind,
        download_url,
        preview_url: preview,
        width,
        height,
    })
}

/// Converts a decoded response into normalized media, in post order.
///
/// Indexes are renumbered over the entries that survive normalization.
pub fn media_from_response(response: &PostResponse) -> Vec<ApiMedia> {
    response
        .media_details
        .iter()
        .enumerate()
        .filter_map(|(position, detail)| normalize(position, detail))
        .enumerate()
        .map(|(index, media)| ApiMedia { index, ..media })
        .collect()
}

/// Parses a raw response body.
///
/// # Errors
///
/// Returns [`ApiError::InvalidResponse`] when the body is not valid JSON.
pub fn parse_post_response(body: &str) -> Result<Vec<ApiMedia>, ApiError> {
    let response: PostResponse = serde_json::from_str(body)?;
    Ok(media_from_response(&response))
}
