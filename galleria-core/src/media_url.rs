//! Media URL rules.
//!
//! Decides which URLs count as post media, which are emoji or video
//! thumbnails, and how quality tiers are read and rewritten.

use regex::Regex;
use std::sync::LazyLock;
use url::Url;

use crate::models::MediaKind;

/// URLs longer than this are rejected.
pub const MAX_URL_LENGTH: usize = 2048;

/// Host serving post images and video thumbnails.
pub const IMAGE_HOST: &str = "pbs.twimg.com";

/// Host serving video and animated image files.
pub const VIDEO_HOST: &str = "video.twimg.com";

/// Quality tier requested for normalized image URLs.
pub const ORIGINAL_TIER: &str = "orig";

static EMOJI_HOST_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^abs(-\d+)?\.twimg\.com$").expect("Invalid regex"));

static VIDEO_THUMB_PATH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/(ext_tw_video_thumb|amplify_video_thumb|tweet_video_thumb|video_thumb)/")
        .expect("Invalid regex")
});

static NAME_PARAM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([?&])name=[^&#]*").expect("Invalid regex"));

fn parse_http(url: &str) -> Option<Url> {
    let parsed = Url::parse(url).ok()?;
    matches!(parsed.scheme(), "http" | "https").then_some(parsed)
}

// ============================================================================
// Classification
// ============================================================================

/// Returns true if `url` points at post media.
///
/// Only http(s) URLs up to [`MAX_URL_LENGTH`] qualify. Image-host URLs must
/// be under `/media/` or a video-thumbnail path and never a profile image.
/// Every video-host URL qualifies.
pub fn is_valid_media_url(url: &str) -> bool {
    if url.is_empty() || url.len() > MAX_URL_LENGTH {
        return false;
    }
    let Some(parsed) = parse_http(url) else {
        return false;
    };
    let path = parsed.path();
    match parsed.host_str() {
        Some(IMAGE_HOST) => {
            !path.contains("/profile_images/")
                && (path.starts_with("/media/") || VIDEO_THUMB_PATH_RE.is_match(path))
        }
        Some(VIDEO_HOST) => true,
        _ => false,
    }
}

/// Returns true if `url` is an emoji asset.
pub fn is_emoji_url(url: &str) -> bool {
    parse_http(url).is_some_and(|parsed| {
        parsed
            .host_str()
            .is_some_and(|host| EMOJI_HOST_RE.is_match(host))
            && parsed.path().contains("/emoji/")
    })
}

/// Returns true if `url` is a still frame of a video.
pub fn is_video_thumbnail_url(url: &str) -> bool {
    parse_http(url).is_some_and(|parsed| {
        parsed.host_str() == Some(IMAGE_HOST) && VIDEO_THUMB_PATH_RE.is_match(parsed.path())
    })
}

/// Returns true if `url` is served by the video host.
pub fn is_video_host_url(url: &str) -> bool {
    parse_http(url).is_some_and(|parsed| parsed.host_str() == Some(VIDEO_HOST))
}

// ============================================================================
// Quality Tiers
// ============================================================================

/// Returns the `name=` quality tier declared by `url`.
pub fn quality_tier(url: &str) -> Option<String> {
    if let Ok(parsed) = Url::parse(url) {
        return parsed
            .query_pairs()
            .find(|(key, _)| key == "name")
            .map(|(_, value)| value.into_owned())
            .filter(|value| !value.is_empty());
    }
    NAME_PARAM_RE
        .find(url)
        .map(|m| m.as_str()[6..].to_string())
        .filter(|value| !value.is_empty())
}

/// Rewrites (or appends) the `name=` quality tier of `url`.
///
/// Other query parameters keep their order.
pub fn with_quality_tier(url: &str, tier: &str) -> String {
    let Ok(mut parsed) = Url::parse(url) else {
        return replace_tier_textually(url, tier);
    };

    let mut found = false;
    let pairs: Vec<(String, String)> = parsed
        .query_pairs()
        .map(|(key, value)| {
            if key == "name" {
                found = true;
                (key.into_owned(), tier.to_string())
            } else {
                (key.into_owned(), value.into_owned())
            }
        })
        .collect();

    {
        let mut query = parsed.query_pairs_mut();
        query.clear();
        for (key, value) in &pairs {
            query.append_pair(key, value);
        }
        if !found {
            query.append_pair("name", tier);
        }
    }
    parsed.to_string()
}

fn replace_tier_textually(url: &str, tier: &str) -> String {
    if NAME_PARAM_RE.is_match(url) {
        return NAME_PARAM_RE
            .replace(url, format!("${{1}}name={tier}"))
            .into_owned();
    }
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{url}{separator}name={tier}")
}

/// Returns the original-quality form of an image URL.
///
/// URLs outside the image host's `/media/` tree are returned unchanged.
pub fn original_image_url(url: &str) -> String {
    match parse_http(url) {
        Some(parsed) if parsed.host_str() == Some(IMAGE_HOST) && parsed.path().starts_with("/media/") => {
            with_quality_tier(url, ORIGINAL_TIER)
        }
        _ => url.to_string(),
    }
}

/// Scheme, host, and path of `url`, used to spot the same asset at
/// different quality tiers.
pub fn asset_key(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) => format!(
            "{}://{}{}",
            parsed.scheme(),
            parsed.host_str().unwrap_or_default(),
            parsed.path()
        ),
        Err(_) => url.split(['?', '#']).next().unwrap_or(url).to_string(),
    }
}

// ============================================================================
// Filenames
// ============================================================================

/// Last path segment of `url`, without extension.
pub fn media_filename(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let segment = parsed.path_segments()?.filter(|s| !s.is_empty()).next_back()?;
    let stem = segment.split('.').next().unwrap_or(segment);
    (!stem.is_empty()).then(|| stem.to_string())
}

/// Best guess at the file extension of `url`.
///
/// Prefers the `format=` parameter, then the path extension, then the kind
/// default.
pub fn guess_extension(url: &str, kind: MediaKind) -> String {
    if let Ok(parsed) = Url::parse(url) {
        if let Some((_, format)) = parsed.query_pairs().find(|(key, _)| key == "format") {
            if !format.is_empty() {
                return format.to_ascii_lowercase();
            }
        }
        let from_path = parsed
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .and_then(|last| last.rsplit_once('.'))
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .filter(|ext| !ext.is_empty() && ext.len() <= 4 && ext.chars().all(|c| c.is_ascii_alphanumeric()));
        if let Some(ext) = from_path {
            return ext;
        }
    }
    kind.default_extension().to_string()
}

/// Builds a download filename for the `index`-th item of a post.
///
/// Items are numbered from 1.
pub fn build_filename(author: Option<&str>, post_id: Option<&str>, index: usize, extension: &str) -> String {
    let number = index + 1;
    match (author.filter(|a| !a.is_empty() && *a != "unknown"), post_id) {
        (Some(author), Some(id)) => format!("{author}_{id}_{number}.{extension}"),
        (None, Some(id)) => format!("post_{id}_{number}.{extension}"),
        _ => format!("media_{number}.{extension}"),
    }
}
