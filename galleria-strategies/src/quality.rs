//! Quality selection for `background-image` declarations.
//!
//! A declaration may list several candidate URLs for the same picture at
//! different quality tiers. The heuristic scores each candidate and picks
//! exactly one winner, deterministically:
//!
//! | signal | score |
//! |--------|-------|
//! | `name=orig` | 100 |
//! | `name=4096x4096` | 90 |
//! | `name=large` | 70 |
//! | `name=medium` | 40 |
//! | `name=small` | 20 |
//! | `name=thumb` | 10 |
//! | `small`/`medium` in the path | -15 |
//! | no tier: `WxH` in the URL | `min(area / 250000, 20)` |
//! | no tier: `@2x`, `@3x`, `dpr=N` | +2 per extra density level |
//!
//! Ties go to the larger `width x height`, then to the earliest candidate.

use galleria_core::media_url::{ORIGINAL_TIER, original_image_url, quality_tier, with_quality_tier};
use galleria_core::{MediaItem, MediaKind};
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;
use url::Url;

static BACKGROUND_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"url\(\s*(?:"([^"]*)"|'([^']*)'|([^'"()\s]*))\s*\)"#).expect("Invalid regex")
});

static DIMENSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:\b|_)(\d{2,5})x(\d{2,5})(?:\b|_)").expect("Invalid regex")
});

static DPR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:@([1-4])x\b|[?&]dpr=([1-4]))").expect("Invalid regex"));

/// Penalty for `small`/`medium` appearing in the path.
pub const PATH_SIZE_PENALTY: i32 = 15;

/// Area granting one bonus point for candidates without a tier.
pub const AREA_PER_POINT: u64 = 250_000;

/// Cap on the dimension bonus.
pub const MAX_DIMENSION_BONUS: i32 = 20;

/// Bonus per density level above 1x.
pub const DPR_BONUS_PER_LEVEL: i32 = 2;

/// Score of a declared quality tier.
pub fn tier_score(tier: &str) -> Option<i32> {
    match tier {
        "orig" => Some(100),
        "4096x4096" => Some(90),
        "large" => Some(70),
        "medium" => Some(40),
        "small" => Some(20),
        "thumb" => Some(10),
        _ => None,
    }
}

// ============================================================================
// Candidates
// ============================================================================

/// Extracts every `url(...)` from a `background-image` declaration, in order.
///
/// Empty `url()` entries are kept so the raw candidate count stays exact.
pub fn parse_background_urls(declaration: &str) -> Vec<String> {
    BACKGROUND_URL_RE
        .captures_iter(declaration)
        .map(|caps| {
            caps.get(1)
                .or_else(|| caps.get(2))
                .or_else(|| caps.get(3))
                .map(|m| m.as_str().trim().to_string())
                .unwrap_or_default()
        })
        .collect()
}

/// One scored candidate URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoredCandidate {
    /// Candidate URL as declared.
    pub url: String,
    /// Position among the raw candidates.
    pub position: usize,
    /// Declared `name=` tier.
    pub tier: Option<String>,
    /// Heuristic score.
    pub score: i32,
    /// Width parsed from the URL.
    pub width: Option<u32>,
    /// Height parsed from the URL.
    pub height: Option<u32>,
}

impl ScoredCandidate {
    fn area(&self) -> u64 {
        match (self.width, self.height) {
            (Some(w), Some(h)) => u64::from(w) * u64::from(h),
            _ => 0,
        }
    }
}

fn is_usable(candidate: &str) -> bool {
    let trimmed = candidate.trim();
    !trimmed.is_empty() && !trimmed.to_ascii_lowercase().starts_with("data:")
}

fn url_path(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) => parsed.path().to_ascii_lowercase(),
        Err(_) => url.split(['?', '#']).next().unwrap_or(url).to_ascii_lowercase(),
    }
}

fn parse_dimensions(url: &str) -> Option<(u32, u32)> {
    let caps = DIMENSION_RE.captures(url)?;
    let width = caps.get(1)?.as_str().parse().ok()?;
    let height = caps.get(2)?.as_str().parse().ok()?;
    (width > 0 && height > 0).then_some((width, height))
}

fn density_level(url: &str) -> u32 {
    DPR_RE
        .captures_iter(url)
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
        .filter_map(|m| m.as_str().parse::<u32>().ok())
        .max()
        .unwrap_or(1)
}

/// Scores one candidate.
pub fn score_candidate(url: &str, position: usize) -> ScoredCandidate {
    let tier = quality_tier(url);
    let dimensions = parse_dimensions(url);
    let declared = tier.as_deref().and_then(tier_score);

    let mut score = match declared {
        Some(score) => score,
        None => {
            let area = dimensions.map_or(0, |(w, h)| u64::from(w) * u64::from(h));
            let bonus = i32::try_from(area / AREA_PER_POINT).unwrap_or(i32::MAX);
            let dpr_levels = i32::try_from(density_level(url).saturating_sub(1)).unwrap_or(0);
            bonus.min(MAX_DIMENSION_BONUS) + dpr_levels * DPR_BONUS_PER_LEVEL
        }
    };

    let path = url_path(url);
    if path.contains("small") || path.contains("medium") {
        score -= PATH_SIZE_PENALTY;
    }

    ScoredCandidate {
        url: url.to_string(),
        position,
        tier,
        score,
        width: dimensions.map(|(w, _)| w),
        height: dimensions.map(|(_, h)| h),
    }
}

// ============================================================================
// Selection
// ============================================================================

/// The winning candidate of a declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QualitySelection {
    /// Winner normalized to the original tier.
    pub url: String,
    /// Winner as declared.
    pub original_url: String,
    /// Tier the winner declared.
    pub original_tier: Option<String>,
    /// Winner score.
    pub score: i32,
    /// Number of raw candidates in the declaration.
    pub candidate_count: usize,
    /// Width parsed from the winner.
    pub width: Option<u32>,
    /// Height parsed from the winner.
    pub height: Option<u32>,
}

impl QualitySelection {
    /// Builds an image item from the selection.
    pub fn into_media_item(self, id: impl Into<String>, filename: impl Into<String>) -> MediaItem {
        let mut item = MediaItem::new(id, self.url, MediaKind::Image, filename)
            .with_original_url(self.original_url)
            .with_source("background-image");
        if let (Some(w), Some(h)) = (self.width, self.height) {
            item = item.with_dimensions(w, h);
        }
        item.meta.quality_label = Some(ORIGINAL_TIER.to_string());
        item.meta.original_tier = self.original_tier;
        item.meta.candidate_count = Some(self.candidate_count);
        item
    }
}

/// Picks the best candidate from a list of raw URLs.
///
/// Empty, blank and `data:` candidates are skipped; `None` if nothing is left.
pub fn select_best_candidate(candidates: &[String]) -> Option<QualitySelection> {
    let mut best: Option<ScoredCandidate> = None;

    for (position, raw) in candidates.iter().enumerate() {
        if !is_usable(raw) {
            continue;
        }
        let scored = score_candidate(raw.trim(), position);
        let better = best.as_ref().is_none_or(|current| {
            (scored.score, scored.area()) > (current.score, current.area())
        });
        if better {
            best = Some(scored);
        }
    }

    let winner = best?;
    let url = if winner.tier.is_some() {
        with_quality_tier(&winner.url, ORIGINAL_TIER)
    } else {
        original_image_url(&winner.url)
    };

    Some(QualitySelection {
        url,
        original_url: winner.url,
        original_tier: winner.tier,
        score: winner.score,
        candidate_count: candidates.len(),
        width: winner.width,
        height: winner.height,
    })
}

/// Runs the heuristic on a `background-image` declaration.
pub fn select_best_quality(declaration: &str) -> Option<QualitySelection> {
    select_best_candidate(&parse_background_urls(declaration))
}

// ============================================================================
// Tests
// ============================================================================
