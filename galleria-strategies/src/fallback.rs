//! Last-resort strategy: inline `background-image` declarations.

use async_trait::async_trait;
use galleria_core::media_url::{asset_key, is_emoji_url, is_valid_media_url};
use galleria_core::{ElementQuery, ExtractionResult, MediaItem, SourceKind};
use galleria_fetch::{ExtractionRequest, FetchError, MediaStrategy};
use std::collections::HashSet;
use tracing::{debug, instrument, trace};

use crate::dom_direct::finalize_items;
use crate::identity::CONTAINER_SELECTOR;
use crate::quality::{select_best_candidate, select_best_quality};

/// Strategy name.
pub const CSS_STRATEGY_NAME: &str = "css-fallback";

/// Failure reason when no declaration yields media.
pub const NO_CSS_MEDIA: &str = "No background images found";

/// Walks the post container and resolves every inline background image.
#[derive(Debug, Default, Clone, Copy)]
pub struct CssFallbackStrategy;

fn declared_background<E: ElementQuery>(node: &E) -> Option<crate::quality::QualitySelection> {
    if let Some(declaration) = node.style_property("background-image") {
        if let Some(selection) = select_best_quality(&declaration) {
            return Some(selection);
        }
    }
    let data = node.attr("data-background-image")?;
    if data.contains("url(") {
        select_best_quality(&data)
    } else {
        select_best_candidate(&[data])
    }
}

/// Resolves one image per element of `container` and its descendants.
pub fn collect_background_media<E: ElementQuery>(container: &E) -> Vec<MediaItem> {
    let mut seen = HashSet::new();
    let mut items = Vec::new();

    let nodes = std::iter::once(container.clone()).chain(container.query_all("*"));
    for node in nodes {
        let Some(selection) = declared_background(&node) else { continue };
        if !is_valid_media_url(&selection.url) || is_emoji_url(&selection.url) {
            trace!(url = %selection.url, "Ignoring non-media background");
            continue;
        }
        if seen.insert(asset_key(&selection.url)) {
            items.push(selection.into_media_item(String::new(), String::new()));
        }
    }
    items
}

#[async_trait(?Send)]
impl MediaStrategy for CssFallbackStrategy {
    fn name(&self) -> &str {
        CSS_STRATEGY_NAME
    }

    fn priority(&self) -> u32 {
        3
    }

    fn source_kind(&self) -> SourceKind {
        SourceKind::CssFallback
    }

    #[instrument(skip(self, request), fields(extraction_id = %request.extraction_id))]
    async fn extract(&self, request: &ExtractionRequest) -> Result<ExtractionResult, FetchError> {
        let element = &request.element;
        let container = element
            .closest(CONTAINER_SELECTOR)
            .unwrap_or_else(|| element.clone());

        let items = finalize_items(
            collect_background_media(&container),
            "css",
            request.author(),
            request.post_id(),
        );
        if items.is_empty() {
            return Ok(
                ExtractionResult::failure(SourceKind::CssFallback, CSS_STRATEGY_NAME, NO_CSS_MEDIA)
                    .with_identity(request.identity.clone()),
            );
        }

        let clicked_index = declared_background(element)
            .and_then(|selection| {
                let key = asset_key(&selection.url);
                items.iter().position(|item| asset_key(&item.url) == key)
            })
            .unwrap_or(0);
        debug!(count = items.len(), clicked_index, "CSS fallback extraction succeeded");

        Ok(ExtractionResult::success(
            items,
            clicked_index,
            SourceKind::CssFallback,
            CSS_STRATEGY_NAME,
        )
        .with_identity(request.identity.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use galleria_core::{Document, ExtractionOptions};

    #[tokio::test]
    async fn test_one_item_per_element() {
        let html = r#"<article>
            <div style="background-image: url('https://pbs.twimg.com/media/A?format=jpg&name=small'), url('https://pbs.twimg.com/media/A?format=jpg&name=large')"></div>
            <div id="b" data-background-image="https://pbs.twimg.com/media/B?format=png&name=thumb"></div>
            <div style="background-image: url(https://abs.twimg.com/emoji/v2/x.svg)"></div>
            <div style="background-image: url('https://pbs.twimg.com/profile_images/1/p.jpg')"></div>
        </article>"#;
        let element = Document::parse(html, None).select_first("#b").unwrap();
        let req = ExtractionRequest::new(element, ExtractionOptions::default());

        let result = CssFallbackStrategy.extract(&req).await.unwrap();
        assert!(result.success);
        assert_eq!(result.media_items.len(), 2);

        let first = &result.media_items[0];
        assert_eq!(first.url, "https://pbs.twimg.com/media/A?format=jpg&name=orig");
        assert_eq!(first.meta.original_tier.as_deref(), Some("large"));
        assert_eq!(first.meta.candidate_count, Some(2));
        assert_eq!(first.filename, "media_1.jpg");

        assert_eq!(result.clicked_index, 1);
        assert_eq!(result.meta.source_kind, SourceKind::CssFallback);
    }

    #[tokio::test]
    async fn test_nothing_declared() {
        let element = Document::parse("<article><img></article>", None)
            .select_first("img")
            .unwrap();
        let req = ExtractionRequest::new(element, ExtractionOptions::default());
        let result = CssFallbackStrategy.extract(&req).await.unwrap();
        assert!(!result.success);
        assert_eq!(result.error(), Some(NO_CSS_MEDIA));
    }
}
