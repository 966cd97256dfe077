//! Media strategy reading the post's own DOM.
//!
//! Collects `img` elements, `video` elements served by the video host and
//! inline `background-image` declarations inside the post container.
//! Works without an identity.

use async_trait::async_trait;
use galleria_core::media_url::{
    asset_key, build_filename, guess_extension, is_emoji_url, is_valid_media_url,
    is_video_host_url, is_video_thumbnail_url, original_image_url,
};
use galleria_core::{ElementQuery, ExtractionResult, MediaItem, MediaKind, SourceKind};
use galleria_fetch::{ExtractionRequest, FetchError, MediaStrategy};
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::{debug, instrument};

use crate::clicked::find_media_element;
use crate::identity::CONTAINER_SELECTOR;
use crate::quality::select_best_quality;

/// Strategy name.
pub const DOM_STRATEGY_NAME: &str = "dom-fallback";

/// Failure reason when the container holds no media.
pub const NO_DOM_MEDIA: &str = "No media items found";

static URL_DIMENSIONS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/(\d{2,6})x(\d{2,6})/").expect("Invalid regex"));

static MP4_SUFFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.mp4.*$").expect("Invalid regex"));

/// Reads media straight from the post container.
#[derive(Debug, Default, Clone, Copy)]
pub struct DomDirectStrategy;

// ============================================================================
// Collection
// ============================================================================

/// Media discovered in a container, in discovery order.
#[derive(Debug, Default)]
struct Collected {
    items: Vec<MediaItem>,
    seen: HashSet<String>,
}

impl Collected {
    fn push(&mut self, item: MediaItem) {
        if self.seen.insert(asset_key(&item.url)) {
            self.items.push(item);
        }
    }
}

fn attr_dimension<E: ElementQuery>(element: &E, name: &str) -> Option<u32> {
    element.attr(name)?.trim().parse().ok().filter(|v| *v > 0)
}

fn element_dimensions<E: ElementQuery>(element: &E, url: &str) -> Option<(u32, u32)> {
    if let (Some(w), Some(h)) = (attr_dimension(element, "width"), attr_dimension(element, "height")) {
        return Some((w, h));
    }
    let caps = URL_DIMENSIONS_RE.captures(url)?;
    Some((caps.get(1)?.as_str().parse().ok()?, caps.get(2)?.as_str().parse().ok()?))
}

fn video_source<E: ElementQuery>(video: &E) -> Option<String> {
    video
        .attr("src")
        .filter(|src| is_video_host_url(src))
        .or_else(|| {
            video
                .query_all("source[src]")
                .iter()
                .filter_map(|source| source.attr("src"))
                .find(|src| is_video_host_url(src))
        })
}

fn placeholder(kind: MediaKind, url: &str) -> MediaItem {
    MediaItem::new(String::new(), url, kind, String::new())
}

/// Collects the media of `container`, deduplicated by scheme, host and path.
pub fn collect_container_media<E: ElementQuery>(container: &E) -> Vec<MediaItem> {
    let mut collected = Collected::default();

    for img in container.query_all("img[src]") {
        let Some(src) = img.attr("src") else { continue };
        if !is_valid_media_url(&src) || is_emoji_url(&src) || is_video_thumbnail_url(&src) {
            continue;
        }
        let mut item = placeholder(MediaKind::Image, &original_image_url(&src))
            .with_original_url(src.clone())
            .with_source("img");
        if let Some((w, h)) = element_dimensions(&img, &src) {
            item = item.with_dimensions(w, h);
        }
        item.meta.quality_label = Some("orig".to_string());
        collected.push(item);
    }

    for video in container.query_all("video") {
        let Some(src) = video_source(&video) else { continue };
        let thumbnail = video
            .attr("poster")
            .filter(|poster| !poster.is_empty())
            .unwrap_or_else(|| MP4_SUFFIX_RE.replace(&src, ".jpg").into_owned());
        let mut item = placeholder(MediaKind::Video, &src)
            .with_thumbnail(thumbnail)
            .with_source("video");
        if let Some((w, h)) = element_dimensions(&video, &src) {
            item = item.with_dimensions(w, h);
        }
        collected.push(item);
    }

    let styled = std::iter::once(container.clone())
        .chain(container.query_all(r#"[style*="background-image"]"#));
    for node in styled {
        let Some(declaration) = node.style_property("background-image") else { continue };
        let Some(selection) = select_best_quality(&declaration) else { continue };
        if !is_valid_media_url(&selection.url) || is_emoji_url(&selection.url) {
            continue;
        }
        collected.push(selection.into_media_item(String::new(), String::new()));
    }

    collected.items
}

/// Gives items their final ids and filenames.
pub(crate) fn finalize_items(
    items: Vec<MediaItem>,
    prefix: &str,
    author: Option<&str>,
    post_id: Option<&str>,
) -> Vec<MediaItem> {
    items
        .into_iter()
        .enumerate()
        .map(|(index, mut item)| {
            let owner = post_id.unwrap_or("local");
            item.id = format!("{owner}_{prefix}_{index}");
            item.filename = build_filename(author, post_id, index, &guess_extension(&item.url, item.kind));
            item
        })
        .collect()
}

fn strip_query(url: &str) -> &str {
    url.split(['?', '#']).next().unwrap_or(url)
}

/// Index of the clicked item by URL-prefix match, 0 when nothing matches.
pub fn dom_clicked_index<E: ElementQuery>(element: &E, items: &[MediaItem]) -> usize {
    let Some(media) = find_media_element(element) else {
        return 0;
    };
    match media.tag_name().as_str() {
        "img" => {
            let Some(src) = media.attr("src") else { return 0 };
            let prefix = strip_query(&src);
            if prefix.is_empty() {
                return 0;
            }
            items
                .iter()
                .position(|item| {
                    item.url.starts_with(prefix)
                        || item.original_url.starts_with(prefix)
                        || prefix.starts_with(strip_query(&item.url))
                })
                .unwrap_or(0)
        }
        "video" => {
            let Some(src) = video_source(&media) else { return 0 };
            items
                .iter()
                .position(|item| item.url.contains(&src))
                .unwrap_or(0)
        }
        _ => 0,
    }
}

// ============================================================================
// Strategy
// ============================================================================

#[async_trait(?Send)]
impl MediaStrategy for DomDirectStrategy {
    fn name(&self) -> &str {
        DOM_STRATEGY_NAME
    }

    fn priority(&self) -> u32 {
        2
    }

    fn source_kind(&self) -> SourceKind {
        SourceKind::DomFallback
    }

    #[instrument(skip(self, request), fields(extraction_id = %request.extraction_id))]
    async fn extract(&self, request: &ExtractionRequest) -> Result<ExtractionResult, FetchError> {
        let element = &request.element;
        let container = element
            .closest(CONTAINER_SELECTOR)
            .unwrap_or_else(|| element.clone());

        let items = finalize_items(
            collect_container_media(&container),
            "dom",
            request.author(),
            request.post_id(),
        );
        if items.is_empty() {
            return Ok(
                ExtractionResult::failure(SourceKind::DomFallback, DOM_STRATEGY_NAME, NO_DOM_MEDIA)
                    .with_identity(request.identity.clone()),
            );
        }

        let clicked_index = dom_clicked_index(element, &items);
        debug!(count = items.len(), clicked_index, "DOM extraction succeeded");
        Ok(ExtractionResult::success(
            items,
            clicked_index,
            SourceKind::DomFallback,
            DOM_STRATEGY_NAME,
        )
        .with_identity(request.identity.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use galleria_core::{Document, ExtractionOptions, Identity};

    const POST: &str = r#"<article data-testid="tweet">
        <img src="https://pbs.twimg.com/profile_images/1/me.jpg">
        <img src="https://abs-0.twimg.com/emoji/v2/svg/1f600.svg">
        <img id="first" src="https://pbs.twimg.com/media/AAA?format=jpg&name=small" width="600" height="400">
        <img id="second" src="https://pbs.twimg.com/media/BBB?format=png&name=360x360">
        <img src="https://pbs.twimg.com/media/AAA?format=jpg&name=large">
        <img src="https://pbs.twimg.com/ext_tw_video_thumb/9/pu/img/T.jpg">
        <video id="clip" src="https://video.twimg.com/ext_tw_video/9/pu/vid/720x1280/V.mp4?tag=12"></video>
        <div style="background-image: url('https://pbs.twimg.com/media/CCC?format=jpg&name=medium')"></div>
    </article>"#;

    fn request(selector: &str) -> ExtractionRequest {
        let element = Document::parse(POST, None).select_first(selector).unwrap();
        ExtractionRequest::new(element, ExtractionOptions::default())
            .with_identity(Some(Identity::new("5", "zed", "test", 1.0)))
    }

    #[tokio::test]
    async fn test_collects_and_filters() {
        let result = DomDirectStrategy.extract(&request("#second")).await.unwrap();
        assert!(result.success);

        let urls: Vec<&str> = result.media_items.iter().map(|i| i.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://pbs.twimg.com/media/AAA?format=jpg&name=orig",
                "https://pbs.twimg.com/media/BBB?format=png&name=orig",
                "https://video.twimg.com/ext_tw_video/9/pu/vid/720x1280/V.mp4?tag=12",
                "https://pbs.twimg.com/media/CCC?format=jpg&name=orig",
            ]
        );
        assert_eq!(result.clicked_index, 1);
        assert_eq!(result.media_items[0].width, Some(600));
        assert_eq!(result.media_items[1].filename, "zed_5_2.png");
        assert_eq!(result.media_items[2].kind, MediaKind::Video);
        assert_eq!(result.media_items[2].width, Some(720));
        assert_eq!(
            result.media_items[2].thumbnail_url.as_deref(),
            Some("https://video.twimg.com/ext_tw_video/9/pu/vid/720x1280/V.jpg")
        );
        assert_eq!(result.media_items[3].meta.source.as_deref(), Some("background-image"));
        assert_eq!(result.meta.source_kind, SourceKind::DomFallback);
    }

    #[tokio::test]
    async fn test_clicked_video() {
        let result = DomDirectStrategy.extract(&request("#clip")).await.unwrap();
        assert_eq!(result.clicked_index, 2);
    }

    #[tokio::test]
    async fn test_no_media_is_a_failure() {
        let element = Document::parse("<article><p>text only</p></article>", None)
            .select_first("p")
            .unwrap();
        let req = ExtractionRequest::new(element, ExtractionOptions::default());
        let result = DomDirectStrategy.extract(&req).await.unwrap();
        assert!(!result.success);
        assert_eq!(result.error(), Some(NO_DOM_MEDIA));
    }

    #[test]
    fn test_finalize_without_identity() {
        let items = finalize_items(
            vec![placeholder(MediaKind::Video, "https://video.twimg.com/v.mp4")],
            "dom",
            None,
            None,
        );
        assert_eq!(items[0].id, "local_dom_0");
        assert_eq!(items[0].filename, "media_1.mp4");
    }
}
