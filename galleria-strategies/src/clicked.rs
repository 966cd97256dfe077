//! Locating the media node the user clicked.

use galleria_core::ElementQuery;
use galleria_core::media_url::media_filename;

use crate::identity::CONTAINER_SELECTOR;

const MEDIA_SELECTOR: &str = "img, video";

/// Descendant depth searched below the clicked node.
const CHILD_SEARCH_DEPTH: usize = 3;

/// Ancestor depth searched above the clicked node.
const PARENT_SEARCH_DEPTH: usize = 5;

fn is_media<E: ElementQuery>(element: &E) -> bool {
    matches!(element.tag_name().as_str(), "img" | "video")
}

fn direct_media_child<E: ElementQuery>(element: &E) -> Option<E> {
    element.query_all(MEDIA_SELECTOR).into_iter().find(|child| {
        child
            .parent()
            .is_some_and(|parent| parent.is_same(element))
    })
}

fn depth_below<E: ElementQuery>(ancestor: &E, node: &E, limit: usize) -> Option<usize> {
    node.ancestors(limit)
        .iter()
        .position(|candidate| candidate.is_same(ancestor))
}

/// Finds the img/video behind a click.
///
/// The clicked node itself, then a direct child, then a descendant at most
/// three levels down, then a direct child of one of the five nearest
/// ancestors.
pub fn find_media_element<E: ElementQuery>(element: &E) -> Option<E> {
    if is_media(element) {
        return Some(element.clone());
    }
    if let Some(child) = direct_media_child(element) {
        return Some(child);
    }
    let nested = element
        .query_all(MEDIA_SELECTOR)
        .into_iter()
        .find(|node| depth_below(element, node, CHILD_SEARCH_DEPTH).is_some());
    if nested.is_some() {
        return nested;
    }
    element
        .ancestors(PARENT_SEARCH_DEPTH)
        .iter()
        .skip(1)
        .find_map(direct_media_child)
}

/// URL a media node displays: `src` for images, `poster` then `src` for
/// videos.
pub fn media_source_url<E: ElementQuery>(media: &E) -> Option<String> {
    let non_empty = |value: Option<String>| value.filter(|v| !v.trim().is_empty());
    match media.tag_name().as_str() {
        "video" => non_empty(media.attr("poster"))
            .or_else(|| non_empty(media.attr("src")))
            .or_else(|| {
                media
                    .query("source[src]")
                    .and_then(|source| non_empty(source.attr("src")))
            }),
        _ => non_empty(media.attr("src")),
    }
}

/// Last path segment of `url` without query, fragment or extension.
pub fn filename_key(url: &str) -> Option<String> {
    media_filename(url).or_else(|| {
        let path = url.split(['?', '#']).next()?;
        let segment = path.rsplit('/').find(|s| !s.is_empty())?;
        let stem = segment.split('.').next().unwrap_or(segment);
        (!stem.is_empty()).then(|| stem.to_string())
    })
}

/// Position of `media` among the media nodes of its post container.
///
/// Falls back to 0 when there is no container, the node is not found, or
/// the position is outside `count`.
pub fn dom_order_index<E: ElementQuery>(element: &E, media: Option<&E>, count: usize) -> usize {
    let Some(media) = media else {
        return 0;
    };
    let Some(container) = element.closest(CONTAINER_SELECTOR) else {
        return 0;
    };
    container
        .query_all(MEDIA_SELECTOR)
        .iter()
        .position(|node| node.is_same(media))
        .filter(|&position| position < count)
        .unwrap_or(0)
}
