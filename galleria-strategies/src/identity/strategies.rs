//! The five identity strategies, from most to least specific.

use galleria_core::{Element, ElementQuery, Identity, find_in_ancestors};
use galleria_fetch::IdentityStrategy;

use super::author::{
    aria_post_id, bounded_container, closest_container, is_media_page, numeric_attr,
    permalink_time_id, resolve_author, status_id_from_href, status_link_id,
};

/// Ancestor depth scanned for numeric data attributes.
const DATA_ATTRIBUTE_DEPTH: usize = 10;

/// Ancestor depth scanned by the last-resort traversal.
const PARENT_TRAVERSAL_DEPTH: usize = 15;

/// Ancestor depth scanned for an enclosing link.
const LINK_SEARCH_DEPTH: usize = 10;

fn identity_for<E: ElementQuery>(
    element: &E,
    id: String,
    method: &str,
    confidence: f64,
    source: &str,
) -> Identity {
    let container = closest_container(element);
    let author = resolve_author(element, container.as_ref());
    Identity::new(id, author, method, confidence).with_meta("source", source)
}

// ============================================================================
// Clicked element
// ============================================================================

/// Looks at the clicked node itself, then its bounded post container.
#[derive(Debug, Default)]
pub struct ClickedElementStrategy;

impl ClickedElementStrategy {
    /// Strategy name.
    pub const NAME: &'static str = "clicked-element";
    /// Confidence of identities from this strategy.
    pub const CONFIDENCE: f64 = 0.9;

    const ID_ATTRIBUTES: [&'static str; 4] =
        ["data-tweet-id", "data-item-id", "data-testid", "data-focusable"];

    /// Finds a post id and the place it came from.
    pub fn find_post_id<E: ElementQuery>(element: &E) -> Option<(String, &'static str)> {
        if let Some(id) = Self::ID_ATTRIBUTES
            .iter()
            .find_map(|name| numeric_attr(element, name))
        {
            return Some((id, "data-attribute"));
        }

        if let Some(id) = element.attr("aria-labelledby").as_deref().and_then(aria_post_id) {
            return Some((id, "aria-labelledby"));
        }

        if let Some(id) = element.attr("href").as_deref().and_then(status_id_from_href) {
            return Some((id, "href"));
        }

        let container = bounded_container(element)?;
        status_link_id(&container)
            .map(|id| (id, "container-link"))
            .or_else(|| permalink_time_id(&container).map(|id| (id, "container-time")))
    }
}

impl IdentityStrategy for ClickedElementStrategy {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn priority(&self) -> u32 {
        1
    }

    fn resolve(&self, element: &Element) -> Option<Identity> {
        let (id, source) = Self::find_post_id(element)?;
        Some(identity_for(element, id, Self::NAME, Self::CONFIDENCE, source))
    }
}

// ============================================================================
// URL based
// ============================================================================

/// Reads the post id from the nearest enclosing link or the page URL.
#[derive(Debug, Default)]
pub struct UrlBasedStrategy;

impl UrlBasedStrategy {
    /// Strategy name.
    pub const NAME: &'static str = "url-based";
    /// Confidence of identities from this strategy.
    pub const CONFIDENCE: f64 = 0.8;

    /// Finds a post id and the place it came from.
    pub fn find_post_id<E: ElementQuery>(element: &E) -> Option<(String, &'static str)> {
        let link_href = find_in_ancestors(element, LINK_SEARCH_DEPTH, |node| {
            (node.tag_name() == "a").then(|| node.attr("href")).flatten()
        });

        if let Some(id) = link_href.as_deref().and_then(status_id_from_href) {
            return Some((id, "link-href"));
        }

        // Photo viewers keep the post id only in the page URL.
        let photo_link = link_href.as_deref().is_some_and(|href| href.contains("/photo/"));
        let page_url = element.page_url()?;
        if photo_link || is_media_page(&page_url) {
            return status_id_from_href(&page_url).map(|id| (id, "page-url"));
        }
        None
    }
}

impl IdentityStrategy for UrlBasedStrategy {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn priority(&self) -> u32 {
        2
    }

    fn resolve(&self, element: &Element) -> Option<Identity> {
        let (id, source) = Self::find_post_id(element)?;
        Some(identity_for(element, id, Self::NAME, Self::CONFIDENCE, source))
    }
}

// ============================================================================
// DOM structure
// ============================================================================

/// Finds the closest post container and reads its permalink.
#[derive(Debug, Default)]
pub struct DomStructureStrategy;

impl DomStructureStrategy {
    /// Strategy name.
    pub const NAME: &'static str = "dom-structure";
    /// Confidence of identities from this strategy.
    pub const CONFIDENCE: f64 = 0.6;

    /// Finds a post id and the place it came from.
    pub fn find_post_id<E: ElementQuery>(element: &E) -> Option<(String, &'static str)> {
        let container = closest_container(element)?;
        permalink_time_id(&container)
            .map(|id| (id, "permalink-time"))
            .or_else(|| status_link_id(&container).map(|id| (id, "status-link")))
    }
}

impl IdentityStrategy for DomStructureStrategy {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn priority(&self) -> u32 {
        3
    }

    fn resolve(&self, element: &Element) -> Option<Identity> {
        let (id, source) = Self::find_post_id(element)?;
        Some(identity_for(element, id, Self::NAME, Self::CONFIDENCE, source))
    }
}

// ============================================================================
// Data attribute
// ============================================================================

/// Scans ancestors for numeric post-id data attributes.
#[derive(Debug, Default)]
pub struct DataAttributeStrategy;

impl DataAttributeStrategy {
    /// Strategy name.
    pub const NAME: &'static str = "data-attribute";
    /// Confidence of identities from this strategy.
    pub const CONFIDENCE: f64 = 0.5;

    const ID_ATTRIBUTES: [&'static str; 3] = ["data-tweet-id", "data-item-id", "data-post-id"];

    /// Finds a post id on the element or one of its ancestors.
    pub fn find_post_id<E: ElementQuery>(element: &E) -> Option<String> {
        find_in_ancestors(element, DATA_ATTRIBUTE_DEPTH, |node| {
            Self::ID_ATTRIBUTES
                .iter()
                .find_map(|name| numeric_attr(node, name))
        })
    }
}

impl IdentityStrategy for DataAttributeStrategy {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn priority(&self) -> u32 {
        4
    }

    fn resolve(&self, element: &Element) -> Option<Identity> {
        let id = Self::find_post_id(element)?;
        Some(identity_for(element, id, Self::NAME, Self::CONFIDENCE, "ancestor-attribute"))
    }
}

// ============================================================================
// Parent traversal
// ============================================================================

/// Last resort: any status link under any of the nearest ancestors.
#[derive(Debug, Default)]
pub struct ParentTraversalStrategy;

impl ParentTraversalStrategy {
    /// Strategy name.
    pub const NAME: &'static str = "parent-traversal";
    /// Confidence of identities from this strategy.
    pub const CONFIDENCE: f64 = 0.25;

    /// Finds a post id in the subtree of the element or an ancestor.
    pub fn find_post_id<E: ElementQuery>(element: &E) -> Option<String> {
        find_in_ancestors(element, PARENT_TRAVERSAL_DEPTH, |node| {
            node.attr("href")
                .as_deref()
                .and_then(status_id_from_href)
                .or_else(|| status_link_id(node))
        })
    }
}

impl IdentityStrategy for ParentTraversalStrategy {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn priority(&self) -> u32 {
        5
    }

    fn resolve(&self, element: &Element) -> Option<Identity> {
        let id = Self::find_post_id(element)?;
        Some(identity_for(element, id, Self::NAME, Self::CONFIDENCE, "ancestor-link"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use galleria_core::Document;

    fn pick(html: &str, page_url: Option<&str>, selector: &str) -> Element {
        Document::parse(html, page_url).select_first(selector).unwrap()
    }

    #[test]
    fn test_clicked_element_attribute() {
        let el = pick(r#"<div data-item-id="111"></div>"#, None, "div");
        let identity = ClickedElementStrategy.resolve(&el).unwrap();
        assert_eq!(identity.id, "111");
        assert_eq!(identity.resolution_method, "clicked-element");
        assert!((identity.confidence - 0.9).abs() < f64::EPSILON);
        assert_eq!(identity.meta.get("source").map(String::as_str), Some("data-attribute"));
    }

    #[test]
    fn test_clicked_element_aria_and_href() {
        let el = pick(r#"<div aria-labelledby="id__222"></div>"#, None, "div");
        assert_eq!(ClickedElementStrategy.resolve(&el).unwrap().id, "222");

        let el = pick(r#"<a href="/ann/status/333">x</a>"#, None, "a");
        let identity = ClickedElementStrategy.resolve(&el).unwrap();
        assert_eq!(identity.id, "333");
        assert_eq!(identity.author, "ann");
        assert_eq!(identity.canonical_url, "https://x.com/ann/status/333");
    }

    #[test]
    fn test_clicked_element_container_is_bounded() {
        let mut html = String::from(r#"<article><a href="/bo/status/444">t</a>"#);
        for _ in 0..12 {
            html.push_str("<div>");
        }
        html.push_str(r#"<img id="deep">"#);
        for _ in 0..12 {
            html.push_str("</div>");
        }
        html.push_str("</article>");

        let deep = pick(&html, None, "#deep");
        assert!(ClickedElementStrategy.resolve(&deep).is_none());
        // The unbounded structure strategy still finds it.
        assert_eq!(DomStructureStrategy.resolve(&deep).unwrap().id, "444");
    }

    #[test]
    fn test_url_based_link_and_media_page() {
        let el = pick(
            r#"<a href="/cy/status/555/photo/1"><img></a>"#,
            None,
            "img",
        );
        assert_eq!(UrlBasedStrategy.resolve(&el).unwrap().id, "555");

        let el = pick("<div><img></div>", Some("https://x.com/cy/status/666/photo/2"), "img");
        let identity = UrlBasedStrategy.resolve(&el).unwrap();
        assert_eq!(identity.id, "666");
        assert_eq!(identity.author, "cy");

        let el = pick("<div><img></div>", Some("https://x.com/cy/status/666"), "img");
        assert!(UrlBasedStrategy.resolve(&el).is_none());
    }

    #[test]
    fn test_dom_structure_prefers_permalink_time() {
        let el = pick(
            r#"<article>
                 <a href="/q/status/1">quoted</a>
                 <a href="/dee/status/777"><time>1h</time></a>
                 <img>
               </article>"#,
            None,
            "img",
        );
        let identity = DomStructureStrategy.resolve(&el).unwrap();
        assert_eq!(identity.id, "777");
        assert_eq!(identity.meta.get("source").map(String::as_str), Some("permalink-time"));
    }

    #[test]
    fn test_data_attribute_walks_ancestors() {
        let el = pick(
            r#"<section data-post-id="888"><div><span><img></span></div></section>"#,
            None,
            "img",
        );
        let identity = DataAttributeStrategy.resolve(&el).unwrap();
        assert_eq!(identity.id, "888");
        assert_eq!(identity.author, "unknown");
    }

    #[test]
    fn test_parent_traversal_finds_sibling_links() {
        let el = pick(
            r#"<div><a href="/eve/status/999">t</a><div><div><img></div></div></div>"#,
            None,
            "img",
        );
        let identity = ParentTraversalStrategy.resolve(&el).unwrap();
        assert_eq!(identity.id, "999");
        assert_eq!(identity.author, "eve");
        assert!((identity.confidence - 0.25).abs() < f64::EPSILON);
    }
}
