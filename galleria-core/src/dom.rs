//! Element handles.
//!
//! Extraction logic never talks to a rendering engine. It works against the
//! [`ElementQuery`] capability set (closest-match, attribute read, child
//! query, parent walk), which keeps traversal code pure and testable with a
//! hand-written fake DOM.
//!
//! [`Element`] is the production handle: an owned, cheaply cloneable
//! reference into a parsed [`Document`].

use ego_tree::NodeId;
use scraper::{ElementRef, Html, Selector};
use std::fmt;
use std::rc::Rc;

use crate::error::CoreError;

// ============================================================================
// Element Query Capability
// ============================================================================

/// Minimal element capability used by identity and media strategies.
///
/// Implementations must be total: an invalid selector matches nothing and
/// a detached node simply has no parent.
pub trait ElementQuery: Clone {
    /// Lowercase tag name.
    fn tag_name(&self) -> String;

    /// Reads an attribute.
    fn attr(&self, name: &str) -> Option<String>;

    /// Parent element, if any.
    fn parent(&self) -> Option<Self>;

    /// Closest inclusive ancestor matching `selector`.
    fn closest(&self, selector: &str) -> Option<Self>;

    /// Descendants matching `selector`, in document order (self excluded).
    fn query_all(&self, selector: &str) -> Vec<Self>;

    /// First descendant matching `selector`.
    fn query(&self, selector: &str) -> Option<Self> {
        self.query_all(selector).into_iter().next()
    }

    /// True if `other` is this element or one of its descendants.
    fn contains(&self, other: &Self) -> bool;

    /// True if both handles point at the same node.
    fn is_same(&self, other: &Self) -> bool;

    /// URL of the page the element lives in.
    fn page_url(&self) -> Option<String>;

    /// This element followed by its ancestors, at most `max_depth` parent hops.
    fn ancestors(&self, max_depth: usize) -> Vec<Self> {
        let mut chain = vec![self.clone()];
        let mut current = self.parent();
        while let Some(node) = current {
            if chain.len() > max_depth {
                break;
            }
            current = node.parent();
            chain.push(node);
        }
        chain
    }

    /// Reads one property from the inline `style` attribute.
    fn style_property(&self, property: &str) -> Option<String> {
        self.attr("style")
            .and_then(|style| inline_style_property(&style, property))
    }
}

/// Walks from `element` up through at most `max_depth` ancestors and returns
/// the first value produced by `visit`.
pub fn find_in_ancestors<E, T, F>(element: &E, max_depth: usize, mut visit: F) -> Option<T>
where
    E: ElementQuery,
    F: FnMut(&E) -> Option<T>,
{
    element.ancestors(max_depth).iter().find_map(|node| visit(node))
}

/// Extracts a property value from an inline style declaration block.
///
/// Semicolons inside parentheses or quotes do not terminate a declaration,
/// so `url("data:image/png;base64,...")` survives intact.
pub fn inline_style_property(style: &str, property: &str) -> Option<String> {
    split_declarations(style).into_iter().find_map(|decl| {
        let (name, value) = decl.split_once(':')?;
        if name.trim().eq_ignore_ascii_case(property) {
            let value = value.trim();
            (!value.is_empty()).then(|| value.to_string())
        } else {
            None
        }
    })
}

fn split_declarations(style: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (idx, ch) in style.char_indices() {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(ch),
            (None, '(') => depth += 1,
            (None, ')') => depth = depth.saturating_sub(1),
            (None, ';') if depth == 0 => {
                parts.push(&style[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    parts.push(&style[start..]);
    parts
}

fn parse_selector(selector: &str) -> Option<Selector> {
    Selector::parse(selector).ok()
}

// ============================================================================
// Document
// ============================================================================

/// A parsed HTML document plus the URL it was loaded from.
pub struct Document {
    html: Html,
    page_url: Option<String>,
}

impl Document {
    /// Parses a full HTML document.
    pub fn parse(html: &str, page_url: Option<&str>) -> Rc<Self> {
        Rc::new(Self {
            html: Html::parse_document(html),
            page_url: page_url.map(str::to_string),
        })
    }

    /// Returns the page URL.
    pub fn page_url(&self) -> Option<&str> {
        self.page_url.as_deref()
    }

    /// Returns the `<html>` element.
    pub fn root_element(self: &Rc<Self>) -> Element {
        Element {
            doc: Rc::clone(self),
            id: self.html.root_element().id(),
        }
    }

    /// Returns every element matching `selector`, in document order.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidSelector`] if the selector does not parse.
    pub fn select_all(self: &Rc<Self>, selector: &str) -> Result<Vec<Element>, CoreError> {
        let parsed = parse_selector(selector)
            .ok_or_else(|| CoreError::InvalidSelector(selector.to_string()))?;
        Ok(self
            .html
            .select(&parsed)
            .map(|el| Element {
                doc: Rc::clone(self),
                id: el.id(),
            })
            .collect())
    }

    /// Returns the first element matching `selector`.
    ///
    /// # Errors
    ///
    /// Returns an error if the selector is invalid or nothing matches.
    pub fn select_first(self: &Rc<Self>, selector: &str) -> Result<Element, CoreError> {
        self.select_all(selector)?
            .into_iter()
            .next()
            .ok_or_else(|| CoreError::ElementNotFound(selector.to_string()))
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("page_url", &self.page_url)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Element
// ============================================================================

/// Owned handle to an element inside a [`Document`].
#[derive(Clone)]
pub struct Element {
    doc: Rc<Document>,
    id: NodeId,
}

impl Element {
    fn element_ref(&self) -> Option<ElementRef<'_>> {
        self.doc.html.tree.get(self.id).and_then(ElementRef::wrap)
    }

    fn handle(&self, id: NodeId) -> Self {
        Self {
            doc: Rc::clone(&self.doc),
            id,
        }
    }

    /// Returns the document this element belongs to.
    pub fn document(&self) -> &Rc<Document> {
        &self.doc
    }

    /// Concatenated text content.
    pub fn text(&self) -> String {
        self.element_ref()
            .map(|el| el.text().collect::<String>())
            .unwrap_or_default()
    }

    /// True if the element matches `selector`.
    pub fn matches(&self, selector: &str) -> bool {
        match (parse_selector(selector), self.element_ref()) {
            (Some(sel), Some(el)) => sel.matches(&el),
            _ => false,
        }
    }
}

impl ElementQuery for Element {
    fn tag_name(&self) -> String {
        self.element_ref()
            .map(|el| el.value().name().to_ascii_lowercase())
            .unwrap_or_default()
    }

    fn attr(&self, name: &str) -> Option<String> {
        self.element_ref()
            .and_then(|el| el.value().attr(name).map(str::to_string))
    }

    fn parent(&self) -> Option<Self> {
        let el = self.element_ref()?;
        el.parent()
            .and_then(ElementRef::wrap)
            .map(|parent| self.handle(parent.id()))
    }

    fn closest(&self, selector: &str) -> Option<Self> {
        let sel = parse_selector(selector)?;
        let el = self.element_ref()?;
        if sel.matches(&el) {
            return Some(self.clone());
        }
        el.ancestors()
            .filter_map(ElementRef::wrap)
            .find(|ancestor| sel.matches(ancestor))
            .map(|ancestor| self.handle(ancestor.id()))
    }

    fn query_all(&self, selector: &str) -> Vec<Self> {
        let (Some(sel), Some(el)) = (parse_selector(selector), self.element_ref()) else {
            return Vec::new();
        };
        el.select(&sel)
            .filter(|found| found.id() != self.id)
            .map(|found| self.handle(found.id()))
            .collect()
    }

    fn contains(&self, other: &Self) -> bool {
        if !Rc::ptr_eq(&self.doc, &other.doc) {
            return false;
        }
        if self.id == other.id {
            return true;
        }
        other
            .element_ref()
            .is_some_and(|el| el.ancestors().any(|a| a.id() == self.id))
    }

    fn is_same(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.doc, &other.doc) && self.id == other.id
    }

    fn page_url(&self) -> Option<String> {
        self.doc.page_url.clone()
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element")
            .field("tag", &self.tag_name())
            .field("id", &self.id)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
          <article data-testid="tweet" id="post">
            <a href="/jack/status/20"><time>now</time></a>
            <div class="media" style="background-image: url('https://pbs.twimg.com/media/A?name=small'); width: 10px">
              <img id="pic" src="https://pbs.twimg.com/media/A?format=jpg&name=small">
            </div>
          </article>
        </body></html>
    "#;

    #[test]
    fn test_closest_includes_self_and_ancestors() {
        let doc = Document::parse(PAGE, Some("https://x.com/home"));
        let img = doc.select_first("#pic").unwrap();

        assert!(img.closest("img").unwrap().is_same(&img));
        let article = img.closest("article").unwrap();
        assert_eq!(article.attr("id").as_deref(), Some("post"));
        assert!(article.contains(&img));
        assert!(!img.contains(&article));
        assert_eq!(img.page_url().as_deref(), Some("https://x.com/home"));
    }

    #[test]
    fn test_query_all_excludes_self() {
        let doc = Document::parse(PAGE, None);
        let article = doc.select_first("article").unwrap();
        assert!(article.query_all("article").is_empty());
        assert_eq!(article.query_all("a[href*='/status/']").len(), 1);
    }

    #[test]
    fn test_invalid_selector_matches_nothing() {
        let doc = Document::parse(PAGE, None);
        let img = doc.select_first("#pic").unwrap();
        assert!(img.closest("[[[").is_none());
        assert!(img.query_all(":::").is_empty());
        assert!(doc.select_all("[[[").is_err());
    }

    #[test]
    fn test_ancestors_is_depth_bounded() {
        let doc = Document::parse(PAGE, None);
        let img = doc.select_first("#pic").unwrap();
        // img -> div -> article -> body -> html
        assert_eq!(img.ancestors(2).len(), 3);
        assert_eq!(img.ancestors(50).len(), 5);
    }

    #[test]
    fn test_inline_style_property() {
        let style = r#"width: 10px; background-image: url("data:image/png;base64,AAA"), url(x.jpg); color: red"#;
        assert_eq!(
            inline_style_property(style, "background-image").as_deref(),
            Some(r#"url("data:image/png;base64,AAA"), url(x.jpg)"#)
        );
        assert_eq!(inline_style_property(style, "COLOR").as_deref(), Some("red"));
        assert_eq!(inline_style_property(style, "height"), None);
    }

    #[test]
    fn test_style_property_on_element() {
        let doc = Document::parse(PAGE, None);
        let div = doc.select_first("div.media").unwrap();
        let bg = div.style_property("background-image").unwrap();
        assert!(bg.starts_with("url('https://pbs.twimg.com/media/A"));
    }
}
