//! Shared lookups for identity strategies: post links, usernames, containers.
//!
//! Everything here is generic over [`ElementQuery`] so it runs against the
//! scraper-backed [`galleria_core::Element`] and hand-built fakes alike.

use galleria_core::ElementQuery;
use regex::Regex;
use std::sync::LazyLock;
use url::Url;

/// Selector for a post container. The innermost match wins for quotes.
pub const CONTAINER_SELECTOR: &str = r#"[data-testid="tweet"], article"#;

/// Selector for links to a post.
pub const STATUS_LINK_SELECTOR: &str = r#"a[href*="/status/"]"#;

/// Selector for the display-name block of a post.
pub const USER_NAME_LINK_SELECTOR: &str = r#"[data-testid="User-Name"] a[href^="/"]"#;

/// Ancestor depth for container lookups anchored at the clicked node.
pub const CONTAINER_SEARCH_DEPTH: usize = 10;

/// Sentinel author when nothing usable is found.
pub const UNKNOWN_AUTHOR: &str = "unknown";

/// First path segments that are site sections rather than users.
pub const RESERVED_PATHS: &[&str] = &[
    "i",
    "home",
    "explore",
    "notifications",
    "messages",
    "bookmarks",
    "lists",
    "profile",
    "more",
    "compose",
    "search",
    "settings",
    "help",
    "display",
    "moments",
    "topics",
    "login",
    "logout",
    "signup",
    "account",
    "privacy",
    "tos",
    "hashtag",
    "intent",
    "share",
    "web",
];

static STATUS_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/status/(\d+)").expect("Invalid regex"));

static STATUS_AUTHOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|/)([A-Za-z0-9_]{1,15})/status/\d+").expect("Invalid regex")
});

static MEDIA_PAGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/status/\d+/(?:photo|video)/\d+").expect("Invalid regex"));

static ARIA_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"id__(\d+)").expect("Invalid regex"));

static USERNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_]{1,15}$").expect("Invalid regex"));

// ============================================================================
// Post ids
// ============================================================================

/// Post id from a `/status/<digits>` href or URL.
pub fn status_id_from_href(href: &str) -> Option<String> {
    STATUS_ID_RE
        .captures(href)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Author segment preceding `/status/` in an href or URL.
pub fn status_author_from_href(href: &str) -> Option<String> {
    STATUS_AUTHOR_RE
        .captures(href)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|name| is_valid_username(name))
}

/// Returns true for `/status/<id>/photo/<n>` and `/video/<n>` URLs.
pub fn is_media_page(url: &str) -> bool {
    MEDIA_PAGE_RE.is_match(url)
}

/// Post id from an `aria-labelledby` value like `id__1234`.
pub fn aria_post_id(value: &str) -> Option<String> {
    ARIA_ID_RE
        .captures(value)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Value of `name` on `element` when it is a plain run of digits.
pub fn numeric_attr<E: ElementQuery>(element: &E, name: &str) -> Option<String> {
    element
        .attr(name)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()))
}

/// Post id of the first status link inside `scope`.
pub fn status_link_id<E: ElementQuery>(scope: &E) -> Option<String> {
    scope
        .query_all(STATUS_LINK_SELECTOR)
        .iter()
        .find_map(|link| link.attr("href").as_deref().and_then(status_id_from_href))
}

/// Post id of the status link wrapping a `time` element inside `scope`.
pub fn permalink_time_id<E: ElementQuery>(scope: &E) -> Option<String> {
    scope.query_all("time").iter().find_map(|time| {
        time.closest(STATUS_LINK_SELECTOR)
            .filter(|link| scope.contains(link))
            .and_then(|link| link.attr("href"))
            .as_deref()
            .and_then(status_id_from_href)
    })
}

// ============================================================================
// Containers
// ============================================================================

/// Returns true if `element` is a post container.
pub fn is_post_container<E: ElementQuery>(element: &E) -> bool {
    element.tag_name() == "article" || element.attr("data-testid").as_deref() == Some("tweet")
}

/// Nearest post container within [`CONTAINER_SEARCH_DEPTH`] levels.
pub fn bounded_container<E: ElementQuery>(element: &E) -> Option<E> {
    galleria_core::find_in_ancestors(element, CONTAINER_SEARCH_DEPTH, |node| {
        is_post_container(node).then(|| node.clone())
    })
}

/// Nearest post container at any depth.
pub fn closest_container<E: ElementQuery>(element: &E) -> Option<E> {
    element.closest(CONTAINER_SELECTOR)
}

// ============================================================================
// Authors
// ============================================================================

/// Returns true if `name` can be a username.
pub fn is_valid_username(name: &str) -> bool {
    USERNAME_RE.is_match(name) && !is_reserved(name)
}

fn is_reserved(name: &str) -> bool {
    RESERVED_PATHS
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(name))
}

/// Username of a single-segment profile href such as `/alice`.
pub fn profile_username(href: &str) -> Option<String> {
    let path = href.split(['?', '#']).next().unwrap_or(href);
    let name = path.strip_prefix('/')?.trim_end_matches('/');
    (!name.contains('/') && is_valid_username(name)).then(|| name.to_string())
}

/// First path segment of a page URL when it is a username.
pub fn page_username(page_url: &str) -> Option<String> {
    let parsed = Url::parse(page_url).ok()?;
    let first = parsed.path_segments()?.next()?;
    is_valid_username(first).then(|| first.to_string())
}

/// Resolves the author of the post around `element`.
///
/// Looks at the `User-Name` block, then status link hrefs, then plain
/// profile links inside the container, then the page URL. Without a
/// container the nearest ancestor holding a status link is searched.
pub fn resolve_author<E: ElementQuery>(element: &E, container: Option<&E>) -> String {
    let scope = container
        .cloned()
        .or_else(|| {
            galleria_core::find_in_ancestors(element, CONTAINER_SEARCH_DEPTH, |node| {
                node.query(STATUS_LINK_SELECTOR).map(|_| node.clone())
            })
        })
        .unwrap_or_else(|| element.clone());

    let from_user_name = || {
        scope
            .query_all(USER_NAME_LINK_SELECTOR)
            .iter()
            .filter_map(|link| link.attr("href"))
            .find_map(|href| profile_username(&href))
    };
    let from_status_link = || {
        element
            .attr("href")
            .into_iter()
            .chain(
                scope
                    .query_all(STATUS_LINK_SELECTOR)
                    .iter()
                    .filter_map(|link| link.attr("href")),
            )
            .find_map(|href| status_author_from_href(&href))
    };
    let from_profile_link = || {
        scope
            .query_all(r#"a[href^="/"]"#)
            .iter()
            .filter_map(|link| link.attr("href"))
            .find_map(|href| profile_username(&href))
    };
    let from_page = || element.page_url().as_deref().and_then(page_username);

    from_user_name()
        .or_else(from_status_link)
        .or_else(from_profile_link)
        .or_else(from_page)
        .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use galleria_core::Document;

    #[test]
    fn test_status_hrefs() {
        assert_eq!(status_id_from_href("/alice/status/123/photo/1").as_deref(), Some("123"));
        assert_eq!(status_id_from_href("/alice").as_deref(), None);
        assert_eq!(
            status_author_from_href("https://x.com/alice/status/9").as_deref(),
            Some("alice")
        );
        assert_eq!(status_author_from_href("/i/web/status/9"), None);
        assert!(is_media_page("https://x.com/a/status/1/photo/2"));
        assert!(!is_media_page("https://x.com/a/status/1"));
    }

    #[test]
    fn test_usernames() {
        assert!(is_valid_username("alice_01"));
        assert!(!is_valid_username("this_name_is_far_too_long"));
        assert!(!is_valid_username("explore"));
        assert!(!is_valid_username("Settings"));
        assert_eq!(profile_username("/bob").as_deref(), Some("bob"));
        assert_eq!(profile_username("/bob/"), Some("bob".to_string()));
        assert_eq!(profile_username("/bob/status/1"), None);
        assert_eq!(page_username("https://x.com/carol/status/5").as_deref(), Some("carol"));
        assert_eq!(page_username("https://x.com/home"), None);
    }

    #[test]
    fn test_aria_and_numeric_attr() {
        assert_eq!(aria_post_id("id__777 other").as_deref(), Some("777"));
        let doc = Document::parse(r#"<div data-tweet-id=" 42 " data-item-id="abc"></div>"#, None);
        let div = doc.select_first("div").unwrap();
        assert_eq!(numeric_attr(&div, "data-tweet-id").as_deref(), Some("42"));
        assert_eq!(numeric_attr(&div, "data-item-id"), None);
    }

    #[test]
    fn test_author_lookup_order() {
        let doc = Document::parse(
            r#"<article>
                 <a href="/explore">Explore</a>
                 <div data-testid="User-Name"><a href="/dana">Dana</a></div>
                 <a href="/erin/status/1">link</a>
                 <img src="x">
               </article>"#,
            Some("https://x.com/frank/status/1"),
        );
        let img = doc.select_first("img").unwrap();
        let container = closest_container(&img);
        assert_eq!(resolve_author(&img, container.as_ref()), "dana");
    }

    #[test]
    fn test_author_falls_back_to_page_then_unknown() {
        let doc = Document::parse("<div><img></div>", Some("https://x.com/gina/status/1"));
        let img = doc.select_first("img").unwrap();
        assert_eq!(resolve_author(&img, None), "gina");

        let doc = Document::parse("<div><img></div>", None);
        let img = doc.select_first("img").unwrap();
        assert_eq!(resolve_author(&img, None), UNKNOWN_AUTHOR);
    }

    #[test]
    fn test_permalink_time() {
        let doc = Document::parse(
            r#"<article><a href="/h/status/88"><time>now</time></a></article>"#,
            None,
        );
        let article = doc.select_first("article").unwrap();
        assert_eq!(permalink_time_id(&article).as_deref(), Some("88"));
    }
}
