//! Default resolver and chain against a timeline snapshot.

use async_trait::async_trait;
use galleria_core::{Document, ExtractionOptions, MediaKind, SourceKind};
use galleria_fetch::{ExtractionRequest, ExtractionSettings, HttpError};
use galleria_strategies::api::{ApiError, ApiMedia};
use galleria_strategies::{MediaApi, default_chain, default_identity_resolver};
use std::cell::Cell;
use std::rc::Rc;

const TIMELINE: &str = r#"
<main>
  <article data-testid="tweet">
    <div data-testid="User-Name"><a href="/nadia">Nadia</a></div>
    <a href="/nadia/status/1700000000000000001"><time>2h</time></a>
    <a href="/nadia/status/1700000000000000001/photo/1">
      <div style="background-image: url('https://pbs.twimg.com/media/P1?format=jpg&name=small')"></div>
      <img id="p1" src="https://pbs.twimg.com/media/P1?format=jpg&name=small">
    </a>
    <a href="/nadia/status/1700000000000000001/photo/2">
      <img id="p2" src="https://pbs.twimg.com/media/P2?format=jpg&name=small">
    </a>
  </article>
</main>
"#;

/// API that fails `failures` times, then serves two photos.
struct CountingApi {
    failures: u32,
    calls: Rc<Cell<u32>>,
}

#[async_trait(?Send)]
impl MediaApi for CountingApi {
    async fn fetch_media(&self, _post_id: &str) -> Result<Vec<ApiMedia>, ApiError> {
        let call = self.calls.get() + 1;
        self.calls.set(call);
        if call <= self.failures {
            return Err(ApiError::Http(HttpError::Status {
                status: 503,
                url: "https://cdn.example/tweet-result".to_string(),
            }));
        }
        Ok(["P1", "P2"]
            .iter()
            .enumerate()
            .map(|(index, stem)| ApiMedia {
                index,
                media_id: None,
                kind: MediaKind::Image,
                download_url: format!("https://pbs.twimg.com/media/{stem}?format=jpg&name=orig"),
                preview_url: format!("https://pbs.twimg.com/media/{stem}.jpg"),
                width: None,
                height: None,
            })
            .collect())
    }
}

fn request_for(selector: &str) -> ExtractionRequest {
    let doc = Document::parse(TIMELINE, Some("https://x.com/home"));
    let element = doc.select_first(selector).unwrap();
    let identity = default_identity_resolver().resolve(&element);
    ExtractionRequest::new(element, ExtractionOptions::default()).with_identity(identity)
}

#[test]
fn test_identity_from_timeline() {
    let request = request_for("#p2");
    let identity = request.identity.unwrap();
    assert_eq!(identity.id, "1700000000000000001");
    assert_eq!(identity.author, "nadia");
    assert_eq!(identity.resolution_method, "clicked-element");
    assert_eq!(identity.canonical_url, "https://x.com/nadia/status/1700000000000000001");
}

#[tokio::test]
async fn test_api_recovers_within_retry_budget() {
    let calls = Rc::new(Cell::new(0));
    let api = Rc::new(CountingApi {
        failures: 1,
        calls: Rc::clone(&calls),
    });
    let chain = default_chain(&ExtractionSettings::default(), Some(api));

    let outcome = chain.run(&request_for("#p2")).await;
    assert!(outcome.is_success());
    assert_eq!(outcome.result.meta.source_kind, SourceKind::Api);
    assert_eq!(outcome.result.clicked_index, 1);
    assert_eq!(outcome.metrics.strategy_retries.get("twitter-api"), Some(&1));
    assert_eq!(calls.get(), 2);
}

#[tokio::test]
async fn test_dom_takes_over_when_api_is_down() {
    let calls = Rc::new(Cell::new(0));
    let api = Rc::new(CountingApi {
        failures: u32::MAX,
        calls: Rc::clone(&calls),
    });
    let chain = default_chain(&ExtractionSettings::default(), Some(api));

    let outcome = chain.run(&request_for("#p1")).await;
    assert!(outcome.is_success());
    assert_eq!(outcome.successful_strategy(), Some("dom-fallback"));
    assert_eq!(outcome.result.media_items.len(), 2);
    assert_eq!(outcome.result.clicked_index, 0);
    assert_eq!(
        outcome.result.media_items[0].url,
        "https://pbs.twimg.com/media/P1?format=jpg&name=orig"
    );
    assert_eq!(outcome.result.media_items[1].filename, "nadia_1700000000000000001_2.jpg");
    assert_eq!(calls.get(), 2);
}

#[tokio::test]
async fn test_offline_chain_without_identity() {
    let doc = Document::parse(TIMELINE, None);
    let element = doc.select_first("#p2").unwrap();
    let request = ExtractionRequest::new(element, ExtractionOptions::default());

    let chain = default_chain(&ExtractionSettings::default(), None);
    let outcome = chain.run(&request).await;
    assert!(outcome.is_success());
    assert_eq!(outcome.result.clicked_index, 1);
    assert!(outcome.result.identity.is_none());
}
