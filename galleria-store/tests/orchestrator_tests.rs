//! Orchestrator behaviour with inline mock strategies.

use async_trait::async_trait;
use galleria_core::{
    Clock, Document, Element, ExtractionOptions, ExtractionResult, ManualClock, MediaItem,
    MediaKind, SourceKind, SystemClock,
};
use galleria_fetch::{ExtractionRequest, FetchError, HttpError, MediaStrategy, StrategyChain, with_retry};
use galleria_store::{CacheConfig, Orchestrator};
use galleria_strategies::{DomDirectStrategy, default_identity_resolver};
use std::cell::Cell;
use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant};

const POST: &str = r#"
<article data-tweet-id="1800000000000000002">
  <div data-testid="User-Name"><a href="/leo">Leo</a></div>
  <a href="/leo/status/1800000000000000002/photo/1">
    <img id="photo" src="https://pbs.twimg.com/media/LEO1?format=jpg&name=small">
  </a>
</article>
"#;

fn clicked() -> Element {
    Document::parse(POST, Some("https://x.com/home"))
        .select_first("#photo")
        .unwrap()
}

/// API stand-in that always errors.
struct DownApi {
    calls: Rc<Cell<u32>>,
}

#[async_trait(?Send)]
impl MediaStrategy for DownApi {
    fn name(&self) -> &str {
        "twitter-api"
    }

    fn priority(&self) -> u32 {
        1
    }

    fn source_kind(&self) -> SourceKind {
        SourceKind::Api
    }

    async fn extract(&self, _request: &ExtractionRequest) -> Result<ExtractionResult, FetchError> {
        self.calls.set(self.calls.get() + 1);
        Err(FetchError::Http(HttpError::Status {
            status: 503,
            url: "https://cdn.example/tweet-result".to_string(),
        }))
    }
}

/// Sleeps, then returns one image. Counts invocations.
struct SlowStrategy {
    delay: Duration,
    calls: Rc<Cell<u32>>,
}

#[async_trait(?Send)]
impl MediaStrategy for SlowStrategy {
    fn name(&self) -> &str {
        "slow"
    }

    fn priority(&self) -> u32 {
        1
    }

    fn source_kind(&self) -> SourceKind {
        SourceKind::DomFallback
    }

    async fn extract(&self, request: &ExtractionRequest) -> Result<ExtractionResult, FetchError> {
        self.calls.set(self.calls.get() + 1);
        tokio::time::sleep(self.delay).await;
        let item = MediaItem::new(
            "slow_0",
            "https://pbs.twimg.com/media/SLOW?format=jpg&name=orig",
            MediaKind::Image,
            "slow.jpg",
        );
        Ok(ExtractionResult::success(vec![item], 0, SourceKind::DomFallback, "slow")
            .with_identity(request.identity.clone()))
    }
}

fn orchestrator_with(chain: StrategyChain) -> Orchestrator {
    Orchestrator::new(
        default_identity_resolver(),
        chain,
        CacheConfig::default(),
        Arc::new(SystemClock),
    )
}

fn slow_chain(delay: Duration, calls: &Rc<Cell<u32>>) -> StrategyChain {
    StrategyChain::builder()
        .add(SlowStrategy {
            delay,
            calls: Rc::clone(calls),
        })
        .build()
}

fn slow_orchestrator(delay: Duration, calls: &Rc<Cell<u32>>) -> Orchestrator {
    orchestrator_with(slow_chain(delay, calls))
}

// ============================================================================
// End-to-end
// ============================================================================

#[tokio::test]
async fn test_dom_fallback_after_api_exhausts_retry() {
    let api_calls = Rc::new(Cell::new(0));
    let chain = StrategyChain::builder()
        .enable_duplicate_guard()
        .add(with_retry(
            DownApi {
                calls: Rc::clone(&api_calls),
            },
            1,
        ))
        .add(DomDirectStrategy)
        .build();
    let orchestrator = orchestrator_with(chain);

    let result = orchestrator.extract(&clicked(), &ExtractionOptions::default()).await;

    assert!(result.success);
    assert_eq!(result.media_items.len(), 1);
    assert_eq!(result.meta.source_kind, SourceKind::DomFallback);
    assert_eq!(result.meta.strategy_name, "dom-fallback");
    assert_eq!(result.meta.attempts, 2);
    assert_eq!(result.meta.retries, 1);
    assert_eq!(api_calls.get(), 2);
    assert_eq!(result.media_items[0].filename, "leo_1800000000000000002_1.jpg");

    let identity = result.identity.unwrap();
    assert_eq!(identity.id, "1800000000000000002");
    assert_eq!(identity.author, "leo");

    let metrics = orchestrator.metrics();
    assert_eq!(metrics.total_retries, 1);
    assert_eq!(metrics.strategy_wins.get("dom-fallback"), Some(&1));
}

// ============================================================================
// Cache
// ============================================================================

#[tokio::test]
async fn test_cache_hit_skips_chain() {
    let calls = Rc::new(Cell::new(0));
    let orchestrator = slow_orchestrator(Duration::ZERO, &calls);
    let element = clicked();

    let first = orchestrator.extract(&element, &ExtractionOptions::default()).await;
    let second = orchestrator.extract(&element, &ExtractionOptions::default()).await;

    assert!(first.success && second.success);
    assert!(!first.meta.cache_hit);
    assert!(second.meta.cache_hit);
    assert_eq!(second.meta.source_kind, SourceKind::Cache);
    assert_eq!(second.meta.strategy_name, "slow");
    assert_eq!(calls.get(), 1);
    assert_eq!(orchestrator.cache_stats().hits, 1);
}

#[tokio::test]
async fn test_cache_ttl_boundary_through_orchestrator() {
    let calls = Rc::new(Cell::new(0));
    let clock = Arc::new(ManualClock::at_millis(0));
    let orchestrator = Orchestrator::new(
        default_identity_resolver(),
        slow_chain(Duration::ZERO, &calls),
        CacheConfig::new(10, Duration::from_millis(1000)),
        Arc::clone(&clock) as Arc<dyn Clock>,
    );
    let element = clicked();
    let options = ExtractionOptions::default();

    orchestrator.extract(&element, &options).await;

    clock.advance(Duration::from_millis(999));
    let fresh = orchestrator.extract(&element, &options).await;
    assert!(fresh.meta.cache_hit);
    assert_eq!(calls.get(), 1);

    // Age counts from insertion, not from the last hit.
    clock.advance(Duration::from_millis(2));
    let stale = orchestrator.extract(&element, &options).await;
    assert!(!stale.meta.cache_hit);
    assert_eq!(stale.meta.source_kind, SourceKind::DomFallback);
    assert_eq!(calls.get(), 2);
    assert_eq!(orchestrator.cache_stats().ttl_evictions, 1);
}

#[tokio::test]
async fn test_disabled_cache_runs_every_time() {
    let calls = Rc::new(Cell::new(0));
    let orchestrator = slow_orchestrator(Duration::ZERO, &calls);
    let element = clicked();
    let options = ExtractionOptions {
        enable_cache: false,
        ..ExtractionOptions::default()
    };

    orchestrator.extract(&element, &options).await;
    let second = orchestrator.extract(&element, &options).await;

    assert!(!second.meta.cache_hit);
    assert_eq!(calls.get(), 2);
    assert_eq!(orchestrator.cache_stats().size, 0);
}

#[tokio::test]
async fn test_unresolved_identity_is_never_cached() {
    let calls = Rc::new(Cell::new(0));
    let orchestrator = slow_orchestrator(Duration::ZERO, &calls);
    let element = Document::parse(r#"<div><img id="x" src="https://pbs.twimg.com/media/Q.jpg"></div>"#, None)
        .select_first("#x")
        .unwrap();

    let first = orchestrator.extract(&element, &ExtractionOptions::default()).await;
    orchestrator.extract(&element, &ExtractionOptions::default()).await;

    assert!(first.success);
    assert!(first.identity.is_none());
    assert_eq!(calls.get(), 2);
    assert_eq!(orchestrator.metrics().identity_failures, 2);
    assert_eq!(orchestrator.cache_stats().size, 0);
}

// ============================================================================
// Concurrency
// ============================================================================

#[tokio::test]
async fn test_concurrent_requests_share_one_run() {
    let calls = Rc::new(Cell::new(0));
    let orchestrator = slow_orchestrator(Duration::from_millis(30), &calls);
    let element = clicked();
    let options = ExtractionOptions::default();

    let (a, b) = tokio::join!(
        orchestrator.extract(&element, &options),
        orchestrator.extract(&element, &options)
    );

    assert!(a.success && b.success);
    assert_eq!(a.media_items, b.media_items);
    assert_eq!(calls.get(), 1);
    assert_eq!(orchestrator.metrics().dedup_joins, 1);
    assert_eq!(orchestrator.in_flight(), 0);
}

#[tokio::test]
async fn test_joiner_honors_own_timeout() {
    let calls = Rc::new(Cell::new(0));
    let orchestrator = slow_orchestrator(Duration::from_millis(300), &calls);
    let element = clicked();
    let leader_options = ExtractionOptions::default();
    let joiner_options = ExtractionOptions {
        timeout: Some(Duration::from_millis(20)),
        ..ExtractionOptions::default()
    };

    let (leader, (joiner, waited)) = tokio::join!(
        orchestrator.extract(&element, &leader_options),
        async {
            let started = Instant::now();
            let result = orchestrator.extract(&element, &joiner_options).await;
            (result, started.elapsed())
        }
    );

    assert!(!joiner.success);
    assert!(joiner.error().unwrap().contains("timed out after 20ms"));
    assert_eq!(joiner.meta.source_kind, SourceKind::StrategyChain);
    assert!(joiner.identity.is_some());
    assert!(waited < Duration::from_millis(250));

    assert!(leader.success);
    assert_eq!(calls.get(), 1);

    let metrics = orchestrator.metrics();
    assert_eq!(metrics.dedup_joins, 1);
    assert_eq!(metrics.timeouts, 1);
    assert_eq!(orchestrator.cache_stats().size, 1);
}

#[tokio::test]
async fn test_timeout_yields_failure() {
    let calls = Rc::new(Cell::new(0));
    let orchestrator = slow_orchestrator(Duration::from_millis(500), &calls);
    let options = ExtractionOptions {
        timeout: Some(Duration::from_millis(20)),
        ..ExtractionOptions::default()
    };

    let result = orchestrator.extract(&clicked(), &options).await;

    assert!(!result.success);
    assert!(result.media_items.is_empty());
    assert_eq!(result.meta.source_kind, SourceKind::StrategyChain);
    assert!(result.error().unwrap().contains("timed out"));
    assert!(result.identity.is_some());

    let metrics = orchestrator.metrics();
    assert_eq!(metrics.timeouts, 1);
    assert_eq!(metrics.failures, 1);
    assert_eq!(orchestrator.cache_stats().size, 0);
    assert_eq!(orchestrator.in_flight(), 0);
}

// ============================================================================
// Metrics
// ============================================================================

#[tokio::test]
async fn test_metrics_report_interval() {
    let calls = Rc::new(Cell::new(0));
    let orchestrator = slow_orchestrator(Duration::ZERO, &calls).with_report_interval(2);
    let element = clicked();

    let mut reports = Vec::new();
    for _ in 0..5 {
        orchestrator.extract(&element, &ExtractionOptions::default()).await;
        reports.push(orchestrator.metrics().reports);
    }
    assert_eq!(reports, vec![0, 1, 1, 2, 2]);

    let silent = slow_orchestrator(Duration::ZERO, &calls).with_report_interval(0);
    silent.extract(&element, &ExtractionOptions::default()).await;
    silent.extract(&element, &ExtractionOptions::default()).await;
    assert_eq!(silent.metrics().reports, 0);
}
