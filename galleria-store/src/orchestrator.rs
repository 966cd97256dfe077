//! Top-level extraction flow.
//!
//! ```text
//! element -> identity -> cache (hit: return) -> in-flight map (join)
//!         -> strategy chain under a timeout -> cache store -> result
//! ```
//!
//! Everything runs on one thread. Cache and metrics bookkeeping is
//! synchronous; the only suspension points are inside the chain and the
//! timeout timer. Two requests for the same post that overlap share one
//! chain run; each caller still waits no longer than its own timeout.
//!
//! The in-flight map only holds weak handles. A run whose callers have all
//! gone away is dropped rather than kept alive by the map.

use futures::future::{FutureExt, LocalBoxFuture, Shared, WeakShared};
use galleria_core::{Clock, Element, ExtractionOptions, ExtractionResult, Identity, SourceKind};
use galleria_fetch::{
    CHAIN_STRATEGY_NAME, ChainMetrics, DEFAULT_TIMEOUT, ExtractionRequest, IdentityResolver,
    StrategyChain,
};
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

use crate::cache::{CacheConfig, CacheStats, ResultCache};

/// Default number of extractions between metrics reports.
pub const DEFAULT_REPORT_INTERVAL: u32 = 25;

type Run = LocalBoxFuture<'static, ExtractionResult>;

// ============================================================================
// Metrics
// ============================================================================

/// Aggregate counters across all extractions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestratorMetrics {
    /// Calls to `extract`.
    pub extractions: u64,
    /// Extractions that returned media.
    pub successes: u64,
    /// Extractions that returned a failure.
    pub failures: u64,
    /// Extractions answered from the cache.
    pub cache_hits: u64,
    /// Extractions that joined a run already in flight.
    pub dedup_joins: u64,
    /// Chain runs cut short by the timeout.
    pub timeouts: u64,
    /// Extractions without a resolvable identity.
    pub identity_failures: u64,
    /// Chain runs started.
    pub chain_runs: u64,
    /// Wins per strategy name.
    pub strategy_wins: BTreeMap<String, u64>,
    /// Retries across all chain runs.
    pub total_retries: u64,
    /// Duplicate-guard skips across all chain runs.
    pub duplicate_skipped: u64,
    /// Summed wall time of all extractions.
    pub total_processing_time_ms: u64,
    /// Periodic metrics reports logged.
    pub reports: u64,
}

impl OrchestratorMetrics {
    fn record_chain(&mut self, chain: &ChainMetrics) {
        self.chain_runs += 1;
        self.total_retries += u64::from(chain.total_retries());
        self.duplicate_skipped += u64::from(chain.duplicate_skipped);
        if let Some(winner) = &chain.success_strategy {
            *self.strategy_wins.entry(winner.clone()).or_default() += 1;
        }
    }

    /// Mean wall time per extraction in milliseconds.
    pub fn average_processing_time_ms(&self) -> u64 {
        self.total_processing_time_ms
            .checked_div(self.extractions)
            .unwrap_or(0)
    }
}

/// Orchestrator and cache counters together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSummary {
    /// Orchestrator counters.
    pub orchestrator: OrchestratorMetrics,
    /// Result cache counters.
    pub cache: CacheStats,
}

// ============================================================================
// Orchestrator
// ============================================================================

struct Inner {
    resolver: IdentityResolver,
    chain: StrategyChain,
    cache: RefCell<ResultCache>,
    in_flight: RefCell<HashMap<String, WeakShared<Run>>>,
    metrics: RefCell<OrchestratorMetrics>,
    clock: Arc<dyn Clock>,
    default_timeout: Cell<Duration>,
    report_interval: Cell<u32>,
}

/// Resolves identities, consults the cache and runs the chain.
///
/// Cheap to clone; clones share cache, metrics and in-flight runs.
#[derive(Clone)]
pub struct Orchestrator {
    inner: Rc<Inner>,
}

impl Orchestrator {
    /// Creates an orchestrator with an empty cache.
    pub fn new(
        resolver: IdentityResolver,
        chain: StrategyChain,
        cache_config: CacheConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            inner: Rc::new(Inner {
                resolver,
                chain,
                cache: RefCell::new(ResultCache::new(cache_config, Arc::clone(&clock))),
                in_flight: RefCell::new(HashMap::new()),
                metrics: RefCell::new(OrchestratorMetrics::default()),
                clock,
                default_timeout: Cell::new(DEFAULT_TIMEOUT),
                report_interval: Cell::new(DEFAULT_REPORT_INTERVAL),
            }),
        }
    }

    /// Sets the timeout used when the caller passes none.
    #[must_use]
    pub fn with_default_timeout(self, timeout: Duration) -> Self {
        self.inner.default_timeout.set(timeout);
        self
    }

    /// Sets how many extractions pass between metrics reports; 0 disables.
    #[must_use]
    pub fn with_report_interval(self, interval: u32) -> Self {
        self.inner.report_interval.set(interval);
        self
    }

    /// Extracts the media of the post behind `element`.
    ///
    /// Never fails: problems surface as a result with `success == false`.
    #[instrument(skip_all, fields(cache = options.enable_cache))]
    pub async fn extract(&self, element: &Element, options: &ExtractionOptions) -> ExtractionResult {
        let start = Instant::now();
        let inner = &self.inner;
        inner.metrics.borrow_mut().extractions += 1;

        let mut result = match inner.resolver.resolve(element) {
            None => {
                // Without a key there is nothing to cache or share.
                inner.metrics.borrow_mut().identity_failures += 1;
                debug!("Identity unresolved, running uncached");
                Rc::clone(inner).run_chain(inner.request(element, options, None), None).await
            }
            Some(identity) => {
                let key = identity.cache_key();
                let cached = if options.enable_cache {
                    inner.cache.borrow_mut().get(&key)
                } else {
                    None
                };

                if let Some(mut cached) = cached {
                    debug!(key = %key, "Serving cached result");
                    inner.metrics.borrow_mut().cache_hits += 1;
                    cached.meta.cache_hit = true;
                    cached.meta.source_kind = SourceKind::Cache;
                    cached
                } else if let Some(run) = inner.joinable(&key) {
                    debug!(key = %key, "Joining extraction in flight");
                    inner.metrics.borrow_mut().dedup_joins += 1;
                    let timeout = inner.timeout_for(options);
                    match tokio::time::timeout(timeout, run).await {
                        Ok(result) => result,
                        Err(_) => {
                            warn!(
                                key = %key,
                                timeout_ms = timeout.as_millis(),
                                "Joined extraction timed out"
                            );
                            inner.timeout_failure(timeout, Some(identity))
                        }
                    }
                } else {
                    let request = inner.request(element, options, Some(identity));
                    let run = Rc::clone(inner)
                        .run_chain(request, Some(key.clone()))
                        .boxed_local()
                        .shared();
                    inner.track(key, &run);
                    run.await
                }
            }
        };

        result.meta.total_processing_time_ms =
            u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
        inner.record_outcome(&result);
        inner.maybe_report();
        result
    }

    /// Aggregate counters.
    pub fn metrics(&self) -> OrchestratorMetrics {
        self.inner.metrics.borrow().clone()
    }

    /// Cache counters.
    pub fn cache_stats(&self) -> CacheStats {
        self.inner.cache.borrow().stats()
    }

    /// Orchestrator and cache counters together.
    pub fn metrics_summary(&self) -> MetricsSummary {
        MetricsSummary {
            orchestrator: self.metrics(),
            cache: self.cache_stats(),
        }
    }

    /// Drops every cached result.
    pub fn clear_cache(&self) {
        self.inner.cache.borrow_mut().clear();
    }

    /// Number of chain runs currently in flight.
    pub fn in_flight(&self) -> usize {
        self.inner
            .in_flight
            .borrow()
            .values()
            .filter(|run| run.upgrade().is_some())
            .count()
    }

    /// The chain this orchestrator runs.
    pub fn chain(&self) -> &StrategyChain {
        &self.inner.chain
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("chain", &self.inner.chain)
            .field("default_timeout", &self.inner.default_timeout.get())
            .field("in_flight", &self.in_flight())
            .finish_non_exhaustive()
    }
}

impl Inner {
    fn request(
        &self,
        element: &Element,
        options: &ExtractionOptions,
        identity: Option<Identity>,
    ) -> ExtractionRequest {
        ExtractionRequest::new(element.clone(), options.clone())
            .with_identity(identity)
            .with_clock(Arc::clone(&self.clock))
    }

    fn timeout_for(&self, options: &ExtractionOptions) -> Duration {
        options.timeout.unwrap_or_else(|| self.default_timeout.get())
    }

    /// A live run for `key`, if one is in flight.
    fn joinable(&self, key: &str) -> Option<Shared<Run>> {
        self.in_flight.borrow().get(key).and_then(WeakShared::upgrade)
    }

    fn track(&self, key: String, run: &Shared<Run>) {
        let mut in_flight = self.in_flight.borrow_mut();
        // Runs abandoned by every caller leave dead handles behind.
        in_flight.retain(|_, weak| weak.upgrade().is_some());
        if let Some(weak) = run.downgrade() {
            in_flight.insert(key, weak);
        }
    }

    fn timeout_failure(&self, timeout: Duration, identity: Option<Identity>) -> ExtractionResult {
        self.metrics.borrow_mut().timeouts += 1;
        let mut result = ExtractionResult::failure(
            SourceKind::StrategyChain,
            CHAIN_STRATEGY_NAME,
            format!("Extraction timed out after {}ms", timeout.as_millis()),
        )
        .with_identity(identity);
        result.meta.resolved_at = self.clock.now();
        result
    }

    async fn run_chain(self: Rc<Self>, request: ExtractionRequest, key: Option<String>) -> ExtractionResult {
        let timeout = self.timeout_for(&request.options);

        let mut result = match tokio::time::timeout(timeout, self.chain.run(&request)).await {
            Ok(outcome) => {
                let retries = outcome.metrics.total_retries();
                self.metrics.borrow_mut().record_chain(&outcome.metrics);
                let mut result = outcome.result;
                result.meta.retries = retries;
                result.meta.attempts = 1 + retries;
                result
            }
            Err(_) => {
                warn!(
                    extraction_id = %request.extraction_id,
                    timeout_ms = timeout.as_millis(),
                    "Extraction timed out"
                );
                self.timeout_failure(timeout, None)
            }
        };

        if result.identity.is_none() {
            result.identity.clone_from(&request.identity);
        }

        if let Some(key) = key {
            if result.success && request.options.enable_cache {
                self.cache.borrow_mut().set(key.clone(), result.clone());
            }
            self.in_flight.borrow_mut().remove(&key);
        }
        result
    }

    fn record_outcome(&self, result: &ExtractionResult) {
        let mut metrics = self.metrics.borrow_mut();
        if result.success {
            metrics.successes += 1;
        } else {
            metrics.failures += 1;
        }
        metrics.total_processing_time_ms += result.meta.total_processing_time_ms;
    }

    fn maybe_report(&self) {
        let interval = u64::from(self.report_interval.get());
        let mut metrics = self.metrics.borrow_mut();
        if interval == 0 || metrics.extractions % interval != 0 {
            return;
        }
        metrics.reports += 1;
        let cache = self.cache.borrow().stats();
        info!(
            extractions = metrics.extractions,
            successes = metrics.successes,
            failures = metrics.failures,
            cache_hits = metrics.cache_hits,
            dedup_joins = metrics.dedup_joins,
            timeouts = metrics.timeouts,
            retries = metrics.total_retries,
            avg_ms = metrics.average_processing_time_ms(),
            hit_ratio = cache.hit_ratio,
            lru_evictions = cache.lru_evictions,
            ttl_evictions = cache.ttl_evictions,
            cache_size = cache.size,
            "Extraction metrics"
        );
    }
}
