//! Strategy chain for executing media strategies in order.
//!
//! The chain takes a list of media strategies and runs them in priority
//! order until one succeeds. It never errors: when every strategy fails the
//! last failure is returned, and when nothing could run a synthetic
//! `strategy-chain` failure is produced.
//!
//! Optional features:
//! - duplicate guard: a strategy name executes at most once per run
//! - middleware: hooks before and after every strategy
//! - parallel groups: several strategies raced as one chain entry

use futures::future::{FutureExt, LocalBoxFuture};
use futures::stream::{FuturesUnordered, StreamExt};
use galleria_core::{ExtractionResult, SourceKind};
use std::collections::{BTreeMap, HashSet};
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

use crate::strategy::{ExtractionRequest, MediaStrategy, StrategyInfo, run_strategy};

/// Name stamped on results the chain synthesizes itself.
pub const CHAIN_STRATEGY_NAME: &str = "strategy-chain";

// ============================================================================
// Middleware
// ============================================================================

/// What a middleware wants done with the next strategy.
#[derive(Debug, Clone, PartialEq)]
pub enum MiddlewareAction {
    /// Run the strategy normally.
    Continue,
    /// Do not run the strategy.
    Skip,
    /// Use this result instead of running the strategy.
    ShortCircuit(ExtractionResult),
}

/// Hook around every strategy the chain runs.
pub trait ChainMiddleware {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Called before a strategy runs.
    fn before(&self, _strategy: &str, _request: &ExtractionRequest) -> MiddlewareAction {
        MiddlewareAction::Continue
    }

    /// Called with the result of every strategy that ran.
    fn after(&self, _strategy: &str, _request: &ExtractionRequest, _result: &ExtractionResult) {}
}

/// Middleware invocation counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MiddlewareCalls {
    /// `before` invocations.
    pub before: u32,
    /// `after` invocations.
    pub after: u32,
}

// ============================================================================
// Chain Metrics
// ============================================================================

/// Bookkeeping for one chain run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChainMetrics {
    /// Strategies that were invoked, in order.
    pub attempted_strategies: Vec<String>,
    /// Strategies that ended in failure, in order.
    pub failed_strategies: Vec<String>,
    /// Registrations or executions skipped by the duplicate guard.
    pub duplicate_skipped: u32,
    /// Number of strategy invocations.
    pub total_tried: u32,
    /// Retries reported by each invoked strategy.
    pub strategy_retries: BTreeMap<String, u32>,
    /// The strategy that produced the final successful result.
    pub success_strategy: Option<String>,
    /// Wall time of the run.
    pub duration: Duration,
    /// Middleware counters.
    pub middleware_calls: MiddlewareCalls,
    /// Members raced by the last parallel group that ran.
    pub group_size: Option<usize>,
    /// Parallel members dropped after another member won.
    pub losing_cancel_count: Option<usize>,
}

impl ChainMetrics {
    /// Sum of retries across all invoked strategies.
    pub fn total_retries(&self) -> u32 {
        self.strategy_retries.values().sum()
    }
}

// ============================================================================
// Chain Outcome
// ============================================================================

/// The outcome of a chain run.
#[derive(Debug, Clone)]
pub struct ChainOutcome {
    /// Final result (never an error).
    pub result: ExtractionResult,
    /// Run bookkeeping.
    pub metrics: ChainMetrics,
}

impl ChainOutcome {
    /// Returns true if a strategy succeeded.
    pub fn is_success(&self) -> bool {
        self.result.success
    }

    /// Returns the successful strategy name, if any.
    pub fn successful_strategy(&self) -> Option<&str> {
        self.metrics.success_strategy.as_deref()
    }
}

// ============================================================================
// Chain Entries
// ============================================================================

enum ChainEntry {
    Single(Box<dyn MediaStrategy>),
    Parallel {
        name: String,
        members: Vec<Box<dyn MediaStrategy>>,
    },
}

impl ChainEntry {
    fn priority(&self) -> u32 {
        match self {
            Self::Single(strategy) => strategy.priority(),
            Self::Parallel { members, .. } => {
                members.iter().map(|m| m.priority()).min().unwrap_or(u32::MAX)
            }
        }
    }

    fn names(&self) -> Vec<&str> {
        match self {
            Self::Single(strategy) => vec![strategy.name()],
            Self::Parallel { members, .. } => members.iter().map(|m| m.name()).collect(),
        }
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builds a [`StrategyChain`].
#[derive(Default)]
pub struct StrategyChainBuilder {
    entries: Vec<ChainEntry>,
    duplicate_guard: bool,
    middleware: Vec<Box<dyn ChainMiddleware>>,
}

impl StrategyChainBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a strategy.
    #[must_use]
    pub fn add<S: MediaStrategy + 'static>(self, strategy: S) -> Self {
        self.add_boxed(Box::new(strategy))
    }

    /// Adds an already boxed strategy.
    #[must_use]
    pub fn add_boxed(mut self, strategy: Box<dyn MediaStrategy>) -> Self {
        self.entries.push(ChainEntry::Single(strategy));
        self
    }

    /// Adds a group of strategies that are raced against each other.
    #[must_use]
    pub fn add_parallel(mut self, name: impl Into<String>, members: Vec<Box<dyn MediaStrategy>>) -> Self {
        if !members.is_empty() {
            self.entries.push(ChainEntry::Parallel {
                name: name.into(),
                members,
            });
        }
        self
    }

    /// Skips strategies registered or executed twice under one name.
    #[must_use]
    pub fn enable_duplicate_guard(mut self) -> Self {
        self.duplicate_guard = true;
        self
    }

    /// Installs a middleware. Middleware runs in installation order.
    #[must_use]
    pub fn use_middleware<M: ChainMiddleware + 'static>(mut self, middleware: M) -> Self {
        self.middleware.push(Box::new(middleware));
        self
    }

    /// Builds the chain, ordering entries by priority (stable).
    pub fn build(self) -> StrategyChain {
        let mut entries = self.entries;
        let mut registration_skipped = 0;

        if self.duplicate_guard {
            let mut seen: HashSet<String> = HashSet::new();
            entries.retain(|entry| match entry {
                ChainEntry::Single(strategy) => {
                    let fresh = seen.insert(strategy.name().to_string());
                    if !fresh {
                        debug!(strategy = %strategy.name(), "Duplicate registration skipped");
                        registration_skipped += 1;
                    }
                    fresh
                }
                ChainEntry::Parallel { .. } => true,
            });
        }

        entries.sort_by_key(ChainEntry::priority);

        StrategyChain {
            entries,
            duplicate_guard: self.duplicate_guard,
            registration_skipped,
            middleware: self.middleware,
        }
    }
}

// ============================================================================
// Strategy Chain
// ============================================================================

/// Priority-ordered media strategies tried until one succeeds.
pub struct StrategyChain {
    entries: Vec<ChainEntry>,
    duplicate_guard: bool,
    registration_skipped: u32,
    middleware: Vec<Box<dyn ChainMiddleware>>,
}

impl StrategyChain {
    /// Starts building a chain.
    pub fn builder() -> StrategyChainBuilder {
        StrategyChainBuilder::new()
    }

    /// Number of chain entries (a parallel group counts once).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the chain has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Strategy names in execution order (group members inline).
    pub fn strategy_names(&self) -> Vec<&str> {
        self.entries.iter().flat_map(ChainEntry::names).collect()
    }

    /// Returns information about every strategy.
    pub fn strategy_info(&self) -> Vec<StrategyInfo> {
        self.entries
            .iter()
            .flat_map(|entry| match entry {
                ChainEntry::Single(strategy) => vec![StrategyInfo::from_strategy(strategy.as_ref())],
                ChainEntry::Parallel { members, .. } => members
                    .iter()
                    .map(|m| StrategyInfo::from_strategy(m.as_ref()))
                    .collect(),
            })
            .collect()
    }

    /// Runs strategies in order until one succeeds.
    #[instrument(skip(self, request), fields(extraction_id = %request.extraction_id, entries = self.entries.len()))]
    pub async fn run(&self, request: &ExtractionRequest) -> ChainOutcome {
        let start = Instant::now();
        let mut run = ChainRun {
            metrics: ChainMetrics {
                duplicate_skipped: self.registration_skipped,
                ..ChainMetrics::default()
            },
            executed: HashSet::new(),
            last_failure: None,
        };

        debug!(strategies = ?self.strategy_names(), "Executing strategy chain");

        for entry in &self.entries {
            let winner = match entry {
                ChainEntry::Single(strategy) => self.run_single(strategy.as_ref(), request, &mut run).await,
                ChainEntry::Parallel { name, members } => {
                    self.run_parallel(name, members, request, &mut run).await
                }
            };

            if let Some((name, mut result)) = winner {
                run.metrics.duration = start.elapsed();
                run.metrics.success_strategy = Some(name.clone());
                result.meta.strategy_name = name;
                result.meta.attempted_strategies = run.metrics.attempted_strategies.clone();
                info!(
                    strategy = %result.meta.strategy_name,
                    items = result.media_items.len(),
                    tried = run.metrics.total_tried,
                    duration = ?run.metrics.duration,
                    "Strategy chain succeeded"
                );
                return ChainOutcome {
                    result,
                    metrics: run.metrics,
                };
            }
        }

        run.metrics.duration = start.elapsed();
        let mut result = run.last_failure.take().unwrap_or_else(|| {
            ExtractionResult::failure(
                SourceKind::StrategyChain,
                CHAIN_STRATEGY_NAME,
                "No strategy could handle the request",
            )
        });
        result.meta.attempted_strategies = run.metrics.attempted_strategies.clone();
        result.meta.resolved_at = request.now();

        warn!(
            tried = run.metrics.total_tried,
            failed = ?run.metrics.failed_strategies,
            error = result.error().unwrap_or_default(),
            "All strategies failed"
        );
        ChainOutcome {
            result,
            metrics: run.metrics,
        }
    }

    /// Applies the duplicate guard; returns false if `name` must be skipped.
    fn admit(&self, name: &str, run: &mut ChainRun) -> bool {
        if self.duplicate_guard && !run.executed.insert(name.to_string()) {
            debug!(strategy = %name, "Duplicate execution skipped");
            run.metrics.duplicate_skipped += 1;
            return false;
        }
        true
    }

    fn before(&self, name: &str, request: &ExtractionRequest, run: &mut ChainRun) -> MiddlewareAction {
        for middleware in &self.middleware {
            run.metrics.middleware_calls.before += 1;
            match middleware.before(name, request) {
                MiddlewareAction::Continue => {}
                action => {
                    debug!(middleware = %middleware.name(), strategy = %name, "Middleware intervened");
                    return action;
                }
            }
        }
        MiddlewareAction::Continue
    }

    fn after(&self, name: &str, request: &ExtractionRequest, result: &ExtractionResult, run: &mut ChainRun) {
        for middleware in &self.middleware {
            run.metrics.middleware_calls.after += 1;
            middleware.after(name, request, result);
        }
    }

    /// Books a finished strategy; returns the winner on success.
    fn record(
        &self,
        name: String,
        result: ExtractionResult,
        request: &ExtractionRequest,
        run: &mut ChainRun,
    ) -> Option<(String, ExtractionResult)> {
        run.metrics.attempted_strategies.push(name.clone());
        run.metrics.total_tried += 1;
        run.metrics
            .strategy_retries
            .insert(name.clone(), result.meta.retries);
        self.after(&name, request, &result, run);

        if result.success {
            return Some((name, result));
        }

        debug!(strategy = %name, error = result.error().unwrap_or_default(), "Strategy failed");
        run.metrics.failed_strategies.push(name);
        run.last_failure = Some(result);
        None
    }

    async fn run_single(
        &self,
        strategy: &dyn MediaStrategy,
        request: &ExtractionRequest,
        run: &mut ChainRun,
    ) -> Option<(String, ExtractionResult)> {
        let name = strategy.name().to_string();
        if !self.admit(&name, run) {
            return None;
        }
        if !strategy.can_handle(request) {
            debug!(strategy = %name, "Strategy cannot handle request, skipping");
            return None;
        }

        let result = match self.before(&name, request, run) {
            MiddlewareAction::Continue => {
                let attempt_start = Instant::now();
                let result = run_strategy(strategy, request).await;
                debug!(strategy = %name, success = result.success, duration = ?attempt_start.elapsed(), "Strategy finished");
                result
            }
            MiddlewareAction::Skip => return None,
            MiddlewareAction::ShortCircuit(result) => result,
        };

        self.record(name, result, request, run)
    }

    async fn run_parallel(
        &self,
        group: &str,
        members: &[Box<dyn MediaStrategy>],
        request: &ExtractionRequest,
        run: &mut ChainRun,
    ) -> Option<(String, ExtractionResult)> {
        let mut pending: FuturesUnordered<LocalBoxFuture<'_, (String, ExtractionResult)>> =
            FuturesUnordered::new();

        for member in members {
            let name = member.name().to_string();
            if !self.admit(&name, run) || !member.can_handle(request) {
                continue;
            }
            match self.before(&name, request, run) {
                MiddlewareAction::Continue => {
                    let strategy = member.as_ref();
                    pending.push(
                        async move {
                            let result = run_strategy(strategy, request).await;
                            (name, result)
                        }
                        .boxed_local(),
                    );
                }
                MiddlewareAction::Skip => {}
                MiddlewareAction::ShortCircuit(result) => {
                    pending.push(futures::future::ready((name, result)).boxed_local());
                }
            }
        }

        if pending.is_empty() {
            return None;
        }
        run.metrics.group_size = Some(pending.len());
        debug!(group = %group, size = pending.len(), "Racing parallel group");

        while let Some((name, result)) = pending.next().await {
            if let Some(winner) = self.record(name, result, request, run) {
                let losers = pending.len();
                run.metrics.losing_cancel_count = Some(losers);
                debug!(group = %group, winner = %winner.0, cancelled = losers, "Parallel group settled");
                return Some(winner);
            }
        }
        run.metrics.losing_cancel_count = Some(0);
        None
    }
}

impl std::fmt::Debug for StrategyChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrategyChain")
            .field("strategies", &self.strategy_names())
            .field("duplicate_guard", &self.duplicate_guard)
            .field("middleware", &self.middleware.len())
            .finish()
    }
}

struct ChainRun {
    metrics: ChainMetrics,
    executed: HashSet<String>,
    last_failure: Option<ExtractionResult>,
}

// ============================================================================
// Tests
// ============================================================================
