//! Media strategy trait and request types.
//!
//! A strategy represents one way of resolving the media of a post (platform
//! API, DOM elements, inline styles). The chain tries them in priority
//! order until one succeeds.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use galleria_core::{
    Clock, Element, ExtractionOptions, ExtractionResult, Identity, SourceKind, SystemClock,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::error::FetchError;

// ============================================================================
// Extraction Request
// ============================================================================

/// Everything a strategy gets to look at.
#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    /// The element the user clicked.
    pub element: Element,
    /// Caller options.
    pub options: ExtractionOptions,
    /// Correlation id for logs.
    pub extraction_id: String,
    /// Identity of the post, when resolved.
    pub identity: Option<Identity>,
    /// Source of `resolved_at` stamps.
    pub clock: Arc<dyn Clock>,
}

impl ExtractionRequest {
    /// Creates a request with a fresh extraction id and no identity.
    pub fn new(element: Element, options: ExtractionOptions) -> Self {
        Self {
            element,
            options,
            extraction_id: Uuid::new_v4().to_string(),
            identity: None,
            clock: Arc::new(SystemClock),
        }
    }

    /// Stamps results with `clock` instead of the system clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Current time according to the request clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Attaches the resolved identity.
    #[must_use]
    pub fn with_identity(mut self, identity: Option<Identity>) -> Self {
        self.identity = identity;
        self
    }

    /// Post id, when an identity is attached.
    pub fn post_id(&self) -> Option<&str> {
        self.identity.as_ref().map(|identity| identity.id.as_str())
    }

    /// Author handle, when an identity is attached.
    pub fn author(&self) -> Option<&str> {
        self.identity.as_ref().map(|identity| identity.author.as_str())
    }
}

// ============================================================================
// Media Strategy Trait
// ============================================================================

/// One way of resolving the media of a post.
///
/// `Ok` with `success == false` is an expected failure and carries a reason
/// in `meta.error`. `Err` signals an unexpected or transient problem; the
/// chain converts it into a failed result so callers never see it.
///
/// Futures are `!Send`: element handles share their document through `Rc`,
/// so everything runs on a single-threaded runtime.
///
/// ## Implementing a Strategy
///
/// ```ignore
/// struct VideoTagStrategy;
///
/// #[async_trait(?Send)]
/// impl MediaStrategy for VideoTagStrategy {
///     fn name(&self) -> &str {
///         "video-tag"
///     }
///
///     fn priority(&self) -> u32 {
///         5
///     }
///
///     fn source_kind(&self) -> SourceKind {
///         SourceKind::DomFallback
///     }
///
///     async fn extract(&self, request: &ExtractionRequest) -> Result<ExtractionResult, FetchError> {
///         // Inspect request.element and build the result
///     }
/// }
/// ```
#[async_trait(?Send)]
pub trait MediaStrategy {
    /// Unique name of this strategy (e.g. `twitter-api`).
    fn name(&self) -> &str;

    /// Priority of this strategy (lower = tried first).
    fn priority(&self) -> u32;

    /// The data source results of this strategy come from.
    fn source_kind(&self) -> SourceKind;

    /// Quick, synchronous capability check run before `extract`.
    fn can_handle(&self, _request: &ExtractionRequest) -> bool {
        true
    }

    /// Resolves media for the request.
    async fn extract(&self, request: &ExtractionRequest) -> Result<ExtractionResult, FetchError>;
}

/// Runs a strategy, folds `Err` into a failed result and stamps
/// `resolved_at` from the request clock.
pub async fn run_strategy(
    strategy: &dyn MediaStrategy,
    request: &ExtractionRequest,
) -> ExtractionResult {
    let mut result = match strategy.extract(request).await {
        Ok(result) => result,
        Err(error) => {
            warn!(
                strategy = %strategy.name(),
                extraction_id = %request.extraction_id,
                error = %error,
                "Strategy raised an error"
            );
            ExtractionResult::failure(strategy.source_kind(), strategy.name(), error.to_string())
        }
    };
    result.meta.resolved_at = request.now();
    result
}

// ============================================================================
// Strategy Info
// ============================================================================

/// Information about a registered strategy (for reporting).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyInfo {
    /// Strategy name.
    pub name: String,
    /// Source kind.
    pub source_kind: SourceKind,
    /// Priority.
    pub priority: u32,
}

impl StrategyInfo {
    /// Creates strategy info from a strategy implementation.
    pub fn from_strategy(strategy: &dyn MediaStrategy) -> Self {
        Self {
            name: strategy.name().to_string(),
            source_kind: strategy.source_kind(),
            priority: strategy.priority(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
