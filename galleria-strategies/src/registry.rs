//! Default strategy wiring.
//!
//! Identity strategies are stateless and listed once; media chains are
//! built per service because the API strategy owns a client.

use galleria_fetch::{ExtractionSettings, IdentityResolver, IdentityStrategy, StrategyChain, with_retry};
use std::rc::Rc;
use tracing::debug;

use crate::api::{ApiStrategy, MediaApi};
use crate::dom_direct::DomDirectStrategy;
use crate::fallback::CssFallbackStrategy;
use crate::identity::{
    ClickedElementStrategy, DataAttributeStrategy, DomStructureStrategy, ParentTraversalStrategy,
    UrlBasedStrategy,
};

// ============================================================================
// Identity
// ============================================================================

/// All identity strategies, most specific first.
pub fn identity_strategies() -> Vec<Box<dyn IdentityStrategy>> {
    vec![
        Box::new(ClickedElementStrategy),
        Box::new(UrlBasedStrategy),
        Box::new(DomStructureStrategy),
        Box::new(DataAttributeStrategy),
        Box::new(ParentTraversalStrategy),
    ]
}

/// Resolver running every identity strategy.
pub fn default_identity_resolver() -> IdentityResolver {
    IdentityResolver::with_strategies(identity_strategies())
}

// ============================================================================
// Media
// ============================================================================

/// Builds the default media chain.
///
/// 1. `twitter-api` (wrapped in a retry decorator), when `api` is given
/// 2. `dom-fallback`
/// 3. `css-fallback`
pub fn default_chain(settings: &ExtractionSettings, api: Option<Rc<dyn MediaApi>>) -> StrategyChain {
    let mut builder = StrategyChain::builder();
    if settings.duplicate_guard {
        builder = builder.enable_duplicate_guard();
    }

    if let Some(api) = api {
        builder = builder.add(
            with_retry(ApiStrategy::new(api), settings.api_retries).with_backoff(settings.backoff()),
        );
    }

    let chain = builder
        .add(DomDirectStrategy)
        .add(CssFallbackStrategy)
        .build();
    debug!(strategies = ?chain.strategy_names(), "Built default chain");
    chain
}
