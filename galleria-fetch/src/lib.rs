// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # Galleria Fetch
//!
//! Strategy execution infrastructure for Galleria.
//!
//! ## Identity
//!
//! - [`identity::IdentityStrategy`] - Trait for finding the post behind an element
//! - [`identity::IdentityResolver`] - Runs identity strategies in priority order
//!
//! ## Strategy Chain
//!
//! The chain executes media strategies in priority order:
//!
//! - [`strategy::MediaStrategy`] - Trait for media strategy implementations
//! - [`chain::StrategyChain`] - Executes strategies until one succeeds
//! - [`retry::WithRetry`] - Retry decorator for a single strategy
//! - [`context::ExtractionSettings`] - Timeouts and retry budget
//!
//! ## Host APIs
//!
//! - [`host::http`] - HTTP client with tracing and domain allowlist
//!
//! ## Example
//!
//! ```ignore
//! use galleria_fetch::{ExtractionRequest, StrategyChain, with_retry};
//!
//! let chain = StrategyChain::builder()
//!     .enable_duplicate_guard()
//!     .add(with_retry(api_strategy, 1))
//!     .add(dom_strategy)
//!     .build();
//!
//! let outcome = chain.run(&ExtractionRequest::new(element, options)).await;
//! ```

pub mod chain;
pub mod context;
pub mod error;
pub mod host;
pub mod identity;
pub mod retry;
pub mod strategy;

// Errors
pub use error::{FetchError, HttpError};

// Host APIs
pub use host::http::HttpClient;

// Identity
pub use identity::{IdentityResolver, IdentityStrategy};

// Strategy & Chain
pub use chain::{
    CHAIN_STRATEGY_NAME, ChainMetrics, ChainMiddleware, ChainOutcome, MiddlewareAction,
    MiddlewareCalls, StrategyChain, StrategyChainBuilder,
};
pub use context::{DEFAULT_API_RETRIES, DEFAULT_TIMEOUT, ExtractionSettings};
pub use retry::{Backoff, WithRetry, with_retry};
pub use strategy::{ExtractionRequest, MediaStrategy, StrategyInfo, run_strategy};
