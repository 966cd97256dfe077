// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # Galleria Strategies
//!
//! Concrete identity and media strategies.
//!
//! ## Media strategies
//!
//! | Strategy | Priority | Source kind | Needs identity |
//! |----------|----------|-------------|----------------|
//! | [`ApiStrategy`] (`twitter-api`) | 1 | `api` | yes |
//! | [`DomDirectStrategy`] (`dom-fallback`) | 2 | `dom-fallback` | no |
//! | [`CssFallbackStrategy`] (`css-fallback`) | 3 | `css-fallback` | no |
//!
//! ## Usage
//!
//! ```ignore
//! use galleria_strategies::{default_chain, default_identity_resolver};
//! use galleria_fetch::ExtractionSettings;
//!
//! let resolver = default_identity_resolver();
//! let chain = default_chain(&ExtractionSettings::default(), None);
//! ```

pub mod api;
pub mod clicked;
pub mod dom_direct;
pub mod fallback;
pub mod identity;
pub mod quality;
pub mod registry;

pub use api::{ApiError, ApiStrategy, HttpMediaApi, MediaApi};
pub use dom_direct::DomDirectStrategy;
pub use fallback::CssFallbackStrategy;
pub use quality::{QualitySelection, select_best_candidate, select_best_quality};
pub use registry::{default_chain, default_identity_resolver, identity_strategies};
