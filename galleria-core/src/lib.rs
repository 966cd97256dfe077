// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # Galleria Core
//!
//! Core types, element handles, and media URL rules shared by every
//! Galleria crate.
//!
//! ## Key Types
//!
//! ### Identity & Results
//! - [`Identity`] - The post behind a clicked element
//! - [`MediaItem`] - One resolved media resource
//! - [`ExtractionResult`] - Outcome of an extraction
//! - [`ExtractionOptions`] - Per-call options (timeout, cache)
//! - [`SourceKind`] - Which data source produced a result
//!
//! ### Elements
//! - [`ElementQuery`] - The capability set extraction code relies on
//! - [`Document`] / [`Element`] - Parsed HTML and owned element handles
//!
//! ### Time
//! - [`Clock`] - Injectable time source

pub mod clock;
pub mod dom;
pub mod error;
pub mod media_url;
pub mod models;

// Re-export error types
pub use error::CoreError;

pub use clock::{Clock, ManualClock, SystemClock};
pub use dom::{Document, Element, ElementQuery, find_in_ancestors, inline_style_property};

pub use models::{
    // Identity
    CANONICAL_HOST,
    Identity,
    canonical_post_url,
    is_valid_post_id,
    // Media
    MediaItem,
    MediaKind,
    MediaMeta,
    // Results
    ExtractionMeta,
    ExtractionOptions,
    ExtractionResult,
    SourceKind,
};
