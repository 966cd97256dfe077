//! Domain models for Galleria.
//!
//! ## Submodules
//!
//! - [`identity`] - Post identity (id, author, canonical URL)
//! - [`media`] - Media items and their kinds
//! - [`result`] - Extraction results, meta, and request options

mod identity;
mod media;
mod result;

pub use identity::{CANONICAL_HOST, Identity, canonical_post_url, is_valid_post_id};
pub use media::{MediaItem, MediaKind, MediaMeta};
pub use result::{ExtractionMeta, ExtractionOptions, ExtractionResult, SourceKind};
