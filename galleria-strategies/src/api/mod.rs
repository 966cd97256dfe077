//! Platform API media strategy.
//!
//! - [`client`] - [`MediaApi`] trait and its HTTP implementation
//! - [`parser`] - Syndication response decoding
//! - [`strategy`] - [`ApiStrategy`], the `twitter-api` chain entry

pub mod client;
pub mod error;
pub mod parser;
pub mod strategy;

pub use client::{DEFAULT_ENDPOINT, DisabledApi, HttpMediaApi, MediaApi};
pub use error::ApiError;
pub use parser::{ApiMedia, parse_post_response};
pub use strategy::{API_STRATEGY_NAME, ApiStrategy, api_clicked_index};
