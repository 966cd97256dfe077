//! Host APIs used by strategies.
//!
//! - [`http`] - HTTP client with tracing and domain allowlist

pub mod http;

pub use http::HttpClient;
