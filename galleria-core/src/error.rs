//! Core error types for Galleria.

use thiserror::Error;

/// Core error type for Galleria operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A CSS selector could not be parsed.
    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    /// No element matched the requested selector.
    #[error("No element matches selector: {0}")]
    ElementNotFound(String),

    /// A URL could not be parsed or is not usable as media.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}
