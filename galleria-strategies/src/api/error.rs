//! Platform API errors.

use galleria_fetch::{FetchError, HttpError};
use thiserror::Error;

/// Errors from the platform media API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport or status failure.
    #[error("HTTP request failed: {0}")]
    Http(#[from] HttpError),

    /// The body could not be decoded.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The platform answered 429.
    #[error("Rate limited")]
    RateLimited,

    /// The API is switched off in settings.
    #[error("API access disabled")]
    Disabled,
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::InvalidResponse(err.to_string())
    }
}

impl From<ApiError> for FetchError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Http(HttpError::Status { status: 429, .. }) | ApiError::RateLimited => {
                FetchError::RateLimited { retry_after: None }
            }
            ApiError::Http(err) => FetchError::Http(err),
            ApiError::InvalidResponse(msg) => FetchError::InvalidResponse(msg),
            ApiError::Disabled => FetchError::StrategyNotAvailable("twitter-api".to_string()),
        }
    }
}
