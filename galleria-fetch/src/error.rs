//! Fetch error types.

use std::time::Duration;
use thiserror::Error;

// ============================================================================
// Main Fetch Error
// ============================================================================

/// Error type for strategy execution.
///
/// Strategies return `Err` only for unexpected or transient problems. The
/// chain converts every `Err` into a failed `ExtractionResult`, so these
/// never escape to callers of the extraction entry point.
#[derive(Debug, Error)]
pub enum FetchError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] HttpError),

    /// Operation timed out.
    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    /// Rate limited by the platform.
    #[error("Rate limited, retry after {retry_after:?} seconds")]
    RateLimited {
        /// Seconds to wait before retrying.
        retry_after: Option<u64>,
    },

    /// Invalid response from the platform.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The request carries no resolved identity.
    #[error("No post identity available")]
    MissingIdentity,

    /// Strategy not available.
    #[error("Strategy not available: {0}")]
    StrategyNotAvailable(String),
}

impl FetchError {
    /// Returns true if retrying the same strategy may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(err) => err.is_transient(),
            Self::Timeout(_) | Self::RateLimited { .. } => true,
            _ => false,
        }
    }
}

// ============================================================================
// HTTP Error
// ============================================================================

/// HTTP-specific error type.
#[derive(Debug, Error)]
pub enum HttpError {
    /// Request error.
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    /// Non-success status code.
    #[error("Unexpected status {status} from {url}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Requested URL.
        url: String,
    },

    /// Domain not allowed.
    #[error("Domain not allowed: {0}")]
    DomainNotAllowed(String),

    /// Invalid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    Build(String),
}

impl HttpError {
    /// Returns true for connection problems, timeouts, throttling and 5xx.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Request(err) => err.is_timeout() || err.is_connect(),
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(FetchError::Timeout(Duration::from_secs(1)).is_transient());
        assert!(FetchError::RateLimited { retry_after: None }.is_transient());
        assert!(
            FetchError::Http(HttpError::Status {
                status: 503,
                url: "https://api.example.com".into()
            })
            .is_transient()
        );
        assert!(
            !FetchError::Http(HttpError::Status {
                status: 404,
                url: "https://api.example.com".into()
            })
            .is_transient()
        );
        assert!(!FetchError::MissingIdentity.is_transient());
        assert!(!FetchError::InvalidResponse("bad".into()).is_transient());
    }
}
