//! Platform media API client.

use async_trait::async_trait;
use galleria_fetch::HttpClient;
use tracing::{debug, instrument};

use super::error::ApiError;
use super::parser::{ApiMedia, PostResponse, media_from_response};

/// Default syndication endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://cdn.syndication.twimg.com/tweet-result";

// ============================================================================
// Media API Trait
// ============================================================================

/// Source of post media by post id.
#[async_trait(?Send)]
pub trait MediaApi {
    /// Fetches the attachments of a post, in post order.
    async fn fetch_media(&self, post_id: &str) -> Result<Vec<ApiMedia>, ApiError>;
}

// ============================================================================
// HTTP Implementation
// ============================================================================

/// [`MediaApi`] backed by the syndication JSON endpoint.
#[derive(Debug, Clone)]
pub struct HttpMediaApi {
    http: HttpClient,
    endpoint: String,
}

impl HttpMediaApi {
    /// Creates a client for `endpoint`.
    pub fn new(http: HttpClient, endpoint: impl Into<String>) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
        }
    }

    /// Creates a client for [`DEFAULT_ENDPOINT`].
    pub fn with_default_endpoint(http: HttpClient) -> Self {
        Self::new(http, DEFAULT_ENDPOINT)
    }

    /// Endpoint in use.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait(?Send)]
impl MediaApi for HttpMediaApi {
    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    async fn fetch_media(&self, post_id: &str) -> Result<Vec<ApiMedia>, ApiError> {
        let response: PostResponse = self
            .http
            .get_json(&self.endpoint, &[("id", post_id), ("lang", "en")])
            .await?;
        let media = media_from_response(&response);
        debug!(count = media.len(), "API media resolved");
        Ok(media)
    }
}

// ============================================================================
// Disabled API
// ============================================================================

/// [`MediaApi`] that always refuses, used when the API is switched off.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledApi;

#[async_trait(?Send)]
impl MediaApi for DisabledApi {
    async fn fetch_media(&self, _post_id: &str) -> Result<Vec<ApiMedia>, ApiError> {
        Err(ApiError::Disabled)
    }
}
