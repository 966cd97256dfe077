//! Retry decorator for media strategies.
//!
//! [`WithRetry`] wraps a strategy and loops internally: a failed result or
//! a transient `Err` is retried up to `max_retries` times. A non-transient
//! `Err` (see [`FetchError::is_transient`]) ends the loop at once. The retry
//! count travels back to the chain through `meta.retries`.

use async_trait::async_trait;
use galleria_core::{ExtractionResult, SourceKind};
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::FetchError;
use crate::strategy::{ExtractionRequest, MediaStrategy};

// ============================================================================
// Backoff
// ============================================================================

/// Delay schedule between retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Whether to double the delay on each retry.
    pub exponential: bool,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
}

impl Backoff {
    /// No delay between retries.
    pub fn none() -> Self {
        Self {
            base_delay: Duration::ZERO,
            exponential: false,
            max_delay: Duration::ZERO,
        }
    }

    /// Fixed delay between retries.
    pub fn fixed(delay: Duration) -> Self {
        Self {
            base_delay: delay,
            exponential: false,
            max_delay: delay,
        }
    }

    /// Doubling delay starting at `base`, capped at `max`.
    pub fn exponential(base: Duration, max: Duration) -> Self {
        Self {
            base_delay: base,
            exponential: true,
            max_delay: max,
        }
    }

    /// Calculates the delay before retry number `retry` (1-based).
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        let delay = if self.exponential {
            let factor = 2u32.saturating_pow(retry.saturating_sub(1));
            self.base_delay.saturating_mul(factor)
        } else {
            self.base_delay
        };
        delay.min(self.max_delay)
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::none()
    }
}

// ============================================================================
// Retry Decorator
// ============================================================================

/// A strategy that retries the wrapped strategy on failure.
///
/// Name, priority and source kind are those of the wrapped strategy.
#[derive(Debug)]
pub struct WithRetry<S> {
    inner: S,
    max_retries: u32,
    backoff: Backoff,
}

/// Wraps `strategy` so it is retried up to `max_retries` times.
pub fn with_retry<S: MediaStrategy>(strategy: S, max_retries: u32) -> WithRetry<S> {
    WithRetry {
        inner: strategy,
        max_retries,
        backoff: Backoff::none(),
    }
}

impl<S> WithRetry<S> {
    /// Sets the delay schedule between retries.
    #[must_use]
    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Maximum number of retries.
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// The wrapped strategy.
    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait(?Send)]
impl<S: MediaStrategy> MediaStrategy for WithRetry<S> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn priority(&self) -> u32 {
        self.inner.priority()
    }

    fn source_kind(&self) -> SourceKind {
        self.inner.source_kind()
    }

    fn can_handle(&self, request: &ExtractionRequest) -> bool {
        self.inner.can_handle(request)
    }

    async fn extract(&self, request: &ExtractionRequest) -> Result<ExtractionResult, FetchError> {
        let mut retries = 0;
        loop {
            let mut result = match self.inner.extract(request).await {
                Ok(result) => result,
                Err(error) => {
                    let transient = error.is_transient();
                    warn!(
                        strategy = %self.inner.name(),
                        extraction_id = %request.extraction_id,
                        transient,
                        error = %error,
                        "Strategy raised an error"
                    );
                    let mut failure = ExtractionResult::failure(
                        self.inner.source_kind(),
                        self.inner.name(),
                        error.to_string(),
                    );
                    if !transient {
                        failure.meta.retries = retries;
                        return Ok(failure);
                    }
                    failure
                }
            };
            if result.success || retries >= self.max_retries {
                result.meta.retries = retries;
                return Ok(result);
            }

            retries += 1;
            let delay = self.backoff.delay_for_retry(retries);
            debug!(
                strategy = %self.inner.name(),
                retry = retries,
                max_retries = self.max_retries,
                delay = ?delay,
                error = result.error().unwrap_or_default(),
                "Retrying strategy"
            );
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
