//! Extraction settings shared by chain construction and the orchestrator.

use std::time::Duration;

use crate::retry::Backoff;

/// Default bound on a whole extraction.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default number of API retries.
pub const DEFAULT_API_RETRIES: u32 = 1;

// ============================================================================
// Extraction Settings
// ============================================================================

/// Runtime settings for extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionSettings {
    /// Timeout applied when the caller does not pass one.
    pub timeout: Duration,
    /// Retries granted to the API strategy.
    pub api_retries: u32,
    /// Delay between API retries.
    pub retry_backoff: Duration,
    /// Whether the chain skips strategies registered twice under one name.
    pub duplicate_guard: bool,
}

impl Default for ExtractionSettings {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            api_retries: DEFAULT_API_RETRIES,
            retry_backoff: Duration::ZERO,
            duplicate_guard: true,
        }
    }
}

impl ExtractionSettings {
    /// Sets the default timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the API retry budget.
    #[must_use]
    pub fn with_api_retries(mut self, retries: u32) -> Self {
        self.api_retries = retries;
        self
    }

    /// Sets a fixed delay between API retries.
    #[must_use]
    pub fn with_retry_backoff(mut self, delay: Duration) -> Self {
        self.retry_backoff = delay;
        self
    }

    /// Disables the duplicate guard.
    #[must_use]
    pub fn without_duplicate_guard(mut self) -> Self {
        self.duplicate_guard = false;
        self
    }

    /// Backoff schedule derived from `retry_backoff`.
    pub fn backoff(&self) -> Backoff {
        if self.retry_backoff.is_zero() {
            Backoff::none()
        } else {
            Backoff::fixed(self.retry_backoff)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = ExtractionSettings::default();
        assert_eq!(settings.timeout, Duration::from_secs(10));
        assert_eq!(settings.api_retries, 1);
        assert!(settings.duplicate_guard);
        assert_eq!(settings.backoff(), Backoff::none());
    }

    #[test]
    fn test_builder() {
        let settings = ExtractionSettings::default()
            .with_timeout(Duration::from_millis(500))
            .with_api_retries(3)
            .with_retry_backoff(Duration::from_millis(50))
            .without_duplicate_guard();
        assert_eq!(settings.api_retries, 3);
        assert!(!settings.duplicate_guard);
        assert_eq!(settings.backoff().delay_for_retry(2), Duration::from_millis(50));
    }
}
