//! Public entry point for click-driven media extraction.

use galleria_core::{Element, ExtractionOptions, ExtractionResult, SystemClock};
use galleria_fetch::HttpClient;
use galleria_strategies::{HttpMediaApi, MediaApi, default_chain, default_identity_resolver};
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::StoreError;
use crate::orchestrator::{MetricsSummary, Orchestrator};
use crate::settings::EngineSettings;

/// Thin façade over an [`Orchestrator`].
#[derive(Debug, Clone)]
pub struct MediaService {
    orchestrator: Orchestrator,
}

impl MediaService {
    /// Wraps an existing orchestrator.
    pub fn new(orchestrator: Orchestrator) -> Self {
        Self { orchestrator }
    }

    /// Builds the default pipeline from settings.
    ///
    /// The API strategy is wired only when `api.enabled` is set.
    ///
    /// # Errors
    ///
    /// Returns error if the settings are invalid or the HTTP client cannot
    /// be built.
    pub fn from_settings(settings: &EngineSettings) -> Result<Self, StoreError> {
        settings.validate()?;

        let api: Option<Rc<dyn MediaApi>> = if settings.api.enabled {
            let mut http = HttpClient::with_timeout(Duration::from_secs(settings.api.timeout_secs))?;
            if !settings.api.allowed_domains.is_empty() {
                http = http.with_allowed_domains(settings.api.allowed_domains.clone());
            }
            Some(Rc::new(HttpMediaApi::new(http, settings.api.endpoint.clone())))
        } else {
            debug!("Platform API disabled");
            None
        };

        Ok(Self::with_api(settings, api))
    }

    /// Builds the default pipeline with a caller-supplied API client.
    ///
    /// Settings are taken as given; call [`EngineSettings::validate`] first
    /// when they come from outside.
    pub fn with_api(settings: &EngineSettings, api: Option<Rc<dyn MediaApi>>) -> Self {
        let extraction = settings.extraction.to_settings();
        let chain = default_chain(&extraction, api);
        info!(strategies = ?chain.strategy_names(), "Media service ready");

        let orchestrator = Orchestrator::new(
            default_identity_resolver(),
            chain,
            settings.cache.to_config(),
            Arc::new(SystemClock),
        )
        .with_default_timeout(extraction.timeout)
        .with_report_interval(settings.metrics_report_interval);

        Self::new(orchestrator)
    }

    /// Extracts the media of the post the user clicked.
    pub async fn extract_from_clicked_element(
        &self,
        element: &Element,
        options: Option<ExtractionOptions>,
    ) -> ExtractionResult {
        let options = options.unwrap_or_default();
        self.orchestrator.extract(element, &options).await
    }

    /// Orchestrator and cache counters.
    pub fn metrics_summary(&self) -> MetricsSummary {
        self.orchestrator.metrics_summary()
    }

    /// The underlying orchestrator.
    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }
}
