//! JSON output formatting.

use anyhow::Result;
use galleria_core::ExtractionResult;
use galleria_store::MetricsSummary;
use serde::Serialize;

// ============================================================================
// Output Types
// ============================================================================

/// JSON output of the extract command.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractOutput<'a> {
    /// Number of extraction runs performed.
    pub runs: u32,
    /// Result of the last run.
    pub result: &'a ExtractionResult,
    /// Counters, in verbose mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<MetricsSummary>,
}

// ============================================================================
// Formatter
// ============================================================================

/// JSON formatter.
pub struct JsonFormatter {
    pretty: bool,
}

impl JsonFormatter {
    /// Creates a new JSON formatter.
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    /// Formats any serializable value.
    pub fn format<T: Serialize>(&self, data: &T) -> Result<String> {
        let json = if self.pretty {
            serde_json::to_string_pretty(data)?
        } else {
            serde_json::to_string(data)?
        };
        Ok(json)
    }
}
