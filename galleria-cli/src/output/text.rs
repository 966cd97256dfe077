//! Text output formatting with colors.

use galleria_core::{ExtractionResult, MediaItem};
use galleria_store::{EngineSettings, MetricsSummary};
use galleria_strategies::QualitySelection;

// ============================================================================
// ANSI Colors
// ============================================================================

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const CYAN: &str = "\x1b[36m";

/// Marker in front of the clicked item.
const CLICKED_MARKER: char = '▶';

/// Text formatter with optional colors.
pub struct TextFormatter {
    use_colors: bool,
}

impl TextFormatter {
    /// Creates a new text formatter.
    pub fn new(use_colors: bool) -> Self {
        Self { use_colors }
    }

    /// Formats an extraction result.
    pub fn format_result(&self, result: &ExtractionResult) -> String {
        let mut lines = Vec::new();

        let header = match &result.identity {
            Some(identity) => format!("Post {} by @{}", identity.id, identity.author),
            None => "Unidentified post".to_string(),
        };
        lines.push(format!("{} ({})", self.bold(&header), result.meta.strategy_name));

        if let Some(identity) = &result.identity {
            lines.push(self.dim(&format!(
                "{} via {} ({:.2})",
                identity.canonical_url, identity.resolution_method, identity.confidence
            )));
        }

        if !result.success {
            let reason = result.error().unwrap_or("unknown error");
            lines.push(self.red(&format!("✗ {reason}")));
            return lines.join("\n");
        }

        lines.push(String::new());
        for (index, item) in result.media_items.iter().enumerate() {
            lines.push(self.format_item(index, item, index == result.clicked_index));
        }

        lines.push(String::new());
        let mut footer = format!(
            "{} item{} · attempts {} · retries {} · {}ms",
            result.media_items.len(),
            if result.media_items.len() == 1 { "" } else { "s" },
            result.meta.attempts,
            result.meta.retries,
            result.meta.total_processing_time_ms
        );
        if result.meta.cache_hit {
            footer.push_str(" · cached");
        }
        lines.push(self.dim(&footer));

        lines.join("\n")
    }

    fn format_item(&self, index: usize, item: &MediaItem, clicked: bool) -> String {
        let marker = if clicked {
            self.green(&CLICKED_MARKER.to_string())
        } else {
            " ".to_string()
        };
        let size = match (item.width, item.height) {
            (Some(w), Some(h)) => format!(" {w}x{h}"),
            _ => String::new(),
        };
        format!(
            "{marker} {}. {:<15} {}{}\n     {}",
            index + 1,
            item.kind.as_str(),
            self.cyan(&item.filename),
            self.dim(&size),
            item.url
        )
    }

    /// Formats orchestrator and cache counters.
    pub fn format_metrics(&self, summary: &MetricsSummary) -> String {
        let m = &summary.orchestrator;
        let c = &summary.cache;
        let mut lines = vec![self.bold("Metrics"), "─".repeat(40)];

        lines.push(format!(
            "Extractions:  {} ({} ok, {} failed)",
            m.extractions, m.successes, m.failures
        ));
        lines.push(format!(
            "Cache:        {} hits, {} misses, ratio {:.2}",
            c.hits, c.misses, c.hit_ratio
        ));
        lines.push(format!(
            "Evictions:    {} lru, {} ttl ({}/{} entries)",
            c.lru_evictions, c.ttl_evictions, c.size, c.capacity
        ));
        lines.push(format!(
            "Joins:        {}  Timeouts: {}  Retries: {}",
            m.dedup_joins, m.timeouts, m.total_retries
        ));
        if !m.strategy_wins.is_empty() {
            let wins: Vec<String> = m
                .strategy_wins
                .iter()
                .map(|(name, count)| format!("{name}={count}"))
                .collect();
            lines.push(format!("Wins:         {}", wins.join(", ")));
        }
        lines.push(format!("Average:      {}ms", m.average_processing_time_ms()));

        lines.join("\n")
    }

    /// Formats a quality selection.
    pub fn format_quality(&self, selection: &QualitySelection) -> String {
        let mut lines = vec![
            format!("{} {}", self.bold("Best:"), self.cyan(&selection.url)),
            format!("Declared: {}", selection.original_url),
        ];
        if let Some(tier) = &selection.original_tier {
            lines.push(format!("Tier:     {tier}"));
        }
        if let (Some(w), Some(h)) = (selection.width, selection.height) {
            lines.push(format!("Size:     {w}x{h}"));
        }
        lines.push(self.dim(&format!(
            "score {} of {} candidate{}",
            selection.score,
            selection.candidate_count,
            if selection.candidate_count == 1 { "" } else { "s" }
        )));
        lines.join("\n")
    }

    /// Formats engine settings.
    pub fn format_settings(&self, settings: &EngineSettings) -> String {
        let api = if settings.api.enabled {
            self.green(&settings.api.endpoint)
        } else {
            self.dim("disabled")
        };
        [
            self.bold("Galleria Configuration"),
            "─".repeat(40),
            format!(
                "Cache:       {} entries, ttl {}ms",
                settings.cache.max_entries, settings.cache.ttl_ms
            ),
            format!("API:         {api} (timeout {}s)", settings.api.timeout_secs),
            format!(
                "Extraction:  timeout {}ms, {} retr{}, backoff {}ms",
                settings.extraction.timeout_ms,
                settings.extraction.api_retries,
                if settings.extraction.api_retries == 1 { "y" } else { "ies" },
                settings.extraction.backoff_ms
            ),
            format!("Dup guard:   {}", settings.extraction.duplicate_guard),
            format!("Reports:     every {} extractions", settings.metrics_report_interval),
            format!("Log level:   {}", settings.log_level),
        ]
        .join("\n")
    }

    // Color helpers

    fn paint(&self, color: &str, s: &str) -> String {
        if self.use_colors {
            format!("{color}{s}{RESET}")
        } else {
            s.to_string()
        }
    }

    fn bold(&self, s: &str) -> String {
        self.paint(BOLD, s)
    }

    fn dim(&self, s: &str) -> String {
        self.paint(DIM, s)
    }

    fn green(&self, s: &str) -> String {
        self.paint(GREEN, s)
    }

    fn red(&self, s: &str) -> String {
        self.paint(RED, s)
    }

    fn cyan(&self, s: &str) -> String {
        self.paint(CYAN, s)
    }
}
