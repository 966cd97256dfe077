//! CLI output formatting tests.
//!
//! These tests verify that CLI output is correctly formatted for both
//! text and JSON output modes.

#[cfg(test)]
mod text_formatter_tests {
    use super::super::text::TextFormatter;
    use galleria_core::{ExtractionResult, Identity, MediaItem, MediaKind, SourceKind};
    use galleria_store::{EngineSettings, MetricsSummary, OrchestratorMetrics};
    use galleria_strategies::select_best_quality;

    fn two_photos() -> ExtractionResult {
        let items = (1..=2)
            .map(|n| {
                MediaItem::new(
                    format!("9_dom_{n}"),
                    format!("https://pbs.twimg.com/media/P{n}?format=jpg&name=orig"),
                    MediaKind::Image,
                    format!("mia_9_{n}.jpg"),
                )
            })
            .collect();
        ExtractionResult::success(items, 1, SourceKind::DomFallback, "dom-fallback")
            .with_identity(Some(Identity::new("9", "mia", "clicked-element", 0.9)))
    }

    #[test]
    fn test_result_marks_clicked_item() {
        let formatter = TextFormatter::new(false);
        let output = formatter.format_result(&two_photos());

        assert!(output.starts_with("Post 9 by @mia (dom-fallback)"));
        assert!(output.contains("▶ 2. image"));
        assert!(output.contains("  1. image"));
        assert!(output.contains("mia_9_2.jpg"));
        assert!(output.contains("2 items · attempts 1 · retries 0"));
        assert!(!output.contains("cached"));
    }

    #[test]
    fn test_failure_shows_reason() {
        let formatter = TextFormatter::new(false);
        let result = ExtractionResult::failure(SourceKind::StrategyChain, "strategy-chain", "All strategies failed");
        let output = formatter.format_result(&result);

        assert!(output.starts_with("Unidentified post"));
        assert!(output.contains("✗ All strategies failed"));
    }

    #[test]
    fn test_colors_toggle() {
        let plain = TextFormatter::new(false).format_result(&two_photos());
        let colored = TextFormatter::new(true).format_result(&two_photos());
        assert!(!plain.contains("\x1b["));
        assert!(colored.contains("\x1b[1m"));
    }

    #[test]
    fn test_metrics_lists_wins() {
        let mut orchestrator = OrchestratorMetrics {
            extractions: 4,
            successes: 3,
            failures: 1,
            total_processing_time_ms: 40,
            ..OrchestratorMetrics::default()
        };
        orchestrator.strategy_wins.insert("twitter-api".to_string(), 2);
        let summary = MetricsSummary {
            orchestrator,
            cache: galleria_store::CacheStats::default(),
        };

        let output = TextFormatter::new(false).format_metrics(&summary);
        assert!(output.contains("Extractions:  4 (3 ok, 1 failed)"));
        assert!(output.contains("Wins:         twitter-api=2"));
        assert!(output.contains("Average:      10ms"));
    }

    #[test]
    fn test_quality_output() {
        let selection = select_best_quality(
            "url('https://pbs.twimg.com/media/Q?format=jpg&name=small'), url('https://pbs.twimg.com/media/Q?format=jpg&name=large')",
        )
        .unwrap();
        let output = TextFormatter::new(false).format_quality(&selection);

        assert!(output.contains("Best: https://pbs.twimg.com/media/Q?format=jpg&name=orig"));
        assert!(output.contains("Tier:     large"));
        assert!(output.contains("of 2 candidates"));
    }

    #[test]
    fn test_settings_output() {
        let mut settings = EngineSettings::default();
        settings.api.enabled = false;
        let output = TextFormatter::new(false).format_settings(&settings);

        assert!(output.contains("Cache:       50 entries, ttl 300000ms"));
        assert!(output.contains("API:         disabled"));
        assert!(output.contains("1 retry"));
    }
}

#[cfg(test)]
mod json_formatter_tests {
    use super::super::json::{ExtractOutput, JsonFormatter};
    use galleria_core::{ExtractionResult, MediaItem, MediaKind, SourceKind};

    #[test]
    fn test_extract_output_shape() {
        let item = MediaItem::new("1", "https://video.twimg.com/v.mp4", MediaKind::Video, "v.mp4");
        let result = ExtractionResult::success(vec![item], 0, SourceKind::Api, "twitter-api");
        let output = ExtractOutput {
            runs: 1,
            result: &result,
            metrics: None,
        };

        let json = JsonFormatter::new(false).format(&output).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["runs"], 1);
        assert_eq!(value["result"]["success"], true);
        assert_eq!(value["result"]["clickedIndex"], 0);
        assert_eq!(value["result"]["mediaItems"][0]["kind"], "video");
        assert!(value.get("metrics").is_none());
    }

    #[test]
    fn test_pretty_printing() {
        let formatter = JsonFormatter::new(true);
        let json = formatter.format(&serde_json::json!({"a": 1})).unwrap();
        assert!(json.contains('\n'));
        assert!(!JsonFormatter::new(false).format(&serde_json::json!({"a": 1})).unwrap().contains('\n'));
    }
}
