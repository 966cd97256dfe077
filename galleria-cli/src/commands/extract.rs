//! Extract command - resolve the media behind a clicked element.

use anyhow::{Context, Result};
use clap::Args;
use galleria_core::{Document, ExtractionOptions};
use galleria_store::{EngineSettings, MediaService};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

use crate::output::{ExtractOutput, JsonFormatter, TextFormatter};
use crate::{Cli, ExitCode, OutputFormat};

/// Arguments for the extract command.
#[derive(Args)]
pub struct ExtractArgs {
    /// Saved HTML page.
    pub html_file: PathBuf,

    /// CSS selector of the clicked element (first match is used).
    #[arg(long, short)]
    pub selector: String,

    /// URL the page was saved from.
    #[arg(long)]
    pub page_url: Option<String>,

    /// Bypass the result cache.
    #[arg(long)]
    pub no_cache: bool,

    /// Bound on each extraction in milliseconds.
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Leave the platform API out of the chain.
    #[arg(long)]
    pub offline: bool,

    /// Run the extraction this many times (exercises the cache).
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub repeat: u32,
}

impl ExtractArgs {
    fn options(&self) -> ExtractionOptions {
        ExtractionOptions {
            timeout: self.timeout_ms.map(Duration::from_millis),
            enable_cache: !self.no_cache,
        }
    }
}

/// Runs the extract command.
pub async fn run(args: &ExtractArgs, settings: &EngineSettings, cli: &Cli) -> Result<ExitCode> {
    let html = tokio::fs::read_to_string(&args.html_file)
        .await
        .with_context(|| format!("Failed to read {}", args.html_file.display()))?;

    let document = Document::parse(&html, args.page_url.as_deref());
    let element = document
        .select_first(&args.selector)
        .with_context(|| format!("No element for selector {:?}", args.selector))?;
    debug!(selector = %args.selector, element = ?element, "Clicked element selected");

    let mut settings = settings.clone();
    if args.offline {
        settings.api.enabled = false;
    }
    let service = MediaService::from_settings(&settings)?;

    let options = args.options();
    let mut last = None;
    for pass in 1..=args.repeat {
        let result = service
            .extract_from_clicked_element(&element, Some(options.clone()))
            .await;
        info!(
            pass,
            success = result.success,
            source = %result.meta.source_kind,
            cache_hit = result.meta.cache_hit,
            ms = result.meta.total_processing_time_ms,
            "Extraction finished"
        );
        last = Some(result);
    }
    let Some(result) = last else {
        anyhow::bail!("Nothing was extracted");
    };

    let metrics = cli.verbose.then(|| service.metrics_summary());
    match cli.format {
        OutputFormat::Text => {
            let formatter = TextFormatter::new(!cli.no_color);
            println!("{}", formatter.format_result(&result));
            if let Some(metrics) = &metrics {
                println!();
                println!("{}", formatter.format_metrics(metrics));
            }
        }
        OutputFormat::Json => {
            let output = ExtractOutput {
                runs: args.repeat,
                result: &result,
                metrics,
            };
            println!("{}", JsonFormatter::new(cli.pretty).format(&output)?);
        }
    }

    Ok(if result.success {
        ExitCode::Success
    } else {
        ExitCode::NoMedia
    })
}
