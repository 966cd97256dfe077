// Lint configuration for this crate
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! Galleria CLI - media extraction from saved pages.
//!
//! # Examples
//!
//! ```bash
//! # Extract the post behind the clicked image
//! galleria extract timeline.html --selector '#photo-2'
//!
//! # Same, DOM only, as JSON
//! galleria extract timeline.html -s 'img[alt="Image"]' --offline --format json --pretty
//!
//! # Pick the best candidate of a background-image declaration
//! galleria quality "url(a?name=small), url(a?name=large)"
//!
//! # Create the settings file
//! galleria config init
//! ```

mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use galleria_store::{EngineSettings, LogLevel, default_settings_path};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use commands::{config, extract, quality};

// ============================================================================
// CLI Definition
// ============================================================================

/// Galleria CLI - click-driven media extraction.
#[derive(Parser)]
#[command(name = "galleria")]
#[command(about = "Resolve the media of a clicked post")]
#[command(long_about = r#"
Galleria finds the post behind a clicked element and resolves its media.

Strategies, in order:
  • Platform API (twitter-api), retried once
  • DOM elements (dom-fallback)
  • Inline background images (css-fallback)

Examples:
  galleria extract page.html -s '#photo'    # Clicked element by selector
  galleria extract page.html -s img --offline  # Skip the platform API
  galleria quality "url(...), url(...)"     # Quality heuristic only
  galleria config show                      # Effective settings
"#)]
#[command(version)]
#[command(author = "Galleria Contributors")]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (text or json).
    #[arg(long, short = 'f', default_value = "text", global = true)]
    pub format: OutputFormat,

    /// Pretty-print JSON output.
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Settings file (defaults to the user config dir).
    #[arg(long, global = true, value_name = "FILE")]
    pub settings: Option<PathBuf>,

    /// Verbose output (show debug info).
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Quiet mode (minimal output).
    #[arg(long, short, global = true)]
    pub quiet: bool,
}

impl Cli {
    /// Settings file in effect.
    pub fn settings_path(&self) -> PathBuf {
        self.settings.clone().unwrap_or_else(default_settings_path)
    }
}

/// CLI commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Extract media for a clicked element of a saved page.
    #[command(visible_alias = "x")]
    Extract(extract::ExtractArgs),

    /// Run the quality heuristic on a background-image declaration.
    #[command(visible_alias = "q")]
    Quality(quality::QualityArgs),

    /// Manage configuration.
    Config(config::ConfigArgs),
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable text with colors.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

/// CLI exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Success.
    Success = 0,
    /// General error.
    Error = 1,
    /// The command ran but found no media.
    NoMedia = 2,
}

// ============================================================================
// Logging Setup
// ============================================================================

fn setup_logging(verbose: bool, quiet: bool, level: LogLevel) {
    if quiet {
        return; // No logging in quiet mode
    }

    let filter = if verbose {
        EnvFilter::new("galleria=debug,info")
    } else {
        EnvFilter::new(format!("galleria={level}"))
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .without_time()
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

// ============================================================================
// Main Entry Point
// ============================================================================

async fn run(cli: &Cli) -> Result<ExitCode> {
    let settings = EngineSettings::load(&cli.settings_path()).await;
    setup_logging(cli.verbose, cli.quiet, settings.log_level);

    match &cli.command {
        Commands::Extract(args) => extract::run(args, &settings, cli).await,
        Commands::Quality(args) => quality::run(args, cli),
        Commands::Config(args) => config::run(args, &settings, cli).await,
    }
}

fn main() {
    let cli = Cli::parse();

    // Element handles are `!Send`; everything runs on one thread.
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(ExitCode::Error as i32);
        }
    };

    let code = match runtime.block_on(run(&cli)) {
        Ok(code) => code,
        Err(e) => {
            if !cli.quiet {
                eprintln!("Error: {e:#}");
            }
            ExitCode::Error
        }
    };

    std::process::exit(code as i32);
}
