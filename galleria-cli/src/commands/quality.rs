//! Quality command - run the background-image heuristic.

use anyhow::Result;
use clap::Args;
use galleria_strategies::select_best_quality;

use crate::output::{JsonFormatter, TextFormatter};
use crate::{Cli, ExitCode, OutputFormat};

/// Arguments for the quality command.
#[derive(Args)]
pub struct QualityArgs {
    /// A `background-image` declaration, e.g. "url(a), url(b)".
    pub declaration: String,
}

/// Runs the quality command.
pub fn run(args: &QualityArgs, cli: &Cli) -> Result<ExitCode> {
    let Some(selection) = select_best_quality(&args.declaration) else {
        if !cli.quiet {
            eprintln!("No usable candidate in declaration");
        }
        return Ok(ExitCode::NoMedia);
    };

    match cli.format {
        OutputFormat::Text => {
            let formatter = TextFormatter::new(!cli.no_color);
            println!("{}", formatter.format_quality(&selection));
        }
        OutputFormat::Json => {
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format(&selection)?);
        }
    }

    Ok(ExitCode::Success)
}
