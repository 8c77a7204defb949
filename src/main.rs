//! churnprep: churn-model data preparation CLI
//!
//! Bins and encodes customer records per model family, splits them with
//! stratification and rebalances the training partition.

use anyhow::Result;
use clap::Parser;
use console::style;
use tracing_subscriber::EnvFilter;

use churnprep::cli::evaluate::run_evaluate;
use churnprep::cli::prepare::run_prepare;
use churnprep::cli::{Cli, Commands};

/// Log to stderr so table output on stdout stays clean. `RUST_LOG` wins over
/// the verbosity flag.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "churnprep=debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let outcome = match &cli.command {
        Commands::Prepare(args) => run_prepare(args),
        Commands::Evaluate(args) => run_evaluate(args),
    };

    if let Err(err) = &outcome {
        eprintln!("\n    {} {:#}", style("✗").red().bold(), err);
        std::process::exit(1);
    }
    outcome
}
