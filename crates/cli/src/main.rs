//! # trace-relay CLI
//!
//! Command-line entry point.
//!
//! Provides:
//! - Configuration loading, layering and validation
//! - Collector verification and settings persistence
//! - NDJSON capture replay through the rate-limited relay

mod cli;
mod commands;
mod config;
mod error;
mod stats;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use cli::{Cli, Commands};
use commands::{run_info, run_probe, run_replay, run_save, run_validate};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Initialize logging based on CLI options
    init_logging(&cli)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "trace-relay starting"
    );

    // Execute command
    let result = match &cli.command {
        Commands::Replay(args) => run_replay(args).await,
        Commands::Probe(args) => run_probe(args).await,
        Commands::Validate(args) => run_validate(args),
        Commands::Info(args) => run_info(args),
        Commands::Save(args) => run_save(args).await,
    };

    if let Err(ref e) = result {
        tracing::error!(error = %e, "Command failed");
    }

    result.map_err(anyhow::Error::from)
}

/// Initialize logging based on CLI options
fn init_logging(cli: &Cli) -> Result<()> {
    let format = match cli.log_format {
        cli::LogFormat::Json => observability::LogFormat::Json,
        cli::LogFormat::Pretty => observability::LogFormat::Pretty,
        cli::LogFormat::Compact => observability::LogFormat::Compact,
    };
    let fallback = observability::default_filter(cli.verbose, cli.quiet);
    observability::init_tracing(format, fallback, cli.quiet)
}
