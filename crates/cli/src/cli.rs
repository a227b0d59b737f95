//! CLI argument definitions using clap.

use clap::{Args, Parser, Subcommand, ValueEnum};
use contracts::DeliveryMode;
use std::path::PathBuf;

/// trace-relay - rate-limited telemetry relay for captured HTTP traffic
#[derive(Parser, Debug)]
#[command(
    name = "trace-relay",
    author,
    version,
    about = "Rate-limited relay of captured request/response traffic",
    long_about = "Relays captured request/response pairs to a remote collector.\n\n\
                  Submissions are rate limited over a sliding one-second window and \n\
                  delivered by a bounded pool of background workers; failures are \n\
                  logged and dropped, never retried."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "TRACE_RELAY_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "TRACE_RELAY_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Replay an NDJSON capture file through the relay
    Replay(ReplayArgs),

    /// Verify a collector URL and credential
    Probe(ProbeArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display the effective configuration
    Info(InfoArgs),

    /// Persist collector URL and credential
    Save(SaveArgs),
}

/// Where the effective configuration comes from
#[derive(Args, Debug, Clone)]
pub struct ConfigSource {
    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "relay.toml",
        env = "TRACE_RELAY_CONFIG"
    )]
    pub config: PathBuf,

    /// Stored settings file (defaults to the user config directory)
    #[arg(long, env = "TRACE_RELAY_SETTINGS")]
    pub settings: Option<PathBuf>,

    /// Ignore stored settings, the credentials file and METLO_* variables
    #[arg(long)]
    pub no_overlays: bool,
}

/// Arguments for the `replay` command
#[derive(Parser, Debug, Clone)]
pub struct ReplayArgs {
    #[command(flatten)]
    pub source: ConfigSource,

    /// NDJSON file, one transaction per line
    #[arg(short, long)]
    pub input: PathBuf,

    /// Override admissions per second
    #[arg(long)]
    pub rate_limit: Option<u32>,

    /// Override the worker pool bound
    #[arg(long)]
    pub workers: Option<usize>,

    /// Override the delivery mode
    #[arg(long, value_enum)]
    pub mode: Option<ModeArg>,

    /// Delay between submissions in milliseconds (0 = as fast as possible)
    #[arg(long, default_value = "0")]
    pub interval_ms: u64,

    /// Seconds to wait for in-flight deliveries at the end
    #[arg(long, default_value = "5", env = "TRACE_RELAY_GRACE")]
    pub grace_secs: u64,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "TRACE_RELAY_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `probe` command
#[derive(Parser, Debug)]
pub struct ProbeArgs {
    #[command(flatten)]
    pub source: ConfigSource,

    /// Collector base URL (overrides configuration)
    #[arg(long)]
    pub url: Option<String>,

    /// Collector credential (overrides configuration)
    #[arg(long, env = "METLO_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Probe timeout in milliseconds
    #[arg(long, default_value = "5000")]
    pub timeout_ms: u64,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub source: ConfigSource,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    #[command(flatten)]
    pub source: ConfigSource,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `save` command
#[derive(Parser, Debug)]
pub struct SaveArgs {
    /// Collector base URL
    #[arg(long)]
    pub url: String,

    /// Collector credential
    #[arg(long, hide_env_values = true, env = "METLO_KEY")]
    pub api_key: String,

    /// Settings file (defaults to the user config directory)
    #[arg(long, env = "TRACE_RELAY_SETTINGS")]
    pub settings: Option<PathBuf>,

    /// Save without verifying the collector first
    #[arg(long)]
    pub no_probe: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

/// Delivery mode override
#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum ModeArg {
    Http,
    Rpc,
    Log,
}

impl From<ModeArg> for DeliveryMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Http => Self::Http,
            ModeArg::Rpc => Self::Rpc,
            ModeArg::Log => Self::Log,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replay_args() {
        let cli = Cli::parse_from([
            "trace-relay",
            "-v",
            "replay",
            "--input",
            "capture.ndjson",
            "--rate-limit",
            "10",
            "--mode",
            "log",
        ]);
        assert_eq!(cli.verbose, 1);
        match cli.command {
            Commands::Replay(args) => {
                assert_eq!(args.input, PathBuf::from("capture.ndjson"));
                assert_eq!(args.rate_limit, Some(10));
                assert!(matches!(args.mode, Some(ModeArg::Log)));
                assert_eq!(args.source.config, PathBuf::from("relay.toml"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["trace-relay", "-q", "-v", "info"]).is_err());
    }
}
