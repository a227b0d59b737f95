//! Logging and metrics plumbing shared by the relay crates.
//!
//! Library code calls the recorders in [`metrics`] unconditionally; they are
//! no-ops until a binary installs an exporter with [`serve_metrics`]. The log
//! layout is picked once per process with [`init_tracing`].

pub mod metrics;

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

pub use crate::metrics::{
    record_admission, record_delivery, record_enqueue_rejected, record_live_workers,
    record_probe, record_queue_depth, record_relay_state, DeliveryStatsAggregator,
    DeliverySummary, RunningStats, StatsSummary,
};

/// Log line layout
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per event, with source location
    Json,
    #[default]
    Pretty,
    Compact,
}

/// Filter used when `RUST_LOG` does not parse or is unset
pub fn default_filter(verbosity: u8, quiet: bool) -> &'static str {
    match (quiet, verbosity) {
        (true, _) => "warn",
        (false, 0) => "info",
        (false, 1) => "debug",
        (false, _) => "trace",
    }
}

/// Install the global subscriber.
///
/// `RUST_LOG` wins over `fallback` unless `force` is set.
pub fn init_tracing(format: LogFormat, fallback: &str, force: bool) -> Result<()> {
    let filter = if force {
        EnvFilter::new(fallback)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback))
    };

    let layer = match format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_thread_names(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        LogFormat::Pretty => fmt::layer().pretty().boxed(),
        LogFormat::Compact => fmt::layer().compact().boxed(),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init()
        .context("Failed to initialize tracing subscriber")
}

/// Expose every recorded counter on `0.0.0.0:<port>/metrics`
pub fn serve_metrics(port: u16) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .install()
        .context("Failed to install Prometheus recorder")?;

    tracing::info!(port, "Prometheus exporter listening");
    Ok(())
}
