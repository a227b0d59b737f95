//! `replay` command implementation.

use std::sync::Arc;
use std::time::{Duration, Instant};

use contracts::TransactionSink;
use dispatcher::{DeliveryObserver, DeliveryReport, Relay};
use ingestion::ReplaySource;
use observability::DeliveryStatsAggregator;
use parking_lot::Mutex;
use tracing::{info, warn};

use crate::cli::ReplayArgs;
use crate::config::resolve;
use crate::error::{CliError, Result};
use crate::stats::ReplayStats;

/// Execute the `replay` command
pub async fn run_replay(args: &ReplayArgs) -> Result<()> {
    let mut config = resolve(&args.source)?;

    // Apply CLI overrides
    if let Some(rate) = args.rate_limit {
        info!(rate_limit = rate, "Overriding rate limit from CLI");
        config.rate_limit = rate;
    }
    if let Some(workers) = args.workers {
        info!(max_workers = workers, "Overriding worker bound from CLI");
        config.max_workers = workers;
    }
    if let Some(mode) = args.mode {
        info!(mode = ?mode, "Overriding delivery mode from CLI");
        config.delivery.mode = mode.into();
    }

    if args.metrics_port != 0 {
        observability::serve_metrics(args.metrics_port)?;
        info!("Metrics endpoint available on port {}", args.metrics_port);
    }

    let source = ReplaySource::open(&args.input)?;

    let aggregator = Arc::new(Mutex::new(DeliveryStatsAggregator::new()));
    let observer: DeliveryObserver = {
        let aggregator = Arc::clone(&aggregator);
        Arc::new(move |report: &DeliveryReport| {
            aggregator.lock().update(
                report.result.as_ref().map(|_| ()),
                report.latency.as_secs_f64() * 1000.0,
            );
        })
    };

    let relay = Relay::new()?.with_observer(observer);
    let state = relay.reconfigure(config).await;
    if !state.is_enabled() {
        return Err(CliError::RelayDisabled { state });
    }

    let interval = Duration::from_millis(args.interval_ms);
    let started = Instant::now();
    let shutdown_signal = setup_shutdown_signal();

    info!(input = %args.input.display(), "Starting replay...");

    let mut stats = ReplayStats::default();
    tokio::select! {
        _ = submit_all(&relay, source, interval, &mut stats) => {
            info!("Replay input exhausted");
        }
        _ = shutdown_signal => {
            warn!("Received shutdown signal, stopping replay...");
        }
    }

    stats.shutdown = relay.shutdown(Duration::from_secs(args.grace_secs)).await;
    stats.duration = started.elapsed();
    stats.delivery = aggregator.lock().summary();

    info!(
        submitted = stats.submitted,
        dropped = stats.dropped(),
        delivered = stats.delivery.total_delivered,
        failed = stats.delivery.total_failed,
        duration_secs = stats.duration.as_secs_f64(),
        "Replay finished"
    );
    stats.print_summary();

    Ok(())
}

/// Feed every record to the relay
async fn submit_all<R: std::io::BufRead>(
    relay: &Relay,
    mut source: ReplaySource<R>,
    interval: Duration,
    stats: &mut ReplayStats,
) {
    while let Some(transaction) = source.next() {
        stats.record(relay.submit(transaction));
        stats.malformed = source.malformed();
        if interval.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(interval).await;
        }
    }
    stats.malformed = source.malformed();
}

/// Setup Ctrl+C and SIGTERM signal handlers
async fn setup_shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
