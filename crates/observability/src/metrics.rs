//! Relay metric recorders
//!
//! Thin wrappers over the `metrics` facade so every crate emits the same
//! names and labels. All recorders are no-ops until a recorder is installed.

use std::collections::HashMap;

use contracts::{DeliveryError, SubmitOutcome};
use metrics::{counter, gauge, histogram};

/// Rate limiter decision
pub fn record_admission(allowed: bool) {
    let decision = if allowed { "allowed" } else { "denied" };
    counter!("trace_relay_admissions_total", "decision" => decision).increment(1);
}

/// Submission dropped after admission or before it (queue full, closed, disabled)
pub fn record_enqueue_rejected(outcome: SubmitOutcome) {
    counter!(
        "trace_relay_submissions_rejected_total",
        "reason" => outcome.as_str()
    )
    .increment(1);
}

/// One delivery attempt
pub fn record_delivery(transport: &str, result: Result<(), &DeliveryError>, latency_ms: f64) {
    let status = match result {
        Ok(()) => "success",
        Err(e) => e.kind(),
    };
    counter!(
        "trace_relay_deliveries_total",
        "transport" => transport.to_string(),
        "status" => status
    )
    .increment(1);

    histogram!(
        "trace_relay_delivery_latency_ms",
        "transport" => transport.to_string()
    )
    .record(latency_ms);
}

/// Transactions waiting for a worker
pub fn record_queue_depth(depth: usize) {
    gauge!("trace_relay_queue_depth").set(depth as f64);
}

/// Live delivery workers
pub fn record_live_workers(count: usize) {
    gauge!("trace_relay_live_workers").set(count as f64);
}

/// Connectivity probe result (`verified`, `not_found`, ...)
pub fn record_probe(outcome: &str, enabled: bool) {
    counter!(
        "trace_relay_probes_total",
        "outcome" => outcome.to_string(),
        "enabled" => if enabled { "true" } else { "false" }
    )
    .increment(1);
}

/// Relay state transition
pub fn record_relay_state(state: &str) {
    counter!(
        "trace_relay_state_transitions_total",
        "state" => state.to_string()
    )
    .increment(1);
}

/// Delivery statistics aggregator
///
/// Aggregates in memory for end-of-run summaries.
#[derive(Debug, Clone, Default)]
pub struct DeliveryStatsAggregator {
    pub total_attempts: u64,
    pub total_delivered: u64,
    pub total_failed: u64,

    /// Latency of every attempt (ms)
    pub latency_stats: RunningStats,

    /// Failures per error kind
    pub failure_kinds: HashMap<String, u64>,
}

impl DeliveryStatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, result: Result<(), &DeliveryError>, latency_ms: f64) {
        self.total_attempts += 1;
        self.latency_stats.push(latency_ms);

        match result {
            Ok(()) => self.total_delivered += 1,
            Err(e) => {
                self.total_failed += 1;
                *self.failure_kinds.entry(e.kind().to_string()).or_insert(0) += 1;
            }
        }
    }

    pub fn summary(&self) -> DeliverySummary {
        DeliverySummary {
            total_attempts: self.total_attempts,
            total_delivered: self.total_delivered,
            total_failed: self.total_failed,
            failure_rate: if self.total_attempts > 0 {
                self.total_failed as f64 / self.total_attempts as f64 * 100.0
            } else {
                0.0
            },
            latency_ms: StatsSummary::from(&self.latency_stats),
            failure_kinds: self.failure_kinds.clone(),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Delivery summary
#[derive(Debug, Clone, Default)]
pub struct DeliverySummary {
    pub total_attempts: u64,
    pub total_delivered: u64,
    pub total_failed: u64,
    pub failure_rate: f64,
    pub latency_ms: StatsSummary,
    pub failure_kinds: HashMap<String, u64>,
}

impl std::fmt::Display for DeliverySummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Delivery Summary ===")?;
        writeln!(f, "Attempts: {}", self.total_attempts)?;
        writeln!(f, "Delivered: {}", self.total_delivered)?;
        writeln!(
            f,
            "Failed: {} ({:.2}%)",
            self.total_failed, self.failure_rate
        )?;
        writeln!(f, "Latency (ms): {}", self.latency_ms)?;

        if !self.failure_kinds.is_empty() {
            let mut kinds: Vec<_> = self.failure_kinds.iter().collect();
            kinds.sort();
            writeln!(f, "Failures by kind:")?;
            for (kind, count) in kinds {
                writeln!(f, "  {}: {}", kind, count)?;
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online statistics (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
