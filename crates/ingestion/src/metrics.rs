//! Capture counters

use std::sync::atomic::{AtomicU64, Ordering};

use contracts::SubmitOutcome;

/// Per-adapter capture counters
#[derive(Debug, Default)]
pub struct CaptureMetrics {
    /// Transactions built from host captures
    pub captured: AtomicU64,

    /// Transactions the sink accepted for delivery
    pub enqueued: AtomicU64,

    /// Transactions the sink dropped (denied, full, closed, disabled)
    pub dropped: AtomicU64,

    /// Capture pieces that could not be read and were replaced by defaults
    pub parse_errors: AtomicU64,
}

impl CaptureMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_captured(&self, source: &str) {
        self.captured.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("trace_relay_captured_total", "source" => source.to_string()).increment(1);
    }

    pub fn record_outcome(&self, outcome: SubmitOutcome) {
        if outcome.is_enqueued() {
            self.enqueued.fetch_add(1, Ordering::Relaxed);
        } else {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_parse_error(&self) {
        self.parse_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CaptureSnapshot {
        CaptureSnapshot {
            captured: self.captured.load(Ordering::Relaxed),
            enqueued: self.enqueued.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            parse_errors: self.parse_errors.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`CaptureMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureSnapshot {
    pub captured: u64,
    pub enqueued: u64,
    pub dropped: u64,
    pub parse_errors: u64,
}
