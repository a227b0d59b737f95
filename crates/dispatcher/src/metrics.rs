//! Dispatcher counters

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Counters for one dispatcher instance
#[derive(Debug, Default)]
pub struct DispatchMetrics {
    submitted: AtomicU64,
    admitted: AtomicU64,
    denied: AtomicU64,
    queue_full: AtomicU64,
    rejected_closed: AtomicU64,
    delivered: AtomicU64,
    failed: AtomicU64,
    cancelled: AtomicU64,
    queue_len: AtomicUsize,
    live_workers: AtomicUsize,
}

impl DispatchMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_submitted(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_admitted(&self) {
        self.admitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_denied(&self) {
        self.denied.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_queue_full(&self) {
        self.queue_full.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_rejected_closed(&self) {
        self.rejected_closed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_delivered(&self) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_cancelled(&self, count: u64) {
        self.cancelled.fetch_add(count, Ordering::Relaxed);
    }

    pub fn set_queue_len(&self, len: usize) {
        self.queue_len.store(len, Ordering::Relaxed);
        observability::record_queue_depth(len);
    }

    pub fn set_live_workers(&self, count: usize) {
        self.live_workers.store(count, Ordering::Relaxed);
        observability::record_live_workers(count);
    }

    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    /// Attempts that have finished, either way
    pub fn completed(&self) -> u64 {
        self.delivered() + self.failed()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            submitted: self.submitted.load(Ordering::Relaxed),
            admitted: self.admitted.load(Ordering::Relaxed),
            denied: self.denied.load(Ordering::Relaxed),
            queue_full: self.queue_full.load(Ordering::Relaxed),
            rejected_closed: self.rejected_closed.load(Ordering::Relaxed),
            delivered: self.delivered(),
            failed: self.failed(),
            cancelled: self.cancelled.load(Ordering::Relaxed),
            queue_len: self.queue_len.load(Ordering::Relaxed),
            live_workers: self.live_workers.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`DispatchMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub submitted: u64,
    pub admitted: u64,
    pub denied: u64,
    pub queue_full: u64,
    pub rejected_closed: u64,
    pub delivered: u64,
    pub failed: u64,
    pub cancelled: u64,
    pub queue_len: usize,
    pub live_workers: usize,
}

impl MetricsSnapshot {
    /// Submissions that never reached a worker
    pub fn dropped(&self) -> u64 {
        self.denied + self.queue_full + self.rejected_closed + self.cancelled
    }
}
