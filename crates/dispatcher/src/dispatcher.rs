//! Dispatcher - admission, queueing and delivery of captured transactions

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tracing::{debug, info, instrument, warn};

use contracts::{
    CapturedTransaction, DeliveryError, RelayConfig, SubmitOutcome, TransactionSink, Transport,
};

use crate::error::DispatcherError;
use crate::metrics::{DispatchMetrics, MetricsSnapshot};
use crate::pool::{PoolSettings, WorkerPool};
use crate::rate_limiter::{Clock, MonotonicClock, RateLimiter};
use crate::transports::{build_transport, CollectorTransport};

/// How long `shutdown` waits for in-flight deliveries by default
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Outcome of one delivery attempt
#[derive(Debug, Clone)]
pub struct DeliveryReport {
    pub transport: String,
    /// `METHOD host/path -> status`
    pub transaction: String,
    pub result: Result<(), DeliveryError>,
    pub latency: Duration,
    /// Time spent waiting for a worker
    pub queued_for: Duration,
}

impl DeliveryReport {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Callback invoked by workers after every attempt
pub type DeliveryObserver = Arc<dyn Fn(&DeliveryReport) + Send + Sync>;

/// Summary of a dispatcher shutdown
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Queued transactions that never started
    pub cancelled: u64,
    /// Workers still running when the grace period ran out
    pub abandoned_workers: usize,
    /// Final counters
    pub metrics: MetricsSnapshot,
}

/// Builder for creating a Dispatcher
pub struct DispatcherBuilder<T> {
    transport: T,
    rate_limit: u32,
    settings: PoolSettings,
    clock: Arc<dyn Clock>,
    runtime: Option<Handle>,
    observer: Option<DeliveryObserver>,
}

impl<T> DispatcherBuilder<T>
where
    T: Transport + Sync + 'static,
{
    pub fn new(config: &RelayConfig, transport: T) -> Self {
        Self {
            transport,
            rate_limit: config.rate_limit,
            settings: PoolSettings {
                max_workers: config.max_workers,
                queue_capacity: config.queue_capacity,
                idle_timeout: config.idle_timeout(),
                attempt_deadline: config.delivery.attempt_deadline(),
            },
            clock: Arc::new(MonotonicClock),
            runtime: None,
            observer: None,
        }
    }

    /// Time source for the rate limiter
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Runtime the workers are spawned on (default: the current one)
    pub fn runtime(mut self, handle: Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    pub fn on_delivery(mut self, observer: DeliveryObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Hard ceiling on one attempt, overriding connect + request timeout
    pub fn attempt_deadline(mut self, deadline: Duration) -> Self {
        self.settings.attempt_deadline = deadline;
        self
    }

    #[instrument(name = "dispatcher_builder_build", skip(self), fields(transport = %self.transport.name()))]
    pub fn build(self) -> Result<Dispatcher<T>, DispatcherError> {
        let runtime = match self.runtime {
            Some(handle) => handle,
            None => Handle::try_current().map_err(|e| DispatcherError::NoRuntime(e.to_string()))?,
        };

        let metrics = Arc::new(DispatchMetrics::new());
        let limiter = RateLimiter::with_clock(self.rate_limit, self.clock);

        info!(
            rate_limit = self.rate_limit,
            max_workers = self.settings.max_workers,
            queue_capacity = self.settings.queue_capacity,
            "Dispatcher started"
        );

        let pool = WorkerPool::new(
            self.transport,
            self.settings,
            runtime,
            Arc::clone(&metrics),
            self.observer,
        );

        Ok(Dispatcher {
            limiter,
            pool,
            metrics,
            closed: AtomicBool::new(false),
        })
    }
}

/// Rate-limited, non-blocking front door to a worker pool
pub struct Dispatcher<T: Transport + Sync + 'static = CollectorTransport> {
    limiter: RateLimiter,
    pool: WorkerPool<T>,
    metrics: Arc<DispatchMetrics>,
    closed: AtomicBool,
}

impl Dispatcher<CollectorTransport> {
    /// Build transport and dispatcher from configuration
    ///
    /// Must be called inside a tokio runtime.
    pub fn from_config(config: &RelayConfig) -> Result<Self, DispatcherError> {
        let transport = build_transport(config)?;
        DispatcherBuilder::new(config, transport).build()
    }
}

impl<T> Dispatcher<T>
where
    T: Transport + Sync + 'static,
{
    pub fn builder(config: &RelayConfig, transport: T) -> DispatcherBuilder<T> {
        DispatcherBuilder::new(config, transport)
    }

    /// Hand a transaction over for delivery.
    ///
    /// Returns immediately. Only the rate limiter's lock and a non-blocking
    /// queue push happen on the caller's thread.
    pub fn submit(&self, transaction: CapturedTransaction) -> SubmitOutcome {
        self.metrics.inc_submitted();

        if self.closed.load(Ordering::Acquire) {
            self.metrics.inc_rejected_closed();
            observability::record_enqueue_rejected(SubmitOutcome::Closed);
            return SubmitOutcome::Closed;
        }

        let allowed = self.limiter.allow();
        observability::record_admission(allowed);
        if !allowed {
            self.metrics.inc_denied();
            debug!(transaction = %transaction, "Rate limit reached, transaction dropped");
            return SubmitOutcome::Denied;
        }
        self.metrics.inc_admitted();

        let outcome = self.pool.try_submit(transaction);
        match outcome {
            SubmitOutcome::Enqueued => {}
            SubmitOutcome::QueueFull => {
                self.metrics.inc_queue_full();
                observability::record_enqueue_rejected(outcome);
                warn!(
                    transport = %self.pool.transport().name(),
                    "Delivery queue full, transaction dropped"
                );
            }
            _ => {
                self.metrics.inc_rejected_closed();
                observability::record_enqueue_rejected(outcome);
            }
        }
        outcome
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        let mut snapshot = self.metrics.snapshot();
        snapshot.queue_len = self.pool.queue_len();
        snapshot.live_workers = self.pool.live_workers();
        snapshot
    }

    pub fn transport(&self) -> &T {
        self.pool.transport()
    }

    pub fn rate_limit(&self) -> u32 {
        self.limiter.limit()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Stop accepting, cancel queued work, wait up to `grace` for in-flight
    /// deliveries, then close the transport. A second call only reports.
    #[instrument(name = "dispatcher_shutdown", skip(self), fields(transport = %self.pool.transport().name()))]
    pub async fn shutdown(&self, grace: Duration) -> ShutdownReport {
        if self.closed.swap(true, Ordering::AcqRel) {
            return ShutdownReport {
                metrics: self.metrics(),
                ..Default::default()
            };
        }

        let drained = self.pool.drain(grace).await;
        self.pool.transport().close().await;

        let report = ShutdownReport {
            cancelled: drained.cancelled,
            abandoned_workers: drained.abandoned_workers,
            metrics: self.metrics(),
        };

        info!(
            delivered = report.metrics.delivered,
            failed = report.metrics.failed,
            cancelled = report.cancelled,
            abandoned = report.abandoned_workers,
            "Dispatcher shutdown complete"
        );
        report
    }
}

impl<T> TransactionSink for Dispatcher<T>
where
    T: Transport + Sync + 'static,
{
    fn submit(&self, transaction: CapturedTransaction) -> SubmitOutcome {
        Dispatcher::submit(self, transaction)
    }
}

impl<T> Drop for Dispatcher<T>
where
    T: Transport + Sync + 'static,
{
    fn drop(&mut self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            self.pool.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rate_limiter::ManualClock;
    use parking_lot::Mutex;
    use std::sync::atomic::AtomicU64;
    use std::time::Instant;

    #[derive(Clone, Default)]
    struct MockTransport {
        sent: Arc<AtomicU64>,
        closed: Arc<AtomicBool>,
        fail: bool,
        panic: bool,
        delay: Option<Duration>,
    }

    impl Transport for MockTransport {
        fn name(&self) -> &str {
            "mock"
        }

        async fn send(&self, _transaction: &CapturedTransaction) -> Result<(), DeliveryError> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.panic {
                panic!("transport exploded");
            }
            if self.fail {
                return Err(DeliveryError::Status { status: 500 });
            }
            self.sent.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn close(&self) {
            self.closed.store(true, Ordering::SeqCst);
        }
    }

    fn config(rate: u32, workers: usize) -> RelayConfig {
        let mut config = RelayConfig::new("http://localhost:8081", "key");
        config.rate_limit = rate;
        config.max_workers = workers;
        config
    }

    async fn wait_completed<T: Transport + Sync + 'static>(dispatcher: &Dispatcher<T>, n: u64) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while dispatcher.metrics().delivered + dispatcher.metrics().failed < n
            && Instant::now() < deadline
        {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    #[tokio::test]
    async fn test_denied_never_reach_transport() {
        let transport = MockTransport::default();
        let sent = Arc::clone(&transport.sent);
        let clock = ManualClock::new();
        let dispatcher = Dispatcher::builder(&config(3, 2), transport)
            .clock(Arc::new(clock.clone()))
            .build()
            .unwrap();

        let outcomes: Vec<_> = (0..5)
            .map(|_| dispatcher.submit(CapturedTransaction::default()))
            .collect();
        assert_eq!(
            outcomes,
            vec![
                SubmitOutcome::Enqueued,
                SubmitOutcome::Enqueued,
                SubmitOutcome::Enqueued,
                SubmitOutcome::Denied,
                SubmitOutcome::Denied,
            ]
        );

        wait_completed(&dispatcher, 3).await;
        assert_eq!(sent.load(Ordering::SeqCst), 3);
        let metrics = dispatcher.metrics();
        assert_eq!(metrics.denied, 2);
        assert_eq!(metrics.admitted, 3);
    }

    #[tokio::test]
    async fn test_zero_rate_drops_everything() {
        let transport = MockTransport::default();
        let sent = Arc::clone(&transport.sent);
        let dispatcher = Dispatcher::builder(&config(0, 2), transport).build().unwrap();

        for _ in 0..10 {
            assert_eq!(
                dispatcher.submit(CapturedTransaction::default()),
                SubmitOutcome::Denied
            );
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(sent.load(Ordering::SeqCst), 0);
        assert_eq!(dispatcher.metrics().live_workers, 0);
    }

    #[tokio::test]
    async fn test_failures_are_absorbed() {
        let transport = MockTransport {
            fail: true,
            ..Default::default()
        };
        let reports = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&reports);
        let dispatcher = Dispatcher::builder(&config(10, 2), transport)
            .on_delivery(Arc::new(move |report: &DeliveryReport| {
                sink.lock().push(report.clone());
            }))
            .build()
            .unwrap();

        for _ in 0..3 {
            assert_eq!(
                dispatcher.submit(CapturedTransaction::default()),
                SubmitOutcome::Enqueued
            );
        }
        wait_completed(&dispatcher, 3).await;

        assert_eq!(dispatcher.metrics().failed, 3);
        let reports = reports.lock();
        assert_eq!(reports.len(), 3);
        assert!(reports
            .iter()
            .all(|r| r.result == Err(DeliveryError::Status { status: 500 })));
    }

    #[tokio::test]
    async fn test_transport_panic_is_contained() {
        let transport = MockTransport {
            panic: true,
            ..Default::default()
        };
        let dispatcher = Dispatcher::builder(&config(10, 1), transport).build().unwrap();

        dispatcher.submit(CapturedTransaction::default());
        dispatcher.submit(CapturedTransaction::default());
        wait_completed(&dispatcher, 2).await;

        // The same worker survived both panics
        assert_eq!(dispatcher.metrics().failed, 2);
        assert_eq!(
            dispatcher.submit(CapturedTransaction::default()),
            SubmitOutcome::Enqueued
        );
    }

    #[tokio::test]
    async fn test_attempt_deadline_bounds_hanging_transport() {
        let transport = MockTransport {
            delay: Some(Duration::from_secs(3600)),
            ..Default::default()
        };
        let reports = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&reports);
        let dispatcher = Dispatcher::builder(&config(10, 1), transport)
            .attempt_deadline(Duration::from_millis(50))
            .on_delivery(Arc::new(move |report: &DeliveryReport| {
                sink.lock().push(report.result.clone());
            }))
            .build()
            .unwrap();

        dispatcher.submit(CapturedTransaction::default());
        wait_completed(&dispatcher, 1).await;

        let reports = reports.lock();
        assert!(matches!(reports[0], Err(DeliveryError::Timeout { .. })));
    }

    #[tokio::test]
    async fn test_submit_is_fast_with_hanging_transport() {
        let transport = MockTransport {
            delay: Some(Duration::from_secs(3600)),
            ..Default::default()
        };
        let mut cfg = config(1000, 2);
        cfg.queue_capacity = 8;
        let dispatcher = Dispatcher::builder(&cfg, transport).build().unwrap();

        let started = Instant::now();
        for _ in 0..500 {
            dispatcher.submit(CapturedTransaction::default());
        }
        assert!(started.elapsed() < Duration::from_millis(500));

        let metrics = dispatcher.metrics();
        assert_eq!(metrics.submitted, 500);
        assert!(metrics.queue_full > 0);
    }

    #[tokio::test]
    async fn test_shutdown_closes_transport_and_rejects() {
        let transport = MockTransport {
            delay: Some(Duration::from_millis(30)),
            ..Default::default()
        };
        let closed = Arc::clone(&transport.closed);
        let sent = Arc::clone(&transport.sent);
        let dispatcher = Dispatcher::builder(&config(100, 1), transport).build().unwrap();

        for _ in 0..4 {
            dispatcher.submit(CapturedTransaction::default());
        }
        tokio::time::sleep(Duration::from_millis(10)).await;

        let report = dispatcher.shutdown(Duration::from_secs(2)).await;
        assert_eq!(report.cancelled, 3);
        assert_eq!(report.abandoned_workers, 0);
        assert_eq!(sent.load(Ordering::SeqCst), 1);
        assert!(closed.load(Ordering::SeqCst));

        assert_eq!(
            dispatcher.submit(CapturedTransaction::default()),
            SubmitOutcome::Closed
        );
        let again = dispatcher.shutdown(Duration::from_secs(1)).await;
        assert_eq!(again.cancelled, 0);
    }

    #[tokio::test]
    async fn test_shutdown_grace_abandons_hanging_delivery() {
        let transport = MockTransport {
            delay: Some(Duration::from_secs(3600)),
            ..Default::default()
        };
        let dispatcher = Dispatcher::builder(&config(10, 1), transport).build().unwrap();
        dispatcher.submit(CapturedTransaction::default());
        tokio::time::sleep(Duration::from_millis(10)).await;

        let report = dispatcher.shutdown(Duration::from_millis(50)).await;
        assert_eq!(report.abandoned_workers, 1);
    }

    #[test]
    fn test_build_without_runtime_fails() {
        let result = Dispatcher::builder(&config(10, 1), MockTransport::default()).build();
        assert!(matches!(result, Err(DispatcherError::NoRuntime(_))));
    }
}
