//! WorkerPool - bounded, lazily grown set of delivery workers
//!
//! Workers are tokio tasks spawned on demand up to `max_workers` and released
//! after `idle_timeout` without work. Admitted transactions wait in a bounded
//! queue; each one gets exactly one delivery attempt.

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_channel::{Receiver, Sender, TrySendError};
use futures::FutureExt;
use tokio::runtime::Handle;
use tokio::sync::Notify;
use tracing::{debug, instrument, warn};

use contracts::{CapturedTransaction, DeliveryError, SubmitOutcome, Transport};

use crate::dispatcher::{DeliveryObserver, DeliveryReport};
use crate::metrics::DispatchMetrics;

struct Job {
    transaction: CapturedTransaction,
    enqueued_at: Instant,
}

pub(crate) struct PoolSettings {
    pub max_workers: usize,
    pub queue_capacity: usize,
    pub idle_timeout: Duration,
    pub attempt_deadline: Duration,
}

struct Shared<T> {
    transport: T,
    transport_name: String,
    max_workers: usize,
    idle_timeout: Duration,
    attempt_deadline: Duration,
    live: AtomicUsize,
    idle: AtomicUsize,
    all_exited: Notify,
    metrics: Arc<DispatchMetrics>,
    observer: Option<DeliveryObserver>,
}

/// Result of draining the pool
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct DrainResult {
    pub cancelled: u64,
    pub abandoned_workers: usize,
}

pub(crate) struct WorkerPool<T> {
    tx: Sender<Job>,
    rx: Receiver<Job>,
    shared: Arc<Shared<T>>,
    runtime: Handle,
}

impl<T> WorkerPool<T>
where
    T: Transport + Sync + 'static,
{
    pub fn new(
        transport: T,
        settings: PoolSettings,
        runtime: Handle,
        metrics: Arc<DispatchMetrics>,
        observer: Option<DeliveryObserver>,
    ) -> Self {
        let (tx, rx) = async_channel::bounded(settings.queue_capacity.max(1));
        let transport_name = transport.name().to_string();

        Self {
            tx,
            rx,
            shared: Arc::new(Shared {
                transport,
                transport_name,
                max_workers: settings.max_workers.max(1),
                idle_timeout: settings.idle_timeout,
                attempt_deadline: settings.attempt_deadline,
                live: AtomicUsize::new(0),
                idle: AtomicUsize::new(0),
                all_exited: Notify::new(),
                metrics,
                observer,
            }),
            runtime,
        }
    }

    pub fn transport(&self) -> &T {
        &self.shared.transport
    }

    pub fn live_workers(&self) -> usize {
        self.shared.live.load(Ordering::SeqCst)
    }

    pub fn queue_len(&self) -> usize {
        self.tx.len()
    }

    /// Queue a transaction without waiting
    pub fn try_submit(&self, transaction: CapturedTransaction) -> SubmitOutcome {
        let job = Job {
            transaction,
            enqueued_at: Instant::now(),
        };

        match self.tx.try_send(job) {
            Ok(()) => {
                self.shared.metrics.set_queue_len(self.tx.len());
                self.ensure_worker();
                SubmitOutcome::Enqueued
            }
            Err(TrySendError::Full(_)) => SubmitOutcome::QueueFull,
            Err(TrySendError::Closed(_)) => SubmitOutcome::Closed,
        }
    }

    /// Spawn a worker while queued jobs outnumber idle workers and the
    /// ceiling allows it
    fn ensure_worker(&self) {
        if self.tx.len() <= self.shared.idle.load(Ordering::SeqCst) {
            return;
        }
        if !reserve_slot(&self.shared) {
            return;
        }

        let shared = Arc::clone(&self.shared);
        let rx = self.rx.clone();
        self.runtime.spawn(async move {
            worker_loop(shared, rx).await;
        });
    }

    /// Stop accepting work and cancel everything still queued
    pub fn close(&self) -> u64 {
        self.tx.close();

        let mut cancelled = 0;
        while self.rx.try_recv().is_ok() {
            cancelled += 1;
        }
        if cancelled > 0 {
            self.shared.metrics.add_cancelled(cancelled);
            warn!(
                transport = %self.shared.transport_name,
                cancelled,
                "Queued transactions cancelled"
            );
        }
        self.shared.metrics.set_queue_len(0);
        cancelled
    }

    /// Close, then wait up to `grace` for in-flight deliveries
    #[instrument(name = "worker_pool_drain", skip(self), fields(transport = %self.shared.transport_name))]
    pub async fn drain(&self, grace: Duration) -> DrainResult {
        let cancelled = self.close();

        let shared = Arc::clone(&self.shared);
        let wait_all = async move {
            loop {
                let notified = shared.all_exited.notified();
                if shared.live.load(Ordering::SeqCst) == 0 {
                    return;
                }
                notified.await;
            }
        };

        let abandoned_workers = match tokio::time::timeout(grace, wait_all).await {
            Ok(()) => 0,
            Err(_) => {
                let live = self.live_workers();
                warn!(live, grace_ms = grace.as_millis() as u64, "In-flight deliveries abandoned");
                live
            }
        };

        DrainResult {
            cancelled,
            abandoned_workers,
        }
    }
}

fn reserve_slot<T>(shared: &Shared<T>) -> bool {
    let reserved = shared
        .live
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |live| {
            (live < shared.max_workers).then_some(live + 1)
        });

    match reserved {
        Ok(previous) => {
            shared.metrics.set_live_workers(previous + 1);
            true
        }
        Err(_) => false,
    }
}

fn release_slot<T>(shared: &Shared<T>) {
    let remaining = shared.live.fetch_sub(1, Ordering::SeqCst) - 1;
    shared.metrics.set_live_workers(remaining);
    if remaining == 0 {
        shared.all_exited.notify_waiters();
    }
}

async fn worker_loop<T: Transport + Sync>(shared: Arc<Shared<T>>, rx: Receiver<Job>) {
    debug!(transport = %shared.transport_name, "Delivery worker started");

    loop {
        shared.idle.fetch_add(1, Ordering::SeqCst);
        let next = tokio::time::timeout(shared.idle_timeout, rx.recv()).await;
        shared.idle.fetch_sub(1, Ordering::SeqCst);

        match next {
            Ok(Ok(job)) => {
                shared.metrics.set_queue_len(rx.len());
                deliver(&shared, job).await;
            }
            // Closed and empty
            Ok(Err(_)) => break,
            Err(_) => {
                release_slot(&shared);
                // Work may have arrived after the timeout fired
                if rx.is_empty() || rx.is_closed() || !reserve_slot(&shared) {
                    debug!(transport = %shared.transport_name, "Idle delivery worker released");
                    return;
                }
            }
        }
    }

    release_slot(&shared);
    debug!(transport = %shared.transport_name, "Delivery worker stopped");
}

async fn deliver<T: Transport + Sync>(shared: &Shared<T>, job: Job) {
    let started = Instant::now();
    let queued_for = started.duration_since(job.enqueued_at);

    let attempt = AssertUnwindSafe(shared.transport.send(&job.transaction)).catch_unwind();
    let result = match tokio::time::timeout(shared.attempt_deadline, attempt).await {
        Ok(Ok(result)) => result,
        Ok(Err(panic)) => Err(DeliveryError::Panicked(panic_message(panic.as_ref()))),
        Err(_) => Err(DeliveryError::Timeout {
            elapsed_ms: started.elapsed().as_millis() as u64,
        }),
    };
    let latency = started.elapsed();

    match &result {
        Ok(()) => {
            shared.metrics.inc_delivered();
            debug!(
                transport = %shared.transport_name,
                transaction = %job.transaction,
                latency_ms = latency.as_millis() as u64,
                "Transaction delivered"
            );
        }
        Err(e) => {
            shared.metrics.inc_failed();
            warn!(
                transport = %shared.transport_name,
                transaction = %job.transaction,
                error = %e,
                "Delivery failed, transaction dropped"
            );
        }
    }

    let latency_ms = latency.as_secs_f64() * 1000.0;
    observability::record_delivery(&shared.transport_name, result.as_ref().map(|_| ()), latency_ms);

    if let Some(observer) = &shared.observer {
        observer(&DeliveryReport {
            transport: shared.transport_name.clone(),
            transaction: job.transaction.to_string(),
            result,
            latency,
            queued_for,
        });
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
