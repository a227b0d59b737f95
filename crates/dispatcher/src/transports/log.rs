//! LogTransport - logs a summary instead of delivering

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use contracts::{CapturedTransaction, DeliveryError, Transport};
use tracing::info;

/// Dry-run transport
#[derive(Debug, Default)]
pub struct LogTransport {
    logged: AtomicU64,
    closed: AtomicBool,
}

impl LogTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn logged(&self) -> u64 {
        self.logged.load(Ordering::Relaxed)
    }
}

impl Transport for LogTransport {
    fn name(&self) -> &str {
        "log"
    }

    async fn send(&self, transaction: &CapturedTransaction) -> Result<(), DeliveryError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(DeliveryError::Closed);
        }

        let seq = self.logged.fetch_add(1, Ordering::Relaxed) + 1;
        info!(
            seq,
            transaction = %transaction,
            source = %transaction.meta.ingest_source,
            environment = %transaction.meta.environment,
            request_bytes = transaction.request.body.len(),
            response_bytes = transaction.response.body.len(),
            "Captured transaction"
        );
        Ok(())
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::Release);
        info!(total = self.logged(), "LogTransport closed");
    }
}
