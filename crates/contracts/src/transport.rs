//! Transport / TransactionSink traits - Dispatcher seams
//!
//! `Transport` is the delivery side (one attempt, no retries);
//! `TransactionSink` is what capture adapters see.

use std::fmt;

use crate::{CapturedTransaction, DeliveryError};

/// Delivery transport
///
/// Shared by every worker of a pool, so all methods take `&self`.
#[trait_variant::make(Transport: Send)]
pub trait LocalTransport {
    /// Transport name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Deliver one transaction, exactly one attempt
    ///
    /// # Errors
    /// Returns the failure class of the attempt; callers drop the transaction
    async fn send(&self, transaction: &CapturedTransaction) -> Result<(), DeliveryError>;

    /// Release connections; later `send` calls fail with `DeliveryError::Closed`
    async fn close(&self);
}

/// Result of handing a transaction to a sink.
///
/// Only `Enqueued` means a worker will attempt delivery; every other
/// variant means the transaction was dropped on the spot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubmitOutcome {
    /// Admitted and queued for delivery
    Enqueued,
    /// Rate limiter denied admission
    Denied,
    /// Admitted but the delivery queue was full
    QueueFull,
    /// Sink is shutting down or shut down
    Closed,
    /// Relay unconfigured, disabled or still validating
    Disabled,
}

impl SubmitOutcome {
    pub fn is_enqueued(&self) -> bool {
        matches!(self, Self::Enqueued)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Enqueued => "enqueued",
            Self::Denied => "denied",
            Self::QueueFull => "queue_full",
            Self::Closed => "closed",
            Self::Disabled => "disabled",
        }
    }
}

impl fmt::Display for SubmitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fire-and-forget entry point for capture adapters.
///
/// Must never block on network I/O and never fail loudly.
pub trait TransactionSink: Send + Sync {
    fn submit(&self, transaction: CapturedTransaction) -> SubmitOutcome;
}

impl<S: TransactionSink + ?Sized> TransactionSink for std::sync::Arc<S> {
    fn submit(&self, transaction: CapturedTransaction) -> SubmitOutcome {
        (**self).submit(transaction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recording(Mutex<Vec<String>>);

    impl TransactionSink for Recording {
        fn submit(&self, transaction: CapturedTransaction) -> SubmitOutcome {
            self.0.lock().unwrap().push(transaction.request.method.clone());
            SubmitOutcome::Enqueued
        }
    }

    #[test]
    fn test_outcome_labels() {
        assert!(SubmitOutcome::Enqueued.is_enqueued());
        assert!(!SubmitOutcome::QueueFull.is_enqueued());
        assert_eq!(SubmitOutcome::Denied.to_string(), "denied");
    }

    #[test]
    fn test_arc_sink_forwards() {
        let sink = std::sync::Arc::new(Recording::default());
        let outcome = sink.submit(CapturedTransaction::builder().method("POST").build());
        assert_eq!(outcome, SubmitOutcome::Enqueued);
        assert_eq!(sink.0.lock().unwrap().as_slice(), ["POST".to_string()]);
    }
}
