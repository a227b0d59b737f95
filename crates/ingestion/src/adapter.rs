//! Capture adapter trait

use contracts::{CapturedTransaction, SubmitOutcome, TransactionSink};
use tracing::debug;

use crate::metrics::CaptureMetrics;

/// Host integration that turns native captures into transactions
///
/// Implement `to_transaction` for each host; it must not fail, degrading
/// unreadable pieces to empty values instead. `capture` then hands the
/// result to the sink without blocking.
pub trait CaptureAdapter: Send + Sync {
    /// Host-native capture type
    type Capture;

    /// Tag written to `meta.metloSource`
    fn ingest_source(&self) -> &str;

    /// Build a transaction from one capture
    fn to_transaction(&self, capture: Self::Capture) -> CapturedTransaction;

    /// Where transactions are submitted
    fn sink(&self) -> &dyn TransactionSink;

    fn metrics(&self) -> &CaptureMetrics;

    /// Build and submit one capture
    fn capture(&self, capture: Self::Capture) -> SubmitOutcome {
        let transaction = self.to_transaction(capture);
        self.metrics().record_captured(self.ingest_source());

        let summary = transaction.to_string();
        let outcome = self.sink().submit(transaction);
        self.metrics().record_outcome(outcome);
        if !outcome.is_enqueued() {
            debug!(
                source = self.ingest_source(),
                transaction = %summary,
                outcome = %outcome,
                "Capture dropped by sink"
            );
        }
        outcome
    }
}
