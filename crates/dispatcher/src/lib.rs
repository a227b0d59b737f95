//! # Dispatcher
//!
//! Rate-limited asynchronous delivery of captured transactions.
//!
//! Responsibilities:
//! - Admit transactions through a sliding one-second `RateLimiter`
//! - Hand admitted transactions to a bounded pool of delivery workers
//! - Deliver over HTTP, unary RPC or a log-only transport, one attempt each
//! - Verify collector connectivity before enabling a `Relay`
//! - Never block, fail or slow down the capturing caller

pub mod connectivity;
pub mod dispatcher;
pub mod error;
pub mod metrics;
mod pool;
pub mod rate_limiter;
pub mod relay;
pub mod transports;

pub use connectivity::{ConnectivityCheck, ProbeOutcome};
pub use contracts::{SubmitOutcome, TransactionSink, Transport};
pub use dispatcher::{
    DeliveryObserver, DeliveryReport, Dispatcher, DispatcherBuilder, ShutdownReport,
    DEFAULT_SHUTDOWN_GRACE,
};
pub use error::DispatcherError;
pub use metrics::{DispatchMetrics, MetricsSnapshot};
pub use rate_limiter::{Clock, ManualClock, MonotonicClock, RateLimiter, SlidingWindow};
pub use relay::{DisabledReason, Relay, RelayState};
pub use transports::{build_transport, CollectorTransport, HttpTransport, LogTransport, RpcTransport};
