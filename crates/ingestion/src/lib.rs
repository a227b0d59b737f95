//! # Ingestion
//!
//! Capture adapters: turn host-native captures into `CapturedTransaction`s
//! and hand them to a `TransactionSink`.
//!
//! Responsibilities:
//! - Parse raw proxy exchanges (`RawExchangeAdapter`)
//! - Read recorded NDJSON captures (`ReplaySource`)
//! - Count captures and drops per adapter
//!
//! ## Usage Example
//!
//! ```ignore
//! use ingestion::{CaptureAdapter, RawExchange, RawExchangeAdapter};
//!
//! let adapter = RawExchangeAdapter::new(relay.clone());
//! adapter.capture(RawExchange::new("api.example.com", 443, request_bytes, response_bytes));
//! ```

mod adapter;
mod error;
mod metrics;
mod raw_exchange;
mod replay;

pub use adapter::CaptureAdapter;
pub use error::{IngestionError, Result};
pub use metrics::{CaptureMetrics, CaptureSnapshot};
pub use raw_exchange::{RawExchange, RawExchangeAdapter, BURP_SUITE_SOURCE, PROXY_SOURCE_ADDRESS};
pub use replay::{ReplaySource, REPLAY_SOURCE};
