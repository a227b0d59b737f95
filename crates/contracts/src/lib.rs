//! # Contracts
//!
//! Frozen interface contracts shared by every relay crate: the captured
//! transaction model and its wire schema, relay configuration, transport and
//! submission traits, and the error taxonomy.
//! Business crates depend on this crate only; reverse dependencies are prohibited.
//!
//! ## Ownership Model
//! - A `CapturedTransaction` is built by a capture adapter and moved into
//!   `TransactionSink::submit`; from then on the delivery worker is its sole owner
//! - `RelayConfig` is immutable per dispatcher; reconfiguration builds a new one

mod config;
mod endpoint;
mod error;
mod transaction;
mod transport;

pub use config::*;
pub use endpoint::*;
pub use error::*;
pub use transaction::*;
pub use transport::*;
