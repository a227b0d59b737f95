//! Delivery transports
//!
//! - `HttpTransport`: JSON document POSTed to the collector
//! - `RpcTransport`: unary call to the co-located helper process
//! - `LogTransport`: summary line only

mod http;
mod log;
pub mod proto;
mod rpc;

pub use self::http::HttpTransport;
pub use self::log::LogTransport;
pub use self::rpc::{RpcTransport, PROCESS_TRACE_PATH};

use contracts::{CapturedTransaction, DeliveryError, DeliveryMode, RelayConfig, Transport};
use tracing::instrument;

use crate::error::DispatcherError;

/// Transport selected by `delivery.mode`
#[derive(Debug)]
pub enum CollectorTransport {
    Http(HttpTransport),
    Rpc(RpcTransport),
    Log(LogTransport),
}

impl Transport for CollectorTransport {
    fn name(&self) -> &str {
        match self {
            Self::Http(t) => t.name(),
            Self::Rpc(t) => t.name(),
            Self::Log(t) => t.name(),
        }
    }

    async fn send(&self, transaction: &CapturedTransaction) -> Result<(), DeliveryError> {
        match self {
            Self::Http(t) => t.send(transaction).await,
            Self::Rpc(t) => t.send(transaction).await,
            Self::Log(t) => t.send(transaction).await,
        }
    }

    async fn close(&self) {
        match self {
            Self::Http(t) => t.close().await,
            Self::Rpc(t) => t.close().await,
            Self::Log(t) => t.close().await,
        }
    }
}

/// Create the configured transport
///
/// RPC channels connect lazily, so this must run inside a tokio runtime.
#[instrument(name = "build_transport", skip(config), fields(mode = ?config.delivery.mode))]
pub fn build_transport(config: &RelayConfig) -> Result<CollectorTransport, DispatcherError> {
    match config.delivery.mode {
        DeliveryMode::Http => Ok(CollectorTransport::Http(HttpTransport::new(config)?)),
        DeliveryMode::Rpc => Ok(CollectorTransport::Rpc(RpcTransport::new(config)?)),
        DeliveryMode::Log => Ok(CollectorTransport::Log(LogTransport::new())),
    }
}
