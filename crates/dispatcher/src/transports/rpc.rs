//! RpcTransport - unary call to the local helper process

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use contracts::{CapturedTransaction, DeliveryError, RelayConfig, Transport};
use tonic::client::Grpc;
use tonic::codec::ProstCodec;
use tonic::codegen::http::uri::PathAndQuery;
use tonic::transport::{Channel, Endpoint};
use tonic::{Code, Status};
use tracing::{debug, instrument};

use super::proto::{ApiTrace, ProcessTraceRes};
use crate::error::DispatcherError;

/// Fully qualified method path of the ingest call
pub const PROCESS_TRACE_PATH: &str = "/metloingest.MetloIngest/ProcessTrace";

/// Persistent channel to `127.0.0.1:<rpc_port>`
#[derive(Debug)]
pub struct RpcTransport {
    channel: Channel,
    target: String,
    closed: AtomicBool,
}

impl RpcTransport {
    /// The channel connects on first use, so construction never waits.
    #[instrument(name = "rpc_transport_new", skip(config))]
    pub fn new(config: &RelayConfig) -> Result<Self, DispatcherError> {
        let port = config
            .delivery
            .rpc_port
            .ok_or_else(|| DispatcherError::transport_creation("rpc", "delivery.rpc_port not set"))?;
        let target = format!("http://127.0.0.1:{port}");

        let channel = Endpoint::from_shared(target.clone())
            .map_err(|e| DispatcherError::transport_creation("rpc", e.to_string()))?
            .connect_timeout(config.delivery.connect_timeout())
            .timeout(config.delivery.request_timeout())
            .connect_lazy();

        debug!(target = %target, "RpcTransport ready");

        Ok(Self {
            channel,
            target,
            closed: AtomicBool::new(false),
        })
    }

    pub fn target(&self) -> &str {
        &self.target
    }
}

impl Transport for RpcTransport {
    fn name(&self) -> &str {
        "rpc"
    }

    async fn send(&self, transaction: &CapturedTransaction) -> Result<(), DeliveryError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(DeliveryError::Closed);
        }

        let started = Instant::now();
        let mut grpc = Grpc::new(self.channel.clone());
        grpc.ready()
            .await
            .map_err(|e| DeliveryError::Network(format!("{}: {e}", self.target)))?;

        let codec: ProstCodec<ApiTrace, ProcessTraceRes> = ProstCodec::default();
        let response = grpc
            .unary(
                tonic::Request::new(ApiTrace::from(transaction)),
                PathAndQuery::from_static(PROCESS_TRACE_PATH),
                codec,
            )
            .await
            .map_err(|status| status_to_delivery_error(&status, started))?;

        debug!(block = response.get_ref().block, "Helper accepted trace");
        Ok(())
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}

fn status_to_delivery_error(status: &Status, started: Instant) -> DeliveryError {
    match status.code() {
        Code::InvalidArgument => DeliveryError::Rejected(status.message().to_string()),
        Code::DeadlineExceeded => DeliveryError::Timeout {
            elapsed_ms: started.elapsed().as_millis() as u64,
        },
        Code::Cancelled if status.message().contains("Timeout") => DeliveryError::Timeout {
            elapsed_ms: started.elapsed().as_millis() as u64,
        },
        code => DeliveryError::Network(format!("{code:?}: {}", status.message())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::DeliveryMode;

    fn rpc_config(port: u16) -> RelayConfig {
        let mut config = RelayConfig::new("http://localhost:8081", "k");
        config.delivery.mode = DeliveryMode::Rpc;
        config.delivery.rpc_port = Some(port);
        config.delivery.connect_timeout_ms = 200;
        config
    }

    #[tokio::test]
    async fn test_target_uses_loopback() {
        let transport = RpcTransport::new(&rpc_config(50051)).unwrap();
        assert_eq!(transport.target(), "http://127.0.0.1:50051");
    }

    #[tokio::test]
    async fn test_unreachable_helper_is_network_error() {
        let transport = RpcTransport::new(&rpc_config(9)).unwrap();
        let result = transport.send(&CapturedTransaction::default()).await;
        assert!(
            matches!(result, Err(DeliveryError::Network(_)) | Err(DeliveryError::Timeout { .. })),
            "got {result:?}"
        );
    }

    #[tokio::test]
    async fn test_closed_transport_rejects() {
        let transport = RpcTransport::new(&rpc_config(50051)).unwrap();
        transport.close().await;
        assert_eq!(
            transport.send(&CapturedTransaction::default()).await,
            Err(DeliveryError::Closed)
        );
    }

    #[test]
    fn test_status_mapping() {
        let started = Instant::now();
        assert_eq!(
            status_to_delivery_error(&Status::invalid_argument("Invalid API Trace"), started),
            DeliveryError::Rejected("Invalid API Trace".into())
        );
        assert!(matches!(
            status_to_delivery_error(&Status::deadline_exceeded("slow"), started),
            DeliveryError::Timeout { .. }
        ));
        assert!(matches!(
            status_to_delivery_error(&Status::unavailable("down"), started),
            DeliveryError::Network(_)
        ));
    }
}
