//! HttpTransport - JSON POST to the collector

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use contracts::{
    collector_endpoint, CapturedTransaction, DeliveryError, RelayConfig, Transport,
    LOG_REQUEST_PATH,
};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use tracing::{debug, instrument};
use url::Url;

use crate::error::DispatcherError;

const JSON_CONTENT_TYPE: &str = "application/json; charset=UTF-8";

/// POSTs one transaction per request to `<collector>/api/v1/log-request/single`
#[derive(Debug)]
pub struct HttpTransport {
    client: Client,
    endpoint: Url,
    api_key: String,
    closed: AtomicBool,
}

impl HttpTransport {
    #[instrument(name = "http_transport_new", skip(config), fields(collector = %config.collector.url))]
    pub fn new(config: &RelayConfig) -> Result<Self, DispatcherError> {
        let endpoint = collector_endpoint(&config.collector.url, LOG_REQUEST_PATH)?;

        let client = Client::builder()
            .connect_timeout(config.delivery.connect_timeout())
            .timeout(config.delivery.request_timeout())
            .build()
            .map_err(|e| DispatcherError::transport_creation("http", e.to_string()))?;

        debug!(endpoint = %endpoint, "HttpTransport ready");

        Ok(Self {
            client,
            endpoint,
            api_key: config.collector.api_key.clone(),
            closed: AtomicBool::new(false),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

impl Transport for HttpTransport {
    fn name(&self) -> &str {
        "http"
    }

    async fn send(&self, transaction: &CapturedTransaction) -> Result<(), DeliveryError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(DeliveryError::Closed);
        }

        let body = transaction
            .to_wire_json()
            .map_err(|e| DeliveryError::Serialization(e.to_string()))?;

        let started = Instant::now();
        let response = self
            .client
            .post(self.endpoint.clone())
            .header(AUTHORIZATION, &self.api_key)
            .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
            .body(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    DeliveryError::Timeout {
                        elapsed_ms: started.elapsed().as_millis() as u64,
                    }
                } else {
                    DeliveryError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(DeliveryError::Status {
                status: status.as_u16(),
            });
        }
        Ok(())
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}
