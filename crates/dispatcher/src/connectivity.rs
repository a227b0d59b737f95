//! ConnectivityCheck - pre-flight verification of a collector
//!
//! `GET <collector>/api/v1/verify` with the credential in `Authorization`.
//!
//! | result              | relay     |
//! |---------------------|-----------|
//! | 200                 | enabled   |
//! | 404                 | disabled  |
//! | 401                 | disabled  |
//! | other status        | enabled, warning logged |
//! | timeout             | disabled  |
//! | unreachable / bad URL | disabled |

use std::fmt;
use std::time::{Duration, Instant};

use contracts::{collector_endpoint, VERIFY_PATH};
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, StatusCode};
use tracing::{info, instrument, warn};

use crate::error::DispatcherError;

/// Probe timeout used by [`ConnectivityCheck::probe`]
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Classified probe result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// 200
    Verified,
    /// 404: host is not a collector
    NotFound,
    /// 401: credential rejected
    Unauthorized,
    /// Anything else; the collector answered, so delivery stays enabled
    UnexpectedStatus(u16),
    TimedOut,
    Unreachable(String),
    InvalidEndpoint(String),
}

impl ProbeOutcome {
    /// Whether delivery should be enabled
    pub fn enables(&self) -> bool {
        matches!(self, Self::Verified | Self::UnexpectedStatus(_))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Verified => "verified",
            Self::NotFound => "not_found",
            Self::Unauthorized => "unauthorized",
            Self::UnexpectedStatus(_) => "unexpected_status",
            Self::TimedOut => "timed_out",
            Self::Unreachable(_) => "unreachable",
            Self::InvalidEndpoint(_) => "invalid_endpoint",
        }
    }
}

impl fmt::Display for ProbeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Verified => write!(f, "collector verified"),
            Self::NotFound => write!(f, "verification endpoint not found (404)"),
            Self::Unauthorized => write!(f, "credential rejected (401)"),
            Self::UnexpectedStatus(status) => write!(f, "unexpected status {status}"),
            Self::TimedOut => write!(f, "collector did not answer in time"),
            Self::Unreachable(message) => write!(f, "collector unreachable: {message}"),
            Self::InvalidEndpoint(message) => write!(f, "invalid collector url: {message}"),
        }
    }
}

/// Collector verification client
#[derive(Debug, Clone)]
pub struct ConnectivityCheck {
    client: Client,
}

impl ConnectivityCheck {
    pub fn new() -> Result<Self, DispatcherError> {
        let client = Client::builder()
            .build()
            .map_err(|e| DispatcherError::transport_creation("probe", e.to_string()))?;
        Ok(Self { client })
    }

    /// Verify with the default 5 s timeout
    pub async fn probe(&self, base_url: &str, api_key: &str) -> bool {
        self.check(base_url, api_key, DEFAULT_PROBE_TIMEOUT)
            .await
            .enables()
    }

    /// Probe and classify; never fails
    #[instrument(name = "connectivity_check", skip(self, api_key))]
    pub async fn check(&self, base_url: &str, api_key: &str, timeout: Duration) -> ProbeOutcome {
        let outcome = self.classify(base_url, api_key, timeout).await;
        observability::record_probe(outcome.as_str(), outcome.enables());

        match &outcome {
            ProbeOutcome::Verified => info!(collector = base_url, "Collector verified"),
            ProbeOutcome::UnexpectedStatus(status) => warn!(
                collector = base_url,
                status,
                "Unexpected verification status, enabling delivery anyway"
            ),
            other => warn!(collector = base_url, outcome = %other, "Collector verification failed"),
        }
        outcome
    }

    async fn classify(&self, base_url: &str, api_key: &str, timeout: Duration) -> ProbeOutcome {
        let endpoint = match collector_endpoint(base_url, VERIFY_PATH) {
            Ok(url) => url,
            Err(e) => return ProbeOutcome::InvalidEndpoint(e.to_string()),
        };

        let started = Instant::now();
        let request = self
            .client
            .get(endpoint)
            .header(AUTHORIZATION, api_key)
            .timeout(timeout)
            .send();

        // The request timeout covers connect + headers; the outer one is a backstop
        let response = match tokio::time::timeout(timeout, request).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) if e.is_timeout() => return ProbeOutcome::TimedOut,
            Ok(Err(e)) => return ProbeOutcome::Unreachable(e.to_string()),
            Err(_) => return ProbeOutcome::TimedOut,
        };

        tracing::debug!(
            status = response.status().as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Verification response"
        );

        match response.status() {
            StatusCode::OK => ProbeOutcome::Verified,
            StatusCode::NOT_FOUND => ProbeOutcome::NotFound,
            StatusCode::UNAUTHORIZED => ProbeOutcome::Unauthorized,
            other => ProbeOutcome::UnexpectedStatus(other.as_u16()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn collector_answering(status: u16) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/verify"))
            .and(header("authorization", "key"))
            .respond_with(ResponseTemplate::new(status))
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn test_verified() {
        let server = collector_answering(200).await;
        let check = ConnectivityCheck::new().unwrap();
        assert!(check.probe(&server.uri(), "key").await);
        assert_eq!(
            check.check(&server.uri(), "key", DEFAULT_PROBE_TIMEOUT).await,
            ProbeOutcome::Verified
        );
    }

    #[tokio::test]
    async fn test_not_found_disables() {
        let server = collector_answering(404).await;
        let check = ConnectivityCheck::new().unwrap();
        assert!(!check.probe(&server.uri(), "key").await);
    }

    #[tokio::test]
    async fn test_unauthorized_disables() {
        let server = collector_answering(401).await;
        let check = ConnectivityCheck::new().unwrap();
        let outcome = check.check(&server.uri(), "key", DEFAULT_PROBE_TIMEOUT).await;
        assert_eq!(outcome, ProbeOutcome::Unauthorized);
        assert!(!outcome.enables());
    }

    #[tokio::test]
    async fn test_server_error_still_enables() {
        let server = collector_answering(500).await;
        let check = ConnectivityCheck::new().unwrap();
        let outcome = check.check(&server.uri(), "key", DEFAULT_PROBE_TIMEOUT).await;
        assert_eq!(outcome, ProbeOutcome::UnexpectedStatus(500));
        assert!(outcome.enables());
    }

    #[tokio::test]
    async fn test_hanging_collector_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let check = ConnectivityCheck::new().unwrap();
        let started = Instant::now();
        let outcome = check
            .check(&server.uri(), "key", Duration::from_millis(200))
            .await;
        assert_eq!(outcome, ProbeOutcome::TimedOut);
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_base_path_preserved() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/metlo/api/v1/verify"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let check = ConnectivityCheck::new().unwrap();
        let base = format!("{}/metlo", server.uri());
        assert!(check.probe(&base, "key").await);
    }

    #[tokio::test]
    async fn test_invalid_and_unreachable() {
        let check = ConnectivityCheck::new().unwrap();
        assert!(matches!(
            check.check("not a url", "k", DEFAULT_PROBE_TIMEOUT).await,
            ProbeOutcome::InvalidEndpoint(_)
        ));
        let outcome = check
            .check("http://127.0.0.1:9", "k", Duration::from_secs(2))
            .await;
        assert!(!outcome.enables(), "got {outcome:?}");
    }
}
