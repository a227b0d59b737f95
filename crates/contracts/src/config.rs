//! RelayConfig - Config Loader output
//!
//! Describes one dispatcher instance: collector, admission rate, worker pool,
//! delivery transport and the pre-flight probe. Immutable once a dispatcher
//! is built from it; reconfiguration builds a new dispatcher.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Default admissions per second
pub const DEFAULT_RATE_LIMIT: u32 = 100;

/// Default delivery worker ceiling
pub const DEFAULT_MAX_WORKERS: usize = 2;

/// Default bounded queue size between `submit` and the workers
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Idle time after which a delivery worker is released
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 60;

/// Complete relay configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct RelayConfig {
    /// Collector endpoint and credential
    #[validate(nested)]
    pub collector: CollectorConfig,

    /// Master switch; a disabled relay drops every submission
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Admissions per sliding one-second window (0 denies everything)
    #[serde(default = "default_rate_limit")]
    pub rate_limit: u32,

    /// Upper bound of concurrent delivery workers
    #[serde(default = "default_max_workers")]
    #[validate(range(min = 1))]
    pub max_workers: usize,

    /// Admitted transactions waiting for a worker
    #[serde(default = "default_queue_capacity")]
    #[validate(range(min = 1))]
    pub queue_capacity: usize,

    /// Seconds an idle worker waits before exiting
    #[serde(default = "default_idle_timeout_secs")]
    #[validate(range(min = 1))]
    pub idle_timeout_secs: u64,

    /// Environment tag stamped by adapters
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Delivery transport
    #[serde(default)]
    #[validate(nested)]
    pub delivery: DeliveryConfig,

    /// Pre-flight connectivity probe
    #[serde(default)]
    #[validate(nested)]
    pub probe: ProbeConfig,
}

impl RelayConfig {
    /// Configuration with defaults for everything but the collector
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            collector: CollectorConfig {
                url: url.into(),
                api_key: api_key.into(),
            },
            enabled: default_enabled(),
            rate_limit: default_rate_limit(),
            max_workers: default_max_workers(),
            queue_capacity: default_queue_capacity(),
            idle_timeout_secs: default_idle_timeout_secs(),
            environment: default_environment(),
            delivery: DeliveryConfig::default(),
            probe: ProbeConfig::default(),
        }
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

fn default_enabled() -> bool {
    true
}

fn default_rate_limit() -> u32 {
    DEFAULT_RATE_LIMIT
}

fn default_max_workers() -> usize {
    DEFAULT_MAX_WORKERS
}

fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}

fn default_idle_timeout_secs() -> u64 {
    DEFAULT_IDLE_TIMEOUT_SECS
}

fn default_environment() -> String {
    crate::DEFAULT_ENVIRONMENT.to_string()
}

/// Collector endpoint and credential
#[derive(Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct CollectorConfig {
    /// Collector base URL; sub-paths are joined onto it
    #[validate(url)]
    pub url: String,

    /// Sent verbatim in the `Authorization` header
    #[serde(default)]
    pub api_key: String,
}

impl fmt::Debug for CollectorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectorConfig")
            .field("url", &self.url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

/// Delivery mechanism
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMode {
    /// JSON document POSTed to the collector
    #[default]
    Http,
    /// Unary RPC to a co-located helper process
    Rpc,
    /// Log a summary only (dry runs)
    Log,
}

/// Transport settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct DeliveryConfig {
    #[serde(default)]
    pub mode: DeliveryMode,

    /// Local port of the helper process (rpc mode)
    #[serde(default)]
    pub rpc_port: Option<u16>,

    #[serde(default = "default_connect_timeout_ms")]
    #[validate(range(min = 1))]
    pub connect_timeout_ms: u64,

    #[serde(default = "default_request_timeout_ms")]
    #[validate(range(min = 1))]
    pub request_timeout_ms: u64,
}

impl DeliveryConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Hard ceiling on one delivery attempt
    pub fn attempt_deadline(&self) -> Duration {
        self.connect_timeout() + self.request_timeout()
    }
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            mode: DeliveryMode::default(),
            rpc_port: None,
            connect_timeout_ms: default_connect_timeout_ms(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

fn default_connect_timeout_ms() -> u64 {
    5_000
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

/// Pre-flight probe settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ProbeConfig {
    /// Skip the probe entirely when false
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default = "default_probe_timeout_ms")]
    #[validate(range(min = 1))]
    pub timeout_ms: u64,
}

impl ProbeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_ms: default_probe_timeout_ms(),
        }
    }
}

fn default_probe_timeout_ms() -> u64 {
    5_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RelayConfig::new("https://collector.example.com", "key");
        assert_eq!(config.rate_limit, 100);
        assert_eq!(config.max_workers, 2);
        assert_eq!(config.idle_timeout(), Duration::from_secs(60));
        assert_eq!(config.probe.timeout(), Duration::from_secs(5));
        assert_eq!(config.delivery.mode, DeliveryMode::Http);
        assert_eq!(config.delivery.attempt_deadline(), Duration::from_secs(15));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = RelayConfig::new("https://collector.example.com", "super-secret");
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_zero_workers_rejected() {
        let mut config = RelayConfig::new("https://collector.example.com", "key");
        config.max_workers = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_mode_snake_case() {
        let mode: DeliveryMode = serde_json::from_str("\"rpc\"").unwrap();
        assert_eq!(mode, DeliveryMode::Rpc);
    }
}
