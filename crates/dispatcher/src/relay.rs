//! Relay - configuration lifecycle in front of a dispatcher
//!
//! `Unconfigured -> Validating -> Enabled | Disabled`
//!
//! Each successful reconfiguration builds a fresh dispatcher and swaps it in
//! atomically. The retired dispatcher finishes its in-flight deliveries in
//! the background under its own configuration. Submissions are no-ops while
//! no dispatcher is active.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::{ArcSwap, ArcSwapOption};
use config_loader::ConfigLoader;
use tokio::runtime::Handle;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

use contracts::{CapturedTransaction, DeliveryMode, RelayConfig, SubmitOutcome, TransactionSink};

use crate::connectivity::{ConnectivityCheck, ProbeOutcome};
use crate::dispatcher::{DeliveryObserver, Dispatcher, ShutdownReport, DEFAULT_SHUTDOWN_GRACE};
use crate::error::DispatcherError;
use crate::metrics::MetricsSnapshot;
use crate::transports::build_transport;

/// Why the relay is not delivering
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisabledReason {
    /// Configuration failed validation or transport construction
    InvalidConfig(String),
    /// `enabled = false`
    SwitchedOff,
    /// Connectivity probe said no
    Probe(ProbeOutcome),
    /// `shutdown` was called
    ShutDown,
}

impl fmt::Display for DisabledReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfig(message) => write!(f, "invalid configuration: {message}"),
            Self::SwitchedOff => write!(f, "disabled by configuration"),
            Self::Probe(outcome) => write!(f, "{outcome}"),
            Self::ShutDown => write!(f, "shut down"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayState {
    Unconfigured,
    Validating,
    Enabled,
    Disabled(DisabledReason),
}

impl RelayState {
    pub fn is_enabled(&self) -> bool {
        matches!(self, Self::Enabled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unconfigured => "unconfigured",
            Self::Validating => "validating",
            Self::Enabled => "enabled",
            Self::Disabled(_) => "disabled",
        }
    }
}

impl fmt::Display for RelayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled(reason) => write!(f, "disabled ({reason})"),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Adapter-facing sink that owns the active dispatcher
pub struct Relay {
    state: ArcSwap<RelayState>,
    active: ArcSwapOption<Dispatcher>,
    reconfigure_lock: Mutex<()>,
    checker: ConnectivityCheck,
    observer: Option<DeliveryObserver>,
    retire_grace: Duration,
}

impl Relay {
    pub fn new() -> Result<Self, DispatcherError> {
        Ok(Self::with_checker(ConnectivityCheck::new()?))
    }

    pub fn with_checker(checker: ConnectivityCheck) -> Self {
        Self {
            state: ArcSwap::from_pointee(RelayState::Unconfigured),
            active: ArcSwapOption::empty(),
            reconfigure_lock: Mutex::new(()),
            checker,
            observer: None,
            retire_grace: DEFAULT_SHUTDOWN_GRACE,
        }
    }

    /// Observer attached to every dispatcher built from now on
    pub fn with_observer(mut self, observer: DeliveryObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Grace period for retired dispatchers
    pub fn with_retire_grace(mut self, grace: Duration) -> Self {
        self.retire_grace = grace;
        self
    }

    pub fn state(&self) -> RelayState {
        (**self.state.load()).clone()
    }

    /// Counters of the active dispatcher
    pub fn metrics(&self) -> Option<MetricsSnapshot> {
        let active = self.active.load();
        (*active).as_ref().map(|dispatcher| dispatcher.metrics())
    }

    /// Validate, probe and (re)build delivery for `config`.
    ///
    /// Calls are serialized. Until the outcome is known the previous
    /// dispatcher, if any, keeps serving.
    #[instrument(name = "relay_reconfigure", skip(self, config), fields(collector = %config.collector.url))]
    pub async fn reconfigure(&self, config: RelayConfig) -> RelayState {
        let _guard = self.reconfigure_lock.lock().await;
        self.set_state(RelayState::Validating);

        let state = match self.prepare(&config).await {
            Ok(dispatcher) => {
                self.swap_in(Some(Arc::new(dispatcher)));
                info!(
                    rate_limit = config.rate_limit,
                    max_workers = config.max_workers,
                    mode = ?config.delivery.mode,
                    "Relay enabled"
                );
                RelayState::Enabled
            }
            Err(reason) => {
                self.swap_in(None);
                warn!(reason = %reason, "Relay disabled");
                RelayState::Disabled(reason)
            }
        };

        self.set_state(state.clone());
        state
    }

    async fn prepare(&self, config: &RelayConfig) -> Result<Dispatcher, DisabledReason> {
        ConfigLoader::validate(config)
            .map_err(|e| DisabledReason::InvalidConfig(e.to_string()))?;

        if !config.enabled {
            return Err(DisabledReason::SwitchedOff);
        }

        // Log mode never talks to the collector
        if config.probe.enabled && config.delivery.mode != DeliveryMode::Log {
            let outcome = self
                .checker
                .check(
                    &config.collector.url,
                    &config.collector.api_key,
                    config.probe.timeout(),
                )
                .await;
            if !outcome.enables() {
                return Err(DisabledReason::Probe(outcome));
            }
        }

        let transport =
            build_transport(config).map_err(|e| DisabledReason::InvalidConfig(e.to_string()))?;
        let mut builder = Dispatcher::builder(config, transport);
        if let Some(observer) = &self.observer {
            builder = builder.on_delivery(Arc::clone(observer));
        }
        builder
            .build()
            .map_err(|e| DisabledReason::InvalidConfig(e.to_string()))
    }

    /// Install `next` and retire whatever was active
    fn swap_in(&self, next: Option<Arc<Dispatcher>>) {
        let Some(retired) = self.active.swap(next) else {
            return;
        };

        let grace = self.retire_grace;
        match Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    let report = retired.shutdown(grace).await;
                    info!(
                        delivered = report.metrics.delivered,
                        cancelled = report.cancelled,
                        "Retired dispatcher drained"
                    );
                });
            }
            // Dropping closes the queue; workers finish what they hold
            Err(_) => drop(retired),
        }
    }

    /// Retire the active dispatcher and wait for it
    #[instrument(name = "relay_shutdown", skip(self))]
    pub async fn shutdown(&self, grace: Duration) -> Option<ShutdownReport> {
        let _guard = self.reconfigure_lock.lock().await;
        let retired = self.active.swap(None);
        self.set_state(RelayState::Disabled(DisabledReason::ShutDown));

        match retired {
            Some(dispatcher) => Some(dispatcher.shutdown(grace).await),
            None => None,
        }
    }

    fn set_state(&self, state: RelayState) {
        observability::record_relay_state(state.as_str());
        self.state.store(Arc::new(state));
    }
}

impl TransactionSink for Relay {
    fn submit(&self, transaction: CapturedTransaction) -> SubmitOutcome {
        let active = self.active.load();
        match &*active {
            Some(dispatcher) => dispatcher.submit(transaction),
            None => {
                observability::record_enqueue_rejected(SubmitOutcome::Disabled);
                SubmitOutcome::Disabled
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn collector(verify_status: u16) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/verify"))
            .respond_with(ResponseTemplate::new(verify_status))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/v1/log-request/single"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        server
    }

    async fn wait_delivered(relay: &Relay, n: u64) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while relay.metrics().map(|m| m.delivered).unwrap_or(0) < n && Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    #[tokio::test]
    async fn test_unconfigured_drops() {
        let relay = Relay::new().unwrap();
        assert_eq!(relay.state(), RelayState::Unconfigured);
        assert_eq!(
            relay.submit(CapturedTransaction::default()),
            SubmitOutcome::Disabled
        );
        assert!(relay.metrics().is_none());
    }

    #[tokio::test]
    async fn test_verified_collector_enables_delivery() {
        let server = collector(200).await;
        let relay = Relay::new().unwrap();

        let state = relay.reconfigure(RelayConfig::new(server.uri(), "key")).await;
        assert_eq!(state, RelayState::Enabled);

        assert_eq!(
            relay.submit(CapturedTransaction::default()),
            SubmitOutcome::Enqueued
        );
        wait_delivered(&relay, 1).await;
        assert_eq!(relay.metrics().unwrap().delivered, 1);
    }

    #[tokio::test]
    async fn test_unauthorized_disables() {
        let server = collector(401).await;
        let relay = Relay::new().unwrap();

        let state = relay.reconfigure(RelayConfig::new(server.uri(), "key")).await;
        assert_eq!(
            state,
            RelayState::Disabled(DisabledReason::Probe(ProbeOutcome::Unauthorized))
        );
        assert_eq!(
            relay.submit(CapturedTransaction::default()),
            SubmitOutcome::Disabled
        );
    }

    #[tokio::test]
    async fn test_invalid_config_disables() {
        let relay = Relay::new().unwrap();
        let state = relay.reconfigure(RelayConfig::new("nonsense", "key")).await;
        assert!(matches!(
            state,
            RelayState::Disabled(DisabledReason::InvalidConfig(_))
        ));
    }

    #[tokio::test]
    async fn test_switched_off() {
        let relay = Relay::new().unwrap();
        let mut config = RelayConfig::new("http://localhost:8081", "key");
        config.enabled = false;
        assert_eq!(
            relay.reconfigure(config).await,
            RelayState::Disabled(DisabledReason::SwitchedOff)
        );
    }

    #[tokio::test]
    async fn test_reconfigure_replaces_dispatcher() {
        let server = collector(200).await;
        let relay = Relay::new().unwrap();

        let mut first = RelayConfig::new(server.uri(), "key");
        first.rate_limit = 1;
        relay.reconfigure(first).await;
        assert_eq!(relay.submit(CapturedTransaction::default()), SubmitOutcome::Enqueued);
        assert_eq!(relay.submit(CapturedTransaction::default()), SubmitOutcome::Denied);

        // New dispatcher, new limiter
        let mut second = RelayConfig::new(server.uri(), "key");
        second.rate_limit = 5;
        relay.reconfigure(second).await;
        let enqueued = (0..5)
            .filter(|_| relay.submit(CapturedTransaction::default()).is_enqueued())
            .count();
        assert_eq!(enqueued, 5);

        // Disabling retires the active dispatcher
        let mut off = RelayConfig::new(server.uri(), "key");
        off.enabled = false;
        relay.reconfigure(off).await;
        assert_eq!(
            relay.submit(CapturedTransaction::default()),
            SubmitOutcome::Disabled
        );
    }

    #[tokio::test]
    async fn test_log_mode_enables_without_collector() {
        let relay = Relay::new().unwrap();
        let mut config = RelayConfig::new("http://127.0.0.1:9", "");
        config.delivery.mode = DeliveryMode::Log;
        assert!(config.probe.enabled);

        // Nothing listens on the collector port
        assert_eq!(relay.reconfigure(config).await, RelayState::Enabled);
        assert_eq!(
            relay.submit(CapturedTransaction::default()),
            SubmitOutcome::Enqueued
        );

        let report = relay.shutdown(Duration::from_secs(1)).await.unwrap();
        assert_eq!(report.abandoned_workers, 0);
        assert_eq!(
            relay.state(),
            RelayState::Disabled(DisabledReason::ShutDown)
        );
    }
}
