//! # Integration Tests
//!
//! End-to-end scenarios across crates.
//!
//! Covers:
//! - Wire schema snapshots
//! - Rate-limited delivery against a mock collector
//! - Capture adapters feeding the relay
//! - Connectivity probe policy

#[cfg(test)]
mod contract_tests {
    use contracts::CapturedTransaction;
    use serde_json::{json, Value};

    #[test]
    fn test_empty_transaction_wire_shape() {
        let tx = CapturedTransaction::builder().method("").build();
        let value: Value = serde_json::from_slice(&tx.to_wire_json().unwrap()).unwrap();

        assert_eq!(value["request"]["url"]["parameters"], json!([]));
        assert_eq!(value["request"]["headers"], json!([]));
        assert_eq!(value["request"]["body"], json!(""));
        assert_eq!(value["response"]["headers"], json!([]));
        assert_eq!(value["response"]["body"], json!(""));
        assert_eq!(value["meta"]["incoming"], json!(true));
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{
        CapturedTransaction, DeliveryMode, RelayConfig, SubmitOutcome, TransactionSink, Transport,
    };
    use dispatcher::{ConnectivityCheck, Dispatcher, Relay, RelayState};
    use ingestion::{CaptureAdapter, RawExchange, RawExchangeAdapter, ReplaySource, BURP_SUITE_SOURCE};
    use serde_json::Value;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const LOG_PATH: &str = "/api/v1/log-request/single";

    async fn collector() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/verify"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(LOG_PATH))
            .and(header("authorization", "key"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        server
    }

    fn config(server: &MockServer, rate: u32, workers: usize) -> RelayConfig {
        let mut config = RelayConfig::new(server.uri(), "key");
        config.rate_limit = rate;
        config.max_workers = workers;
        config
    }

    fn transaction(i: usize) -> CapturedTransaction {
        CapturedTransaction::builder()
            .method("GET")
            .host("shop.example.com")
            .path(format!("/items/{i}"))
            .status(200)
            .build()
    }

    async fn posted(server: &MockServer) -> Vec<Value> {
        server
            .received_requests()
            .await
            .unwrap_or_default()
            .into_iter()
            .filter(|r| r.url.path() == LOG_PATH)
            .map(|r| serde_json::from_slice(&r.body).unwrap())
            .collect()
    }

    async fn wait_posted(server: &MockServer, n: usize) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while posted(server).await.len() < n && Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    /// rate 10, pool 4: 15 submissions in ~200 ms deliver 10 and drop 5;
    /// once the window has slid, 10 more are all admitted
    #[tokio::test]
    async fn test_rate_limited_burst_then_window_slides() {
        let server = collector().await;
        let dispatcher = Dispatcher::from_config(&config(&server, 10, 4)).unwrap();

        let mut outcomes = Vec::new();
        for i in 0..15 {
            outcomes.push(dispatcher.submit(transaction(i)));
            tokio::time::sleep(Duration::from_millis(13)).await;
        }
        let enqueued = outcomes.iter().filter(|o| o.is_enqueued()).count();
        let denied = outcomes
            .iter()
            .filter(|o| **o == SubmitOutcome::Denied)
            .count();
        assert_eq!(enqueued, 10);
        assert_eq!(denied, 5);

        wait_posted(&server, 10).await;
        assert_eq!(posted(&server).await.len(), 10);
        assert!(dispatcher.metrics().live_workers <= 4);

        tokio::time::sleep(Duration::from_millis(1100)).await;
        for i in 15..25 {
            assert_eq!(dispatcher.submit(transaction(i)), SubmitOutcome::Enqueued);
        }

        wait_posted(&server, 20).await;
        let report = dispatcher.shutdown(Duration::from_secs(5)).await;
        assert_eq!(report.metrics.delivered, 20);
        assert_eq!(report.metrics.denied, 5);
        assert_eq!(posted(&server).await.len(), 20);
    }

    #[tokio::test]
    async fn test_hanging_collector_never_blocks_submit() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(10)))
            .mount(&server)
            .await;

        let mut config = config(&server, 1000, 2);
        config.queue_capacity = 8;
        let dispatcher = Dispatcher::from_config(&config).unwrap();

        let started = Instant::now();
        let outcomes: Vec<_> = (0..100).map(|i| dispatcher.submit(transaction(i))).collect();
        assert!(started.elapsed() < Duration::from_millis(200));
        assert!(outcomes.contains(&SubmitOutcome::QueueFull));

        let report = dispatcher.shutdown(Duration::from_millis(100)).await;
        assert!(report.cancelled > 0 || report.abandoned_workers > 0);
    }

    #[tokio::test]
    async fn test_raw_exchange_through_relay() {
        let server = collector().await;
        let relay = Arc::new(Relay::new().unwrap());
        assert_eq!(
            relay.reconfigure(config(&server, 10, 2)).await,
            RelayState::Enabled
        );

        let adapter = RawExchangeAdapter::new(Arc::clone(&relay)).with_environment("staging");
        let outcome = adapter.capture(RawExchange::new(
            "10.0.0.9",
            8080,
            &b"GET /orders?id=3 HTTP/1.1\r\nAccept: */*\r\n\r\n"[..],
            &b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\n\r\nok"[..],
        ));
        assert_eq!(outcome, SubmitOutcome::Enqueued);

        wait_posted(&server, 1).await;
        let bodies = posted(&server).await;
        assert_eq!(bodies.len(), 1);
        let body = &bodies[0];
        assert_eq!(body["request"]["url"]["path"], "/orders");
        assert_eq!(body["request"]["url"]["parameters"][0]["name"], "id");
        assert_eq!(body["response"]["body"], "ok");
        assert_eq!(body["meta"]["destinationPort"], 8080);
        assert_eq!(body["meta"]["environment"], "staging");
        assert_eq!(body["meta"]["metloSource"], BURP_SUITE_SOURCE);

        relay.shutdown(Duration::from_secs(1)).await;
        assert!(!adapter.capture(RawExchange::default()).is_enqueued());
    }

    #[tokio::test]
    async fn test_relay_refuses_rejected_credential() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/verify"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let relay = Relay::new().unwrap();
        let state = relay.reconfigure(config(&server, 10, 2)).await;
        assert!(matches!(state, RelayState::Disabled(_)));
        assert_eq!(relay.submit(transaction(0)), SubmitOutcome::Disabled);
        assert!(posted(&server).await.is_empty());
    }

    #[tokio::test]
    async fn test_config_file_to_delivery() {
        let server = collector().await;
        let content = format!(
            "rate_limit = 5\nmax_workers = 1\n\n[collector]\nurl = \"{}\"\napi_key = \"key\"\n",
            server.uri()
        );
        let config = ConfigLoader::load_from_str(&content, ConfigFormat::Toml).unwrap();

        let relay = Relay::new().unwrap();
        assert!(relay.reconfigure(config).await.is_enabled());

        let admitted = (0..8)
            .map(|i| relay.submit(transaction(i)))
            .filter(|o| o.is_enqueued())
            .count();
        assert_eq!(admitted, 5);

        wait_posted(&server, 5).await;
        let report = relay.shutdown(Duration::from_secs(5)).await.unwrap();
        assert_eq!(report.metrics.delivered, 5);
    }

    #[tokio::test]
    async fn test_replay_file_in_log_mode() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("capture.ndjson");
        let mut lines = Vec::new();
        for i in 0..4 {
            lines.push(String::from_utf8(transaction(i).to_wire_json().unwrap()).unwrap());
        }
        lines.insert(2, "not a transaction".to_string());
        std::fs::write(&path, lines.join("\n")).unwrap();

        let mut config = RelayConfig::new("http://127.0.0.1:9", "");
        config.delivery.mode = DeliveryMode::Log;
        let dispatcher = Dispatcher::from_config(&config).unwrap();

        let mut source = ReplaySource::open(&path).unwrap();
        let outcomes: Vec<_> = source.by_ref().map(|tx| dispatcher.submit(tx)).collect();
        assert_eq!(outcomes.len(), 4);
        assert_eq!(source.malformed(), 1);

        let deadline = Instant::now() + Duration::from_secs(5);
        while dispatcher.metrics().delivered < 4 && Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        let report = dispatcher.shutdown(Duration::from_secs(2)).await;
        assert_eq!(report.metrics.delivered, 4);
        assert_eq!(dispatcher.transport().name(), "log");
    }

    #[tokio::test]
    async fn test_probe_policy() {
        let check = ConnectivityCheck::new().unwrap();
        for (status, expected) in [(200, true), (404, false), (401, false), (500, true)] {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/api/v1/verify"))
                .respond_with(ResponseTemplate::new(status))
                .mount(&server)
                .await;
            assert_eq!(
                check.probe(&server.uri(), "key").await,
                expected,
                "status {status}"
            );
        }

        let hanging = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(10)))
            .mount(&hanging)
            .await;
        let outcome = check
            .check(&hanging.uri(), "key", Duration::from_millis(300))
            .await;
        assert!(!outcome.enables());
    }
}
