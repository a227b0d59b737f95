//! `info` command implementation.

use anyhow::Context;
use config_loader::RelayConfig;
use contracts::{collector_endpoint, DeliveryMode, LOG_REQUEST_PATH};
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;
use crate::config::{credentials_path, redacted, resolve, settings_store};
use crate::error::Result;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    config: RelayConfig,
    delivery_target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    settings_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    credentials_file: Option<String>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.source.config.display(), "Loading configuration info");

    let config = resolve(&args.source)?;
    let info = build_config_info(&config, args);

    if args.json {
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&info);
    }

    Ok(())
}

fn delivery_target(config: &RelayConfig) -> String {
    match config.delivery.mode {
        DeliveryMode::Http => collector_endpoint(&config.collector.url, LOG_REQUEST_PATH)
            .map(|url| url.to_string())
            .unwrap_or_else(|e| format!("invalid ({e})")),
        DeliveryMode::Rpc => match config.delivery.rpc_port {
            Some(port) => format!("rpc://127.0.0.1:{port}"),
            None => "rpc (no port configured)".to_string(),
        },
        DeliveryMode::Log => "log only".to_string(),
    }
}

fn build_config_info(config: &RelayConfig, args: &InfoArgs) -> ConfigInfo {
    ConfigInfo {
        config: redacted(config),
        delivery_target: delivery_target(config),
        settings_file: settings_store(args.source.settings.as_deref())
            .map(|store| store.path().display().to_string()),
        credentials_file: credentials_path().map(|p| p.display().to_string()),
    }
}

fn print_config_info(info: &ConfigInfo) {
    let config = &info.config;

    println!("=== Relay Configuration ===\n");

    println!("Collector");
    println!("   ├─ URL: {}", config.collector.url);
    println!("   ├─ API key: {}", config.collector.api_key);
    println!("   └─ Enabled: {}", config.enabled);

    println!("\nDelivery");
    println!("   ├─ Mode: {:?}", config.delivery.mode);
    println!("   ├─ Target: {}", info.delivery_target);
    println!(
        "   ├─ Timeouts: connect {} ms, request {} ms",
        config.delivery.connect_timeout_ms, config.delivery.request_timeout_ms
    );
    println!("   ├─ Rate limit: {} / s", config.rate_limit);
    println!("   ├─ Workers: {}", config.max_workers);
    println!("   ├─ Queue capacity: {}", config.queue_capacity);
    println!("   └─ Idle timeout: {} s", config.idle_timeout_secs);

    println!("\nProbe");
    if config.probe.enabled {
        println!("   └─ Enabled, timeout {} ms", config.probe.timeout_ms);
    } else {
        println!("   └─ Disabled");
    }

    println!("\nSources");
    println!("   ├─ Environment: {}", config.environment);
    println!(
        "   ├─ Settings file: {}",
        info.settings_file.as_deref().unwrap_or("(none)")
    );
    println!(
        "   └─ Credentials file: {}",
        info.credentials_file.as_deref().unwrap_or("(none)")
    );

    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delivery_target() {
        let mut config = RelayConfig::new("http://collector:8081/base", "k");
        assert_eq!(
            delivery_target(&config),
            "http://collector:8081/base/api/v1/log-request/single"
        );

        config.delivery.mode = DeliveryMode::Rpc;
        config.delivery.rpc_port = Some(9090);
        assert_eq!(delivery_target(&config), "rpc://127.0.0.1:9090");

        config.delivery.mode = DeliveryMode::Log;
        assert_eq!(delivery_target(&config), "log only");
    }
}
