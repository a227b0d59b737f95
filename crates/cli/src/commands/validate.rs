//! `validate` command implementation.

use anyhow::Context;
use config_loader::RelayConfig;
use contracts::DeliveryMode;
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;
use crate::config::resolve;
use crate::error::{CliError, Result};

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    collector: String,
    mode: String,
    rate_limit: u32,
    max_workers: usize,
    queue_capacity: usize,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.source.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        Err(anyhow::anyhow!("Configuration validation failed").into())
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.source.config.display().to_string();

    match resolve(&args.source) {
        Ok(config) => {
            let warnings = collect_warnings(&config);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    collector: config.collector.url.clone(),
                    mode: format!("{:?}", config.delivery.mode),
                    rate_limit: config.rate_limit,
                    max_workers: config.max_workers,
                    queue_capacity: config.queue_capacity,
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(match e {
                CliError::Config(inner) => inner.to_string(),
                other => other.to_string(),
            }),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(config: &RelayConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if !config.enabled {
        warnings.push("enabled = false - every submission will be dropped".to_string());
    }

    if config.rate_limit == 0 {
        warnings.push("rate_limit = 0 - every submission will be denied".to_string());
    }

    if config.delivery.mode == DeliveryMode::Log {
        warnings.push("delivery.mode = log - transactions are only logged".to_string());
    }

    if !config.probe.enabled && config.delivery.mode != DeliveryMode::Log {
        warnings.push("probe disabled - collector is not verified before delivery".to_string());
    }

    if config.queue_capacity < config.max_workers {
        warnings.push(format!(
            "queue_capacity ({}) is smaller than max_workers ({})",
            config.queue_capacity, config.max_workers
        ));
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Collector: {}", summary.collector);
            println!("  Mode: {}", summary.mode);
            println!("  Rate limit: {} / s", summary.rate_limit);
            println!("  Workers: {}", summary.max_workers);
            println!("  Queue capacity: {}", summary.queue_capacity);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warnings() {
        let mut config = RelayConfig::new("http://localhost:8081", "k");
        assert!(collect_warnings(&config).is_empty());

        config.rate_limit = 0;
        config.enabled = false;
        config.delivery.mode = DeliveryMode::Log;
        let warnings = collect_warnings(&config);
        assert_eq!(warnings.len(), 3);
        assert!(warnings[1].contains("denied"));
    }
}
