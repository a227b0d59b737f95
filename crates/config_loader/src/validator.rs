//! Config validation
//!
//! Rules:
//! - derive rules on `RelayConfig` (url syntax, workers/queue/timeouts >= 1)
//! - collector URL must be http(s) and joinable
//! - api key required when enabled (except log mode)
//! - rpc mode needs `delivery.rpc_port`

use contracts::{collector_endpoint, ContractError, DeliveryMode, RelayConfig, VERIFY_PATH};
use validator::Validate;

/// Validate a RelayConfig
///
/// Returns the first error encountered.
pub fn validate(config: &RelayConfig) -> Result<(), ContractError> {
    validate_derived(config)?;
    validate_collector(config)?;
    validate_delivery(config)?;
    Ok(())
}

fn validate_derived(config: &RelayConfig) -> Result<(), ContractError> {
    config.validate().map_err(|errors| {
        let mut fields: Vec<_> = errors.errors().keys().map(|k| k.to_string()).collect();
        fields.sort();
        ContractError::config_validation(fields.join(", "), errors.to_string())
    })
}

fn validate_collector(config: &RelayConfig) -> Result<(), ContractError> {
    collector_endpoint(&config.collector.url, VERIFY_PATH)?;

    if config.enabled
        && config.delivery.mode != DeliveryMode::Log
        && config.collector.api_key.trim().is_empty()
    {
        return Err(ContractError::config_validation(
            "collector.api_key",
            "api key cannot be empty when the relay is enabled",
        ));
    }
    Ok(())
}

fn validate_delivery(config: &RelayConfig) -> Result<(), ContractError> {
    if config.delivery.mode == DeliveryMode::Rpc {
        match config.delivery.rpc_port {
            None => {
                return Err(ContractError::config_validation(
                    "delivery.rpc_port",
                    "rpc mode requires rpc_port",
                ))
            }
            Some(0) => {
                return Err(ContractError::config_validation(
                    "delivery.rpc_port",
                    "rpc_port must be > 0",
                ))
            }
            Some(_) => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_config() -> RelayConfig {
        RelayConfig::new("https://collector.example.com", "key")
    }

    #[test]
    fn test_valid_config() {
        assert!(validate(&minimal_config()).is_ok());
    }

    #[test]
    fn test_invalid_url() {
        let mut config = minimal_config();
        config.collector.url = "not a url".into();
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("collector"), "got: {err}");
    }

    #[test]
    fn test_unsupported_scheme() {
        let mut config = minimal_config();
        config.collector.url = "ftp://collector.example.com".into();
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("unsupported scheme"), "got: {err}");
    }

    #[test]
    fn test_empty_api_key() {
        let mut config = minimal_config();
        config.collector.api_key = "  ".into();
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("api key cannot be empty"), "got: {err}");
    }

    #[test]
    fn test_empty_api_key_allowed_when_disabled() {
        let mut config = minimal_config();
        config.collector.api_key = String::new();
        config.enabled = false;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_zero_queue_capacity() {
        let mut config = minimal_config();
        config.queue_capacity = 0;
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("queue_capacity"), "got: {err}");
    }

    #[test]
    fn test_rpc_without_port() {
        let mut config = minimal_config();
        config.delivery.mode = DeliveryMode::Rpc;
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("rpc_port"), "got: {err}");

        config.delivery.rpc_port = Some(50051);
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_zero_rate_is_valid() {
        let mut config = minimal_config();
        config.rate_limit = 0;
        assert!(validate(&config).is_ok());
    }
}
