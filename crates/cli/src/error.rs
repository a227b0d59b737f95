//! Error types for CLI operations.

use contracts::ContractError;
use dispatcher::{DispatcherError, RelayState};
use ingestion::IngestionError;
use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Neither a config file nor stored settings were found
    #[error("Configuration file not found: {path} (and no stored collector settings)")]
    ConfigNotFound { path: String },

    /// Configuration parse or validation error
    #[error("Configuration error: {0}")]
    Config(#[from] ContractError),

    /// Dispatcher construction error
    #[error("Dispatcher error: {0}")]
    Dispatcher(#[from] DispatcherError),

    /// Capture input error
    #[error("Capture input error: {0}")]
    Ingestion(#[from] IngestionError),

    /// The relay refused to enable delivery
    #[error("Relay not enabled: {state}")]
    RelayDisabled { state: RelayState },

    /// Collector verification failed
    #[error("Collector verification failed: {message}")]
    ProbeFailed { message: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error wrapper
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn probe_failed(message: impl Into<String>) -> Self {
        Self::ProbeFailed {
            message: message.into(),
        }
    }
}

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
