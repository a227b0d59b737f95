//! Dispatcher error types

use thiserror::Error;

/// Dispatcher-specific errors
///
/// Only construction can fail; `submit` reports through `SubmitOutcome`.
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// Transport could not be built from configuration
    #[error("failed to create transport '{transport}': {message}")]
    TransportCreation { transport: String, message: String },

    /// No tokio runtime to spawn workers on
    #[error("no tokio runtime available: {0}")]
    NoRuntime(String),

    /// Invalid configuration
    #[error("config error: {0}")]
    Contract(#[from] contracts::ContractError),
}

impl DispatcherError {
    pub fn transport_creation(transport: impl Into<String>, message: impl Into<String>) -> Self {
        Self::TransportCreation {
            transport: transport.into(),
            message: message.into(),
        }
    }
}
