//! Layered error definitions
//!
//! Categorized by source: config / connectivity / auth / delivery

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Collector Errors =====
    /// Collector unreachable or timed out
    #[error("collector connectivity error at '{endpoint}': {message}")]
    Connectivity { endpoint: String, message: String },

    /// Collector rejected the credential
    #[error("collector rejected credential at '{endpoint}'")]
    Auth { endpoint: String },

    /// A single delivery attempt failed
    #[error("transport '{transport}' delivery error: {source}")]
    Delivery {
        transport: String,
        #[source]
        source: DeliveryError,
    },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create connectivity error
    pub fn connectivity(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Connectivity {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Create delivery error
    pub fn delivery(transport: impl Into<String>, source: DeliveryError) -> Self {
        Self::Delivery {
            transport: transport.into(),
            source,
        }
    }
}

/// Failure of one delivery attempt.
///
/// Never surfaced to the capturing adapter: workers log it, count it and
/// drop the transaction.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeliveryError {
    /// Transaction could not be encoded for the wire
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// Connection or protocol failure before a response arrived
    #[error("network failure: {0}")]
    Network(String),

    /// Attempt exceeded its connect/request deadline
    #[error("delivery timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },

    /// Collector answered with a non-success HTTP status
    #[error("collector returned status {status}")]
    Status { status: u16 },

    /// Collector or helper reported a failed ingest
    #[error("collector rejected transaction: {0}")]
    Rejected(String),

    /// Transport already closed
    #[error("transport closed")]
    Closed,

    /// Transport panicked during the attempt
    #[error("transport panicked: {0}")]
    Panicked(String),
}

impl DeliveryError {
    /// Short label for metrics
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Serialization(_) => "serialization",
            Self::Network(_) => "network",
            Self::Timeout { .. } => "timeout",
            Self::Status { .. } => "status",
            Self::Rejected(_) => "rejected",
            Self::Closed => "closed",
            Self::Panicked(_) => "panicked",
        }
    }
}
