//! Ingestion error types

use std::path::PathBuf;

use thiserror::Error;

/// Ingestion error
#[derive(Debug, Error)]
pub enum IngestionError {
    /// Capture file could not be opened or read
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A record did not match the wire schema
    #[error("malformed record at line {line}: {message}")]
    MalformedRecord {
        /// 1-based line number
        line: usize,
        message: String,
    },

    /// Raw request bytes had no request line
    #[error("raw request is empty")]
    EmptyRequest,
}

impl IngestionError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Ingestion Result type alias
pub type Result<T> = std::result::Result<T, IngestionError>;
