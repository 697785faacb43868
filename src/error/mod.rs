//! Error handling for the CRID engine.

pub mod util;

use std::io;
use std::path::PathBuf;

use arrow::error::ArrowError;
use parquet::errors::ParquetError;

/// Specialized error type for CRID materialization
#[derive(Debug, thiserror::Error)]
pub enum CridError {
    /// Invalid run configuration or reference data (weights, window size)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Input data does not match the expected column contract
    #[error("Schema error: {0}")]
    Schema(String),

    /// Error opening, reading or writing a file
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Error processing Arrow data
    #[error("Arrow error: {0}")]
    Arrow(#[from] ArrowError),

    /// Error processing Parquet data
    #[error("Parquet error: {0}")]
    Parquet(#[from] ParquetError),

    /// Error mapping records to or from record batches
    #[error("Record conversion error: {0}")]
    Conversion(#[from] serde_arrow::Error),

    /// Error reading or writing JSON documents
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CridError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a schema error
    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema(message.into())
    }

    /// Create an IO error tied to a path
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error was raised before any data was touched
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

/// Result type for CRID engine operations
pub type Result<T> = std::result::Result<T, CridError>;
