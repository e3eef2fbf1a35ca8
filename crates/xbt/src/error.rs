//! Error types for the xbt library.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for dataset operations.
#[derive(Debug, Error)]
pub enum XbtError {
    /// Error reading or accessing a yearly file.
    #[error("IO error for '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error from the CSV library.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// An operation referenced a column the table does not have.
    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    /// Nothing to load.
    #[error("Empty data: {0}")]
    EmptyData(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for xbt operations.
pub type Result<T> = std::result::Result<T, XbtError>;
