//! Storage error types.

use thiserror::Error;

/// Errors that can occur in storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Database error from rusqlite.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Stored or supplied JSON could not be (de)serialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error (e.g., creating the data directory).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// No timestamp file for the given IMDb id.
    #[error("No timestamps stored for {0}")]
    NotFound(String),

    /// A timestamp file failed validation.
    #[error("Invalid timestamp file: {}", .0.join("; "))]
    Invalid(Vec<String>),

    /// Unknown setting key or unusable setting value.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;
