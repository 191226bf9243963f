use core::result::Result as CoreResult;
use std::io::Error as IoError;

use serde_json::Error as SerdeJsonError;
use thiserror::Error;
use toml::de::Error as TomlError;

/// Result type for store operations.
pub type Result<T> = CoreResult<T, Error>;

/// Errors that can occur while ingesting, persisting or retrieving.
#[derive(Debug, Error)]
pub enum Error {
    /// An I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization or deserialization failed.
    #[error("JSON serialization error: {0}")]
    Json(#[from] SerdeJsonError),

    /// TOML deserialization failed.
    #[error("TOML deserialization error: {0}")]
    Toml(#[from] TomlError),

    /// Binary encoding or decoding of the embedding matrix failed.
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Configuration is invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The embedding provider could not be reached or its model could not be loaded.
    #[error("Embedding provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// The embedding provider returned an unusable response.
    #[error("Invalid response from embedding provider: {0}")]
    InvalidResponse(String),

    /// Matrix rows and chunk records disagree in length.
    #[error("Store misaligned: {rows} embedding rows for {records} records")]
    Misaligned {
        /// Number of matrix rows
        rows: usize,
        /// Number of chunk records
        records: usize,
    },

    /// Two matrices of different widths were combined.
    #[error("Dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch {
        /// Width the operation required
        expected: usize,
        /// Width that was supplied
        found: usize,
    },

    /// A general error not covered by other variants.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Determines whether this error may succeed if retried.
    ///
    /// Only provider outages are transient; retry policy belongs to the caller.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ProviderUnavailable(_))
    }
}
