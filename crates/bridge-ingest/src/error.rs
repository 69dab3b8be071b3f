//! Error types for source data ingestion and pre-selection.

use std::path::PathBuf;
use thiserror::Error;

/// Failure reported by a [`Filter`](crate::Filter) for a single candidate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    /// The candidate could not be inspected (missing or garbled fields).
    /// The candidate is discarded, the batch continues.
    #[error("malformed candidate: {0}")]
    Malformed(String),

    /// The filter itself is broken or misconfigured. Fatal for the batch.
    #[error("filter contract violated: {0}")]
    Contract(String),
}

impl FilterError {
    pub fn malformed(detail: impl Into<String>) -> Self {
        Self::Malformed(detail.into())
    }

    pub fn contract(detail: impl Into<String>) -> Self {
        Self::Contract(detail.into())
    }

    /// Returns true if processing can continue after this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Malformed(_))
    }
}

/// Errors that can occur while building a source data provider.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum IngestError {
    // === File System Errors ===
    /// Failed to read file.
    #[error("failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // === JSON Errors ===
    /// The file is not valid JSON.
    #[error("failed to parse JSON {path}: {source}")]
    JsonParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The configured JSON pointer does not resolve to a value.
    #[error("no value at JSON pointer '{pointer}' in {path}")]
    MissingPointer { path: PathBuf, pointer: String },

    /// The selected value is not a list of records of the expected shape.
    #[error("unexpected record shape at '{pointer}' in {path}: {source}")]
    RecordShape {
        path: PathBuf,
        pointer: String,
        #[source]
        source: serde_json::Error,
    },

    // === Provider Errors ===
    /// Two records share the same key.
    #[error("duplicate key {key} in source data")]
    DuplicateKey { key: String },

    /// A filter failed fatally while narrowing the provider.
    #[error(transparent)]
    Filter(#[from] FilterError),
}

/// Result type for ingestion operations.
pub type Result<T> = std::result::Result<T, IngestError>;
