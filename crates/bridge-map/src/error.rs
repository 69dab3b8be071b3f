//! Error types for mapping operations.

use thiserror::Error;

/// Errors from mapping one input into zero or more outputs.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum MappingError {
    /// A field required by the mapping is absent.
    #[error("missing field: {0}")]
    MissingField(String),

    /// A field is present but cannot be converted.
    #[error("invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },

    /// A read-only lookup (code table, reference data) found nothing.
    #[error("lookup failed for '{key}': {message}")]
    Lookup { key: String, message: String },

    /// Any other error raised by mapper code.
    #[error(transparent)]
    Failed(#[from] anyhow::Error),

    /// The mapper panicked.
    #[error("mapper panicked: {0}")]
    Panicked(String),
}

impl MappingError {
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn lookup(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Lookup {
            key: key.into(),
            message: message.into(),
        }
    }

    /// The field associated with this error, if any.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::MissingField(field) | Self::InvalidValue { field, .. } => Some(field),
            _ => None,
        }
    }

    /// Message including the whole cause chain.
    pub fn detail(&self) -> String {
        match self {
            Self::Failed(err) => format!("{err:#}"),
            other => other.to_string(),
        }
    }
}
