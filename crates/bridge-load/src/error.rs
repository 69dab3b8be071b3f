//! Error types for loading.

use std::path::PathBuf;

use thiserror::Error;

use crate::state::LoadState;

/// Error returned by a [`TargetClient`](crate::TargetClient) call.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TargetError {
    /// The target could not be reached or answered garbage.
    #[error("transport error: {0}")]
    Transport(String),

    /// The target refused the request.
    #[error("rejected by target: {0}")]
    Rejected(String),

    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TargetError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected(message.into())
    }
}

/// Internal loader fault. Never caused by target behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum LoadError {
    #[error("illegal load state transition {from} -> {to}")]
    IllegalTransition { from: LoadState, to: LoadState },
}
