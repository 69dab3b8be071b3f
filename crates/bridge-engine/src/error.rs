//! Batch-fatal errors.
//!
//! Record-level problems never show up here; they become
//! [`MigrationOutcome`](crate::MigrationOutcome)s. An [`EngineError`] means
//! the batch itself cannot continue and no report is produced.

use bridge_load::LoadError;
use bridge_model::ConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EngineError {
    // === Setup ===
    /// The batch configuration failed validation.
    #[error("invalid batch configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    /// The strategy is missing a required stage.
    #[error("invalid migration strategy: {0}")]
    InvalidStrategy(String),

    // === Runtime ===
    /// A pluggable component broke its contract.
    #[error("{component} violated its contract: {message}")]
    Contract { component: String, message: String },

    /// A record task panicked outside the guarded stages.
    #[error("record worker panicked: {0}")]
    WorkerPanicked(String),

    /// The worker pool was shut down underneath the batch.
    #[error("worker pool closed: {0}")]
    PoolClosed(String),

    /// The loader state machine was driven illegally.
    #[error(transparent)]
    Load(#[from] LoadError),
}

impl EngineError {
    pub fn contract(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Contract {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Short hint for operators.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::InvalidConfig(_) => Some("Check the batch configuration file"),
            Self::InvalidStrategy(_) => {
                Some("Register a source mapper and at least one target route")
            }
            Self::Contract { .. } => Some("Fix the failing component and re-run the batch"),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
