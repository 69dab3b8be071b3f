//! Result of loading one target record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::state::LoadState;

/// Phase a load failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureClass {
    /// Submit or poll phase.
    Load,
    /// Verify phase.
    Verification,
}

/// Why a record ended in [`LoadState::Failed`].
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LoadFailure {
    #[error("submit failed: {message}")]
    Submit { message: String },

    #[error("target rejected the record on poll {attempt}: {reason}")]
    PollRejected { attempt: u32, reason: String },

    #[error("poll {attempt} failed: {message}")]
    PollError { attempt: u32, message: String },

    #[error("still pending after {attempts} poll attempts")]
    PollAttemptsExhausted { attempts: u32 },

    #[error("poll {attempt} timed out after {timeout_ms} ms")]
    PollAttemptTimeout { attempt: u32, timeout_ms: u64 },

    #[error("polling timed out after {timeout_ms} ms ({attempts} attempts)")]
    PollTimeout { attempts: u32, timeout_ms: u64 },

    #[error("verification mismatch: target content differs from the submitted record")]
    VerificationMismatch,

    #[error("verification failed: {message}")]
    VerifyError { message: String },
}

impl LoadFailure {
    pub fn class(&self) -> FailureClass {
        match self {
            Self::VerificationMismatch | Self::VerifyError { .. } => FailureClass::Verification,
            _ => FailureClass::Load,
        }
    }
}

/// Everything the loader learned while loading one record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadReport {
    pub target: String,
    pub final_state: LoadState,
    /// Every state visited, starting with `NotSubmitted`.
    pub path: Vec<LoadState>,
    pub poll_attempts: u32,
    pub id_in_target_system: Option<String>,
    /// When the target reported the record as processed.
    pub loaded_at: Option<DateTime<Utc>>,
    /// When verification passed.
    pub verified_at: Option<DateTime<Utc>>,
    pub failure: Option<LoadFailure>,
}

impl LoadReport {
    pub fn succeeded(&self) -> bool {
        self.final_state == LoadState::Verified && self.failure.is_none()
    }

    pub fn failure_class(&self) -> Option<FailureClass> {
        self.failure.as_ref().map(LoadFailure::class)
    }
}
