//! Per-record load state machine.
//!
//! ```text
//! NotSubmitted --submit ok--> Submitted --polls--> Polling --done--> Verified
//!      |                          |                 |  ^                |
//!      | submit error             | no polling      |  | pending        | mismatch
//!      v                          v                 |  |                v
//!    Failed                    Verified             +--+--> Failed    Failed
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::LoadError;

/// Phase of one target record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadState {
    NotSubmitted,
    Submitted,
    Polling,
    /// Processed by the target; verification passed or was not performed.
    Verified,
    Failed,
}

impl LoadState {
    pub fn label(&self) -> &'static str {
        match self {
            Self::NotSubmitted => "not_submitted",
            Self::Submitted => "submitted",
            Self::Polling => "polling",
            Self::Verified => "verified",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Verified | Self::Failed)
    }

    /// Whether the machine may move from `self` to `to`.
    pub fn can_transition_to(&self, to: LoadState) -> bool {
        matches!(
            (self, to),
            (Self::NotSubmitted, Self::Submitted | Self::Failed)
                | (Self::Submitted, Self::Polling | Self::Verified)
                | (Self::Polling, Self::Polling | Self::Verified | Self::Failed)
                | (Self::Verified, Self::Failed)
        )
    }
}

impl fmt::Display for LoadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Tracks the current state and every state visited.
#[derive(Debug, Clone)]
pub struct LoadStateMachine {
    path: Vec<LoadState>,
}

impl Default for LoadStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl LoadStateMachine {
    pub fn new() -> Self {
        Self {
            path: vec![LoadState::NotSubmitted],
        }
    }

    pub fn state(&self) -> LoadState {
        self.path
            .last()
            .copied()
            .unwrap_or(LoadState::NotSubmitted)
    }

    pub fn advance(&mut self, to: LoadState) -> Result<(), LoadError> {
        let from = self.state();
        if !from.can_transition_to(to) {
            return Err(LoadError::IllegalTransition { from, to });
        }
        self.path.push(to);
        Ok(())
    }

    /// States visited so far, starting with `NotSubmitted`.
    pub fn path(&self) -> &[LoadState] {
        &self.path
    }

    pub fn into_path(self) -> Vec<LoadState> {
        self.path
    }
}
