//! Contract between the loader and a concrete target system.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::TargetError;

/// Phases a target supports, declared once per client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    /// Submission is acknowledged asynchronously and must be polled.
    pub polls: bool,
    /// The target can confirm a loaded record matches what was sent.
    pub verifies: bool,
}

impl Capabilities {
    /// Synchronous, final submit with no verification.
    pub const fn submit_only() -> Self {
        Self {
            polls: false,
            verifies: false,
        }
    }

    pub const fn all() -> Self {
        Self {
            polls: true,
            verifies: true,
        }
    }
}

/// What the target returned on submit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    /// Id assigned by the target, if it generates one.
    pub id_in_target_system: Option<String>,
    /// Handle used to poll for completion (event id, job id, ...).
    pub ticket: Option<String>,
}

impl Submission {
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id_in_target_system: Some(id.into()),
            ticket: None,
        }
    }

    #[must_use]
    pub fn ticket(mut self, ticket: impl Into<String>) -> Self {
        self.ticket = Some(ticket.into());
        self
    }
}

/// Answer to a single poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PollStatus {
    Pending,
    Done,
    /// The target finished processing and rejected the record.
    Failed(String),
}

/// Client for one target system entity.
///
/// Implementations handle their own connection pooling and must be safe to
/// share between concurrently processed records.
#[async_trait]
pub trait TargetClient<U>: Send + Sync
where
    U: Send + Sync,
{
    fn name(&self) -> &str;

    fn capabilities(&self) -> Capabilities;

    /// Adjusts the record right before submission. Does nothing by default.
    fn sanitize(&self, _record: &mut U) {}

    async fn submit(&self, record: &U) -> Result<Submission, TargetError>;

    /// Only called when [`Capabilities::polls`] is set.
    async fn poll(&self, _submission: &Submission) -> Result<PollStatus, TargetError> {
        Ok(PollStatus::Done)
    }

    /// Only called when [`Capabilities::verifies`] is set and verification is enabled.
    async fn verify(&self, _record: &U, _submission: &Submission) -> Result<bool, TargetError> {
        Ok(true)
    }

    /// Releases sessions or connections after the batch.
    async fn close(&self) -> Result<(), TargetError> {
        Ok(())
    }
}
