//! Terminal per-record results.

use std::fmt;

use bridge_load::{FailureClass, LoadReport};
use bridge_model::DataSetId;
use bridge_validate::ValidationResult;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Final classification of one path through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    /// Routed out without being an error.
    Discarded,
    MappingFailed,
    ValidationFailed,
    LoadFailed,
    VerificationFailed,
    Succeeded,
}

impl OutcomeStatus {
    pub const ALL: [Self; 6] = [
        Self::Discarded,
        Self::MappingFailed,
        Self::ValidationFailed,
        Self::LoadFailed,
        Self::VerificationFailed,
        Self::Succeeded,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Discarded => "discarded",
            Self::MappingFailed => "mapping_failed",
            Self::ValidationFailed => "validation_failed",
            Self::LoadFailed => "load_failed",
            Self::VerificationFailed => "verification_failed",
            Self::Succeeded => "succeeded",
        }
    }

    /// Discards and successes are not failures.
    pub fn is_failure(&self) -> bool {
        !matches!(self, Self::Discarded | Self::Succeeded)
    }
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Which of the two mapping boundaries was involved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingStage {
    /// Source record to data sets.
    Source,
    /// Data set to target records.
    Target,
}

impl fmt::Display for MappingStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Source => f.write_str("source"),
            Self::Target => f.write_str("target"),
        }
    }
}

/// Details explaining an outcome. Determines the outcome's status.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutcomeCause {
    /// Rejected by the selector.
    Filtered,
    /// The selector could not inspect the record.
    MalformedInput { detail: String },
    /// A mapper produced nothing.
    EmptyMapping { stage: MappingStage },
    /// The batch was cancelled before the record was submitted.
    Cancelled,
    Mapping {
        stage: MappingStage,
        mapper: String,
        message: String,
    },
    Validation { result: ValidationResult },
    /// The record reached the loader; covers success and load/verify failures.
    Load { report: LoadReport },
}

impl OutcomeCause {
    pub fn status(&self) -> OutcomeStatus {
        match self {
            Self::Filtered
            | Self::MalformedInput { .. }
            | Self::EmptyMapping { .. }
            | Self::Cancelled => OutcomeStatus::Discarded,
            Self::Mapping { .. } => OutcomeStatus::MappingFailed,
            Self::Validation { .. } => OutcomeStatus::ValidationFailed,
            Self::Load { report } => match report.failure_class() {
                None => OutcomeStatus::Succeeded,
                Some(FailureClass::Load) => OutcomeStatus::LoadFailed,
                Some(FailureClass::Verification) => OutcomeStatus::VerificationFailed,
            },
        }
    }

    /// Short, stable reason string.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Filtered => "filtered",
            Self::MalformedInput { .. } => "malformed input",
            Self::EmptyMapping { .. } => "empty mapping",
            Self::Cancelled => "cancelled",
            Self::Mapping { .. } => "mapping error",
            Self::Validation { .. } => "validation failed",
            Self::Load { report } if report.succeeded() => "loaded",
            Self::Load { .. } => "load error",
        }
    }
}

impl fmt::Display for OutcomeCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Filtered | Self::Cancelled => f.write_str(self.reason()),
            Self::MalformedInput { detail } => write!(f, "malformed input: {detail}"),
            Self::EmptyMapping { stage } => write!(f, "empty mapping at {stage} stage"),
            Self::Mapping {
                stage,
                mapper,
                message,
            } => write!(f, "{stage} mapper '{mapper}' failed: {message}"),
            Self::Validation { result } => {
                write!(f, "{}", result.failure_messages().join("; "))
            }
            Self::Load { report } => match &report.failure {
                Some(failure) => write!(f, "{failure}"),
                None => match &report.id_in_target_system {
                    Some(id) => write!(f, "loaded as {id}"),
                    None => f.write_str("loaded"),
                },
            },
        }
    }
}

/// Terminal record of one path through the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MigrationOutcome {
    /// Position of the source record in the batch input.
    pub sequence: usize,
    pub source_id: String,
    pub dataset_id: Option<DataSetId>,
    pub target: Option<String>,
    pub status: OutcomeStatus,
    pub cause: OutcomeCause,
    pub finished_at: DateTime<Utc>,
}

impl MigrationOutcome {
    pub fn new(sequence: usize, source_id: impl Into<String>, cause: OutcomeCause) -> Self {
        Self {
            sequence,
            source_id: source_id.into(),
            dataset_id: None,
            target: None,
            status: cause.status(),
            cause,
            finished_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn with_dataset(mut self, dataset_id: DataSetId) -> Self {
        self.dataset_id = Some(dataset_id);
        self
    }

    #[must_use]
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn validation_result(&self) -> Option<&ValidationResult> {
        match &self.cause {
            OutcomeCause::Validation { result } => Some(result),
            _ => None,
        }
    }

    pub fn load_report(&self) -> Option<&LoadReport> {
        match &self.cause {
            OutcomeCause::Load { report } => Some(report),
            _ => None,
        }
    }
}

impl fmt::Display for MigrationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {}", self.sequence, self.source_id)?;
        match (&self.dataset_id, &self.target) {
            (Some(dataset), Some(target)) => write!(f, " [{dataset} -> {target}]")?,
            (Some(dataset), None) => write!(f, " [{dataset}]")?,
            (None, Some(target)) => write!(f, " [-> {target}]")?,
            (None, None) => {}
        }
        write!(f, ": {} ({})", self.status, self.cause)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_load::{LoadFailure, LoadState};

    fn load_report(failure: Option<LoadFailure>) -> LoadReport {
        LoadReport {
            target: "crm".to_string(),
            final_state: if failure.is_some() {
                LoadState::Failed
            } else {
                LoadState::Verified
            },
            path: Vec::new(),
            poll_attempts: 1,
            id_in_target_system: Some("42".to_string()),
            loaded_at: None,
            verified_at: None,
            failure,
        }
    }

    #[test]
    fn status_follows_cause() {
        assert_eq!(OutcomeCause::Cancelled.status(), OutcomeStatus::Discarded);
        assert_eq!(
            OutcomeCause::Load {
                report: load_report(None)
            }
            .status(),
            OutcomeStatus::Succeeded
        );
        assert_eq!(
            OutcomeCause::Load {
                report: load_report(Some(LoadFailure::PollAttemptsExhausted { attempts: 3 }))
            }
            .status(),
            OutcomeStatus::LoadFailed
        );
        assert_eq!(
            OutcomeCause::Load {
                report: load_report(Some(LoadFailure::VerificationMismatch))
            }
            .status(),
            OutcomeStatus::VerificationFailed
        );
    }

    #[test]
    fn display_includes_route() {
        let outcome = MigrationOutcome::new(
            3,
            "c3",
            OutcomeCause::Mapping {
                stage: MappingStage::Target,
                mapper: "contact".to_string(),
                message: "missing field: email".to_string(),
            },
        )
        .with_dataset(DataSetId::from("ds-1"))
        .with_target("crm");

        insta::assert_snapshot!(
            outcome.to_string(),
            @"#3 c3 [ds-1 -> crm]: mapping_failed (target mapper 'contact' failed: missing field: email)"
        );
        assert!(outcome.status.is_failure());
    }
}
