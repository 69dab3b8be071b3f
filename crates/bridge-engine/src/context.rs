//! Run-scoped state and the sealed batch report.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use bridge_validate::{ValidationResult, ValidationSummary};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::outcome::{MigrationOutcome, OutcomeStatus};

/// State shared by the record workers of one batch.
///
/// The outcome list is append-only; whole outcomes are pushed under a lock.
#[derive(Debug)]
pub struct RunContext {
    run_id: Uuid,
    started_at: DateTime<Utc>,
    records_entered: AtomicUsize,
    outcomes: Mutex<Vec<MigrationOutcome>>,
    validation: Mutex<ValidationSummary>,
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new()
    }
}

impl RunContext {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            records_entered: AtomicUsize::new(0),
            outcomes: Mutex::new(Vec::new()),
            validation: Mutex::new(ValidationSummary::default()),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub(crate) fn record_entered(&self) {
        self.records_entered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn records_entered(&self) -> usize {
        self.records_entered.load(Ordering::Relaxed)
    }

    pub(crate) fn push(&self, outcome: MigrationOutcome) {
        if outcome.status.is_failure() {
            tracing::warn!(
                sequence = outcome.sequence,
                source_id = %outcome.source_id,
                status = %outcome.status,
                reason = outcome.cause.reason(),
                "record failed"
            );
        } else {
            tracing::debug!(
                sequence = outcome.sequence,
                source_id = %outcome.source_id,
                status = %outcome.status,
                reason = outcome.cause.reason(),
                "record finished"
            );
        }
        self.outcomes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(outcome);
    }

    pub(crate) fn record_validation(&self, result: &ValidationResult) {
        self.validation
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .add(result);
    }

    /// Number of outcomes emitted so far.
    pub fn outcome_count(&self) -> usize {
        self.outcomes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Takes the collected outcomes and freezes them into a report.
    pub(crate) fn seal(&self, cancelled: bool) -> BatchReport {
        let mut outcomes = std::mem::take(
            &mut *self
                .outcomes
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        // Stable: outcomes of one record keep their emission order.
        outcomes.sort_by_key(|o| o.sequence);
        BatchReport {
            run_id: self.run_id,
            started_at: self.started_at,
            finished_at: Utc::now(),
            cancelled,
            records_entered: self.records_entered(),
            outcomes,
            validation: std::mem::take(
                &mut *self
                    .validation
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner),
            ),
        }
    }
}

/// Immutable result of a completed batch.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    run_id: Uuid,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    cancelled: bool,
    records_entered: usize,
    outcomes: Vec<MigrationOutcome>,
    validation: ValidationSummary,
}

impl BatchReport {
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn finished_at(&self) -> DateTime<Utc> {
        self.finished_at
    }

    /// True if the batch was cancelled before every record was pulled.
    pub fn cancelled(&self) -> bool {
        self.cancelled
    }

    /// Records that entered processing. Each has at least one outcome.
    pub fn records_entered(&self) -> usize {
        self.records_entered
    }

    /// Outcomes ordered by source sequence.
    pub fn outcomes(&self) -> &[MigrationOutcome] {
        &self.outcomes
    }

    pub fn outcomes_for<'a>(
        &'a self,
        source_id: &'a str,
    ) -> impl Iterator<Item = &'a MigrationOutcome> + 'a {
        self.outcomes.iter().filter(move |o| o.source_id == source_id)
    }

    pub fn count(&self, status: OutcomeStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }

    /// Outcome count per status; statuses without outcomes are included with 0.
    pub fn counts(&self) -> BTreeMap<OutcomeStatus, usize> {
        OutcomeStatus::ALL
            .iter()
            .map(|&status| (status, self.count(status)))
            .collect()
    }

    pub fn has_failures(&self) -> bool {
        self.outcomes.iter().any(|o| o.status.is_failure())
    }

    /// Validation summary over every data set that reached the validator.
    pub fn validation_summary(&self) -> &ValidationSummary {
        &self.validation
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
