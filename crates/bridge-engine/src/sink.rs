//! Consumers of finished batch reports.

use bridge_model::{DataSetId, redact_value};

use crate::context::BatchReport;
use crate::outcome::OutcomeStatus;

/// Receives the full report once a batch completes.
pub trait MonitoringSink: Send + Sync {
    fn publish(&self, report: &BatchReport);
}

/// Writes the batch summary and every failed outcome to `tracing`.
///
/// Outcome details may quote record content and are redacted unless data
/// logging is enabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl MonitoringSink for TracingSink {
    fn publish(&self, report: &BatchReport) {
        let counts = report.counts();
        let count = |status: OutcomeStatus| counts.get(&status).copied().unwrap_or(0);

        tracing::info!(
            run_id = %report.run_id(),
            records = report.records_entered(),
            outcomes = report.outcomes().len(),
            succeeded = count(OutcomeStatus::Succeeded),
            discarded = count(OutcomeStatus::Discarded),
            mapping_failed = count(OutcomeStatus::MappingFailed),
            validation_failed = count(OutcomeStatus::ValidationFailed),
            load_failed = count(OutcomeStatus::LoadFailed),
            verification_failed = count(OutcomeStatus::VerificationFailed),
            cancelled = report.cancelled(),
            "batch finished"
        );

        for outcome in report.outcomes().iter().filter(|o| o.status.is_failure()) {
            let detail = outcome.cause.to_string();
            tracing::warn!(
                run_id = %report.run_id(),
                sequence = outcome.sequence,
                source_id = %outcome.source_id,
                dataset_id = ?outcome.dataset_id.as_ref().map(DataSetId::as_str),
                target_system = ?outcome.target,
                status = %outcome.status,
                detail = redact_value(&detail),
                "failed outcome"
            );
        }

        if report.validation_summary().total > 0 {
            report.validation_summary().log();
        }
    }
}
