//! Drives one target record through submit, poll and verify.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::client::{PollStatus, Submission, TargetClient};
use crate::error::LoadError;
use crate::policy::LoadPolicy;
use crate::report::{LoadFailure, LoadReport};
use crate::state::{LoadState, LoadStateMachine};

/// Loads records into one target with a fixed policy.
pub struct Loader<U: Send + Sync> {
    client: Arc<dyn TargetClient<U>>,
    policy: LoadPolicy,
}

impl<U: Send + Sync> Clone for Loader<U> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            policy: self.policy.clone(),
        }
    }
}

impl<U> Loader<U>
where
    U: Send + Sync,
{
    /// Creates a loader; the client is shared, not owned.
    pub fn new(client: Arc<dyn TargetClient<U>>, policy: LoadPolicy) -> Self {
        Self { client, policy }
    }

    /// The target client this loader submits to.
    pub fn client(&self) -> &Arc<dyn TargetClient<U>> {
        &self.client
    }

    /// Polling and verification policy applied to every record.
    pub fn policy(&self) -> &LoadPolicy {
        &self.policy
    }

    /// Whether the verify phase will run for this target.
    pub fn verifies(&self) -> bool {
        self.policy.verify_enabled && self.client.capabilities().verifies
    }

    /// Loads one record and reports how far it got.
    ///
    /// Target misbehaviour ends up in [`LoadReport::failure`]; `Err` is only
    /// returned for internal faults.
    pub async fn load(&self, mut record: U) -> Result<LoadReport, LoadError> {
        let target = self.client.name().to_string();
        let capabilities = self.client.capabilities();
        let mut machine = LoadStateMachine::new();
        let mut report = LoadReport {
            target,
            final_state: LoadState::NotSubmitted,
            path: Vec::new(),
            poll_attempts: 0,
            id_in_target_system: None,
            loaded_at: None,
            verified_at: None,
            failure: None,
        };

        self.client.sanitize(&mut record);

        // Submit
        let submission = match self.client.submit(&record).await {
            Ok(submission) => submission,
            Err(err) => {
                machine.advance(LoadState::Failed)?;
                return Ok(self.finish(
                    report,
                    machine,
                    Some(LoadFailure::Submit {
                        message: err.to_string(),
                    }),
                ));
            }
        };
        machine.advance(LoadState::Submitted)?;
        report.id_in_target_system = submission.id_in_target_system.clone();
        tracing::debug!(
            target_system = %report.target,
            id_in_target_system = ?submission.id_in_target_system,
            "record submitted"
        );

        // Poll
        if capabilities.polls {
            machine.advance(LoadState::Polling)?;
            let outcome = self
                .poll_phase(&submission, &mut machine, &mut report.poll_attempts)
                .await?;
            if let Err(failure) = outcome {
                machine.advance(LoadState::Failed)?;
                return Ok(self.finish(report, machine, Some(failure)));
            }
        }
        machine.advance(LoadState::Verified)?;
        report.loaded_at = Some(Utc::now());

        // Verify
        if self.verifies() {
            let failure = match self.client.verify(&record, &submission).await {
                Ok(true) => None,
                Ok(false) => Some(LoadFailure::VerificationMismatch),
                Err(err) => Some(LoadFailure::VerifyError {
                    message: err.to_string(),
                }),
            };
            if failure.is_some() {
                machine.advance(LoadState::Failed)?;
                return Ok(self.finish(report, machine, failure));
            }
            report.verified_at = Some(Utc::now());
        }

        Ok(self.finish(report, machine, None))
    }

    /// Runs the poll loop, bounded by the overall poll timeout if one is set.
    async fn poll_phase(
        &self,
        submission: &Submission,
        machine: &mut LoadStateMachine,
        attempts: &mut u32,
    ) -> Result<Result<(), LoadFailure>, LoadError> {
        let Some(limit) = self.policy.poll_timeout else {
            return self.poll_until_done(submission, machine, attempts).await;
        };
        let polled = tokio::time::timeout(
            limit,
            self.poll_until_done(submission, machine, &mut *attempts),
        )
        .await;
        match polled {
            Ok(outcome) => outcome,
            Err(_elapsed) => Ok(Err(LoadFailure::PollTimeout {
                attempts: *attempts,
                timeout_ms: millis(limit),
            })),
        }
    }

    async fn poll_until_done(
        &self,
        submission: &Submission,
        machine: &mut LoadStateMachine,
        attempts: &mut u32,
    ) -> Result<Result<(), LoadFailure>, LoadError> {
        let max_attempts = self.policy.max_poll_attempts;
        let mut delay = self.policy.poll_interval;

        for attempt in 1..=max_attempts {
            *attempts = attempt;
            let status = match self.poll_once(submission).await {
                Some(status) => status,
                None => {
                    return Ok(Err(LoadFailure::PollAttemptTimeout {
                        attempt,
                        timeout_ms: self.policy.poll_attempt_timeout.map_or(0, millis),
                    }));
                }
            };

            match status {
                Ok(PollStatus::Done) => {
                    tracing::debug!(
                        target_system = self.client.name(),
                        attempt,
                        "target finished processing"
                    );
                    return Ok(Ok(()));
                }
                Ok(PollStatus::Failed(reason)) => {
                    return Ok(Err(LoadFailure::PollRejected { attempt, reason }));
                }
                Err(err) => {
                    return Ok(Err(LoadFailure::PollError {
                        attempt,
                        message: err.to_string(),
                    }));
                }
                Ok(PollStatus::Pending) => {}
            }

            if attempt == max_attempts {
                break;
            }
            tracing::debug!(
                target_system = self.client.name(),
                attempt,
                delay_ms = millis(delay),
                "target still pending"
            );
            machine.advance(LoadState::Polling)?;
            tokio::time::sleep(delay).await;
            delay = self.policy.next_delay(delay);
        }

        Ok(Err(LoadFailure::PollAttemptsExhausted {
            attempts: max_attempts,
        }))
    }

    /// One poll call. `None` means the per-attempt timeout elapsed.
    async fn poll_once(
        &self,
        submission: &Submission,
    ) -> Option<Result<PollStatus, crate::error::TargetError>> {
        match self.policy.poll_attempt_timeout {
            Some(limit) => tokio::time::timeout(limit, self.client.poll(submission))
                .await
                .ok(),
            None => Some(self.client.poll(submission).await),
        }
    }

    fn finish(
        &self,
        mut report: LoadReport,
        machine: LoadStateMachine,
        failure: Option<LoadFailure>,
    ) -> LoadReport {
        report.final_state = machine.state();
        report.path = machine.into_path();
        if let Some(failure) = &failure {
            tracing::warn!(
                target_system = %report.target,
                state = %report.final_state,
                poll_attempts = report.poll_attempts,
                error = %failure,
                "load failed"
            );
        }
        report.failure = failure;
        report
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
