//! Batch loop: pulls source records and drives each through the pipeline.
//!
//! Records are independent units of work. Each one runs in its own task on a
//! bounded pool (`workerConcurrency` permits); the pure stages run inline and
//! the loader suspends between poll attempts without blocking other records.
//! Every path a record takes ends in exactly one [`MigrationOutcome`] pushed
//! to the [`RunContext`]. Only [`EngineError`]s end a batch early.

use std::sync::Arc;

use bridge_ingest::FilterError;
use bridge_load::{LoadPolicy, Loader, TargetClient};
use bridge_map::map_guarded;
use bridge_model::{BatchConfig, SourceRecord};
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::context::{BatchReport, RunContext};
use crate::error::{EngineError, Result};
use crate::outcome::{MappingStage, MigrationOutcome, OutcomeCause};
use crate::sink::MonitoringSink;
use crate::strategy::MigrationStrategy;

/// Runs batches of source records through a [`MigrationStrategy`].
pub struct Orchestrator<S, T, U: Send + Sync> {
    strategy: Arc<MigrationStrategy<S, T, U>>,
    loaders: Arc<[Loader<U>]>,
    config: BatchConfig,
    sink: Option<Arc<dyn MonitoringSink>>,
}

impl<S, T, U> Orchestrator<S, T, U>
where
    S: SourceRecord + 'static,
    T: Send + Sync + 'static,
    U: Send + Sync + 'static,
{
    /// Validates the config and prepares one loader per target route.
    pub fn new(strategy: MigrationStrategy<S, T, U>, config: BatchConfig) -> Result<Self> {
        config.validate()?;
        let policy = LoadPolicy::from(&config);
        let loaders: Arc<[Loader<U>]> = strategy
            .routes
            .iter()
            .map(|route| Loader::new(Arc::clone(&route.client), policy.clone()))
            .collect();
        Ok(Self {
            strategy: Arc::new(strategy),
            loaders,
            config,
            sink: None,
        })
    }

    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn MonitoringSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    pub fn strategy(&self) -> &MigrationStrategy<S, T, U> {
        &self.strategy
    }

    /// Processes one batch.
    ///
    /// After `cancel` fires no further records are pulled; records already
    /// in flight still produce outcomes. Target clients are closed when the
    /// batch ends, whether it completed or aborted.
    ///
    /// # Errors
    ///
    /// Returns an [`EngineError`] on a collaborator contract violation or a
    /// worker panic. No further record is pulled or submitted once the fault
    /// is seen; remaining tasks are aborted and no report is produced.
    pub async fn run<I>(&self, records: I, cancel: &CancellationToken) -> Result<BatchReport>
    where
        I: IntoIterator<Item = S>,
    {
        let context = Arc::new(RunContext::new());
        let span = tracing::info_span!("batch", run_id = %context.run_id());

        let result = self
            .run_batch(records, Arc::clone(&context), cancel)
            .instrument(span)
            .await;
        self.close_targets().await;

        let cancelled = match result {
            Ok(cancelled) => cancelled,
            Err(err) => {
                tracing::error!(
                    run_id = %context.run_id(),
                    error = %err,
                    suggestion = err.suggestion(),
                    outcomes = context.outcome_count(),
                    "batch aborted"
                );
                return Err(err);
            }
        };

        let report = context.seal(cancelled);
        if let Some(sink) = &self.sink {
            sink.publish(&report);
        }
        Ok(report)
    }

    /// Returns whether the batch stopped early because of cancellation.
    ///
    /// A record is only pulled from `records` once a worker permit is held
    /// and neither `cancel` nor a fault from an earlier task has fired.
    async fn run_batch<I>(
        &self,
        records: I,
        context: Arc<RunContext>,
        cancel: &CancellationToken,
    ) -> Result<bool>
    where
        I: IntoIterator<Item = S>,
    {
        tracing::info!(
            workers = self.config.worker_concurrency,
            targets = ?self.strategy.target_names(),
            rules = self.strategy.validator.len(),
            key_date = ?self.config.key_date(),
            "batch started"
        );

        let semaphore = Arc::new(Semaphore::new(self.config.worker_concurrency));
        let fault = CancellationToken::new();
        let mut workers: JoinSet<Result<()>> = JoinSet::new();
        let mut records = records.into_iter();
        let mut sequence = 0;
        let mut cancelled = false;

        loop {
            while let Some(joined) = workers.try_join_next() {
                check_joined(joined, &mut workers)?;
            }
            if fault.is_cancelled() {
                break;
            }
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }

            let permit = tokio::select! {
                biased;
                () = fault.cancelled() => None,
                () = cancel.cancelled() => {
                    cancelled = true;
                    None
                }
                permit = Arc::clone(&semaphore).acquire_owned() => Some(permit),
            };
            let Some(permit) = permit else {
                break;
            };
            let permit = permit.map_err(|e| EngineError::PoolClosed(e.to_string()))?;
            // A failing task fires `fault` before it gives its permit back.
            if fault.is_cancelled() {
                break;
            }
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }
            let Some(record) = records.next() else {
                break;
            };

            context.record_entered();
            let source_id = record.source_id();
            let task = RecordTask {
                sequence,
                source_id: source_id.clone(),
                strategy: Arc::clone(&self.strategy),
                loaders: Arc::clone(&self.loaders),
                context: Arc::clone(&context),
                cancel: cancel.clone(),
                fault: fault.clone(),
            };
            let span = tracing::debug_span!("record", sequence, source_id = %source_id);
            workers.spawn(
                async move {
                    let _permit = permit;
                    let on_fault = task.fault.clone().drop_guard();
                    let result = task.process(record).await;
                    if result.is_ok() {
                        on_fault.disarm();
                    }
                    result
                }
                .instrument(span),
            );
            sequence += 1;
        }

        if cancelled {
            tracing::info!(
                entered = context.records_entered(),
                "cancellation requested, no further records pulled"
            );
        }

        while let Some(joined) = workers.join_next().await {
            check_joined(joined, &mut workers)?;
        }
        Ok(cancelled)
    }

    async fn close_targets(&self) {
        let mut closed: Vec<&Arc<dyn TargetClient<U>>> = Vec::new();
        for loader in self.loaders.iter() {
            let client = loader.client();
            // Several routes may share one client.
            if closed.iter().any(|&c| Arc::ptr_eq(c, client)) {
                continue;
            }
            if let Err(err) = client.close().await {
                tracing::warn!(target_system = client.name(), error = %err, "failed to close target client");
            }
            closed.push(client);
        }
    }
}

fn check_joined(
    joined: std::result::Result<Result<()>, JoinError>,
    workers: &mut JoinSet<Result<()>>,
) -> Result<()> {
    match joined {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => {
            workers.abort_all();
            Err(err)
        }
        Err(join_err) => {
            workers.abort_all();
            Err(EngineError::WorkerPanicked(join_err.to_string()))
        }
    }
}

/// Everything one record task needs.
struct RecordTask<S, T, U: Send + Sync> {
    sequence: usize,
    source_id: String,
    strategy: Arc<MigrationStrategy<S, T, U>>,
    loaders: Arc<[Loader<U>]>,
    context: Arc<RunContext>,
    cancel: CancellationToken,
    /// Fired when any task of the batch hits an engine fault.
    fault: CancellationToken,
}

impl<S, T, U> RecordTask<S, T, U>
where
    S: SourceRecord,
    T: Send + Sync,
    U: Send + Sync,
{
    fn emit(&self, cause: OutcomeCause) -> MigrationOutcome {
        MigrationOutcome::new(self.sequence, self.source_id.clone(), cause)
    }

    /// Drives one record through the pipeline.
    ///
    /// Once `fault` has fired nothing more is submitted and no outcome is
    /// pushed, since the batch will end without a report.
    async fn process(self, record: S) -> Result<()> {
        let strategy = Arc::clone(&self.strategy);
        if self.fault.is_cancelled() {
            return Ok(());
        }

        // Pre-selection
        if let Some(selector) = &strategy.selector {
            match selector.matches(&record) {
                Ok(true) => {}
                Ok(false) => {
                    self.context.push(self.emit(OutcomeCause::Filtered));
                    return Ok(());
                }
                Err(FilterError::Malformed(detail)) => {
                    self.context
                        .push(self.emit(OutcomeCause::MalformedInput { detail }));
                    return Ok(());
                }
                Err(FilterError::Contract(message)) => {
                    return Err(EngineError::contract(
                        format!("selector '{}'", selector.name()),
                        message,
                    ));
                }
            }
        }

        if self.cancel.is_cancelled() {
            self.context.push(self.emit(OutcomeCause::Cancelled));
            return Ok(());
        }

        // Source mapping
        let mapper = strategy.source_mapper.as_ref();
        let data_sets = match map_guarded(mapper, &record) {
            Ok(data_sets) if data_sets.is_empty() => {
                self.context.push(self.emit(OutcomeCause::EmptyMapping {
                    stage: MappingStage::Source,
                }));
                return Ok(());
            }
            Ok(data_sets) => data_sets,
            Err(err) => {
                self.context.push(self.emit(OutcomeCause::Mapping {
                    stage: MappingStage::Source,
                    mapper: mapper.name().to_string(),
                    message: err.detail(),
                }));
                return Ok(());
            }
        };
        tracing::debug!(data_sets = data_sets.len(), "mapped source record");

        for mut data_set in data_sets {
            // Validation
            let result = strategy.validator.validate(&mut data_set).await;
            self.context.record_validation(&result);
            if !result.passed() {
                let dataset_id = data_set.id().clone();
                self.context.push(
                    self.emit(OutcomeCause::Validation { result })
                        .with_dataset(dataset_id),
                );
                continue;
            }

            for (route, loader) in strategy.routes.iter().zip(self.loaders.iter()) {
                let target = route.target_name();

                // Target mapping
                let target_records = match map_guarded(route.mapper.as_ref(), &data_set) {
                    Ok(records) if records.is_empty() => {
                        self.context.push(
                            self.emit(OutcomeCause::EmptyMapping {
                                stage: MappingStage::Target,
                            })
                            .with_dataset(data_set.id().clone())
                            .with_target(target),
                        );
                        continue;
                    }
                    Ok(records) => records,
                    Err(err) => {
                        self.context.push(
                            self.emit(OutcomeCause::Mapping {
                                stage: MappingStage::Target,
                                mapper: route.mapper.name().to_string(),
                                message: err.detail(),
                            })
                            .with_dataset(data_set.id().clone())
                            .with_target(target),
                        );
                        continue;
                    }
                };

                // Loading
                for target_record in target_records {
                    if self.fault.is_cancelled() {
                        return Ok(());
                    }
                    let outcome = if self.cancel.is_cancelled() {
                        self.emit(OutcomeCause::Cancelled)
                    } else {
                        let report = loader.load(target_record).await?;
                        self.emit(OutcomeCause::Load { report })
                    };
                    self.context.push(
                        outcome
                            .with_dataset(data_set.id().clone())
                            .with_target(target),
                    );
                }
            }
        }
        Ok(())
    }
}
