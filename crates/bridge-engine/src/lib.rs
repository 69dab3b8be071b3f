//! Batch orchestration for record-by-record data migration.
//!
//! A [`MigrationStrategy`] wires the stages together: an optional selector,
//! the source mapper, the validator and one or more target routes. The
//! [`Orchestrator`] runs a batch of source records through it and returns a
//! [`BatchReport`] with one [`MigrationOutcome`] per path a record took.

pub mod context;
pub mod error;
pub mod logging;
pub mod orchestrator;
pub mod outcome;
pub mod sink;
pub mod strategy;

// === Errors ===
pub use error::{EngineError, Result};

// === Strategy ===
pub use strategy::{MigrationStrategy, MigrationStrategyBuilder, TargetRoute};

// === Running ===
pub use context::{BatchReport, RunContext};
pub use orchestrator::Orchestrator;
pub use outcome::{MappingStage, MigrationOutcome, OutcomeCause, OutcomeStatus};
pub use sink::{MonitoringSink, TracingSink};

pub use tokio_util::sync::CancellationToken;
