//! Loading target records into target systems.
//!
//! Each record goes through up to three phases: submit, poll until the
//! target reports it processed, and verify that the stored content matches.
//! Which phases run depends on the [`Capabilities`] the target declares and
//! on the [`LoadPolicy`] of the batch. Progress is tracked by a
//! [`LoadStateMachine`] and summarised in a [`LoadReport`].

pub mod client;
pub mod error;
pub mod json_target;
pub mod loader;
pub mod policy;
pub mod report;
pub mod state;

// === Target contract ===
pub use client::{Capabilities, PollStatus, Submission, TargetClient};

// === Errors ===
pub use error::{LoadError, TargetError};

// === Loading ===
pub use json_target::JsonFileTarget;
pub use loader::Loader;
pub use policy::LoadPolicy;
pub use report::{FailureClass, LoadFailure, LoadReport};
pub use state::{LoadState, LoadStateMachine};
