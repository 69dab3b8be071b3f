//! Business-rule validation of canonical data sets.
//!
//! A [`Validator`] holds an ordered list of [`Rule`]s registered at
//! configuration time, either plain [`Rule`]s or [`AsyncRule`]s that may
//! carry a timeout. Validating a data set evaluates every rule and yields a
//! [`ValidationResult`] with one entry per rule; the data set may only move
//! on to target mapping if all entries passed.

pub mod error;
pub mod result;
pub mod rule;
pub mod validator;

pub use error::{Result, ValidatorError};
pub use result::{RuleOutcome, ValidationResult, ValidationSummary};
pub use rule::{AsyncRule, FnRule, Rule, Verdict, rule_fn};
pub use validator::Validator;
