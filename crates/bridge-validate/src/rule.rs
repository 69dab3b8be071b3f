//! Business rules.

use async_trait::async_trait;
use bridge_model::DataSet;

/// Verdict of one rule on one data set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    passed: bool,
    message: Option<String>,
}

impl Verdict {
    pub fn pass() -> Self {
        Self {
            passed: true,
            message: None,
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            passed: false,
            message: Some(message.into()),
        }
    }

    /// Passes if `condition` holds, fails with `message` otherwise.
    pub fn check(condition: bool, message: impl FnOnce() -> String) -> Self {
        if condition {
            Self::pass()
        } else {
            Self::fail(message())
        }
    }

    pub fn passed(&self) -> bool {
        self.passed
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub(crate) fn into_parts(self) -> (bool, Option<String>) {
        (self.passed, self.message)
    }
}

/// A pure predicate over a data set.
///
/// Returning `Err` is treated as a failing verdict for this rule only.
pub trait Rule<T>: Send + Sync {
    /// Unique name within a validator; appears in every result entry.
    fn name(&self) -> &str;

    fn evaluate(&self, data_set: &DataSet<T>) -> anyhow::Result<Verdict>;
}

/// Rule backed by a closure.
pub struct FnRule<F> {
    name: String,
    predicate: F,
}

/// Wraps a closure as a named [`Rule`].
pub fn rule_fn<T, F>(name: impl Into<String>, predicate: F) -> FnRule<F>
where
    F: Fn(&DataSet<T>) -> anyhow::Result<Verdict> + Send + Sync,
{
    FnRule {
        name: name.into(),
        predicate,
    }
}

impl<T, F> Rule<T> for FnRule<F>
where
    F: Fn(&DataSet<T>) -> anyhow::Result<Verdict> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn evaluate(&self, data_set: &DataSet<T>) -> anyhow::Result<Verdict> {
        (self.predicate)(data_set)
    }
}

/// A rule that has to wait on something, such as a lookup in another system.
///
/// Registered with an optional timeout; running past it fails the rule.
#[async_trait]
pub trait AsyncRule<T>: Send + Sync {
    fn name(&self) -> &str;

    async fn evaluate(&self, data_set: &DataSet<T>) -> anyhow::Result<Verdict>;
}
