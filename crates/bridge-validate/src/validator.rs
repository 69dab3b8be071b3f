//! Ordered rule evaluation.
//!
//! Every registered rule produces exactly one entry per data set, whatever
//! happened with the rules before it. A rule that errors, panics or runs past
//! its timeout fails on its own; a rule whose declared dependency failed is
//! recorded as abandoned.
//!
//! Diagnostics raised by a rule are derived from record content, so the log
//! events here pass them through [`redact_value`].

use std::any::Any;
use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Duration;

use bridge_model::{DataSet, redact_value};
use futures_util::FutureExt;

use crate::error::{Result, ValidatorError};
use crate::result::{RuleOutcome, ValidationResult};
use crate::rule::{AsyncRule, Rule, Verdict};

enum RuleKind<T> {
    Sync(Box<dyn Rule<T>>),
    Async {
        rule: Box<dyn AsyncRule<T>>,
        timeout: Option<Duration>,
    },
}

impl<T> RuleKind<T> {
    fn name(&self) -> &str {
        match self {
            Self::Sync(rule) => rule.name(),
            Self::Async { rule, .. } => rule.name(),
        }
    }
}

struct RegisteredRule<T> {
    kind: RuleKind<T>,
    depends_on: Vec<String>,
}

/// Ordered collection of business rules.
pub struct Validator<T> {
    rules: Vec<RegisteredRule<T>>,
}

impl<T> Default for Validator<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Validator<T> {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Appends a rule. Names must be unique.
    pub fn add_rule(&mut self, rule: impl Rule<T> + 'static) -> Result<()> {
        self.register(RuleKind::Sync(Box::new(rule)), Vec::new())
    }

    /// Appends a rule that only runs if all `depends_on` rules passed.
    ///
    /// Dependencies must be registered before the dependent rule.
    pub fn add_dependent_rule<D>(
        &mut self,
        rule: impl Rule<T> + 'static,
        depends_on: impl IntoIterator<Item = D>,
    ) -> Result<()>
    where
        D: Into<String>,
    {
        self.register(
            RuleKind::Sync(Box::new(rule)),
            depends_on.into_iter().map(Into::into).collect(),
        )
    }

    /// Appends an async rule.
    ///
    /// With a `timeout`, a rule still running when it expires is dropped and
    /// recorded as failed. Time spent on its dependencies does not count.
    pub fn add_async_rule(
        &mut self,
        rule: impl AsyncRule<T> + 'static,
        timeout: Option<Duration>,
    ) -> Result<()> {
        self.register(
            RuleKind::Async {
                rule: Box::new(rule),
                timeout,
            },
            Vec::new(),
        )
    }

    /// Async counterpart of [`Validator::add_dependent_rule`].
    pub fn add_dependent_async_rule<D>(
        &mut self,
        rule: impl AsyncRule<T> + 'static,
        timeout: Option<Duration>,
        depends_on: impl IntoIterator<Item = D>,
    ) -> Result<()>
    where
        D: Into<String>,
    {
        self.register(
            RuleKind::Async {
                rule: Box::new(rule),
                timeout,
            },
            depends_on.into_iter().map(Into::into).collect(),
        )
    }

    pub fn with_rule(mut self, rule: impl Rule<T> + 'static) -> Result<Self> {
        self.add_rule(rule)?;
        Ok(self)
    }

    pub fn with_dependent_rule<D>(
        mut self,
        rule: impl Rule<T> + 'static,
        depends_on: impl IntoIterator<Item = D>,
    ) -> Result<Self>
    where
        D: Into<String>,
    {
        self.add_dependent_rule(rule, depends_on)?;
        Ok(self)
    }

    pub fn with_async_rule(
        mut self,
        rule: impl AsyncRule<T> + 'static,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        self.add_async_rule(rule, timeout)?;
        Ok(self)
    }

    fn register(&mut self, kind: RuleKind<T>, depends_on: Vec<String>) -> Result<()> {
        let name = kind.name().to_string();
        if self.position(&name).is_some() {
            return Err(ValidatorError::DuplicateRule(name));
        }
        if let Some(missing) = depends_on.iter().find(|d| self.position(d).is_none()) {
            return Err(ValidatorError::UnknownDependency {
                rule: name,
                dependency: missing.clone(),
            });
        }
        self.rules.push(RegisteredRule { kind, depends_on });
        Ok(())
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.rules.iter().position(|r| r.kind.name() == name)
    }

    /// Rule names in evaluation order.
    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.kind.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Evaluates all rules without touching the data set.
    pub async fn evaluate(&self, data_set: &DataSet<T>) -> ValidationResult {
        let mut passed_by_name: HashMap<&str, bool> = HashMap::with_capacity(self.rules.len());
        let mut entries = Vec::with_capacity(self.rules.len());

        for registered in &self.rules {
            let name = registered.kind.name();
            let failed_dependency = registered
                .depends_on
                .iter()
                .find(|d| !passed_by_name.get(d.as_str()).copied().unwrap_or(false));

            let entry = match failed_dependency {
                Some(dependency) => {
                    tracing::debug!(
                        rule = name,
                        dependency = %dependency,
                        dataset_id = %data_set.id(),
                        "rule abandoned"
                    );
                    RuleOutcome::abandoned(name, dependency)
                }
                None => match &registered.kind {
                    RuleKind::Sync(rule) => run_rule(rule.as_ref(), data_set),
                    RuleKind::Async { rule, timeout } => {
                        run_async_rule(rule.as_ref(), *timeout, data_set).await
                    }
                },
            };
            passed_by_name.insert(name, entry.passed());
            entries.push(entry);
        }

        ValidationResult::new(data_set.id().clone(), entries)
    }

    /// Evaluates all rules and replaces the data set's diagnostics with the
    /// failure messages of this run.
    pub async fn validate(&self, data_set: &mut DataSet<T>) -> ValidationResult {
        let result = self.evaluate(data_set).await;
        data_set.set_diagnostics(result.failure_messages());
        tracing::debug!(
            dataset_id = %data_set.id(),
            rules = result.entries().len(),
            failures = result.failure_count(),
            "validated data set"
        );
        result
    }
}

type Raised = std::result::Result<anyhow::Result<Verdict>, Box<dyn Any + Send>>;

fn run_rule<T>(rule: &dyn Rule<T>, data_set: &DataSet<T>) -> RuleOutcome {
    let raised = catch_unwind(AssertUnwindSafe(|| rule.evaluate(data_set)));
    into_outcome(rule.name(), raised)
}

async fn run_async_rule<T>(
    rule: &dyn AsyncRule<T>,
    timeout: Option<Duration>,
    data_set: &DataSet<T>,
) -> RuleOutcome {
    let name = rule.name();
    let running = AssertUnwindSafe(rule.evaluate(data_set)).catch_unwind();
    let raised = match timeout {
        None => running.await,
        Some(limit) => match tokio::time::timeout(limit, running).await {
            Ok(raised) => raised,
            Err(_) => {
                let millis = limit.as_millis();
                tracing::warn!(rule = name, timeout_ms = millis, "rule timed out");
                return RuleOutcome::new(
                    name,
                    false,
                    Some(format!("rule timed out after {millis} ms")),
                );
            }
        },
    };
    into_outcome(name, raised)
}

fn into_outcome(name: &str, raised: Raised) -> RuleOutcome {
    match raised {
        Ok(Ok(verdict)) => {
            let (passed, message) = verdict.into_parts();
            RuleOutcome::new(name, passed, message)
        }
        Ok(Err(err)) => {
            let detail = format!("{err:#}");
            tracing::warn!(rule = name, error = redact_value(&detail), "rule raised an error");
            RuleOutcome::new(name, false, Some(format!("rule raised an error: {detail}")))
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            tracing::warn!(rule = name, message = redact_value(&message), "rule panicked");
            RuleOutcome::new(name, false, Some(format!("rule panicked: {message}")))
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::{Verdict, rule_fn};

    #[test]
    fn missing_dependency_is_rejected() {
        let result = Validator::<u32>::new().with_dependent_rule(
            rule_fn("b", |_: &DataSet<u32>| Ok(Verdict::pass())),
            ["a"],
        );
        assert!(matches!(
            result,
            Err(ValidatorError::UnknownDependency { ref dependency, .. }) if dependency == "a"
        ));
    }

    #[test]
    fn duplicate_rule_is_rejected() {
        let result = Validator::<u32>::new()
            .with_rule(rule_fn("a", |_: &DataSet<u32>| Ok(Verdict::pass())))
            .and_then(|v| v.with_rule(rule_fn("a", |_: &DataSet<u32>| Ok(Verdict::pass()))));
        assert_eq!(
            result.err(),
            Some(ValidatorError::DuplicateRule("a".to_string()))
        );
    }
}
