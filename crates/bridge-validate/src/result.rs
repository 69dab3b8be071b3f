//! Validation results and batch-level summaries.

use std::collections::BTreeMap;

use bridge_model::DataSetId;
use serde::{Deserialize, Serialize};

/// Entry for one rule in a [`ValidationResult`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleOutcome {
    rule_name: String,
    passed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    /// False when the rule was skipped because a dependency failed.
    evaluated: bool,
}

impl RuleOutcome {
    pub(crate) fn new(rule_name: &str, passed: bool, message: Option<String>) -> Self {
        Self {
            rule_name: rule_name.to_string(),
            passed,
            message,
            evaluated: true,
        }
    }

    pub(crate) fn abandoned(rule_name: &str, dependency: &str) -> Self {
        Self {
            rule_name: rule_name.to_string(),
            passed: false,
            message: Some(format!("abandoned: dependency '{dependency}' failed")),
            evaluated: false,
        }
    }

    pub fn rule_name(&self) -> &str {
        &self.rule_name
    }

    pub fn passed(&self) -> bool {
        self.passed
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn evaluated(&self) -> bool {
        self.evaluated
    }
}

/// Outcome of validating one data set: exactly one entry per registered rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    dataset_id: DataSetId,
    entries: Vec<RuleOutcome>,
}

impl ValidationResult {
    pub(crate) fn new(dataset_id: DataSetId, entries: Vec<RuleOutcome>) -> Self {
        Self {
            dataset_id,
            entries,
        }
    }

    pub fn dataset_id(&self) -> &DataSetId {
        &self.dataset_id
    }

    /// Entries in rule registration order.
    pub fn entries(&self) -> &[RuleOutcome] {
        &self.entries
    }

    /// The entry for a rule, if it was registered.
    pub fn entry(&self, rule_name: &str) -> Option<&RuleOutcome> {
        self.entries.iter().find(|e| e.rule_name == rule_name)
    }

    /// True iff every rule passed.
    pub fn passed(&self) -> bool {
        self.entries.iter().all(RuleOutcome::passed)
    }

    pub fn failures(&self) -> impl Iterator<Item = &RuleOutcome> {
        self.entries.iter().filter(|e| !e.passed)
    }

    pub fn failure_count(&self) -> usize {
        self.failures().count()
    }

    /// `"<rule>: <message>"` for every failing entry.
    pub fn failure_messages(&self) -> Vec<String> {
        self.failures()
            .map(|e| match &e.message {
                Some(message) => format!("{}: {message}", e.rule_name),
                None => e.rule_name.clone(),
            })
            .collect()
    }
}

/// Aggregated view over the validation results of a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Number of data sets each rule failed on.
    pub failures_per_rule: BTreeMap<String, usize>,
}

impl ValidationSummary {
    pub fn from_results<'a>(results: impl IntoIterator<Item = &'a ValidationResult>) -> Self {
        let mut summary = Self::default();
        for result in results {
            summary.add(result);
        }
        summary
    }

    pub fn add(&mut self, result: &ValidationResult) {
        self.total += 1;
        if result.passed() {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
        for failure in result.failures() {
            *self
                .failures_per_rule
                .entry(failure.rule_name.clone())
                .or_default() += 1;
        }
    }

    /// The rule that failed most often, ties broken by name.
    pub fn most_failed_rule(&self) -> Option<(&str, usize)> {
        self.failures_per_rule
            .iter()
            .max_by(|(a_name, a), (b_name, b)| a.cmp(b).then_with(|| b_name.cmp(a_name)))
            .map(|(name, count)| (name.as_str(), *count))
    }

    pub fn log(&self) {
        tracing::info!(
            total = self.total,
            "Validation summary: {} succeeded, {} failed",
            self.succeeded,
            self.failed
        );
        for (rule, count) in &self.failures_per_rule {
            tracing::info!(rule = %rule, count = *count, "rule failures");
        }
    }
}
