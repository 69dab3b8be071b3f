//! Tests for ordered rule evaluation.

use std::time::Duration;

use anyhow::bail;
use async_trait::async_trait;
use bridge_model::DataSet;
use bridge_validate::{AsyncRule, ValidationSummary, Validator, Verdict, rule_fn};

#[derive(Debug, Clone, PartialEq)]
struct Customer {
    name: Option<String>,
    email: Option<String>,
    age: i32,
}

fn customer(name: Option<&str>, email: Option<&str>, age: i32) -> DataSet<Customer> {
    DataSet::with_id(
        format!("customer-{age}"),
        Customer {
            name: name.map(str::to_string),
            email: email.map(str::to_string),
            age,
        },
    )
}

fn customer_rules() -> Validator<Customer> {
    Validator::new()
        .with_rule(rule_fn("required-field-present", |ds: &DataSet<Customer>| {
            Ok(Verdict::check(ds.objects().name.is_some(), || {
                "name is missing".to_string()
            }))
        }))
        .and_then(|v| {
            v.with_rule(rule_fn("age-plausible", |ds: &DataSet<Customer>| {
                let age = ds.objects().age;
                Ok(Verdict::check((0..150).contains(&age), || {
                    format!("age {age} out of range")
                }))
            }))
        })
        .and_then(|v| {
            v.with_rule(rule_fn("email-has-at", |ds: &DataSet<Customer>| {
                Ok(Verdict::check(
                    ds.objects().email.as_deref().is_none_or(|e| e.contains('@')),
                    || "email lacks '@'".to_string(),
                ))
            }))
        })
        .unwrap()
}

// ============================================================================
// Ordered evaluation
// ============================================================================

#[tokio::test]
async fn all_rules_pass() {
    let validator = customer_rules();
    let mut ds = customer(Some("Ada"), Some("ada@example.org"), 36);
    let result = validator.validate(&mut ds).await;

    assert!(result.passed());
    assert_eq!(result.dataset_id(), ds.id());
    assert_eq!(result.entries().len(), 3);
    assert!(ds.diagnostics().is_empty());
}

#[tokio::test]
async fn every_rule_is_evaluated_after_a_failure() {
    let validator = customer_rules();
    let mut ds = customer(None, Some("no-at-sign"), 36);
    let result = validator.validate(&mut ds).await;

    assert!(!result.passed());
    let names: Vec<_> = result.entries().iter().map(|e| e.rule_name()).collect();
    assert_eq!(names, ["required-field-present", "age-plausible", "email-has-at"]);

    let required = result.entry("required-field-present").unwrap();
    assert!(!required.passed());
    assert!(required.evaluated());
    assert_eq!(required.message(), Some("name is missing"));

    assert!(result.entry("age-plausible").unwrap().passed());
    assert!(!result.entry("email-has-at").unwrap().passed());
    assert_eq!(
        ds.diagnostics(),
        [
            "required-field-present: name is missing".to_string(),
            "email-has-at: email lacks '@'".to_string(),
        ]
    );
}

#[tokio::test]
async fn erroring_rule_fails_only_itself() {
    let validator = Validator::new()
        .with_rule(rule_fn("lookup", |_: &DataSet<Customer>| -> anyhow::Result<Verdict> {
            bail!("reference table unavailable")
        }))
        .and_then(|v| {
            v.with_rule(rule_fn("always", |_: &DataSet<Customer>| Ok(Verdict::pass())))
        })
        .unwrap();

    let result = validator.evaluate(&customer(Some("Ada"), None, 1)).await;
    let lookup = result.entry("lookup").unwrap();
    assert!(!lookup.passed());
    assert_eq!(
        lookup.message(),
        Some("rule raised an error: reference table unavailable")
    );
    assert!(result.entry("always").unwrap().passed());
}

#[tokio::test]
async fn panicking_rule_fails_only_itself() {
    let validator = Validator::new()
        .with_rule(rule_fn("panics", |ds: &DataSet<Customer>| -> anyhow::Result<Verdict> {
            let divisor = ds.objects().age;
            Ok(Verdict::check(100 / divisor > 1, String::new))
        }))
        .and_then(|v| {
            v.with_rule(rule_fn("always", |_: &DataSet<Customer>| Ok(Verdict::pass())))
        })
        .unwrap();

    let result = validator.evaluate(&customer(Some("Ada"), None, 0)).await;
    assert_eq!(result.entries().len(), 2);
    let panics = result.entry("panics").unwrap();
    assert!(!panics.passed());
    assert!(panics.message().unwrap().starts_with("rule panicked: "));
    assert!(result.entry("always").unwrap().passed());
}

#[tokio::test]
async fn revalidation_is_idempotent() {
    let validator = customer_rules();
    let mut ds = customer(None, None, 200);
    let first = validator.validate(&mut ds).await;
    let diagnostics = ds.diagnostics().to_vec();
    let second = validator.validate(&mut ds).await;

    assert_eq!(first, second);
    assert_eq!(ds.diagnostics(), diagnostics.as_slice());
}

// ============================================================================
// Dependencies
// ============================================================================

#[tokio::test]
async fn dependent_rule_is_abandoned_when_dependency_fails() {
    let validator = customer_rules()
        .with_dependent_rule(
            rule_fn("name-capitalized", |ds: &DataSet<Customer>| {
                let name = ds.objects().name.as_deref().unwrap_or_default();
                Ok(Verdict::check(
                    name.starts_with(char::is_uppercase),
                    || "name not capitalized".to_string(),
                ))
            }),
            ["required-field-present"],
        )
        .unwrap();

    let result = validator.evaluate(&customer(None, None, 30)).await;
    assert_eq!(result.entries().len(), 4);
    let dependent = result.entry("name-capitalized").unwrap();
    assert!(!dependent.passed());
    assert!(!dependent.evaluated());
    assert_eq!(
        dependent.message(),
        Some("abandoned: dependency 'required-field-present' failed")
    );

    let result = validator.evaluate(&customer(Some("ada"), None, 30)).await;
    let dependent = result.entry("name-capitalized").unwrap();
    assert!(dependent.evaluated());
    assert_eq!(dependent.message(), Some("name not capitalized"));
}

// ============================================================================
// Async rules
// ============================================================================

/// Looks the customer up in a slow registry.
struct RegistryLookup {
    latency: Duration,
}

#[async_trait]
impl AsyncRule<Customer> for RegistryLookup {
    fn name(&self) -> &str {
        "registry-lookup"
    }

    async fn evaluate(&self, data_set: &DataSet<Customer>) -> anyhow::Result<Verdict> {
        tokio::time::sleep(self.latency).await;
        Ok(Verdict::check(data_set.objects().age >= 18, || {
            "not registered as adult".to_string()
        }))
    }
}

#[tokio::test(start_paused = true)]
async fn async_rule_within_timeout_is_evaluated() {
    let validator = customer_rules()
        .with_async_rule(
            RegistryLookup {
                latency: Duration::from_millis(200),
            },
            Some(Duration::from_secs(1)),
        )
        .unwrap();

    let result = validator.evaluate(&customer(Some("Ada"), None, 12)).await;
    let lookup = result.entry("registry-lookup").unwrap();
    assert!(lookup.evaluated());
    assert_eq!(lookup.message(), Some("not registered as adult"));
}

#[tokio::test(start_paused = true)]
async fn async_rule_past_timeout_fails_only_itself() {
    let mut validator = customer_rules();
    validator
        .add_async_rule(
            RegistryLookup {
                latency: Duration::from_secs(5),
            },
            Some(Duration::from_millis(250)),
        )
        .unwrap();
    validator
        .add_dependent_rule(
            rule_fn("after-lookup", |_: &DataSet<Customer>| Ok(Verdict::pass())),
            ["registry-lookup"],
        )
        .unwrap();

    let started = tokio::time::Instant::now();
    let mut ds = customer(Some("Ada"), None, 40);
    let result = validator.validate(&mut ds).await;

    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(250), "{elapsed:?}");
    assert!(elapsed < Duration::from_secs(5), "{elapsed:?}");
    assert_eq!(result.entries().len(), 5);
    let lookup = result.entry("registry-lookup").unwrap();
    assert!(!lookup.passed());
    assert_eq!(lookup.message(), Some("rule timed out after 250 ms"));
    assert!(!result.entry("after-lookup").unwrap().evaluated());
    assert!(result.entry("required-field-present").unwrap().passed());
    assert_eq!(
        ds.diagnostics(),
        [
            "registry-lookup: rule timed out after 250 ms".to_string(),
            "after-lookup: abandoned: dependency 'registry-lookup' failed".to_string(),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn async_rule_without_timeout_waits_for_completion() {
    let validator = Validator::new()
        .with_async_rule(
            RegistryLookup {
                latency: Duration::from_secs(30),
            },
            None,
        )
        .unwrap();

    let result = validator.evaluate(&customer(Some("Ada"), None, 40)).await;
    assert!(result.passed());
}

// ============================================================================
// Summary
// ============================================================================

#[tokio::test]
async fn summary_counts_failures_per_rule() {
    let validator = customer_rules();
    let mut results = Vec::new();
    for ds in [
        customer(Some("Ada"), None, 36),
        customer(None, None, 36),
        customer(None, Some("x"), 300),
    ] {
        results.push(validator.evaluate(&ds).await);
    }

    let summary = ValidationSummary::from_results(&results);
    assert_eq!(summary.total, 3);
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.failed, 2);
    assert_eq!(summary.failures_per_rule["required-field-present"], 2);
    assert_eq!(summary.failures_per_rule["age-plausible"], 1);
    assert_eq!(summary.failures_per_rule["email-has-at"], 1);
    assert_eq!(
        summary.most_failed_rule(),
        Some(("required-field-present", 2))
    );
}

#[tokio::test]
async fn validation_result_serializes() {
    let validator = customer_rules();
    let result = validator.evaluate(&customer(None, None, 36)).await;
    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["dataset_id"], "customer-36");
    assert_eq!(json["entries"][0]["rule_name"], "required-field-present");
    assert_eq!(json["entries"][0]["passed"], false);
    assert!(json["entries"][1].get("message").is_none());
}
