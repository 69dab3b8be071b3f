//! Tests for pre-selection filters.

use bridge_ingest::{
    AggregateFilter, AllOf, AllowlistFilter, BlocklistFilter, Filter, FilterError, filter_fn,
};

#[derive(Debug, Clone, PartialEq)]
struct Customer {
    id: String,
    country: Option<String>,
    contracts: u32,
}

fn customer(id: &str, country: Option<&str>, contracts: u32) -> Customer {
    Customer {
        id: id.to_string(),
        country: country.map(str::to_string),
        contracts,
    }
}

fn country(c: &Customer) -> Result<String, FilterError> {
    c.country
        .clone()
        .ok_or_else(|| FilterError::malformed(format!("customer {} has no country", c.id)))
}

// ============================================================================
// Allow / block lists
// ============================================================================

#[test]
fn allowlist_keeps_listed_values() {
    let filter = AllowlistFilter::new("country-allowlist", country, ["DE".to_string()]);
    assert!(filter.matches(&customer("1", Some("DE"), 1)).unwrap());
    assert!(!filter.matches(&customer("2", Some("AT"), 1)).unwrap());
}

#[test]
fn blocklist_rejects_listed_values() {
    let filter = BlocklistFilter::new("country-blocklist", country, ["AT".to_string()]);
    assert!(filter.matches(&customer("1", Some("DE"), 1)).unwrap());
    assert!(!filter.matches(&customer("2", Some("AT"), 1)).unwrap());
}

#[test]
fn malformed_candidate_reports_error() {
    let filter = AllowlistFilter::new("country-allowlist", country, ["DE".to_string()]);
    let err = filter.matches(&customer("3", None, 1)).unwrap_err();
    assert!(err.is_recoverable());
    assert!(err.to_string().contains("customer 3"));
}

// ============================================================================
// apply
// ============================================================================

#[test]
fn apply_drops_rejected_and_malformed() {
    let filter = AllowlistFilter::new("country-allowlist", country, ["DE".to_string()]);
    let kept = filter
        .apply(vec![
            customer("1", Some("DE"), 1),
            customer("2", Some("AT"), 1),
            customer("3", None, 1),
            customer("4", Some("DE"), 0),
        ])
        .unwrap();
    let ids: Vec<_> = kept.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, ["1", "4"]);
}

#[test]
fn apply_propagates_contract_violation() {
    let filter = filter_fn("broken", |_: &Customer| {
        Err(FilterError::contract("lookup table not loaded"))
    });
    let err = filter.apply(vec![customer("1", Some("DE"), 1)]).unwrap_err();
    assert!(!err.is_recoverable());
}

// ============================================================================
// Composition
// ============================================================================

#[test]
fn all_of_requires_every_filter() {
    let filter = AllOf::new()
        .with(AllowlistFilter::new(
            "country-allowlist",
            country,
            ["DE".to_string(), "AT".to_string()],
        ))
        .with(filter_fn("has-contracts", |c: &Customer| Ok(c.contracts > 0)));

    assert_eq!(filter.filter_names(), ["country-allowlist", "has-contracts"]);
    assert!(filter.matches(&customer("1", Some("AT"), 2)).unwrap());
    assert!(!filter.matches(&customer("2", Some("AT"), 0)).unwrap());
    assert!(!filter.matches(&customer("3", Some("CH"), 2)).unwrap());
}

#[test]
fn all_of_stops_at_first_rejection() {
    // The second filter would fail on every candidate; it must never run.
    let filter = AllOf::new()
        .with(filter_fn("never", |_: &Customer| Ok(false)))
        .with(filter_fn("explodes", |_: &Customer| {
            Err(FilterError::contract("must not be evaluated"))
        }));
    assert!(!filter.matches(&customer("1", Some("DE"), 1)).unwrap());
}

// ============================================================================
// Aggregate filter
// ============================================================================

#[test]
fn aggregate_filter_decides_on_groups() {
    // Aggregate: (candidate, number of customers sharing its country).
    let filter = AggregateFilter::new(
        |candidates: Vec<Customer>| {
            let counts: Vec<usize> = candidates
                .iter()
                .map(|c| {
                    candidates
                        .iter()
                        .filter(|other| other.country == c.country)
                        .count()
                })
                .collect();
            candidates.into_iter().zip(counts).collect::<Vec<_>>()
        },
        |(candidate, _count): (Customer, usize)| candidate,
        filter_fn("country-has-peers", |(_, count): &(Customer, usize)| {
            Ok(*count > 1)
        }),
    );

    let kept = filter
        .apply(vec![
            customer("1", Some("DE"), 1),
            customer("2", Some("AT"), 1),
            customer("3", Some("DE"), 1),
        ])
        .unwrap();
    let ids: Vec<_> = kept.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, ["1", "3"]);
    assert_eq!(filter.name(), "country-has-peers");
}
