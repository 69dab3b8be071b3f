//! Pre-selection of source records.
//!
//! A [`Filter`] decides per candidate whether it enters the pipeline. Filters
//! are pure: they never mutate the candidate and never talk to a target
//! system. Several filters over the same source type compose with
//! [`AllOf`] (logical AND, evaluated in registration order).
//!
//! Filters that need to see groups of candidates at once (e.g. "keep only
//! customers with at least one active contract") are expressed with
//! [`AggregateFilter`], which runs on a whole extract before the batch starts.

use std::collections::HashSet;
use std::fmt::Debug;
use std::hash::Hash;

use crate::error::FilterError;

/// Result of evaluating a filter against one candidate.
pub type FilterResult = std::result::Result<bool, FilterError>;

// ============================================================================
// Filter trait
// ============================================================================

/// Predicate deciding whether a candidate is migrated.
pub trait Filter<S>: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Returns `Ok(true)` if the candidate should be migrated.
    ///
    /// Return [`FilterError::Malformed`] when the candidate cannot be
    /// inspected; it is then treated as non-matching.
    fn matches(&self, candidate: &S) -> FilterResult;

    /// Filters a whole candidate list.
    ///
    /// Malformed candidates are dropped like non-matching ones. A contract
    /// violation aborts and is returned.
    fn apply(&self, candidates: Vec<S>) -> Result<Vec<S>, FilterError> {
        let total = candidates.len();
        let mut kept = Vec::with_capacity(total);
        for candidate in candidates {
            match self.matches(&candidate) {
                Ok(true) => kept.push(candidate),
                Ok(false) => {}
                Err(FilterError::Malformed(detail)) => {
                    tracing::debug!(filter = self.name(), %detail, "dropping malformed candidate");
                }
                Err(err @ FilterError::Contract(_)) => return Err(err),
            }
        }
        tracing::info!(
            filter = self.name(),
            "{} out of {} candidates have been removed by the filter",
            total - kept.len(),
            total
        );
        Ok(kept)
    }
}

impl<S, F: Filter<S> + ?Sized> Filter<S> for Box<F> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn matches(&self, candidate: &S) -> FilterResult {
        (**self).matches(candidate)
    }
}

// ============================================================================
// Composition
// ============================================================================

/// Logical AND over several filters, short-circuiting on the first rejection.
pub struct AllOf<S> {
    filters: Vec<Box<dyn Filter<S>>>,
}

impl<S> AllOf<S> {
    pub fn new() -> Self {
        Self {
            filters: Vec::new(),
        }
    }

    #[must_use]
    pub fn with(mut self, filter: impl Filter<S> + 'static) -> Self {
        self.filters.push(Box::new(filter));
        self
    }

    pub fn push(&mut self, filter: Box<dyn Filter<S>>) {
        self.filters.push(filter);
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Names of the contained filters in evaluation order.
    pub fn filter_names(&self) -> Vec<&str> {
        self.filters.iter().map(|f| f.name()).collect()
    }
}

impl<S> Default for AllOf<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> Filter<S> for AllOf<S> {
    fn name(&self) -> &str {
        "all-of"
    }

    fn matches(&self, candidate: &S) -> FilterResult {
        for filter in &self.filters {
            if !filter.matches(candidate)? {
                tracing::trace!(filter = filter.name(), "candidate rejected");
                return Ok(false);
            }
        }
        Ok(true)
    }
}

// ============================================================================
// Closure filters
// ============================================================================

/// Filter backed by a closure.
pub struct FnFilter<F> {
    name: String,
    predicate: F,
}

/// Wraps a closure as a named [`Filter`].
pub fn filter_fn<S, F>(name: impl Into<String>, predicate: F) -> FnFilter<F>
where
    F: Fn(&S) -> FilterResult + Send + Sync,
{
    FnFilter {
        name: name.into(),
        predicate,
    }
}

impl<S, F> Filter<S> for FnFilter<F>
where
    F: Fn(&S) -> FilterResult + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn matches(&self, candidate: &S) -> FilterResult {
        (self.predicate)(candidate)
    }
}

// ============================================================================
// Allow / block lists
// ============================================================================

type Criteria<S, V> = Box<dyn Fn(&S) -> Result<V, FilterError> + Send + Sync>;

/// Lets through only candidates whose criteria value is in a fixed set.
pub struct AllowlistFilter<S, V> {
    name: String,
    criteria: Criteria<S, V>,
    allowlist: HashSet<V>,
}

impl<S, V> AllowlistFilter<S, V>
where
    V: Eq + Hash,
{
    pub fn new<F>(name: impl Into<String>, criteria: F, allowlist: impl IntoIterator<Item = V>) -> Self
    where
        F: Fn(&S) -> Result<V, FilterError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            criteria: Box::new(criteria),
            allowlist: allowlist.into_iter().collect(),
        }
    }
}

impl<S, V> Filter<S> for AllowlistFilter<S, V>
where
    V: Eq + Hash + Debug + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn matches(&self, candidate: &S) -> FilterResult {
        let value = (self.criteria)(candidate)?;
        let allowed = self.allowlist.contains(&value);
        if !allowed {
            tracing::debug!(filter = %self.name, value = ?value, "not on the allowlist");
        }
        Ok(allowed)
    }
}

/// Rejects candidates whose criteria value is in a fixed set.
pub struct BlocklistFilter<S, V> {
    name: String,
    criteria: Criteria<S, V>,
    blocklist: HashSet<V>,
}

impl<S, V> BlocklistFilter<S, V>
where
    V: Eq + Hash,
{
    pub fn new<F>(name: impl Into<String>, criteria: F, blocklist: impl IntoIterator<Item = V>) -> Self
    where
        F: Fn(&S) -> Result<V, FilterError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            criteria: Box::new(criteria),
            blocklist: blocklist.into_iter().collect(),
        }
    }
}

impl<S, V> Filter<S> for BlocklistFilter<S, V>
where
    V: Eq + Hash + Debug + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn matches(&self, candidate: &S) -> FilterResult {
        let value = (self.criteria)(candidate)?;
        let blocked = self.blocklist.contains(&value);
        if blocked {
            tracing::debug!(filter = %self.name, value = ?value, "on the blocklist");
        }
        Ok(!blocked)
    }
}

// ============================================================================
// Aggregate filter
// ============================================================================

/// Applies a filter to aggregates built from the candidates.
///
/// The aggregation groups candidates (or enriches them with related data),
/// the base filter decides per aggregate, and the disaggregation turns each
/// surviving aggregate back into a candidate.
pub struct AggregateFilter<S, A> {
    aggregate: Box<dyn Fn(Vec<S>) -> Vec<A> + Send + Sync>,
    disaggregate: Box<dyn Fn(A) -> S + Send + Sync>,
    base: Box<dyn Filter<A>>,
}

impl<S, A> AggregateFilter<S, A> {
    pub fn new<Agg, Dis>(aggregate: Agg, disaggregate: Dis, base: impl Filter<A> + 'static) -> Self
    where
        Agg: Fn(Vec<S>) -> Vec<A> + Send + Sync + 'static,
        Dis: Fn(A) -> S + Send + Sync + 'static,
    {
        Self {
            aggregate: Box::new(aggregate),
            disaggregate: Box::new(disaggregate),
            base: Box::new(base),
        }
    }

    pub fn name(&self) -> &str {
        self.base.name()
    }

    /// Aggregates, filters and disaggregates the candidates.
    pub fn apply(&self, candidates: Vec<S>) -> Result<Vec<S>, FilterError> {
        let candidate_count = candidates.len();
        let aggregates = (self.aggregate)(candidates);
        tracing::info!(
            filter = self.name(),
            "There are {} candidates and {} aggregates",
            candidate_count,
            aggregates.len()
        );
        let survivors = self.base.apply(aggregates)?;
        tracing::info!(
            filter = self.name(),
            "There are {} filtered aggregates left",
            survivors.len()
        );
        Ok(survivors.into_iter().map(|a| (self.disaggregate)(a)).collect())
    }
}
