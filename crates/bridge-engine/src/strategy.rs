//! Assembly of the stages applied to every source record.

use std::sync::Arc;

use bridge_ingest::Filter;
use bridge_load::TargetClient;
use bridge_map::{Mapper, SourceMapper, TargetMapper};
use bridge_model::DataSet;
use bridge_validate::Validator;

use crate::error::{EngineError, Result};

/// A target mapper paired with the client that loads its output.
pub struct TargetRoute<T, U: Send + Sync> {
    pub(crate) mapper: Box<TargetMapper<T, U>>,
    pub(crate) client: Arc<dyn TargetClient<U>>,
}

impl<T, U: Send + Sync> TargetRoute<T, U> {
    /// Pairs `mapper` with `client`. The client may be shared with other
    /// routes; it is closed once per batch.
    pub fn new(
        mapper: impl Mapper<DataSet<T>, U> + 'static,
        client: Arc<dyn TargetClient<U>>,
    ) -> Self {
        Self {
            mapper: Box::new(mapper),
            client,
        }
    }

    /// Name of the target system, as reported by its client.
    pub fn target_name(&self) -> &str {
        self.client.name()
    }
}

/// Source type `S`, canonical payload `T`, target record type `U`.
pub struct MigrationStrategy<S, T, U: Send + Sync> {
    pub(crate) selector: Option<Box<dyn Filter<S>>>,
    pub(crate) source_mapper: Box<SourceMapper<S, T>>,
    pub(crate) validator: Validator<T>,
    pub(crate) routes: Vec<TargetRoute<T, U>>,
}

impl<S, T, U: Send + Sync> MigrationStrategy<S, T, U> {
    /// Starts an empty builder.
    pub fn builder() -> MigrationStrategyBuilder<S, T, U> {
        MigrationStrategyBuilder::default()
    }

    /// Name of the pre-selection filter, if one is registered.
    pub fn selector_name(&self) -> Option<&str> {
        self.selector.as_ref().map(|s| s.name())
    }

    /// Name of the source mapper.
    pub fn source_mapper_name(&self) -> &str {
        self.source_mapper.name()
    }

    /// Rule names in evaluation order.
    pub fn rule_names(&self) -> Vec<&str> {
        self.validator.rule_names()
    }

    /// Target names in route order.
    pub fn target_names(&self) -> Vec<&str> {
        self.routes.iter().map(TargetRoute::target_name).collect()
    }
}

/// Collects the stages of a [`MigrationStrategy`].
///
/// A source mapper and at least one target are required.
pub struct MigrationStrategyBuilder<S, T, U: Send + Sync> {
    selector: Option<Box<dyn Filter<S>>>,
    source_mapper: Option<Box<SourceMapper<S, T>>>,
    validator: Validator<T>,
    routes: Vec<TargetRoute<T, U>>,
}

impl<S, T, U: Send + Sync> Default for MigrationStrategyBuilder<S, T, U> {
    fn default() -> Self {
        Self {
            selector: None,
            source_mapper: None,
            validator: Validator::new(),
            routes: Vec::new(),
        }
    }
}

impl<S, T, U: Send + Sync> MigrationStrategyBuilder<S, T, U> {
    /// Pre-selection filter. Combine several with [`bridge_ingest::AllOf`].
    #[must_use]
    pub fn selector(mut self, selector: impl Filter<S> + 'static) -> Self {
        self.selector = Some(Box::new(selector));
        self
    }

    /// Mapper from a source record to canonical data sets. Required.
    #[must_use]
    pub fn source_mapper(mut self, mapper: impl Mapper<S, DataSet<T>> + 'static) -> Self {
        self.source_mapper = Some(Box::new(mapper));
        self
    }

    /// Rules applied to every data set. Defaults to no rules.
    #[must_use]
    pub fn validator(mut self, validator: Validator<T>) -> Self {
        self.validator = validator;
        self
    }

    /// Adds a target. Every validated data set is loaded into every target.
    #[must_use]
    pub fn target(
        mut self,
        mapper: impl Mapper<DataSet<T>, U> + 'static,
        client: Arc<dyn TargetClient<U>>,
    ) -> Self {
        self.routes.push(TargetRoute::new(mapper, client));
        self
    }

    /// Finishes the strategy.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidStrategy`] if the source mapper or every
    /// target is missing.
    pub fn build(self) -> Result<MigrationStrategy<S, T, U>> {
        let source_mapper = self
            .source_mapper
            .ok_or_else(|| EngineError::InvalidStrategy("no source mapper registered".into()))?;
        if self.routes.is_empty() {
            return Err(EngineError::InvalidStrategy(
                "no target route registered".into(),
            ));
        }
        Ok(MigrationStrategy {
            selector: self.selector,
            source_mapper,
            validator: self.validator,
            routes: self.routes,
        })
    }
}
