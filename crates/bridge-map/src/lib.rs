//! Mapping between source records, canonical data sets and target records.

pub mod error;
pub mod mapper;

pub use error::MappingError;
pub use mapper::{FnMapper, Mapper, MappingResult, map_guarded, mapper_fn};

/// Mapper from a raw source record to canonical data sets.
pub type SourceMapper<S, T> = dyn Mapper<S, bridge_model::DataSet<T>>;

/// Mapper from a canonical data set to target records.
pub type TargetMapper<T, U> = dyn Mapper<bridge_model::DataSet<T>, U>;
