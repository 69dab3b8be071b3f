//! Source-side ingestion: data providers and pre-selection filters.

pub mod error;
pub mod filter;
pub mod provider;

// === Errors ===
pub use error::{FilterError, IngestError, Result};

// === Filters ===
pub use filter::{
    AggregateFilter, AllOf, AllowlistFilter, BlocklistFilter, Filter, FilterResult, FnFilter,
    filter_fn,
};

// === Providers ===
pub use provider::{JsonFileSourceDataProvider, ListSourceDataProvider, SourceDataProvider};
