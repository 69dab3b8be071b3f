//! Core model types shared by every stage of the migration pipeline.

pub mod dataset;
pub mod error;
pub mod options;
pub mod record;
pub mod redact;

pub use dataset::{DataSet, DataSetId};
pub use error::{ConfigError, Result};
pub use options::BatchConfig;
pub use record::SourceRecord;
pub use redact::{REDACTED_VALUE, log_data_enabled, redact_value, set_log_data_enabled};
