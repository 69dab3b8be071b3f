//! Source data providers.
//!
//! A provider holds the raw extract of one source system and makes its
//! records addressable by a key. Providers can be narrowed with filters
//! before the records are handed to the orchestrator.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::error::{IngestError, Result};
use crate::filter::{AggregateFilter, Filter};

/// Access to the records of one source system.
pub trait SourceDataProvider<S> {
    type Key;

    /// All records, in extraction order.
    fn get_data(&self) -> &[S];

    /// The record with the given key, if any.
    fn get_entry(&self, key: &Self::Key) -> Option<&S>;
}

type KeySelector<S, K> = Arc<dyn Fn(&S) -> K + Send + Sync>;

/// In-memory provider indexed by a key selector.
pub struct ListSourceDataProvider<S, K> {
    records: Vec<S>,
    index: HashMap<K, usize>,
    key_selector: KeySelector<S, K>,
}

impl<S, K> ListSourceDataProvider<S, K>
where
    K: Eq + Hash + Debug,
{
    /// Builds a provider. Keys must be unique.
    pub fn new<F>(records: Vec<S>, key_selector: F) -> Result<Self>
    where
        F: Fn(&S) -> K + Send + Sync + 'static,
    {
        Self::with_selector(records, Arc::new(key_selector))
    }

    fn with_selector(records: Vec<S>, key_selector: KeySelector<S, K>) -> Result<Self> {
        let mut index = HashMap::with_capacity(records.len());
        for (position, record) in records.iter().enumerate() {
            let key = key_selector(record);
            if index.contains_key(&key) {
                return Err(IngestError::DuplicateKey {
                    key: format!("{key:?}"),
                });
            }
            index.insert(key, position);
        }
        Ok(Self {
            records,
            index,
            key_selector,
        })
    }

    /// Returns a provider holding only the records accepted by `filter`.
    pub fn filter_by(self, filter: &dyn Filter<S>) -> Result<Self> {
        let kept = filter.apply(self.records)?;
        Self::with_selector(kept, self.key_selector)
    }

    /// Returns a provider holding only the records surviving an aggregate filter.
    pub fn filter_by_aggregate<A>(self, filter: &AggregateFilter<S, A>) -> Result<Self> {
        let kept = filter.apply(self.records)?;
        Self::with_selector(kept, self.key_selector)
    }
}

impl<S, K> ListSourceDataProvider<S, K> {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Hands the records over, e.g. to the orchestrator.
    pub fn into_records(self) -> Vec<S> {
        self.records
    }
}

impl<S, K> SourceDataProvider<S> for ListSourceDataProvider<S, K>
where
    K: Eq + Hash,
{
    type Key = K;

    fn get_data(&self) -> &[S] {
        &self.records
    }

    fn get_entry(&self, key: &K) -> Option<&S> {
        self.index.get(key).map(|&position| &self.records[position])
    }
}

/// Provider reading its records from a JSON file.
///
/// The records are selected with a JSON pointer (RFC 6901); use `""` when
/// the file itself is the array.
pub struct JsonFileSourceDataProvider<S, K> {
    path: PathBuf,
    inner: ListSourceDataProvider<S, K>,
}

impl<S, K> JsonFileSourceDataProvider<S, K>
where
    S: DeserializeOwned,
    K: Eq + Hash + Debug,
{
    pub fn open<F>(path: &Path, pointer: &str, key_selector: F) -> Result<Self>
    where
        F: Fn(&S) -> K + Send + Sync + 'static,
    {
        let text = std::fs::read_to_string(path).map_err(|source| IngestError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        let mut document: serde_json::Value =
            serde_json::from_str(&text).map_err(|source| IngestError::JsonParse {
                path: path.to_path_buf(),
                source,
            })?;
        let selected = document
            .pointer_mut(pointer)
            .map(serde_json::Value::take)
            .ok_or_else(|| IngestError::MissingPointer {
                path: path.to_path_buf(),
                pointer: pointer.to_string(),
            })?;
        let records: Vec<S> =
            serde_json::from_value(selected).map_err(|source| IngestError::RecordShape {
                path: path.to_path_buf(),
                pointer: pointer.to_string(),
                source,
            })?;

        tracing::info!(path = %path.display(), count = records.len(), "read source records");
        Ok(Self {
            path: path.to_path_buf(),
            inner: ListSourceDataProvider::new(records, key_selector)?,
        })
    }
}

impl<S, K> JsonFileSourceDataProvider<S, K> {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn into_inner(self) -> ListSourceDataProvider<S, K> {
        self.inner
    }
}

impl<S, K> SourceDataProvider<S> for JsonFileSourceDataProvider<S, K>
where
    K: Eq + Hash,
{
    type Key = K;

    fn get_data(&self) -> &[S] {
        self.inner.get_data()
    }

    fn get_entry(&self, key: &K) -> Option<&S> {
        self.inner.get_entry(key)
    }
}
