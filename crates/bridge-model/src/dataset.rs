//! The canonical aggregate that flows between source-side and target-side mapping.
//!
//! A [`DataSet`] bundles related canonical domain objects under a stable
//! [`DataSetId`]. Mapping steps may swap the payload wholesale, validation may
//! annotate it with diagnostics, but the id stays fixed for the whole run.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of a [`DataSet`], unique within a migration run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DataSetId(String);

impl DataSetId {
    /// Generates a random (UUID v4) id.
    pub fn random() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DataSetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for DataSetId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for DataSetId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Aggregate of canonical objects plus an immutable identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSet<T> {
    id: DataSetId,
    objects: T,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    diagnostics: Vec<String>,
}

impl<T> DataSet<T> {
    /// Creates a data set with a freshly generated id.
    pub fn new(objects: T) -> Self {
        Self::with_id(DataSetId::random(), objects)
    }

    /// Creates a data set with a caller-chosen id, e.g. a natural key of the source record.
    pub fn with_id(id: impl Into<DataSetId>, objects: T) -> Self {
        Self {
            id: id.into(),
            objects,
            diagnostics: Vec::new(),
        }
    }

    pub fn id(&self) -> &DataSetId {
        &self.id
    }

    pub fn objects(&self) -> &T {
        &self.objects
    }

    /// Replaces the payload, keeping the id. Returns the previous payload.
    pub fn replace_objects(&mut self, objects: T) -> T {
        std::mem::replace(&mut self.objects, objects)
    }

    /// Consumes the data set and returns its payload.
    pub fn into_objects(self) -> T {
        self.objects
    }

    /// Diagnostics attached by the most recent validation pass.
    pub fn diagnostics(&self) -> &[String] {
        &self.diagnostics
    }

    /// Overwrites the diagnostics. Validation replaces rather than appends so
    /// that running it twice leaves the data set unchanged.
    pub fn set_diagnostics(&mut self, diagnostics: Vec<String>) {
        self.diagnostics = diagnostics;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replace_objects_keeps_id() {
        let mut data_set = DataSet::with_id("contract-1", vec![1, 2]);
        let previous = data_set.replace_objects(vec![3]);
        assert_eq!(previous, vec![1, 2]);
        assert_eq!(data_set.id().as_str(), "contract-1");
        assert_eq!(data_set.objects(), &vec![3]);
    }

    #[test]
    fn random_ids_differ() {
        let a = DataSet::new(());
        let b = DataSet::new(());
        assert_ne!(a.id(), b.id());
    }
}
