/// Minimal contract the engine needs from a raw source record.
///
/// The id is only used for reporting; it does not have to be unique, but
/// outcomes are much easier to trace when it is.
pub trait SourceRecord: Send + Sync {
    fn source_id(&self) -> String;
}

impl SourceRecord for String {
    fn source_id(&self) -> String {
        self.clone()
    }
}

impl SourceRecord for serde_json::Value {
    fn source_id(&self) -> String {
        match self.get("id") {
            Some(serde_json::Value::String(id)) => id.clone(),
            Some(other) => other.to_string(),
            None => self.to_string(),
        }
    }
}
