//! Target that appends records to a JSON array file.

use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::Mutex;

use crate::client::{Capabilities, Submission, TargetClient};
use crate::error::TargetError;

/// Writes every submitted record into a JSON file holding a list.
///
/// The file is created when missing. Submissions are synchronous and final,
/// so the target neither polls nor verifies. Handy for dry runs and tests.
pub struct JsonFileTarget<U> {
    name: String,
    path: PathBuf,
    write_lock: Mutex<()>,
    _record: PhantomData<fn(&U)>,
}

impl<U> JsonFileTarget<U> {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            write_lock: Mutex::new(()),
            _record: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> TargetError {
        TargetError::Io {
            path: self.path.clone(),
            source,
        }
    }

    async fn read_existing(&self) -> Result<Vec<serde_json::Value>, TargetError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(self.io_error(err)),
        };
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        match serde_json::from_str(&content)? {
            serde_json::Value::Array(items) => Ok(items),
            _ => Err(TargetError::rejected(format!(
                "{} does not contain a JSON list",
                self.path.display()
            ))),
        }
    }
}

#[async_trait]
impl<U> TargetClient<U> for JsonFileTarget<U>
where
    U: Serialize + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::submit_only()
    }

    async fn submit(&self, record: &U) -> Result<Submission, TargetError> {
        let value = serde_json::to_value(record)?;
        let _guard = self.write_lock.lock().await;

        let mut items = self.read_existing().await?;
        let position = items.len();
        items.push(value);
        let json = serde_json::to_string_pretty(&items)?;
        tokio::fs::write(&self.path, json)
            .await
            .map_err(|err| self.io_error(err))?;

        Ok(Submission::with_id(position.to_string()))
    }
}
