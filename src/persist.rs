// Task collection persistence over a key-value blob store

use crate::models::{Task, TaskId};
use crate::storage::KeyValueStore;
use eyre::{Context, Result};
use serde_json::Value;
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Namespace key the collection is stored under by default
pub const DEFAULT_NAMESPACE: &str = "todos";

/// Durable home for the task collection
pub trait Persistence {
    /// Read the stored collection. Missing or malformed data yields an empty collection.
    fn load(&mut self) -> Vec<Task>;

    /// Replace the stored collection with `tasks`
    fn save(&mut self, tasks: &[Task]) -> Result<()>;
}

/// Stores the whole collection as one JSON array under a namespace key
pub struct BlobPersistence<K> {
    storage: K,
    key: String,
}

impl<K: KeyValueStore> BlobPersistence<K> {
    pub fn new(storage: K, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
        }
    }

    /// Use [`DEFAULT_NAMESPACE`] as the key
    pub fn with_default_namespace(storage: K) -> Self {
        Self::new(storage, DEFAULT_NAMESPACE)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn storage(&self) -> &K {
        &self.storage
    }

    pub fn into_storage(self) -> K {
        self.storage
    }
}

impl<K: KeyValueStore> Persistence for BlobPersistence<K> {
    fn load(&mut self) -> Vec<Task> {
        match self.storage.get_item(&self.key) {
            Ok(Some(blob)) => decode_tasks(&blob),
            Ok(None) => {
                debug!(key = %self.key, "No stored tasks, starting empty");
                Vec::new()
            }
            Err(e) => {
                warn!(key = %self.key, error = ?e, "Failed to read stored tasks, starting empty");
                Vec::new()
            }
        }
    }

    fn save(&mut self, tasks: &[Task]) -> Result<()> {
        let blob = encode_tasks(tasks)?;
        self.storage
            .set_item(&self.key, &blob)
            .with_context(|| format!("Failed to save tasks under key '{}'", self.key))?;
        debug!(key = %self.key, count = tasks.len(), "Saved tasks");
        Ok(())
    }
}

/// Serialize a collection as a compact JSON array
pub fn encode_tasks(tasks: &[Task]) -> Result<String> {
    serde_json::to_string(tasks).context("Failed to serialize tasks")
}

/// Parse a stored blob, keeping every well-formed task.
///
/// A blob that is not a JSON array decodes to nothing. Entries that fail to
/// parse are skipped, as are entries repeating an id seen earlier in the array.
pub fn decode_tasks(blob: &str) -> Vec<Task> {
    let entries = match serde_json::from_str::<Value>(blob) {
        Ok(Value::Array(entries)) => entries,
        Ok(other) => {
            warn!(kind = json_kind(&other), "Stored tasks are not a JSON array, ignoring");
            return Vec::new();
        }
        Err(e) => {
            warn!(error = ?e, "Failed to parse stored tasks, ignoring");
            return Vec::new();
        }
    };

    let mut seen: HashSet<TaskId> = HashSet::new();
    let mut tasks = Vec::with_capacity(entries.len());

    for (index, entry) in entries.into_iter().enumerate() {
        let task: Task = match serde_json::from_value(entry) {
            Ok(t) => t,
            Err(e) => {
                warn!(index, error = ?e, "Failed to parse task, skipping");
                continue;
            }
        };

        if !seen.insert(task.id) {
            warn!(index, id = task.id, "Duplicate task id, skipping");
            continue;
        }

        tasks.push(task);
    }

    info!(count = tasks.len(), "Loaded tasks");
    tasks
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
