// Snapshot encoding and import validation

use crate::error::{Result, TaskError};
use crate::models::Task;
use serde_json::Value;
use tracing::{info, warn};

/// Compact encoding used for the persisted blob
pub fn encode(tasks: &[Task]) -> Result<String> {
    Ok(serde_json::to_string(tasks)?)
}

/// Pretty-printed encoding used for export files
pub fn encode_pretty(tasks: &[Task]) -> Result<String> {
    Ok(serde_json::to_string_pretty(tasks)?)
}

/// Decode a persisted blob
///
/// Fails only if the blob is not a JSON array. A record that does not decode
/// is skipped so it cannot take the rest of the collection down with it.
pub fn decode(text: &str) -> serde_json::Result<Vec<Task>> {
    let Value::Array(entries) = serde_json::from_str(text)? else {
        return Err(serde::de::Error::custom("expected a JSON array of tasks"));
    };

    Ok(decode_entries(entries, "Persisted"))
}

/// Minimal structural check for one imported record
///
/// Requires an integer `id`, string `title`, string `category` and boolean
/// `completed`. Other fields fall back to their defaults when mistyped.
pub fn looks_like_task(value: &Value) -> bool {
    let Some(obj) = value.as_object() else {
        return false;
    };

    obj.get("id").is_some_and(|v| v.as_i64().is_some())
        && obj.get("title").is_some_and(Value::is_string)
        && obj.get("category").is_some_and(Value::is_string)
        && obj.get("completed").is_some_and(Value::is_boolean)
}

/// Parse import text, keeping only well-formed task records
///
/// Fails if the text is not JSON or not a JSON array. Malformed entries are
/// skipped with a warning rather than failing the whole import.
pub fn decode_import(text: &str) -> Result<Vec<Task>> {
    let value: Value = serde_json::from_str(text).map_err(|e| TaskError::Import(e.to_string()))?;

    let Value::Array(entries) = value else {
        return Err(TaskError::Import("expected a JSON array of tasks".to_string()));
    };

    let tasks = decode_entries(entries, "Import");
    info!(kept = tasks.len(), "Decoded import snapshot");

    Ok(tasks)
}

fn decode_entries(entries: Vec<Value>, source: &str) -> Vec<Task> {
    let total = entries.len();
    let mut tasks = Vec::with_capacity(total);

    for (index, entry) in entries.into_iter().enumerate() {
        if !looks_like_task(&entry) {
            warn!(source, index, "Task entry failed shape validation, skipping");
            continue;
        }

        let mut task: Task = match serde_json::from_value(entry) {
            Ok(t) => t,
            Err(e) => {
                warn!(source, index, error = ?e, "Task entry failed to decode, skipping");
                continue;
            }
        };
        task.normalize();
        tasks.push(task);
    }

    if tasks.len() < total {
        warn!(source, total, kept = tasks.len(), "Dropped malformed task entries");
    }

    tasks
}
