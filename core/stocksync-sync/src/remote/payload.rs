//! Remote payload decoding.
//!
//! Backends hand back record arrays in a handful of shapes:
//!
//! - a bare array: `[{...}, ...]`
//! - a wrapper object: `{"record": [...], "metadata": {...}}`
//! - a wrapper whose `record` is itself a JSON-encoded string
//! - any of the above, JSON-encoded once more as a string
//!
//! Each string layer costs one extra decode step. `null` and empty bodies
//! mean an empty collection.

use serde_json::Value;
use stocksync_types::Record;
use thiserror::Error;
use tracing::warn;

/// Bound on wrapper/string nesting.
const MAX_NESTING: usize = 4;

/// A remote payload that is not a record array in any accepted shape.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The body (or an embedded string) is not valid JSON.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Valid JSON of the wrong shape.
    #[error("unexpected payload shape: {0}")]
    UnexpectedShape(String),
}

/// Decodes a response body into records.
///
/// Array items that are not valid records (e.g. missing `id`) are skipped and
/// logged; the rest of the array is kept.
pub fn decode_records(body: &[u8]) -> Result<Vec<Record>, DecodeError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }
    let value: Value = serde_json::from_slice(body)?;
    records_from_value(value, 0)
}

/// Decodes an already-parsed JSON value into records.
pub fn records_from_value(value: Value, depth: usize) -> Result<Vec<Record>, DecodeError> {
    if depth > MAX_NESTING {
        return Err(DecodeError::UnexpectedShape(
            "payload nested too deeply".to_string(),
        ));
    }

    match value {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => Ok(items_to_records(items)),
        Value::Object(mut map) => match map.remove("record") {
            Some(inner) => records_from_value(inner, depth + 1),
            None => Err(DecodeError::UnexpectedShape(
                "object without a `record` field".to_string(),
            )),
        },
        Value::String(s) => {
            if s.trim().is_empty() {
                return Ok(Vec::new());
            }
            let inner: Value = serde_json::from_str(&s)?;
            records_from_value(inner, depth + 1)
        }
        Value::Bool(_) => Err(DecodeError::UnexpectedShape("boolean".to_string())),
        Value::Number(_) => Err(DecodeError::UnexpectedShape("number".to_string())),
    }
}

fn items_to_records(items: Vec<Value>) -> Vec<Record> {
    let total = items.len();
    let records: Vec<Record> = items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<Record>(item) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Skipping malformed remote record: {}", e);
                None
            }
        })
        .collect();
    if records.len() < total {
        warn!("Dropped {} of {} remote records", total - records.len(), total);
    }
    records
}

/// Pulls a container identifier out of a creation response.
///
/// Accepts `metadata.id` (document-store style) or a top-level `id`.
pub fn container_id_from_value(value: &Value) -> Option<String> {
    let candidate = value
        .get("metadata")
        .and_then(|m| m.get("id"))
        .or_else(|| value.get("id"))?;

    match candidate {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
