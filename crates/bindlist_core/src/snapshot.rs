//! JSON snapshot intake.
//!
//! # Responsibility
//! - Decode full snapshots delivered by an external data source.
//! - Reject null or malformed snapshots before any collection is touched.
//!
//! # Invariants
//! - A snapshot is a JSON array; `null` is never treated as empty.

use crate::collection::error::{CollectionError, CollectionResult};
use crate::collection::grouped::{GroupedCollection, GroupedReport};
use crate::collection::reconciling::{ReconcileReport, ReconcilingCollection};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt::Debug;

/// Decodes a JSON array snapshot into elements.
///
/// # Errors
/// - `InvalidArgument` when the payload is not JSON, is `null`, is not an
///   array, or holds an element that does not decode as `T`.
pub fn decode_snapshot<T: DeserializeOwned>(json: &str) -> CollectionResult<Vec<T>> {
    let value: Value = serde_json::from_str(json)
        .map_err(|err| CollectionError::InvalidArgument(format!("snapshot is not valid JSON: {err}")))?;

    match value {
        Value::Null => Err(CollectionError::InvalidArgument(
            "snapshot must not be null".to_string(),
        )),
        Value::Array(_) => serde_json::from_value(value).map_err(|err| {
            CollectionError::InvalidArgument(format!("snapshot element is malformed: {err}"))
        }),
        other => Err(CollectionError::InvalidArgument(format!(
            "snapshot must be a JSON array, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl<T: Clone + DeserializeOwned + 'static> ReconcilingCollection<T> {
    /// Decodes `json` and merges it via `update_range`.
    ///
    /// A decode failure leaves the collection untouched.
    pub fn update_from_json(&self, json: &str) -> CollectionResult<ReconcileReport> {
        let incoming = decode_snapshot::<T>(json)?;
        self.update_range(incoming)
    }
}

impl<K, T> GroupedCollection<K, T>
where
    K: PartialEq + Clone + Debug + 'static,
    T: Clone + DeserializeOwned + 'static,
{
    /// Decodes `json` and merges it via `update_items`.
    pub fn update_items_from_json(&self, json: &str) -> CollectionResult<GroupedReport> {
        let incoming = decode_snapshot::<T>(json)?;
        self.update_items(incoming)
    }
}
