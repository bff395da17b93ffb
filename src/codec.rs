//! Compact JSON encoding for wire payloads.

use serde::Serialize;
use serde_json::{Map, Value};

/// Ordered metric name to value mapping. Keys keep insertion order.
pub type CustomMetrics = Map<String, Value>;

/// Serializes a payload to a single-line JSON object.
///
/// Key order follows struct field order, and nested maps keep insertion order,
/// so the same payload always produces the same bytes.
pub fn encode<T: Serialize + ?Sized>(payload: &T) -> serde_json::Result<String> {
    serde_json::to_string(payload)
}
