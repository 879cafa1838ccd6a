//! Example serialization with a depth-limited fallback.

use serde_json::{Map, Value};

use crate::error::SerializeError;

/// Fallback depth is the self-reference depth times this factor.
pub const SELF_REF_DEPTH_MULTIPLIER: usize = 6;

/// Recorded once per `generate` call that needed the fallback.
pub const OVERFLOW_DIAGNOSTIC: &str = "Generated example is too large to be serialized in full. \
A depth-limiting serializer was used, so some expected fields may be missing. \
Re-run with a smaller --self-reference-depth value, like --self-reference-depth 2";

/// Bounds for the primary serializer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerializeLimits {
    pub max_depth: usize,
    pub max_bytes: usize,
}

impl Default for SerializeLimits {
    fn default() -> Self {
        Self {
            max_depth: 128,
            max_bytes: 16 * 1024 * 1024,
        }
    }
}

/// Pretty-print `value` if it fits within `limits`.
pub fn to_pretty(value: &Value, limits: &SerializeLimits) -> Result<String, SerializeError> {
    let depth = nesting_depth(value);
    if depth > limits.max_depth {
        return Err(SerializeError::TooDeep {
            depth,
            limit: limits.max_depth,
        });
    }
    let text = serde_json::to_string_pretty(value)?;
    if text.len() > limits.max_bytes {
        return Err(SerializeError::TooLarge {
            size: text.len(),
            limit: limits.max_bytes,
        });
    }
    Ok(text)
}

/// Pretty-print `value` with containers below `max_depth` emptied.
pub fn to_pretty_depth_limited(value: &Value, max_depth: usize) -> String {
    let truncated = truncate_depth(value, max_depth);
    serde_json::to_string_pretty(&truncated).unwrap_or_else(|_| "{}".to_string())
}

/// Copy of `value` where objects and arrays deeper than `max_depth` are empty.
///
/// The root container is depth 1; scalars are never dropped.
pub fn truncate_depth(value: &Value, max_depth: usize) -> Value {
    truncate_at(value, 1, max_depth)
}

/// Number of nested containers on the deepest path; scalars are 0.
pub fn nesting_depth(value: &Value) -> usize {
    match value {
        Value::Object(map) => 1 + map.values().map(nesting_depth).max().unwrap_or(0),
        Value::Array(items) => 1 + items.iter().map(nesting_depth).max().unwrap_or(0),
        _ => 0,
    }
}

fn truncate_at(value: &Value, depth: usize, max_depth: usize) -> Value {
    match value {
        Value::Object(_) if depth > max_depth => Value::Object(Map::new()),
        Value::Array(_) if depth > max_depth => Value::Array(Vec::new()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), truncate_at(v, depth + 1, max_depth)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|v| truncate_at(v, depth + 1, max_depth))
                .collect(),
        ),
        scalar => scalar.clone(),
    }
}
