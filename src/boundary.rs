//! Deterministic numeric edge values for fuzzers.
//!
//! "Left" and "right" boundaries sit just outside the declared range, or just
//! outside what the declared width can represent when no bound is declared.
//! "Extreme" values are the representable limits of the width itself.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::types::{SchemaKind, SchemaNode};

/// Distance outside a declared integer bound.
pub const INTEGER_DELTA: i128 = 10_000;

/// Distance outside an integer type's own range.
pub const INTEGER_TYPE_DELTA: i128 = 10;

/// Distance outside a declared decimal bound.
pub const DECIMAL_DELTA: f64 = 455_553_333.543_543_543;

/// Numeric width of a schema, from its type and format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NumericWidth {
    Int32,
    Int64,
    Float,
    Double,
}

impl NumericWidth {
    pub fn of(node: &SchemaNode) -> Option<Self> {
        let format = node.constraints.format.as_deref();
        match node.kind {
            SchemaKind::Integer if format == Some("int32") => Some(NumericWidth::Int32),
            SchemaKind::Integer => Some(NumericWidth::Int64),
            SchemaKind::Number if format == Some("float") => Some(NumericWidth::Float),
            SchemaKind::Number => Some(NumericWidth::Double),
            _ => None,
        }
    }

    fn is_integer(&self) -> bool {
        matches!(self, NumericWidth::Int32 | NumericWidth::Int64)
    }

    fn integer_limits(&self) -> (i128, i128) {
        match self {
            NumericWidth::Int32 => (i32::MIN as i128, i32::MAX as i128),
            _ => (i64::MIN as i128, i64::MAX as i128),
        }
    }

    fn decimal_max(&self) -> f64 {
        match self {
            NumericWidth::Float => f32::MAX as f64,
            _ => f64::MAX,
        }
    }
}

/// A boundary value. Integers use `i128` so values past `i64` stay exact.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BoundaryValue {
    Integer(i128),
    Decimal(f64),
}

impl BoundaryValue {
    /// JSON form; integers outside `i64`/`u64` degrade to a JSON float.
    pub fn to_json(&self) -> Value {
        match *self {
            BoundaryValue::Integer(n) => {
                if let Ok(v) = i64::try_from(n) {
                    Value::from(v)
                } else if let Ok(v) = u64::try_from(n) {
                    Value::from(v)
                } else {
                    Value::from(n as f64)
                }
            }
            BoundaryValue::Decimal(d) => Value::from(d),
        }
    }
}

impl fmt::Display for BoundaryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundaryValue::Integer(n) => write!(f, "{}", n),
            BoundaryValue::Decimal(d) => write!(f, "{}", d),
        }
    }
}

/// All four edge values for one numeric schema.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Boundaries {
    pub width: NumericWidth,
    pub left: BoundaryValue,
    pub right: BoundaryValue,
    pub extreme_negative: BoundaryValue,
    pub extreme_positive: BoundaryValue,
}

/// Value just below the declared minimum, or below the width's minimum.
pub fn left_boundary(node: &SchemaNode) -> Option<BoundaryValue> {
    let width = NumericWidth::of(node)?;
    let minimum = node.constraints.minimum;
    Some(if width.is_integer() {
        BoundaryValue::Integer(match minimum {
            Some(min) => min as i128 - INTEGER_DELTA,
            None => width.integer_limits().0 - INTEGER_TYPE_DELTA,
        })
    } else {
        BoundaryValue::Decimal(match minimum {
            Some(min) => min - DECIMAL_DELTA,
            None => -width.decimal_max(),
        })
    })
}

/// Value just above the declared maximum, or above the width's maximum.
pub fn right_boundary(node: &SchemaNode) -> Option<BoundaryValue> {
    let width = NumericWidth::of(node)?;
    let maximum = node.constraints.maximum;
    Some(if width.is_integer() {
        BoundaryValue::Integer(match maximum {
            Some(max) => max as i128 + INTEGER_DELTA,
            None => width.integer_limits().1 + INTEGER_TYPE_DELTA,
        })
    } else {
        BoundaryValue::Decimal(match maximum {
            Some(max) => max + DECIMAL_DELTA,
            None => width.decimal_max(),
        })
    })
}

pub fn extreme_negative(node: &SchemaNode) -> Option<BoundaryValue> {
    let width = NumericWidth::of(node)?;
    Some(if width.is_integer() {
        BoundaryValue::Integer(width.integer_limits().0)
    } else {
        BoundaryValue::Decimal(-width.decimal_max())
    })
}

pub fn extreme_positive(node: &SchemaNode) -> Option<BoundaryValue> {
    let width = NumericWidth::of(node)?;
    Some(if width.is_integer() {
        BoundaryValue::Integer(width.integer_limits().1)
    } else {
        BoundaryValue::Decimal(width.decimal_max())
    })
}

/// Edge values for a numeric schema; `None` for anything else.
pub fn boundaries(node: &SchemaNode) -> Option<Boundaries> {
    Some(Boundaries {
        width: NumericWidth::of(node)?,
        left: left_boundary(node)?,
        right: right_boundary(node)?,
        extreme_negative: extreme_negative(node)?,
        extreme_positive: extreme_positive(node)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn node(schema: Value) -> SchemaNode {
        SchemaNode::from_json(&schema)
    }

    #[test]
    fn declared_integer_bounds() {
        let n = node(json!({"type": "integer", "minimum": 10, "maximum": 20}));
        assert_eq!(left_boundary(&n), Some(BoundaryValue::Integer(10 - 10_000)));
        assert_eq!(right_boundary(&n), Some(BoundaryValue::Integer(20 + 10_000)));
    }

    #[test]
    fn undeclared_integer_bounds_use_type_limits() {
        let n = node(json!({"type": "integer"}));
        assert_eq!(
            left_boundary(&n),
            Some(BoundaryValue::Integer(i64::MIN as i128 - 10))
        );
        let n = node(json!({"type": "integer", "format": "int32"}));
        assert_eq!(
            right_boundary(&n),
            Some(BoundaryValue::Integer(i32::MAX as i128 + 10))
        );
    }

    #[test]
    fn declared_decimal_bounds() {
        let n = node(json!({"type": "number", "minimum": 1.5}));
        assert_eq!(left_boundary(&n), Some(BoundaryValue::Decimal(1.5 - DECIMAL_DELTA)));
    }

    #[test]
    fn undeclared_decimal_bounds_follow_width() {
        let n = node(json!({"type": "number", "format": "float"}));
        assert_eq!(right_boundary(&n), Some(BoundaryValue::Decimal(f32::MAX as f64)));
        let n = node(json!({"type": "number"}));
        assert_eq!(left_boundary(&n), Some(BoundaryValue::Decimal(-f64::MAX)));
    }

    #[test]
    fn extremes_follow_width() {
        let n = node(json!({"type": "integer", "format": "int32", "minimum": 0}));
        assert_eq!(extreme_negative(&n), Some(BoundaryValue::Integer(i32::MIN as i128)));
        assert_eq!(extreme_positive(&n), Some(BoundaryValue::Integer(i32::MAX as i128)));
    }

    #[test]
    fn non_numeric_has_no_boundaries() {
        assert!(boundaries(&node(json!({"type": "string"}))).is_none());
    }

    #[test]
    fn json_form_of_oversized_integer() {
        assert_eq!(BoundaryValue::Integer(-9990).to_json(), json!(-9990));
        assert!(BoundaryValue::Integer(i64::MIN as i128 - 10).to_json().is_f64());
        assert_eq!(BoundaryValue::Integer(42).to_string(), "42");
    }
}
