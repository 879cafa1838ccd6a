//! Leaf values for scalar schemas.
//!
//! Strings try, in order: enum, default (when enabled), the format provider,
//! byte/binary encoding, the pattern generator when a pattern or length is
//! declared, and finally an alphanumeric string grown from the property name.
//! Numbers are drawn uniformly from the declared range or a narrow default
//! one. Booleans are deterministic.

use std::collections::HashMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rand::distributions::Alphanumeric;
use rand::{Rng, RngCore};
use serde_json::{Number, Value};

use crate::cycle::PATH_SEPARATOR;
use crate::format::{BuiltinFormats, FormatProvider};
use crate::pattern::{PatternStringGenerator, ALPHANUMERIC_PLUS};
use crate::types::{SchemaKind, SchemaNode};

/// Length ceiling when only `minLength` or a pattern is declared.
pub const DEFAULT_MAX_LENGTH: usize = 256;

/// Width of the range used when a number has only one bound, or none.
const DEFAULT_NUMBER_SPAN: f64 = 10.0;

pub struct ValueSynthesizer {
    use_defaults: bool,
    formats: Box<dyn FormatProvider>,
    patterns: HashMap<String, PatternStringGenerator>,
}

impl std::fmt::Debug for ValueSynthesizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValueSynthesizer")
            .field("use_defaults", &self.use_defaults)
            .field("patterns", &self.patterns.len())
            .finish()
    }
}

impl ValueSynthesizer {
    pub fn new(use_defaults: bool) -> Self {
        Self {
            use_defaults,
            formats: Box::new(BuiltinFormats),
            patterns: HashMap::new(),
        }
    }

    /// Replace the format provider.
    pub fn with_formats(mut self, formats: impl FormatProvider + 'static) -> Self {
        self.formats = Box::new(formats);
        self
    }

    /// Value for a leaf schema, or `None` for shapes the resolver handles.
    pub fn synthesize(
        &mut self,
        node: &SchemaNode,
        property_path: &str,
        rng: &mut dyn RngCore,
    ) -> Option<Value> {
        match &node.kind {
            SchemaKind::String => Some(self.string_value(node, property_path, rng)),
            SchemaKind::Integer | SchemaKind::Number => Some(self.number_value(node, rng)),
            SchemaKind::Boolean => Some(boolean_value(node)),
            SchemaKind::Object(shape) if shape.properties.is_empty() => Some(
                node.constraints
                    .example
                    .clone()
                    .unwrap_or_else(|| Value::Object(Default::default())),
            ),
            SchemaKind::Any => node.constraints.example.clone(),
            _ => None,
        }
    }

    pub fn string_value(&mut self, node: &SchemaNode, property_path: &str, rng: &mut dyn RngCore) -> Value {
        if let Some(value) = self.enum_or_default(node) {
            return value;
        }
        if let Some(value) = self.formats.generate(node, property_path, rng) {
            return value;
        }

        let c = &node.constraints;
        if matches!(c.format.as_deref(), Some("byte") | Some("binary")) {
            let len = rng.gen_range(8..=16);
            let raw = random_alphanumeric(rng, len);
            return Value::String(STANDARD.encode(raw));
        }

        if c.pattern.is_some() || c.min_length.is_some() || c.max_length.is_some() {
            if c.max_length == Some(0) {
                return Value::String(String::new());
            }
            let min = c.min_length.unwrap_or(1);
            let max = c.max_length.unwrap_or(DEFAULT_MAX_LENGTH).max(min);
            let pattern = c.pattern.as_deref().unwrap_or(ALPHANUMERIC_PLUS);
            return Value::String(self.pattern_value(pattern, min, max, property_path, rng));
        }

        Value::String(alphanumeric_from_name(property_path, rng))
    }

    pub fn number_value(&self, node: &SchemaNode, rng: &mut dyn RngCore) -> Value {
        if let Some(value) = self.enum_or_default(node) {
            return value;
        }

        let c = &node.constraints;
        let (lo, hi) = match (c.minimum, c.maximum) {
            (Some(min), Some(max)) => (min, max.max(min)),
            (Some(min), None) => (min, min + DEFAULT_NUMBER_SPAN),
            (None, Some(max)) => (max - DEFAULT_NUMBER_SPAN, max),
            (None, None) => (0.0, DEFAULT_NUMBER_SPAN),
        };
        let format = c.format.as_deref();

        if node.kind == SchemaKind::Integer {
            let (mut lo, mut hi) = (lo.ceil() as i64, hi.floor() as i64);
            if format == Some("int32") {
                lo = lo.clamp(i32::MIN as i64, i32::MAX as i64);
                hi = hi.clamp(i32::MIN as i64, i32::MAX as i64);
            }
            let value = if lo >= hi { lo } else { rng.gen_range(lo..=hi) };
            return Value::from(value);
        }

        let value = if lo >= hi {
            lo
        } else if hi - lo <= f64::MAX / 2.0 {
            rng.gen_range(lo..=hi)
        } else {
            // The span overflows f64, so sample around the midpoint in halves.
            let (mid, half) = (lo / 2.0 + hi / 2.0, hi / 2.0 - lo / 2.0);
            (mid + rng.gen_range(-1.0..=1.0) * half).clamp(lo, hi)
        };
        let value = if format == Some("float") {
            narrow_to_f32(value)
        } else {
            value
        };
        Number::from_f64(value).map_or(Value::Null, Value::Number)
    }

    // --- Internal implementation ---

    fn enum_or_default(&self, node: &SchemaNode) -> Option<Value> {
        let c = &node.constraints;
        if !c.enum_values.is_empty() {
            return c
                .enum_values
                .iter()
                .find(|v| !v.is_null())
                .or_else(|| c.enum_values.first())
                .cloned();
        }
        if self.use_defaults {
            return c.default.clone();
        }
        None
    }

    fn pattern_value(
        &mut self,
        pattern: &str,
        min: usize,
        max: usize,
        property_path: &str,
        rng: &mut dyn RngCore,
    ) -> String {
        if !self.patterns.contains_key(pattern) {
            match PatternStringGenerator::new(pattern) {
                Ok(generator) => {
                    self.patterns.insert(pattern.to_string(), generator);
                }
                Err(e) => {
                    tracing::warn!(property = property_path, error = %e, "ignoring invalid pattern");
                    if pattern == ALPHANUMERIC_PLUS {
                        return alphanumeric_from_name(property_path, rng);
                    }
                    return self.pattern_value(ALPHANUMERIC_PLUS, min, max, property_path, rng);
                }
            }
        }
        match self.patterns.get(pattern) {
            Some(generator) => generator.generate(min, max, rng),
            None => alphanumeric_from_name(property_path, rng),
        }
    }
}

/// Declared default, otherwise `true`.
fn boolean_value(node: &SchemaNode) -> Value {
    node.constraints
        .enum_values
        .iter()
        .find(|v| v.is_boolean())
        .or(node.constraints.default.as_ref().filter(|v| v.is_boolean()))
        .cloned()
        .unwrap_or(Value::Bool(true))
}

/// Alphanumeric string seeded with the property name so values are easy to
/// trace back to their field. Length is the name's length plus 0..=4.
pub fn alphanumeric_from_name(property_path: &str, rng: &mut dyn RngCore) -> String {
    let name = property_path
        .rsplit(PATH_SEPARATOR)
        .next()
        .unwrap_or(property_path)
        .trim_end_matches(".items");
    let mut value: String = name.chars().filter(char::is_ascii_alphanumeric).collect();
    let target = rng.gen_range(name.len()..=name.len() + 4).max(1);
    while value.len() < target {
        value.push(char::from(rng.sample(Alphanumeric)));
    }
    value
}

fn random_alphanumeric(rng: &mut dyn RngCore, len: usize) -> String {
    (0..len).map(|_| char::from(rng.sample(Alphanumeric))).collect()
}

/// Round-trip through `f32` text so the value carries only `f32` precision.
fn narrow_to_f32(value: f64) -> f64 {
    (value as f32).to_string().parse().unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use serde_json::json;

    fn synth(schema: Value, path: &str) -> Option<Value> {
        synth_with(ValueSynthesizer::new(false), schema, path)
    }

    fn synth_with(mut s: ValueSynthesizer, schema: Value, path: &str) -> Option<Value> {
        let mut rng = StdRng::seed_from_u64(3);
        s.synthesize(&SchemaNode::from_json(&schema), path, &mut rng)
    }

    // === Strings ===

    #[test]
    fn enum_beats_lengths() {
        let v = synth(json!({"type": "string", "enum": ["b", "a"], "minLength": 5, "maxLength": 9}), "x");
        assert_eq!(v, Some(json!("b")));
    }

    #[test]
    fn enum_skips_null_entries() {
        let v = synth(json!({"type": "string", "enum": [null, "set"]}), "x");
        assert_eq!(v, Some(json!("set")));
    }

    #[test]
    fn default_only_when_enabled() {
        let schema = json!({"type": "string", "default": "fallback", "maxLength": 3});
        assert_ne!(synth(schema.clone(), "x"), Some(json!("fallback")));
        assert_eq!(
            synth_with(ValueSynthesizer::new(true), schema, "x"),
            Some(json!("fallback"))
        );
    }

    #[test]
    fn lengths_bound_generated_strings() {
        let v = synth(json!({"type": "string", "minLength": 3, "maxLength": 5}), "name").unwrap();
        let len = v.as_str().unwrap().len();
        assert!((3..=5).contains(&len));
    }

    #[test]
    fn zero_max_length_is_empty() {
        assert_eq!(synth(json!({"type": "string", "maxLength": 0}), "x"), Some(json!("")));
    }

    #[test]
    fn pattern_drives_value() {
        let v = synth(json!({"type": "string", "pattern": "^[0-9]{4}$"}), "pin").unwrap();
        let s = v.as_str().unwrap();
        assert_eq!(s.len(), 4);
        assert!(s.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn invalid_pattern_falls_back_to_alphanumeric() {
        let v = synth(json!({"type": "string", "pattern": "([a-z", "minLength": 2, "maxLength": 6}), "code").unwrap();
        let s = v.as_str().unwrap();
        assert!((2..=6).contains(&s.len()));
        assert!(s.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn unconstrained_string_starts_with_name() {
        let v = synth(json!({"type": "string"}), "owner#nickname").unwrap();
        let s = v.as_str().unwrap();
        assert!(s.starts_with("nickname"));
        assert!((8..=12).contains(&s.len()));
    }

    #[test]
    fn byte_format_is_base64() {
        let v = synth(json!({"type": "string", "format": "byte"}), "blob").unwrap();
        assert!(STANDARD.decode(v.as_str().unwrap()).is_ok());
    }

    #[test]
    fn format_provider_is_consulted() {
        let v = synth(json!({"type": "string", "format": "uuid"}), "id").unwrap();
        assert_eq!(v.as_str().unwrap().len(), 36);
    }

    #[test]
    fn custom_format_provider() {
        struct Fixed;
        impl FormatProvider for Fixed {
            fn generate(&self, _: &SchemaNode, _: &str, _: &mut dyn RngCore) -> Option<Value> {
                Some(json!("fixed"))
            }
        }
        let s = ValueSynthesizer::new(false).with_formats(Fixed);
        assert_eq!(synth_with(s, json!({"type": "string"}), "x"), Some(json!("fixed")));
    }

    // === Numbers ===

    #[test]
    fn integer_within_declared_range() {
        for _ in 0..20 {
            let v = synth(json!({"type": "integer", "minimum": 5, "maximum": 7}), "n").unwrap();
            assert!((5..=7).contains(&v.as_i64().unwrap()));
        }
    }

    #[test]
    fn single_bound_ranges() {
        let v = synth(json!({"type": "integer", "minimum": 100}), "n").unwrap();
        assert!((100..=110).contains(&v.as_i64().unwrap()));
        let v = synth(json!({"type": "number", "maximum": -1.0}), "n").unwrap();
        let f = v.as_f64().unwrap();
        assert!((-11.0..=-1.0).contains(&f));
    }

    #[test]
    fn unbounded_number_in_default_range() {
        let v = synth(json!({"type": "number"}), "n").unwrap();
        assert!((0.0..=10.0).contains(&v.as_f64().unwrap()));
    }

    #[test]
    fn int32_is_clamped() {
        let v = synth(json!({"type": "integer", "format": "int32", "minimum": 3000000000i64}), "n").unwrap();
        assert_eq!(v.as_i64(), Some(i32::MAX as i64));
    }

    #[test]
    fn extreme_double_bounds_stay_in_range() {
        let schema = json!({"type": "number", "minimum": f64::MIN, "maximum": f64::MAX});
        let s = ValueSynthesizer::new(false);
        let node = SchemaNode::from_json(&schema);
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let f = s.number_value(&node, &mut rng).as_f64().unwrap();
            assert!(f.is_finite());
        }

        let half_open = json!({"type": "number", "minimum": 0.0, "maximum": f64::MAX});
        let f = synth(half_open, "n").unwrap().as_f64().unwrap();
        assert!((0.0..=f64::MAX).contains(&f));

        let integer = json!({"type": "integer", "minimum": f64::MIN, "maximum": f64::MAX});
        assert!(synth(integer, "n").unwrap().is_i64());
    }

    #[test]
    fn float_has_f32_precision() {
        let v = synth(json!({"type": "number", "format": "float", "minimum": 1, "maximum": 2}), "n").unwrap();
        let f = v.as_f64().unwrap();
        assert_eq!(f, narrow_to_f32(f));
    }

    #[test]
    fn numeric_enum() {
        assert_eq!(synth(json!({"type": "integer", "enum": [4, 8]}), "n"), Some(json!(4)));
    }

    // === Other leaves ===

    #[test]
    fn boolean_uses_default_then_true() {
        assert_eq!(synth(json!({"type": "boolean", "default": false}), "b"), Some(json!(false)));
        assert_eq!(synth(json!({"type": "boolean"}), "b"), Some(json!(true)));
    }

    #[test]
    fn free_form_object() {
        assert_eq!(synth(json!({"type": "object"}), "o"), Some(json!({})));
        assert_eq!(
            synth(json!({"type": "object", "example": {"k": 1}}), "o"),
            Some(json!({"k": 1}))
        );
    }

    #[test]
    fn any_without_example_is_absent() {
        assert_eq!(synth(json!({}), "x"), None);
        assert_eq!(synth(json!({"example": 5}), "x"), Some(json!(5)));
    }

    #[test]
    fn structured_shapes_are_left_to_resolver() {
        assert_eq!(synth(json!({"type": "array", "items": {"type": "string"}}), "x"), None);
        assert_eq!(synth(json!({"$ref": "#/components/schemas/Pet"}), "x"), None);
    }
}
