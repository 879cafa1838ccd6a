//! Example generation: walks a schema through the registry and builds a JSON value.
//!
//! [`SchemaResolver`] is the entry point. One resolver holds the state of a
//! generation run: the random source, the set of schemas already generated
//! (whose declared examples are trusted from then on), the schemas recorded
//! per property path, and operator diagnostics.
//!
//! Recursion is bounded by the cycle guards in [`crate::cycle`]. A property
//! whose path repeats too often, or whose `$ref` recurs too often along the
//! path, is left out of the result.

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap, HashSet};

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::{Map, Value};

use crate::compose::{self, BranchKeys};
use crate::cycle::{path_exceeds_depth, ref_exceeds_depth, PATH_SEPARATOR};
use crate::format::FormatProvider;
use crate::registry::{CrossRef, SchemaRegistry};
use crate::serialize::{self, SerializeLimits, OVERFLOW_DIAGNOSTIC, SELF_REF_DEPTH_MULTIPLIER};
use crate::synth::{alphanumeric_from_name, ValueSynthesizer};
use crate::types::{simple_ref, Composition, CompositionKind, GenerateOptions, SchemaKind, SchemaNode};

/// Key of the single entry returned by [`SchemaResolver::generate`].
pub const EXAMPLE_KEY: &str = "example";

/// Property name used for generated `additionalProperties` entries.
pub const MAP_ENTRY_KEY: &str = "key";

/// Generates examples for the schemas of one registry.
pub struct SchemaResolver<'a> {
    registry: &'a SchemaRegistry,
    options: GenerateOptions,
    synth: ValueSynthesizer,
    limits: SerializeLimits,
    rng: StdRng,
    generated: HashSet<String>,
    request_data_types: BTreeMap<String, SchemaNode>,
    diagnostics: Vec<String>,
}

impl std::fmt::Debug for SchemaResolver<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaResolver")
            .field("options", &self.options)
            .field("generated", &self.generated)
            .field("diagnostics", &self.diagnostics)
            .finish_non_exhaustive()
    }
}

impl<'a> SchemaResolver<'a> {
    pub fn new(registry: &'a SchemaRegistry, options: GenerateOptions) -> Self {
        let rng = match options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            registry,
            synth: ValueSynthesizer::new(options.use_defaults),
            options,
            limits: SerializeLimits::default(),
            rng,
            generated: HashSet::new(),
            request_data_types: BTreeMap::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Replace the format provider used for string leaves.
    pub fn with_formats(mut self, formats: impl FormatProvider + 'static) -> Self {
        self.synth = ValueSynthesizer::new(self.options.use_defaults).with_formats(formats);
        self
    }

    /// Replace the bounds of the primary serializer.
    pub fn with_limits(mut self, limits: SerializeLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Generate a pretty-printed example for the schema `name`.
    ///
    /// Returns a map with the single key [`EXAMPLE_KEY`], or an empty map if
    /// `name` is not in the registry. Examples too large for the primary
    /// serializer are written depth-limited and a diagnostic is recorded.
    pub fn generate(&mut self, name: &str) -> BTreeMap<String, String> {
        let mut examples = BTreeMap::new();
        let Some(value) = self.generate_value(name) else {
            return examples;
        };

        let text = match serialize::to_pretty(&value, &self.limits) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(schema = name, error = %e, "falling back to depth-limited serialization");
                self.diagnostics.push(OVERFLOW_DIAGNOSTIC.to_string());
                serialize::to_pretty_depth_limited(
                    &value,
                    self.options.self_reference_depth * SELF_REF_DEPTH_MULTIPLIER,
                )
            }
        };
        examples.insert(EXAMPLE_KEY.to_string(), text);
        examples
    }

    /// Generate the example for `name` as a JSON value.
    ///
    /// Returns `None` only when `name` is unknown. A schema that yields
    /// nothing (an untyped schema without example) becomes `{}`.
    pub fn generate_value(&mut self, name: &str) -> Option<Value> {
        let registry = self.registry;
        let Some(node) = registry
            .get(name)
            .map(Cow::Borrowed)
            .or_else(|| registry.resolve(name))
        else {
            tracing::debug!(schema = name, "not in registry");
            return None;
        };

        tracing::debug!(schema = name, "generating example");
        let mut state = GenerationState::default();
        let value = self.resolve_named(name, Some(name), &node, &mut state);
        self.generated.insert(name.to_string());
        Some(value.unwrap_or_else(|| Value::Object(Map::new())))
    }

    /// Declared schema of every property visited, keyed by `#`-joined path.
    pub fn request_data_types(&self) -> &BTreeMap<String, SchemaNode> {
        &self.request_data_types
    }

    /// Operator-facing messages collected across `generate` calls.
    pub fn diagnostics(&self) -> &[String] {
        &self.diagnostics
    }

    pub fn options(&self) -> &GenerateOptions {
        &self.options
    }

    // --- Internal implementation ---

    /// Resolve `node` reached under the model name `name`.
    ///
    /// `key` is the registry name of `node` when known; it selects the
    /// precomputed composition views.
    fn resolve_named(
        &mut self,
        name: &str,
        key: Option<&str>,
        node: &SchemaNode,
        state: &mut GenerationState,
    ) -> Option<Value> {
        let registry = self.registry;
        let depth = self.options.self_reference_depth;

        let cyclic = state.refs_exceed(depth)
            || path_exceeds_depth(name, depth)
            || path_exceeds_depth(&state.path(), depth);
        if cyclic && !registry.is_resolvable(name) {
            tracing::trace!(name, path = %state.path(), "cycle limit reached");
            return None;
        }

        if let Some(example) = self.trusted_example(name, key, node) {
            return Some(example);
        }

        let (resolved, key) = match node.ref_name() {
            Some(reference) => match registry.resolve(reference) {
                Some(target) => (target, Some(simple_ref(reference))),
                None => {
                    tracing::debug!(reference, "unresolvable reference, omitting");
                    return None;
                }
            },
            None => (Cow::Borrowed(node), key),
        };

        if node.ref_name().is_some() {
            if let Some(example) = self.trusted_example(name, key, &resolved) {
                return Some(example);
            }
        }

        let resolved = match compose::discriminated_view(registry, key.unwrap_or(name), &resolved) {
            Some(view) => view,
            None => resolved,
        };

        self.resolve_shape(name, key, &resolved, state)
    }

    /// Declared example of `node`, if examples are trusted for this schema.
    fn trusted_example(&self, name: &str, key: Option<&str>, node: &SchemaNode) -> Option<Value> {
        let trusted = self.options.use_examples
            || self.generated.contains(name)
            || key.is_some_and(|k| self.generated.contains(k));
        if trusted {
            node.constraints.example.clone()
        } else {
            None
        }
    }

    fn resolve_shape(
        &mut self,
        name: &str,
        key: Option<&str>,
        node: &SchemaNode,
        state: &mut GenerationState,
    ) -> Option<Value> {
        match &node.kind {
            SchemaKind::Object(shape) if !shape.properties.is_empty() => {
                let map = self.resolve_properties(name, node, &shape.properties, state);
                Some(Value::Object(map))
            }
            SchemaKind::Composed(composition) => self.resolve_composed(name, key, node, composition, state),
            SchemaKind::Array(items) => self.resolve_array(name, node, items.as_deref(), state),
            SchemaKind::Map(values) => Some(self.resolve_map(name, values, state)),
            SchemaKind::Reference(reference) => {
                tracing::debug!(reference = reference.as_str(), "reference survived resolution");
                None
            }
            _ => {
                let path = state.property_path(name);
                self.synth.synthesize(node, &path, &mut self.rng)
            }
        }
    }

    fn resolve_properties(
        &mut self,
        name: &str,
        node: &SchemaNode,
        properties: &[crate::types::Property],
        state: &mut GenerationState,
    ) -> Map<String, Value> {
        let depth = self.options.self_reference_depth;
        let discriminator = node.discriminator.as_ref().map(|d| d.property_name.clone());
        let mut out = Map::new();

        for property in properties {
            state.push(&property.name);
            if let Some(reference) = item_or_self_ref(&property.schema) {
                state.record_ref(reference);
            }
            if state.refs_exceed(depth) || path_exceeds_depth(&state.path(), depth) {
                tracing::trace!(path = %state.path(), "omitting cyclic property");
                state.pop();
                continue;
            }
            self.request_data_types
                .insert(state.path(), property.schema.clone());

            let value = match &discriminator {
                Some(d) if d.eq_ignore_ascii_case(&property.name) => {
                    Some(Value::String(self.match_to_enum(name, &property.schema, d)))
                }
                _ => self.resolve_named(&property.name, None, &property.schema, state),
            };
            if let Some(value) = value {
                out.insert(property.name.clone(), value);
            }
            state.pop();
        }
        out
    }

    fn resolve_composed(
        &mut self,
        name: &str,
        key: Option<&str>,
        node: &SchemaNode,
        composition: &Composition,
        state: &mut GenerationState,
    ) -> Option<Value> {
        let registry = self.registry;
        let mut out = self.resolve_properties(name, node, &composition.shape.properties, state);

        if !composition.all_of.is_empty() {
            let merged = compose::merged_view(registry, key, composition);
            match self.resolve_shape(name, None, &merged, state) {
                Some(Value::Object(map)) => out.extend(map),
                Some(other) if out.is_empty() => return Some(other),
                _ => {}
            }
        }

        for (kind, branches) in [
            (CompositionKind::AnyOf, &composition.any_of),
            (CompositionKind::OneOf, &composition.one_of),
        ] {
            match self.resolve_branches(name, kind, branches, state) {
                Some(Value::Object(map)) => out.extend(map),
                Some(other) if out.is_empty() => return Some(other),
                _ => {}
            }
        }
        Some(Value::Object(out))
    }

    /// A lone live branch is generated in place; several are keyed by branch.
    fn resolve_branches(
        &mut self,
        name: &str,
        kind: CompositionKind,
        branches: &[SchemaNode],
        state: &mut GenerationState,
    ) -> Option<Value> {
        let live = compose::live_branches(branches);
        match live.as_slice() {
            [] => None,
            [branch] => {
                let branch_name = compose::branch_name(name, branch);
                self.resolve_named(&branch_name, None, branch, state)
            }
            _ => {
                let mut keys = BranchKeys::default();
                let mut out = Map::new();
                for branch in live {
                    let key = keys.key(name, kind, branch);
                    let branch_name = compose::branch_name(name, branch);
                    if let Some(value) = self.resolve_named(&branch_name, None, branch, state) {
                        out.insert(key, value);
                    }
                }
                Some(Value::Object(out))
            }
        }
    }

    fn resolve_array(
        &mut self,
        name: &str,
        node: &SchemaNode,
        items: Option<&SchemaNode>,
        state: &mut GenerationState,
    ) -> Option<Value> {
        let registry = self.registry;
        let Some(items) = items else {
            return Some(Value::Array(Vec::new()));
        };

        let mut item_schema = Cow::Borrowed(items);
        if let Some(reference) = items.ref_name() {
            state.record_ref(reference);
            if let Some(CrossRef::Parameter(parameter)) = registry.resolve_cross_document_ref(reference) {
                match parameter.schema {
                    Some(schema) if matches!(schema.kind, SchemaKind::Array(_)) => {
                        if state.parameter_entries(reference) >= self.options.self_reference_depth {
                            tracing::trace!(reference, path = %state.path(), "parameter array recurs past depth");
                            return Some(Value::Array(Vec::new()));
                        }
                        state.parameters.push(reference.to_string());
                        let value = self.resolve_shape(name, None, &schema, state);
                        state.parameters.pop();
                        return value;
                    }
                    Some(schema) => item_schema = Cow::Owned(schema),
                    None => {}
                }
            }
        }

        let len = self.array_length(node);
        let mut out = Vec::with_capacity(len);
        for _ in 0..len {
            let value = if item_schema.is_any() {
                let path = state.property_path(name);
                Some(Value::String(alphanumeric_from_name(&path, &mut self.rng)))
            } else {
                self.resolve_named(name, None, &item_schema, state)
            };
            if let Some(value) = value {
                out.push(value);
            }
        }
        Some(Value::Array(out))
    }

    /// `array_size` clamped to the declared item bounds.
    fn array_length(&self, node: &SchemaNode) -> usize {
        let min = node.constraints.min_items.unwrap_or(1);
        let max = node
            .constraints
            .max_items
            .filter(|max| *max != 0)
            .unwrap_or(min + 1)
            .max(min);
        self.options.array_size.clamp(min, max)
    }

    fn resolve_map(&mut self, name: &str, values: &SchemaNode, state: &mut GenerationState) -> Value {
        let registry = self.registry;
        let depth = self.options.self_reference_depth;

        if let Some(hit) = registry.cached_additional_properties(name) {
            return hit;
        }

        if values.ref_name().is_some() {
            let path = state.path();
            let count = state.map_counters.entry(path.clone()).or_default();
            *count += 1;
            if *count > depth {
                state.map_counters.remove(&path);
                return Value::Object(Map::new());
            }
        }

        registry.get_or_compute_additional_properties(name, || {
            let mut entry = Map::new();
            state.push(MAP_ENTRY_KEY);
            if let Some(reference) = values.ref_name() {
                state.record_ref(reference);
            }
            if !state.refs_exceed(depth) {
                if let Some(value) = self.resolve_named(MAP_ENTRY_KEY, None, values, state) {
                    entry.insert(MAP_ENTRY_KEY.to_string(), value);
                }
            }
            state.pop();
            Value::Object(entry)
        })
    }

    /// Discriminator value for a schema reached under `name`.
    ///
    /// Prefers an enum value contained in `name`, then a mapping key of a
    /// recorded discriminator on the same property. Only the mapping keys
    /// are matched ignoring case.
    fn match_to_enum(&self, name: &str, property: &SchemaNode, property_name: &str) -> String {
        let registry = self.registry;
        let lowered = name.to_lowercase();
        let resolved = property
            .ref_name()
            .and_then(|r| registry.resolve(r))
            .unwrap_or(Cow::Borrowed(property));

        let from_enum = resolved.constraints.enum_values.iter().find_map(|value| {
            let text = match value {
                Value::String(s) => s.clone(),
                Value::Null => return None,
                other => other.to_string(),
            };
            name.contains(text.as_str()).then_some(text)
        });
        if let Some(value) = from_enum {
            return value;
        }

        registry
            .discriminators()
            .iter()
            .filter(|d| d.property_name.eq_ignore_ascii_case(property_name) && d.has_mapping())
            .flat_map(|d| d.mapping.iter().map(|(key, _)| key))
            .find(|key| lowered.contains(&key.to_lowercase()))
            .cloned()
            .unwrap_or_default()
    }
}

/// The `$ref` of a property, or of its array items.
fn item_or_self_ref(node: &SchemaNode) -> Option<&str> {
    match &node.kind {
        SchemaKind::Reference(reference) => Some(reference),
        SchemaKind::Array(Some(items)) => items.ref_name(),
        _ => None,
    }
}

/// Traversal state of one top-level `generate` call.
#[derive(Debug, Default)]
pub struct GenerationState {
    segments: Vec<String>,
    ref_map: HashMap<String, String>,
    map_counters: HashMap<String, usize>,
    parameters: Vec<String>,
}

impl GenerationState {
    /// Current property path, segments joined by `#`.
    pub fn path(&self) -> String {
        self.segments.join(PATH_SEPARATOR.to_string().as_str())
    }

    /// The current path, or `name` at the top level.
    pub fn property_path(&self, name: &str) -> String {
        if self.segments.is_empty() {
            name.to_string()
        } else {
            self.path()
        }
    }

    pub fn push(&mut self, segment: &str) {
        self.segments.push(segment.to_string());
    }

    /// Leave the current property, forgetting the reference recorded at it.
    pub fn pop(&mut self) {
        self.ref_map.remove(&self.path());
        self.segments.pop();
    }

    /// Record the `$ref` reached at the current path.
    pub fn record_ref(&mut self, reference: &str) {
        self.ref_map.insert(self.path(), reference.to_string());
    }

    pub fn refs_exceed(&self, max_depth: usize) -> bool {
        ref_exceeds_depth(&self.path(), &self.ref_map, max_depth)
    }

    /// How often the array parameter `reference` is open on this descent.
    fn parameter_entries(&self, reference: &str) -> usize {
        self.parameters.iter().filter(|p| *p == reference).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn registry(schemas: Value) -> SchemaRegistry {
        let mut registry = SchemaRegistry::from_schemas(
            schemas
                .as_object()
                .unwrap()
                .iter()
                .map(|(k, v)| (k.clone(), SchemaNode::from_json(v))),
        );
        compose::normalize(&mut registry);
        registry
    }

    fn seeded(depth: usize) -> GenerateOptions {
        GenerateOptions::new().seed(7).self_reference_depth(depth)
    }

    // === Cycles ===

    #[test]
    fn self_reference_stops_at_depth() {
        let registry = registry(json!({
            "A": {"type": "object", "properties": {"self": {"$ref": "#/components/schemas/A"}}}
        }));
        let mut resolver = SchemaResolver::new(&registry, seeded(2));
        assert_eq!(
            resolver.generate_value("A").unwrap(),
            json!({"self": {"self": {}}})
        );
    }

    #[test]
    fn mutual_reference_terminates() {
        let registry = registry(json!({
            "A": {"type": "object", "properties": {"b": {"$ref": "#/components/schemas/B"}}},
            "B": {"type": "object", "properties": {"a": {"$ref": "#/components/schemas/A"}}}
        }));
        let mut resolver = SchemaResolver::new(&registry, seeded(2));
        let value = resolver.generate_value("A").unwrap();
        assert!(value.get("b").is_some());
    }

    #[test]
    fn self_referencing_array_terminates() {
        let registry = registry(json!({
            "Node": {"type": "object", "properties": {
                "name": {"type": "string"},
                "children": {"type": "array", "items": {"$ref": "#/components/schemas/Node"}}
            }}
        }));
        let mut resolver = SchemaResolver::new(&registry, seeded(2));
        let value = resolver.generate_value("Node").unwrap();
        let children = value["children"].as_array().unwrap();
        assert_eq!(children.len(), 2);
        let grandchildren = children[0]["children"].as_array().unwrap();
        assert!(grandchildren[0].get("children").is_none());
        assert!(grandchildren[0]["name"].is_string());
    }

    #[test]
    fn composed_self_reference_terminates() {
        let registry = registry(json!({
            "Node": {"oneOf": [{"type": "string"}, {"$ref": "#/components/schemas/Node"}]}
        }));
        let mut resolver = SchemaResolver::new(&registry, seeded(2));
        assert!(resolver.generate_value("Node").is_some());
    }

    // === Leaves and arrays ===

    #[test]
    fn unknown_schema_is_empty() {
        let registry = registry(json!({}));
        let mut resolver = SchemaResolver::new(&registry, seeded(3));
        assert!(resolver.generate("Missing").is_empty());
    }

    #[test]
    fn enum_wins() {
        let registry = registry(json!({
            "E": {"type": "object", "properties": {"kind": {"type": "string", "enum": ["b", "c"]}}}
        }));
        let mut resolver = SchemaResolver::new(&registry, seeded(3));
        assert_eq!(resolver.generate_value("E").unwrap(), json!({"kind": "b"}));
    }

    #[test]
    fn array_length_follows_min_items() {
        let registry = registry(json!({
            "L": {"type": "array", "minItems": 5, "maxItems": 10, "items": {"type": "integer"}}
        }));
        let mut resolver = SchemaResolver::new(&registry, seeded(3).array_size(2));
        let value = resolver.generate_value("L").unwrap();
        assert_eq!(value.as_array().unwrap().len(), 5);
    }

    #[test]
    fn array_without_items_is_empty() {
        let registry = registry(json!({"L": {"type": "array"}}));
        let mut resolver = SchemaResolver::new(&registry, seeded(3));
        assert_eq!(resolver.generate_value("L").unwrap(), json!([]));
    }

    #[test]
    fn untyped_items_use_name() {
        let registry = registry(json!({
            "T": {"type": "object", "properties": {"tags": {"type": "array", "items": {}}}}
        }));
        let mut resolver = SchemaResolver::new(&registry, seeded(3));
        let value = resolver.generate_value("T").unwrap();
        for tag in value["tags"].as_array().unwrap() {
            assert!(tag.as_str().unwrap().starts_with("tags"));
        }
    }

    #[test]
    fn unresolvable_ref_is_omitted() {
        let registry = registry(json!({
            "A": {"type": "object", "properties": {
                "ok": {"type": "boolean"},
                "gone": {"$ref": "#/components/schemas/Nope"}
            }}
        }));
        let mut resolver = SchemaResolver::new(&registry, seeded(3));
        assert_eq!(resolver.generate_value("A").unwrap(), json!({"ok": true}));
    }

    // === Parameter items ===

    fn with_parameter(parameter_schema: Value) -> SchemaRegistry {
        crate::loader::build_registry(json!({
            "openapi": "3.0.3",
            "components": {
                "schemas": {
                    "S": {"type": "object", "properties": {
                        "xs": {"type": "array", "items": {"$ref": "#/components/parameters/p"}}
                    }}
                },
                "parameters": {
                    "p": {"in": "query", "name": "p", "schema": parameter_schema}
                }
            }
        }))
        .unwrap()
    }

    #[test]
    fn scalar_parameter_schema_fills_items() {
        let registry = with_parameter(json!({"type": "integer", "minimum": 4, "maximum": 4}));
        let mut resolver = SchemaResolver::new(&registry, seeded(3));
        assert_eq!(resolver.generate_value("S").unwrap(), json!({"xs": [4, 4]}));
    }

    #[test]
    fn array_parameter_schema_replaces_array() {
        let registry = with_parameter(json!({
            "type": "array", "minItems": 3, "maxItems": 3, "items": {"type": "boolean"}
        }));
        let mut resolver = SchemaResolver::new(&registry, seeded(3));
        assert_eq!(
            resolver.generate_value("S").unwrap(),
            json!({"xs": [true, true, true]})
        );
    }

    #[test]
    fn self_referencing_parameter_array_terminates() {
        let registry = with_parameter(json!({
            "type": "array", "items": {"$ref": "#/components/parameters/p"}
        }));
        for depth in 1..=3 {
            let mut resolver = SchemaResolver::new(&registry, seeded(depth));
            assert_eq!(resolver.generate_value("S").unwrap(), json!({"xs": []}));
        }
    }

    // === Composition ===

    #[test]
    fn all_of_merges_properties() {
        let registry = registry(json!({
            "A": {"type": "object", "properties": {"a": {"type": "integer"}}},
            "C": {"allOf": [
                {"$ref": "#/components/schemas/A"},
                {"type": "object", "properties": {"b": {"type": "boolean"}}}
            ]}
        }));
        let mut resolver = SchemaResolver::new(&registry, seeded(3));
        let value = resolver.generate_value("C").unwrap();
        assert!(value["a"].is_i64());
        assert_eq!(value["b"], json!(true));
    }

    #[test]
    fn one_of_branches_are_keyed() {
        let registry = registry(json!({
            "V": {"oneOf": [{"type": "string", "enum": ["x"]}, {"type": "integer", "minimum": 1, "maximum": 1}]}
        }));
        let mut resolver = SchemaResolver::new(&registry, seeded(3));
        assert_eq!(
            resolver.generate_value("V").unwrap(),
            json!({"V_ONE_OF_string": "x", "V_ONE_OF_integer": 1})
        );
    }

    #[test]
    fn single_live_branch_is_inlined() {
        let registry = registry(json!({
            "V": {"anyOf": [{"type": "string", "enum": ["only"]}, {}]}
        }));
        let mut resolver = SchemaResolver::new(&registry, seeded(3));
        assert_eq!(resolver.generate_value("V").unwrap(), json!("only"));
    }

    #[test]
    fn discriminator_value_matches_subtype() {
        let registry = registry(json!({
            "Pet": {
                "type": "object",
                "discriminator": {"propertyName": "petType", "mapping": {
                    "dog": "#/components/schemas/Dog",
                    "cat": "#/components/schemas/Cat"
                }},
                "properties": {"petType": {"type": "string"}, "name": {"type": "string"}},
                "required": ["petType"]
            },
            "Dog": {"allOf": [
                {"$ref": "#/components/schemas/Pet"},
                {"type": "object", "properties": {"bark": {"type": "boolean"}}}
            ]},
            "Cat": {"allOf": [
                {"$ref": "#/components/schemas/Pet"},
                {"type": "object", "properties": {"meow": {"type": "boolean"}}}
            ]}
        }));
        let mut resolver = SchemaResolver::new(&registry, seeded(3));
        let dog = resolver.generate_value("Dog").unwrap();
        assert_eq!(dog["petType"], json!("dog"));
        assert_eq!(dog["bark"], json!(true));

        let pet = resolver.generate_value("Pet").unwrap();
        assert_eq!(pet["Pet_ONE_OF_Cat"]["petType"], json!("cat"));
        assert_eq!(pet["Pet_ONE_OF_Dog"]["petType"], json!("dog"));
    }

    #[test]
    fn discriminator_enum_match_is_case_sensitive() {
        let registry = registry(json!({
            "Category": {
                "type": "object",
                "discriminator": {"propertyName": "kind"},
                "properties": {"kind": {"type": "string", "enum": ["cat", "Category"]}}
            }
        }));
        let mut resolver = SchemaResolver::new(&registry, seeded(3));
        assert_eq!(
            resolver.generate_value("Category").unwrap(),
            json!({"kind": "Category"})
        );
    }

    // === Examples ===

    #[test]
    fn examples_used_when_asked() {
        let registry = registry(json!({
            "S": {"type": "object", "example": {"given": 1}, "properties": {"x": {"type": "string"}}}
        }));
        let mut resolver = SchemaResolver::new(&registry, seeded(3).use_examples(true));
        assert_eq!(resolver.generate_value("S").unwrap(), json!({"given": 1}));
    }

    #[test]
    fn examples_trusted_after_first_generation() {
        let registry = registry(json!({
            "S": {"type": "object", "example": {"given": 1}, "properties": {"x": {"type": "boolean"}}}
        }));
        let mut resolver = SchemaResolver::new(&registry, seeded(3));
        assert_eq!(resolver.generate_value("S").unwrap(), json!({"x": true}));
        assert_eq!(resolver.generate_value("S").unwrap(), json!({"given": 1}));
    }

    // === Maps ===

    #[test]
    fn additional_properties_reused_per_property_name() {
        let registry = registry(json!({
            "Root": {"type": "object", "properties": {
                "first": {"$ref": "#/components/schemas/Holder"},
                "second": {"$ref": "#/components/schemas/Holder"}
            }},
            "Holder": {"type": "object", "properties": {
                "labels": {"type": "object", "additionalProperties": {"type": "string"}}
            }}
        }));
        let mut resolver = SchemaResolver::new(&registry, seeded(3));
        let value = resolver.generate_value("Root").unwrap();
        assert!(value["first"]["labels"]["key"].is_string());
        assert_eq!(value["first"]["labels"], value["second"]["labels"]);
    }

    // === Bookkeeping ===

    #[test]
    fn request_data_types_recorded_by_path() {
        let registry = registry(json!({
            "O": {"type": "object", "properties": {
                "inner": {"type": "object", "properties": {"n": {"type": "integer"}}}
            }}
        }));
        let mut resolver = SchemaResolver::new(&registry, seeded(3));
        resolver.generate_value("O");
        let types = resolver.request_data_types();
        assert!(types.contains_key("inner"));
        assert_eq!(types["inner#n"].kind, SchemaKind::Integer);
    }

    #[test]
    fn serializer_overflow_records_one_diagnostic() {
        let registry = registry(json!({
            "D": {"type": "object", "properties": {
                "a": {"type": "object", "properties": {
                    "b": {"type": "object", "properties": {"c": {"type": "boolean"}}}
                }}
            }}
        }));
        let limits = SerializeLimits {
            max_depth: 2,
            ..SerializeLimits::default()
        };
        let mut resolver = SchemaResolver::new(&registry, seeded(3)).with_limits(limits);
        let examples = resolver.generate("D");
        assert_eq!(resolver.diagnostics().len(), 1);
        let parsed: Value = serde_json::from_str(&examples[EXAMPLE_KEY]).unwrap();
        assert_eq!(parsed, json!({"a": {"b": {"c": true}}}));
    }

    #[test]
    fn state_pop_forgets_ref() {
        let mut state = GenerationState::default();
        state.push("a");
        state.record_ref("#/components/schemas/A");
        assert_eq!(state.path(), "a");
        state.push("b");
        assert_eq!(state.path(), "a#b");
        state.pop();
        state.pop();
        assert!(state.ref_map.is_empty());
        assert_eq!(state.property_path("top"), "top");
    }
}
