//! Composition normalization: discriminators, `allOf` merging and branch naming.
//!
//! Polymorphic contracts usually look like this:
//!
//! ```json
//! {
//!   "Pet": {
//!     "type": "object",
//!     "discriminator": {"propertyName": "petType", "mapping": {"dog": "#/components/schemas/Dog"}},
//!     "properties": {"petType": {"type": "string"}}
//!   },
//!   "Dog": {"allOf": [{"$ref": "#/components/schemas/Pet"}, {"properties": {"bark": {"type": "boolean"}}}]}
//! }
//! ```
//!
//! Generating `Pet` should produce one of its concrete subtypes, while
//! generating `Dog` must not wander back into `Pet`'s mapping. [`normalize`]
//! rewrites the registry once, before any generation:
//!
//! - `~oneOf.Pet`: a `oneOf` over the mapping targets, carrying the discriminator.
//! - `~base.Pet`: `Pet` with the discriminator property restricted to the
//!   mapping keys and the mapping dropped. Subtypes' `allOf` now point here.
//! - `~allOf.Dog`: the union of `Dog`'s `allOf` branches.
//!
//! Derived names all start with [`DERIVED_PREFIX`], which contracts cannot use.

use std::borrow::Cow;
use std::collections::{HashMap, HashSet};

use serde_json::Value;

use crate::registry::{SchemaRegistry, DERIVED_PREFIX};
use crate::types::{
    simple_ref, Composition, CompositionKind, Discriminator, ObjectShape, SchemaKind, SchemaNode,
};

/// Registry name of the `oneOf` view of a discriminated schema.
pub fn one_of_name(name: &str) -> String {
    format!("{DERIVED_PREFIX}oneOf.{name}")
}

/// Registry name of a discriminated schema with its mapping removed.
pub fn base_name(name: &str) -> String {
    format!("{DERIVED_PREFIX}base.{name}")
}

/// Registry name of the merged `allOf` view of a schema.
pub fn all_of_name(name: &str) -> String {
    format!("{DERIVED_PREFIX}allOf.{name}")
}

/// Rewrite the registry so generation only reads from it.
pub fn normalize(registry: &mut SchemaRegistry) {
    let declared: Vec<String> = registry.declared_names().map(String::from).collect();

    for name in &declared {
        let Some(node) = registry.get(name).cloned() else {
            continue;
        };
        if node.has_discriminator_mapping()
            && !node.is_composed()
            && !any_composed_in_chain(registry, name)
        {
            normalize_discriminator_mapping(registry, name, &node);
        }
    }

    let all: Vec<String> = registry.names().map(String::from).collect();
    for name in &all {
        propagate_discriminator(registry, name);
    }

    for name in &all {
        let Some(SchemaKind::Composed(composition)) = registry.get(name).map(|n| n.kind.clone())
        else {
            continue;
        };
        if composition.all_of.is_empty() {
            continue;
        }
        let merged = merge_all_of(registry, &composition.all_of);
        registry.register_derived(all_of_name(name), merged);
    }

    tracing::debug!(schemas = registry.len(), "normalized contract");
}

/// Turn a discriminated, non-composed schema into a `oneOf` over its mapping.
///
/// Registers `~oneOf.<name>` and `~base.<name>`, points the mapping targets'
/// `allOf` references at the base copy and records the discriminator.
pub fn normalize_discriminator_mapping(registry: &mut SchemaRegistry, name: &str, node: &SchemaNode) {
    let Some(discriminator) = node.discriminator.clone().filter(Discriminator::has_mapping) else {
        return;
    };

    registry.register_derived(one_of_name(name), one_of_view(name, &discriminator));

    let keys: Vec<Value> = discriminator
        .mapping
        .iter()
        .map(|(key, _)| Value::String(key.clone()))
        .collect();
    if let Some(original) = registry.get_mut(name) {
        restrict_property(original, &discriminator.property_name, &keys);
    }
    let mut base = node.clone();
    restrict_property(&mut base, &discriminator.property_name, &keys);
    base.discriminator = Some(Discriminator::property_only(&discriminator.property_name));
    let base_ref = base_name(name);
    registry.register_derived(base_ref.clone(), base);

    for (_, target) in &discriminator.mapping {
        let target = simple_ref(target);
        let Some(SchemaKind::Composed(composition)) = registry.get_mut(target).map(|n| &mut n.kind)
        else {
            continue;
        };
        for branch in &mut composition.all_of {
            if branch.ref_name().is_some_and(|r| simple_ref(r) == name) {
                branch.kind = SchemaKind::Reference(base_ref.clone());
            }
        }
    }

    tracing::debug!(schema = name, targets = discriminator.mapping.len(), "expanded discriminator mapping");
    registry.record_discriminator(discriminator);
}

/// Merge `allOf` branches into one schema.
///
/// Properties are unioned in branch order (first declaration wins) and
/// required lists are concatenated. Nested `anyOf`/`oneOf` branches survive,
/// making the result composed; otherwise it is a plain object. The first
/// discriminator found is carried over.
pub fn merge_all_of(registry: &SchemaRegistry, branches: &[SchemaNode]) -> SchemaNode {
    let mut merged = Merged::default();
    let mut visited = HashSet::new();
    for branch in branches {
        merged.absorb(registry, branch, &mut visited);
    }
    merged.into_node()
}

/// Give every `anyOf`/`oneOf` branch of a discriminated composed schema its
/// own property-only discriminator, unless it declares one.
pub fn propagate_discriminator(registry: &mut SchemaRegistry, name: &str) {
    let Some(node) = registry.get(name) else {
        return;
    };
    let (SchemaKind::Composed(composition), Some(discriminator)) = (&node.kind, &node.discriminator)
    else {
        return;
    };
    let discriminator = discriminator.clone();
    let targets: Vec<String> = composition
        .any_of
        .iter()
        .chain(&composition.one_of)
        .filter_map(|b| b.ref_name().map(|r| simple_ref(r).to_string()))
        .collect();

    for target in targets {
        if let Some(branch) = registry.get_mut(&target) {
            branch
                .discriminator
                .get_or_insert_with(|| Discriminator::property_only(&discriminator.property_name));
        }
    }
    if let Some(SchemaKind::Composed(composition)) = registry.get_mut(name).map(|n| &mut n.kind) {
        for branch in composition.any_of.iter_mut().chain(composition.one_of.iter_mut()) {
            if branch.ref_name().is_none() {
                branch
                    .discriminator
                    .get_or_insert_with(|| Discriminator::property_only(&discriminator.property_name));
            }
        }
    }
    registry.record_discriminator(discriminator);
}

/// True if any `_`-separated part of `chain` names a composed schema.
pub fn any_composed_in_chain(registry: &SchemaRegistry, chain: &str) -> bool {
    chain
        .split('_')
        .filter(|part| !part.is_empty())
        .any(|part| registry.resolve(part).is_some_and(|n| n.is_composed()))
}

/// The `oneOf` view of `node` if it is an uncomposed discriminated schema.
///
/// `name` is the schema's registry name when known, and the chain used for
/// the composed-ancestor check.
pub fn discriminated_view<'r>(
    registry: &'r SchemaRegistry,
    name: &str,
    node: &SchemaNode,
) -> Option<Cow<'r, SchemaNode>> {
    if !node.has_discriminator_mapping() || node.is_composed() || any_composed_in_chain(registry, name) {
        return None;
    }
    if let Some(view) = registry.get(&one_of_name(name)) {
        return Some(Cow::Borrowed(view));
    }
    node.discriminator
        .as_ref()
        .map(|d| Cow::Owned(one_of_view(name, d)))
}

/// The merged `allOf` view of a composed schema.
pub fn merged_view<'r>(
    registry: &'r SchemaRegistry,
    name: Option<&str>,
    composition: &Composition,
) -> Cow<'r, SchemaNode> {
    match name.and_then(|n| registry.get(&all_of_name(n))) {
        Some(view) => Cow::Borrowed(view),
        None => Cow::Owned(merge_all_of(registry, &composition.all_of)),
    }
}

/// Branches worth generating: drops untyped, unreferenced placeholders.
pub fn live_branches(branches: &[SchemaNode]) -> Vec<&SchemaNode> {
    branches.iter().filter(|b| !b.is_any()).collect()
}

/// Assigns result keys to the branches of one composition.
///
/// Referenced branches are keyed by their simple name; inline branches by
/// type, with a counter appended on repeats.
#[derive(Debug, Default)]
pub struct BranchKeys {
    seen: HashMap<&'static str, usize>,
}

impl BranchKeys {
    pub fn key(&mut self, accumulated: &str, kind: CompositionKind, branch: &SchemaNode) -> String {
        let label = match branch.ref_name() {
            Some(reference) => simple_ref(reference).to_string(),
            None => {
                let type_name = branch.type_name();
                let n = self.seen.entry(type_name).or_default();
                *n += 1;
                if *n == 1 {
                    type_name.to_string()
                } else {
                    format!("{type_name}{n}")
                }
            }
        };
        format!("{accumulated}_{}_{label}", kind.label())
    }
}

/// Name a branch is generated under: `<parent>_<ref>` or the parent's own.
pub fn branch_name(parent: &str, branch: &SchemaNode) -> String {
    match branch.ref_name() {
        Some(reference) => format!("{parent}_{}", simple_ref(reference)),
        None => parent.to_string(),
    }
}

// --- Internal implementation ---

fn one_of_view(name: &str, discriminator: &Discriminator) -> SchemaNode {
    let one_of = discriminator
        .mapping
        .iter()
        .filter(|(_, target)| !simple_ref(target).eq_ignore_ascii_case(name))
        .map(|(_, target)| SchemaNode::reference(target.clone()))
        .collect();
    SchemaNode {
        kind: SchemaKind::Composed(Composition {
            one_of,
            ..Composition::default()
        }),
        constraints: Default::default(),
        discriminator: Some(discriminator.clone()),
    }
}

fn restrict_property(node: &mut SchemaNode, property: &str, values: &[Value]) {
    if let Some(props) = node.properties_mut() {
        if let Some(p) = props.iter_mut().find(|p| p.name == property) {
            p.schema.constraints.enum_values = values.to_vec();
        }
    }
}

#[derive(Default)]
struct Merged {
    shape: ObjectShape,
    any_of: Vec<SchemaNode>,
    one_of: Vec<SchemaNode>,
    discriminator: Option<Discriminator>,
}

impl Merged {
    fn absorb(&mut self, registry: &SchemaRegistry, branch: &SchemaNode, visited: &mut HashSet<String>) {
        let resolved = match branch.ref_name() {
            Some(reference) => {
                if !visited.insert(reference.to_string()) {
                    return;
                }
                match registry.resolve(reference) {
                    Some(node) => node,
                    None => return,
                }
            }
            None => Cow::Borrowed(branch),
        };

        if self.discriminator.is_none() {
            self.discriminator = resolved.discriminator.clone();
        }
        match &resolved.kind {
            SchemaKind::Object(shape) => self.add_shape(shape),
            SchemaKind::Composed(composition) => {
                self.add_shape(&composition.shape);
                for nested in &composition.all_of {
                    self.absorb(registry, nested, visited);
                }
                self.any_of.extend(composition.any_of.iter().cloned());
                self.one_of.extend(composition.one_of.iter().cloned());
            }
            _ => {}
        }
    }

    fn add_shape(&mut self, shape: &ObjectShape) {
        for property in &shape.properties {
            if !self.shape.properties.iter().any(|p| p.name == property.name) {
                self.shape.properties.push(property.clone());
            }
        }
        for required in &shape.required {
            if !self.shape.required.contains(required) {
                self.shape.required.push(required.clone());
            }
        }
    }

    fn into_node(self) -> SchemaNode {
        let kind = if self.any_of.is_empty() && self.one_of.is_empty() {
            SchemaKind::Object(self.shape)
        } else {
            SchemaKind::Composed(Composition {
                all_of: Vec::new(),
                any_of: self.any_of,
                one_of: self.one_of,
                shape: self.shape,
            })
        };
        SchemaNode {
            kind,
            constraints: Default::default(),
            discriminator: self.discriminator,
        }
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
        normalize(&mut registry);
        registry
    }

    fn pets() -> SchemaRegistry {
        registry(json!({
            "Pet": {
                "type": "object",
                "discriminator": {
                    "propertyName": "petType",
                    "mapping": {"dog": "#/components/schemas/Dog", "cat": "#/components/schemas/Cat"}
                },
                "properties": {"petType": {"type": "string"}, "name": {"type": "string"}}
            },
            "Dog": {"allOf": [
                {"$ref": "#/components/schemas/Pet"},
                {"type": "object", "properties": {"bark": {"type": "boolean"}}}
            ]},
            "Cat": {"allOf": [
                {"$ref": "#/components/schemas/Pet"},
                {"type": "object", "properties": {"lives": {"type": "integer"}}}
            ]}
        }))
    }

    // === Discriminator Mapping Tests ===

    #[test]
    fn mapping_becomes_one_of() {
        let registry = pets();
        let view = registry.get(&one_of_name("Pet")).unwrap();
        let SchemaKind::Composed(c) = &view.kind else {
            panic!("expected composed view");
        };
        let refs: Vec<_> = c.one_of.iter().filter_map(|b| b.ref_name()).collect();
        assert_eq!(refs, ["#/components/schemas/Dog", "#/components/schemas/Cat"]);
        assert!(view.has_discriminator_mapping());
    }

    #[test]
    fn base_copy_restricts_discriminator_values() {
        let registry = pets();
        let base = registry.get(&base_name("Pet")).unwrap();
        assert!(!base.has_discriminator_mapping());
        assert_eq!(
            base.property("petType").unwrap().constraints.enum_values,
            vec![json!("dog"), json!("cat")]
        );
    }

    #[test]
    fn subtypes_point_at_base_copy() {
        let registry = pets();
        let SchemaKind::Composed(dog) = &registry.get("Dog").unwrap().kind else {
            panic!("Dog should stay composed");
        };
        assert_eq!(dog.all_of[0].ref_name(), Some("~base.Pet"));
    }

    #[test]
    fn self_target_is_excluded() {
        let registry = registry(json!({
            "Animal": {
                "type": "object",
                "discriminator": {"propertyName": "kind", "mapping": {"animal": "Animal", "bird": "Bird"}},
                "properties": {"kind": {"type": "string"}}
            },
            "Bird": {"type": "object", "properties": {"wings": {"type": "integer"}}}
        }));
        let SchemaKind::Composed(c) = &registry.get(&one_of_name("Animal")).unwrap().kind else {
            panic!("expected composed view");
        };
        assert_eq!(c.one_of.len(), 1);
        assert_eq!(c.one_of[0].ref_name(), Some("Bird"));
    }

    #[test]
    fn discriminator_is_recorded() {
        let registry = pets();
        assert!(registry
            .discriminators()
            .iter()
            .any(|d| d.property_name == "petType" && d.has_mapping()));
    }

    // === allOf Merge Tests ===

    #[test]
    fn all_of_unions_properties_and_required() {
        let registry = registry(json!({
            "A": {"type": "object", "required": ["a"], "properties": {"a": {"type": "string"}}},
            "AB": {"allOf": [
                {"$ref": "#/components/schemas/A"},
                {"type": "object", "required": ["b"], "properties": {"b": {"type": "number"}}}
            ]}
        }));
        let merged = registry.get(&all_of_name("AB")).unwrap();
        let names: Vec<_> = merged.properties().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["a", "b"]);
        let SchemaKind::Object(shape) = &merged.kind else {
            panic!("merge without nested branches is an object");
        };
        assert_eq!(shape.required, ["a", "b"]);
    }

    #[test]
    fn merged_subtype_carries_base_discriminator() {
        let registry = pets();
        let merged = registry.get(&all_of_name("Dog")).unwrap();
        let names: Vec<_> = merged.properties().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["petType", "name", "bark"]);
        assert_eq!(merged.discriminator.as_ref().unwrap().property_name, "petType");
    }

    #[test]
    fn nested_one_of_keeps_merge_composed() {
        let registry = registry(json!({
            "X": {"allOf": [
                {"type": "object", "properties": {"id": {"type": "string"}}},
                {"oneOf": [{"type": "string"}, {"type": "integer"}]}
            ]}
        }));
        let merged = registry.get(&all_of_name("X")).unwrap();
        assert!(merged.is_composed());
        assert_eq!(merged.properties().len(), 1);
    }

    #[test]
    fn self_referencing_all_of_terminates() {
        let registry = registry(json!({
            "Loop": {"allOf": [{"$ref": "#/components/schemas/Loop"}, {"properties": {"v": {"type": "string"}}}]}
        }));
        assert!(registry.get(&all_of_name("Loop")).is_some());
    }

    // === Propagation and Branch Tests ===

    #[test]
    fn branches_receive_property_only_discriminator() {
        let registry = registry(json!({
            "Shape": {
                "oneOf": [{"$ref": "#/components/schemas/Square"}, {"type": "object"}],
                "discriminator": {"propertyName": "shapeType"}
            },
            "Square": {"type": "object", "properties": {"side": {"type": "number"}}}
        }));
        let square = registry.get("Square").unwrap();
        assert_eq!(square.discriminator.as_ref().unwrap().property_name, "shapeType");
        let SchemaKind::Composed(c) = &registry.get("Shape").unwrap().kind else {
            panic!("expected composed");
        };
        assert!(c.one_of[1].discriminator.is_some());
    }

    #[test]
    fn composed_chain_blocks_view() {
        let registry = pets();
        let pet = registry.get("Pet").unwrap();
        assert!(discriminated_view(&registry, "Pet", pet).is_some());
        assert!(discriminated_view(&registry, "Pet_Dog", pet).is_none());
    }

    #[test]
    fn placeholder_branches_are_dropped() {
        let branches = vec![
            SchemaNode::from_json(&json!({"description": "nothing"})),
            SchemaNode::from_json(&json!({"$ref": "#/components/schemas/A"})),
            SchemaNode::from_json(&json!({"type": "string"})),
        ];
        assert_eq!(live_branches(&branches).len(), 2);
    }

    #[test]
    fn branch_keys_and_names() {
        let mut keys = BranchKeys::default();
        let by_ref = SchemaNode::reference("#/components/schemas/Dog");
        let inline = SchemaNode::from_json(&json!({"type": "string"}));
        assert_eq!(keys.key("Pet", CompositionKind::OneOf, &by_ref), "Pet_ONE_OF_Dog");
        assert_eq!(keys.key("Pet", CompositionKind::AnyOf, &inline), "Pet_ANY_OF_string");
        assert_eq!(keys.key("Pet", CompositionKind::AnyOf, &inline), "Pet_ANY_OF_string2");
        assert_eq!(branch_name("Pet", &by_ref), "Pet_Dog");
        assert_eq!(branch_name("Pet", &inline), "Pet");
    }
}
