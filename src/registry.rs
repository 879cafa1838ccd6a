//! Named schemas of one loaded contract.
//!
//! The registry owns every [`SchemaNode`] for a run plus the raw contract
//! document, which backs cross-document `$ref`s such as
//! `#/components/parameters/limit` or `#/paths/~1pets/get/...`.
//! It is built and normalized with `&mut` access at load time and shared
//! read-only afterwards. The only state mutated during generation is the
//! `additionalProperties` memo, which sits behind a mutex so one registry can
//! serve several generators.

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap, HashSet};

use parking_lot::Mutex;
use serde_json::Value;

use crate::loader::navigate_pointer;
use crate::types::{Discriminator, SchemaNode, SCHEMA_REF_PREFIXES};

/// Prefix reserved for schemas derived during normalization.
pub const DERIVED_PREFIX: &str = "~";

/// A parameter reached through a cross-document `$ref`.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub location: String,
    pub schema: Option<SchemaNode>,
}

/// Target of a JSON-pointer reference into the contract document.
#[derive(Debug, Clone, PartialEq)]
pub enum CrossRef {
    Schema(SchemaNode),
    Parameter(Parameter),
}

#[derive(Debug, Default)]
pub struct SchemaRegistry {
    schemas: BTreeMap<String, SchemaNode>,
    document: Value,
    discriminators: Vec<Discriminator>,
    additional_properties: Mutex<HashMap<String, Value>>,
}

impl SchemaRegistry {
    /// Empty registry backed by `document` for pointer lookups.
    pub fn with_document(document: Value) -> Self {
        Self {
            document,
            ..Self::default()
        }
    }

    /// Registry holding exactly `schemas`, with no backing document.
    pub fn from_schemas<I, S>(schemas: I) -> Self
    where
        I: IntoIterator<Item = (S, SchemaNode)>,
        S: Into<String>,
    {
        let mut registry = Self::default();
        for (name, node) in schemas {
            registry.insert(name, node);
        }
        registry
    }

    pub fn insert(&mut self, name: impl Into<String>, node: SchemaNode) {
        self.schemas.insert(name.into(), node);
    }

    /// Register a schema produced by normalization.
    ///
    /// Returns false and leaves the registry untouched if `name` is taken.
    pub fn register_derived(&mut self, name: impl Into<String>, node: SchemaNode) -> bool {
        let name = name.into();
        if self.schemas.contains_key(&name) {
            return false;
        }
        tracing::debug!(schema = %name, "registered derived schema");
        self.schemas.insert(name, node);
        true
    }

    pub fn get(&self, name: &str) -> Option<&SchemaNode> {
        self.schemas.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut SchemaNode> {
        self.schemas.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
    }

    /// All registered names, derived ones included.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(String::as_str)
    }

    /// Names declared by the contract itself.
    pub fn declared_names(&self) -> impl Iterator<Item = &str> {
        self.names().filter(|n| !n.starts_with(DERIVED_PREFIX))
    }

    pub fn document(&self) -> &Value {
        &self.document
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// Resolve a name or `$ref` to a concrete schema.
    ///
    /// Accepts bare names, component refs and document pointers. Chains of
    /// references are followed until a non-reference node is found; a chain
    /// that loops or dangles resolves to `None`.
    pub fn resolve(&self, reference: &str) -> Option<Cow<'_, SchemaNode>> {
        let mut visited = HashSet::new();
        visited.insert(reference.to_string());
        let mut current = self.lookup(reference)?;

        while let Some(next) = current.ref_name().map(str::to_string) {
            if !visited.insert(next.clone()) {
                tracing::debug!(reference, "reference chain loops");
                return None;
            }
            current = self.lookup(&next)?;
        }
        Some(current)
    }

    /// Whether `reference` names a schema this registry can resolve.
    pub fn is_resolvable(&self, reference: &str) -> bool {
        self.resolve(reference).is_some()
    }

    /// Follow a JSON pointer into the contract document.
    ///
    /// Objects carrying both `in` and `name` are parameters; anything else
    /// is parsed as a schema.
    pub fn resolve_cross_document_ref(&self, reference: &str) -> Option<CrossRef> {
        if !reference.starts_with("#/") {
            return None;
        }
        let target = navigate_pointer(&self.document, reference).ok()?;

        let location = target.get("in").and_then(Value::as_str);
        let name = target.get("name").and_then(Value::as_str);
        if let (Some(location), Some(name)) = (location, name) {
            return Some(CrossRef::Parameter(Parameter {
                name: name.to_string(),
                location: location.to_string(),
                schema: target.get("schema").map(SchemaNode::from_json),
            }));
        }
        Some(CrossRef::Schema(SchemaNode::from_json(target)))
    }

    pub fn record_discriminator(&mut self, discriminator: Discriminator) {
        if !self.discriminators.contains(&discriminator) {
            self.discriminators.push(discriminator);
        }
    }

    pub fn discriminators(&self) -> &[Discriminator] {
        &self.discriminators
    }

    pub fn cached_additional_properties(&self, property: &str) -> Option<Value> {
        self.additional_properties.lock().get(property).cloned()
    }

    /// Store a generated sub-map, replacing any earlier one for `property`.
    pub fn store_additional_properties(&self, property: &str, value: Value) {
        self.additional_properties
            .lock()
            .insert(property.to_string(), value);
    }

    /// Memoized `additionalProperties` generation keyed by property name.
    ///
    /// The lock is released while `compute` runs, since computing one map
    /// usually recurses into others. Nested computations store first, so the
    /// outermost value is the one left in the cache.
    pub fn get_or_compute_additional_properties<F>(&self, property: &str, compute: F) -> Value
    where
        F: FnOnce() -> Value,
    {
        if let Some(hit) = self.cached_additional_properties(property) {
            return hit;
        }
        let value = compute();
        self.store_additional_properties(property, value.clone());
        value
    }

    // --- Internal implementation ---

    fn lookup(&self, reference: &str) -> Option<Cow<'_, SchemaNode>> {
        if let Some(name) = component_name(reference) {
            return self.schemas.get(&name).map(Cow::Borrowed);
        }
        if reference.starts_with("#/") {
            return match self.resolve_cross_document_ref(reference)? {
                CrossRef::Schema(node) => Some(Cow::Owned(node)),
                CrossRef::Parameter(p) => p.schema.map(Cow::Owned),
            };
        }
        self.schemas.get(reference).map(Cow::Borrowed)
    }
}

/// Component name for `#/components/schemas/X` or `#/definitions/X`.
///
/// Pointers that descend further into a component are not component names.
fn component_name(reference: &str) -> Option<String> {
    SCHEMA_REF_PREFIXES
        .iter()
        .find_map(|prefix| reference.strip_prefix(prefix))
        .filter(|rest| !rest.is_empty() && !rest.contains('/'))
        .map(|rest| rest.replace("~1", "/").replace("~0", "~"))
}
