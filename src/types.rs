//! Core types: the schema graph model and generation options.
//!
//! A contract's JSON schemas are parsed once into [`SchemaNode`] trees. The
//! variant of each node is decided at parse time so the generator dispatches
//! on [`SchemaKind`] instead of re-inspecting raw JSON on every visit.

use serde_json::{Map, Value};

/// Pointer prefixes that name a component schema directly.
pub const SCHEMA_REF_PREFIXES: &[&str] = &["#/components/schemas/", "#/definitions/"];

/// Default number of times one schema may recur along a single property path.
pub const DEFAULT_SELF_REFERENCE_DEPTH: usize = 3;

/// Default array length before `minItems`/`maxItems` clamping.
pub const DEFAULT_ARRAY_SIZE: usize = 2;

/// Last segment of a `$ref`, e.g. `#/components/schemas/Pet` -> `Pet`.
pub fn simple_ref(reference: &str) -> &str {
    reference.rsplit('/').next().unwrap_or(reference)
}

/// A parsed schema: its shape plus the constraints that apply to it.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaNode {
    pub kind: SchemaKind,
    pub constraints: Constraints,
    pub discriminator: Option<Discriminator>,
}

/// The closed set of schema shapes the generator understands.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaKind {
    String,
    Number,
    Integer,
    Boolean,
    /// Array with an optional item schema.
    Array(Option<Box<SchemaNode>>),
    /// Object with named properties. An empty shape is a free-form object.
    Object(ObjectShape),
    /// Object whose values are all described by one `additionalProperties` schema.
    Map(Box<SchemaNode>),
    Composed(Composition),
    /// A `$ref`, resolved through the registry.
    Reference(String),
    /// No type, no reference, no properties, no composition.
    Any,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectShape {
    pub properties: Vec<Property>,
    pub required: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub name: String,
    pub schema: SchemaNode,
}

/// `allOf` / `anyOf` / `oneOf` branches plus any properties declared alongside them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Composition {
    pub all_of: Vec<SchemaNode>,
    pub any_of: Vec<SchemaNode>,
    pub one_of: Vec<SchemaNode>,
    pub shape: ObjectShape,
}

/// The three composition keywords, used to label generated branch keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompositionKind {
    AllOf,
    AnyOf,
    OneOf,
}

impl CompositionKind {
    pub fn label(&self) -> &'static str {
        match self {
            CompositionKind::AllOf => "ALL_OF",
            CompositionKind::AnyOf => "ANY_OF",
            CompositionKind::OneOf => "ONE_OF",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Constraints {
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub pattern: Option<String>,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub format: Option<String>,
    pub enum_values: Vec<Value>,
    pub default: Option<Value>,
    pub example: Option<Value>,
    pub min_items: Option<usize>,
    pub max_items: Option<usize>,
}

/// A discriminator: the property naming the concrete type, plus an ordered
/// value -> schema reference mapping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Discriminator {
    pub property_name: String,
    pub mapping: Vec<(String, String)>,
}

impl Discriminator {
    /// Discriminator carrying only the property name.
    pub fn property_only(property_name: impl Into<String>) -> Self {
        Self {
            property_name: property_name.into(),
            mapping: Vec::new(),
        }
    }

    pub fn has_mapping(&self) -> bool {
        !self.mapping.is_empty()
    }
}

impl SchemaNode {
    pub fn new(kind: SchemaKind) -> Self {
        Self {
            kind,
            constraints: Constraints::default(),
            discriminator: None,
        }
    }

    /// A bare reference node.
    pub fn reference(reference: impl Into<String>) -> Self {
        Self::new(SchemaKind::Reference(reference.into()))
    }

    /// Parse a JSON schema value.
    ///
    /// Parsing is total: anything unrecognised becomes [`SchemaKind::Any`].
    pub fn from_json(value: &Value) -> Self {
        let Some(obj) = value.as_object() else {
            return Self::new(SchemaKind::Any);
        };

        Self {
            kind: parse_kind(obj),
            constraints: parse_constraints(obj),
            discriminator: obj.get("discriminator").and_then(parse_discriminator),
        }
    }

    pub fn is_composed(&self) -> bool {
        matches!(self.kind, SchemaKind::Composed(_))
    }

    /// True for the placeholder schema with neither a type nor a reference.
    pub fn is_any(&self) -> bool {
        matches!(self.kind, SchemaKind::Any)
    }

    pub fn ref_name(&self) -> Option<&str> {
        match &self.kind {
            SchemaKind::Reference(r) => Some(r),
            _ => None,
        }
    }

    /// Declared properties, for objects and for composed schemas with their own.
    pub fn properties(&self) -> &[Property] {
        match &self.kind {
            SchemaKind::Object(shape) => &shape.properties,
            SchemaKind::Composed(c) => &c.shape.properties,
            _ => &[],
        }
    }

    pub fn properties_mut(&mut self) -> Option<&mut Vec<Property>> {
        match &mut self.kind {
            SchemaKind::Object(shape) => Some(&mut shape.properties),
            SchemaKind::Composed(c) => Some(&mut c.shape.properties),
            _ => None,
        }
    }

    pub fn property(&self, name: &str) -> Option<&SchemaNode> {
        self.properties()
            .iter()
            .find(|p| p.name == name)
            .map(|p| &p.schema)
    }

    /// Type label used when naming inline composition branches.
    pub fn type_name(&self) -> &'static str {
        match &self.kind {
            SchemaKind::String => "string",
            SchemaKind::Number => "number",
            SchemaKind::Integer => "integer",
            SchemaKind::Boolean => "boolean",
            SchemaKind::Array(_) => "array",
            SchemaKind::Object(_) | SchemaKind::Map(_) => "object",
            SchemaKind::Composed(_) => "composed",
            SchemaKind::Reference(_) => "ref",
            SchemaKind::Any => "null",
        }
    }

    /// True when this node or its discriminator carries an explicit mapping.
    pub fn has_discriminator_mapping(&self) -> bool {
        self.discriminator.as_ref().is_some_and(Discriminator::has_mapping)
    }
}

// --- Internal implementation ---

fn parse_kind(obj: &Map<String, Value>) -> SchemaKind {
    if let Some(reference) = obj.get("$ref").and_then(Value::as_str) {
        return SchemaKind::Reference(reference.to_string());
    }

    let branches = |key: &str| -> Vec<SchemaNode> {
        obj.get(key)
            .and_then(Value::as_array)
            .map(|items| items.iter().map(SchemaNode::from_json).collect())
            .unwrap_or_default()
    };
    if ["allOf", "anyOf", "oneOf"]
        .iter()
        .any(|k| obj.get(*k).is_some_and(Value::is_array))
    {
        return SchemaKind::Composed(Composition {
            all_of: branches("allOf"),
            any_of: branches("anyOf"),
            one_of: branches("oneOf"),
            shape: parse_shape(obj),
        });
    }

    match declared_type(obj) {
        Some("string") => SchemaKind::String,
        Some("number") => SchemaKind::Number,
        Some("integer") => SchemaKind::Integer,
        Some("boolean") => SchemaKind::Boolean,
        Some("array") => SchemaKind::Array(parse_items(obj)),
        Some("object") => parse_object(obj),
        Some(_) => SchemaKind::Any,
        None if obj.contains_key("properties") || obj.contains_key("additionalProperties") => {
            parse_object(obj)
        }
        None if obj.contains_key("items") => SchemaKind::Array(parse_items(obj)),
        None => SchemaKind::Any,
    }
}

/// First non-null entry of `type`, which may be a string or an array.
fn declared_type(obj: &Map<String, Value>) -> Option<&str> {
    match obj.get("type")? {
        Value::String(t) if t != "null" => Some(t),
        Value::Array(types) => types
            .iter()
            .filter_map(Value::as_str)
            .find(|t| *t != "null"),
        _ => None,
    }
}

fn parse_object(obj: &Map<String, Value>) -> SchemaKind {
    let shape = parse_shape(obj);
    if shape.properties.is_empty() {
        if let Some(value_schema) = obj.get("additionalProperties").filter(|v| v.is_object()) {
            return SchemaKind::Map(Box::new(SchemaNode::from_json(value_schema)));
        }
    }
    SchemaKind::Object(shape)
}

fn parse_items(obj: &Map<String, Value>) -> Option<Box<SchemaNode>> {
    obj.get("items")
        .filter(|v| v.is_object())
        .map(|items| Box::new(SchemaNode::from_json(items)))
}

fn parse_shape(obj: &Map<String, Value>) -> ObjectShape {
    let properties = obj
        .get("properties")
        .and_then(Value::as_object)
        .map(|props| {
            props
                .iter()
                .map(|(name, schema)| Property {
                    name: name.clone(),
                    schema: SchemaNode::from_json(schema),
                })
                .collect()
        })
        .unwrap_or_default();

    let required = obj
        .get("required")
        .and_then(Value::as_array)
        .map(|r| r.iter().filter_map(Value::as_str).map(String::from).collect())
        .unwrap_or_default();

    ObjectShape {
        properties,
        required,
    }
}

fn parse_constraints(obj: &Map<String, Value>) -> Constraints {
    let count = |key: &str| obj.get(key).and_then(Value::as_u64).map(|n| n as usize);
    let number = |key: &str| obj.get(key).and_then(Value::as_f64);

    // OpenAPI 3.1 allows `examples: [...]`; the first entry stands in for `example`.
    let example = obj.get("example").cloned().or_else(|| {
        obj.get("examples")
            .and_then(Value::as_array)
            .and_then(|e| e.first().cloned())
    });

    Constraints {
        min_length: count("minLength"),
        max_length: count("maxLength"),
        pattern: obj.get("pattern").and_then(Value::as_str).map(String::from),
        minimum: number("minimum"),
        maximum: number("maximum"),
        format: obj.get("format").and_then(Value::as_str).map(String::from),
        enum_values: obj
            .get("enum")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default(),
        default: obj.get("default").cloned(),
        example,
        min_items: count("minItems"),
        max_items: count("maxItems"),
    }
}

fn parse_discriminator(value: &Value) -> Option<Discriminator> {
    let property_name = value.get("propertyName")?.as_str()?.to_string();
    let mapping = value
        .get("mapping")
        .and_then(Value::as_object)
        .map(|m| {
            m.iter()
                .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
                .collect()
        })
        .unwrap_or_default();
    Some(Discriminator {
        property_name,
        mapping,
    })
}

/// Options for example generation.
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    /// Honour contract-declared `example` values.
    pub use_examples: bool,
    /// Honour contract-declared `default` values.
    pub use_defaults: bool,
    /// How many times one schema may recur along a property path.
    pub self_reference_depth: usize,
    /// Preferred array length, clamped to `minItems`/`maxItems`.
    pub array_size: usize,
    /// Seed for reproducible output. `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl GenerateOptions {
    /// Create options with examples and defaults ignored.
    pub fn new() -> Self {
        Self {
            use_examples: false,
            use_defaults: false,
            self_reference_depth: DEFAULT_SELF_REFERENCE_DEPTH,
            array_size: DEFAULT_ARRAY_SIZE,
            seed: None,
        }
    }

    pub fn use_examples(mut self, use_examples: bool) -> Self {
        self.use_examples = use_examples;
        self
    }

    pub fn use_defaults(mut self, use_defaults: bool) -> Self {
        self.use_defaults = use_defaults;
        self
    }

    /// Set the self-reference depth. Values below 1 are raised to 1.
    pub fn self_reference_depth(mut self, depth: usize) -> Self {
        self.self_reference_depth = depth.max(1);
        self
    }

    pub fn array_size(mut self, size: usize) -> Self {
        self.array_size = size;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}
