//! Example validation against contract schemas.
//!
//! The named schema is wrapped in a root that `$ref`s it and carries the
//! contract's schema sections, so internal references resolve as they do in
//! the contract. OpenAPI 3.1 documents use draft 2020-12; everything else
//! (OpenAPI 3.0, Swagger 2) is closest to draft 4.

use jsonschema::Draft;
use serde_json::{Map, Value};

use crate::error::{LoadError, SchemaError, ValidateError};
use crate::registry::SchemaRegistry;

/// JSON pointer of the declared schema `name` in the contract, if any.
pub fn schema_pointer(registry: &SchemaRegistry, name: &str) -> Option<String> {
    let escaped = name.replace('~', "~0").replace('/', "~1");
    ["components/schemas", "definitions"]
        .iter()
        .map(|section| format!("#/{section}/{escaped}"))
        .find(|pointer| registry.document().pointer(&pointer[1..]).is_some())
}

/// Validate `example` against the declared schema `name`.
///
/// # Errors
///
/// Returns `ValidateError::Load` if `name` is not declared in the contract,
/// `ValidateError::InvalidSchema` if the schema doesn't compile, or
/// `ValidateError::Invalid` if the example doesn't match.
pub fn validate_example(
    registry: &SchemaRegistry,
    name: &str,
    example: &Value,
) -> Result<(), ValidateError> {
    let validator = compile(registry, name)?;

    let errors: Vec<SchemaError> = validator
        .iter_errors(example)
        .map(|e| SchemaError {
            path: e.instance_path.to_string(),
            message: e.to_string(),
        })
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        tracing::debug!(schema = name, errors = errors.len(), "example does not match schema");
        Err(ValidateError::Invalid { errors })
    }
}

/// Compile the declared schema `name` into a validator.
///
/// # Errors
///
/// See [`validate_example`].
pub fn compile(registry: &SchemaRegistry, name: &str) -> Result<jsonschema::Validator, ValidateError> {
    let pointer = schema_pointer(registry, name).ok_or_else(|| LoadError::UnknownSchema {
        name: name.to_string(),
    })?;

    let document = registry.document();
    let mut root = Map::new();
    root.insert("$ref".to_string(), Value::String(pointer));
    for section in ["components", "definitions"] {
        if let Some(value) = document.get(section) {
            root.insert(section.to_string(), value.clone());
        }
    }

    jsonschema::options()
        .with_draft(draft_for(document))
        .build(&Value::Object(root))
        .map_err(|e| ValidateError::InvalidSchema {
            name: name.to_string(),
            message: e.to_string(),
        })
}

fn draft_for(document: &Value) -> Draft {
    match document.get("openapi").and_then(Value::as_str) {
        Some(version) if version.starts_with("3.1") => Draft::Draft202012,
        _ => Draft::Draft4,
    }
}
