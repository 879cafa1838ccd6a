//! Contract loading from files, strings and HTTP URLs.
//!
//! A contract is an OpenAPI 3 document (`components.schemas`) or a Swagger 2
//! document (`definitions`). [`build_registry`] turns one into a normalized
//! [`SchemaRegistry`].

use std::path::Path;

use serde_json::Value;

use crate::compose;
use crate::error::LoadError;
use crate::registry::{SchemaRegistry, DERIVED_PREFIX};
use crate::types::SchemaNode;

#[cfg(feature = "remote")]
use std::time::Duration;

/// Default timeout for HTTP requests (10 seconds).
#[cfg(feature = "remote")]
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Load a contract from a file path.
///
/// # Errors
///
/// Returns `LoadError::FileNotFound` if the file doesn't exist,
/// or `LoadError::InvalidJson` if the file isn't valid JSON.
pub fn load_contract(path: &Path) -> Result<Value, LoadError> {
    if !path.exists() {
        return Err(LoadError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|source| LoadError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;

    load_contract_str(&content)
}

/// Load a contract from a JSON string.
///
/// # Errors
///
/// Returns `LoadError::InvalidJson` if the string isn't valid JSON.
pub fn load_contract_str(content: &str) -> Result<Value, LoadError> {
    serde_json::from_str(content).map_err(|source| LoadError::InvalidJson { source })
}

/// Load a contract from an HTTP/HTTPS URL.
///
/// Requires the `remote` feature (enabled by default).
///
/// # Errors
///
/// Returns `LoadError::NetworkError` if the request fails or the server
/// answers with an error status.
#[cfg(feature = "remote")]
pub fn load_contract_url(url: &str) -> Result<Value, LoadError> {
    let network = |source| LoadError::NetworkError {
        url: url.to_string(),
        source,
    };

    let client = reqwest::blocking::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .map_err(network)?;

    tracing::debug!(url, "fetching contract");
    client
        .get(url)
        .send()
        .and_then(|response| response.error_for_status())
        .and_then(|response| response.json())
        .map_err(network)
}

/// Check if a string looks like a URL (starts with http:// or https://).
pub fn is_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

/// Load a contract from a file path or URL.
///
/// URL loading requires the `remote` feature.
///
/// # Errors
///
/// Returns appropriate errors based on the source type.
pub fn load_contract_auto(source: &str) -> Result<Value, LoadError> {
    if is_url(source) {
        #[cfg(feature = "remote")]
        {
            load_contract_url(source)
        }
        #[cfg(not(feature = "remote"))]
        {
            Err(LoadError::FileNotFound {
                path: std::path::PathBuf::from(source),
            })
        }
    } else {
        load_contract(Path::new(source))
    }
}

/// Navigate a JSON Pointer fragment (e.g. `#/components/parameters/limit`).
///
/// `~1` and `~0` in segments are unescaped; numeric segments index arrays.
///
/// # Errors
///
/// Returns `LoadError::PointerNotFound` if any segment is missing.
pub fn navigate_pointer<'v>(document: &'v Value, pointer: &str) -> Result<&'v Value, LoadError> {
    let path = pointer.trim_start_matches('#').trim_start_matches('/');
    if path.is_empty() {
        return Ok(document);
    }

    let not_found = || LoadError::PointerNotFound {
        pointer: pointer.to_string(),
    };
    let mut current = document;
    for part in path.split('/') {
        let key = part.replace("~1", "/").replace("~0", "~");
        current = match current {
            Value::Object(map) => map.get(&key).ok_or_else(not_found)?,
            Value::Array(items) => key
                .parse::<usize>()
                .ok()
                .and_then(|i| items.get(i))
                .ok_or_else(not_found)?,
            _ => return Err(not_found()),
        };
    }
    Ok(current)
}

/// Build a normalized registry from a contract document.
///
/// Schemas come from `components.schemas` and `definitions`; when both are
/// present the OpenAPI 3 entry wins. Names starting with the derived-schema
/// prefix are skipped.
///
/// # Errors
///
/// Returns `LoadError::InvalidContract` if the document declares neither
/// schema section.
pub fn build_registry(document: Value) -> Result<SchemaRegistry, LoadError> {
    let sections: Vec<(&str, Value)> = [
        ("components.schemas", document.pointer("/components/schemas")),
        ("definitions", document.get("definitions")),
    ]
    .into_iter()
    .filter_map(|(label, section)| section.filter(|s| s.is_object()).map(|s| (label, s.clone())))
    .collect();

    if sections.is_empty() {
        return Err(LoadError::InvalidContract {
            message: "no components.schemas or definitions object".to_string(),
        });
    }

    let mut registry = SchemaRegistry::with_document(document);
    for (label, section) in &sections {
        let Some(schemas) = section.as_object() else {
            continue;
        };
        for (name, schema) in schemas {
            if name.starts_with(DERIVED_PREFIX) {
                tracing::warn!(schema = name.as_str(), "skipping schema with reserved name prefix");
                continue;
            }
            if registry.contains(name) {
                tracing::debug!(schema = name.as_str(), section = label, "already declared, keeping first");
                continue;
            }
            registry.insert(name.clone(), SchemaNode::from_json(schema));
        }
    }

    compose::normalize(&mut registry);
    tracing::debug!(schemas = registry.len(), "contract loaded");
    Ok(registry)
}

/// Load a contract from a file path or URL and build its registry.
///
/// # Errors
///
/// Returns any load error or `LoadError::InvalidContract`.
pub fn load_registry(source: &str) -> Result<SchemaRegistry, LoadError> {
    build_registry(load_contract_auto(source)?)
}
