//! Error types for contract loading, validation and pattern-driven generation.
//!
//! Synthesis itself never fails: unresolvable references, cycles and
//! unsatisfiable patterns all degrade to omitted fields or sentinel values.
//! The errors here cover the edges around it.

use std::path::PathBuf;
use thiserror::Error;

/// Errors while loading a contract into a registry.
#[derive(Debug, Error)]
pub enum LoadError {
    // IO errors (exit code 3)
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[cfg(feature = "remote")]
    #[error("failed to fetch {url}: {source}")]
    NetworkError {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    // Parse errors (exit code 2)
    #[error("invalid JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },

    // Contract errors (exit code 2)
    #[error("invalid contract: {message}")]
    InvalidContract { message: String },

    #[error("pointer not found in contract: {pointer}")]
    PointerNotFound { pointer: String },

    #[error("schema not declared in contract: {name}")]
    UnknownSchema { name: String },
}

impl LoadError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            LoadError::FileNotFound { .. } | LoadError::ReadError { .. } => 3,
            #[cfg(feature = "remote")]
            LoadError::NetworkError { .. } => 3,
            _ => 2,
        }
    }
}

/// Errors raised by the pattern-guided string generator.
#[derive(Debug, Error)]
pub enum PatternError {
    #[error("pattern {pattern:?} cannot be compiled: {message}")]
    Invalid { pattern: String, message: String },
}

/// Errors from checking an example against its contract schema.
#[derive(Debug, Error)]
pub enum ValidateError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("schema {name} cannot be compiled: {message}")]
    InvalidSchema { name: String, message: String },

    #[error("validation failed with {} error(s)", errors.len())]
    Invalid { errors: Vec<SchemaError> },
}

/// Single validation error with path context.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SchemaError {
    /// JSON Pointer (RFC 6901) to the invalid field.
    pub path: String,
    /// Human-readable error message.
    pub message: String,
}

impl std::fmt::Display for SchemaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

impl ValidateError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            ValidateError::Load(e) => e.exit_code(),
            ValidateError::InvalidSchema { .. } => 2,
            ValidateError::Invalid { .. } => 1,
        }
    }
}

/// Reasons the primary serializer refuses an example.
#[derive(Debug, Error)]
pub enum SerializeError {
    #[error("example nests {depth} levels deep, limit is {limit}")]
    TooDeep { depth: usize, limit: usize },

    #[error("example serializes to {size} bytes, limit is {limit}")]
    TooLarge { size: usize, limit: usize },

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_error_exit_codes() {
        let err = LoadError::FileNotFound {
            path: PathBuf::from("petstore.json"),
        };
        assert_eq!(err.exit_code(), 3);

        let err = LoadError::InvalidContract {
            message: "no schemas".into(),
        };
        assert_eq!(err.exit_code(), 2);

        let err = LoadError::UnknownSchema { name: "Pet".into() };
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn invalid_json_exit_code() {
        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = LoadError::InvalidJson { source };
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn validate_error_exit_codes() {
        let err = ValidateError::Invalid {
            errors: vec![SchemaError {
                path: "/id".into(),
                message: "\"id\" is a required property".into(),
            }],
        };
        assert_eq!(err.exit_code(), 1);
        assert_eq!(err.to_string(), "validation failed with 1 error(s)");

        let err = ValidateError::Load(LoadError::UnknownSchema { name: "Pet".into() });
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn pattern_error_display() {
        let err = PatternError::Invalid {
            pattern: "[a-".into(),
            message: "unclosed character class".into(),
        };
        assert_eq!(
            err.to_string(),
            "pattern \"[a-\" cannot be compiled: unclosed character class"
        );
    }
}
