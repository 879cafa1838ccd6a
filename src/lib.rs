//! Contract Seed
//!
//! Constraint-satisfying example synthesis from OpenAPI and Swagger schemas.
//!
//! Given a contract, this library produces a JSON example for any named
//! schema: objects with every property filled, arrays sized to their item
//! bounds, strings that match their `pattern`, numbers inside their range.
//! Self-referencing schemas are cut off at a configurable depth, and
//! `allOf`/`anyOf`/`oneOf` compositions (including discriminated
//! hierarchies) are merged or expanded per branch.
//!
//! # Example
//!
//! ```
//! use contract_seed::{build_registry, GenerateOptions, SchemaResolver};
//! use serde_json::json;
//!
//! let contract = json!({
//!     "openapi": "3.0.3",
//!     "components": {"schemas": {
//!         "Pet": {
//!             "type": "object",
//!             "properties": {
//!                 "name": {"type": "string", "enum": ["rex"]},
//!                 "age": {"type": "integer", "minimum": 1, "maximum": 1}
//!             }
//!         }
//!     }}
//! });
//!
//! let registry = build_registry(contract).unwrap();
//! let mut resolver = SchemaResolver::new(&registry, GenerateOptions::new().seed(42));
//! let pet = resolver.generate_value("Pet").unwrap();
//!
//! assert_eq!(pet, json!({"name": "rex", "age": 1}));
//! ```
//!
//! # Value Priority
//!
//! | Schema | Value |
//! |--------|-------|
//! | `enum` | First non-null entry |
//! | `default` (with `use_defaults`) | Declared default |
//! | `format` or format-like name | uuid, date, date-time, email, ip, uri, hostname |
//! | `pattern` / length bounds | Bounded regex-guided string |
//! | integer / number | Inside `[minimum, maximum]` |
//! | `example` (with `use_examples`) | Declared example, checked first |
//!
//! Unsatisfiable patterns yield [`PATTERN_SENTINEL`] instead of failing.

mod boundary;
mod compose;
mod cycle;
mod error;
mod format;
mod linter;
mod loader;
mod pattern;
mod registry;
mod resolver;
mod serialize;
mod synth;
mod types;
mod validator;

pub use boundary::{
    boundaries, extreme_negative, extreme_positive, left_boundary, right_boundary, Boundaries,
    BoundaryValue, NumericWidth,
};
pub use compose::{all_of_name, base_name, normalize, one_of_name};
pub use cycle::{path_exceeds_depth, ref_exceeds_depth};
pub use error::{LoadError, PatternError, SchemaError, SerializeError, ValidateError};
pub use format::{BuiltinFormats, FormatProvider, KnownFormat};
pub use linter::{
    lint, lint_document, lint_file, Diagnostic, FileResult, FileStatus, LintResult, Severity,
};
pub use loader::{
    build_registry, is_url, load_contract, load_contract_auto, load_contract_str, load_registry,
    navigate_pointer,
};
pub use pattern::{
    clean, flatten, generate as generate_pattern, is_sentinel, strip_lookarounds,
    PatternStringGenerator, PATTERN_SENTINEL,
};
pub use registry::{CrossRef, Parameter, SchemaRegistry, DERIVED_PREFIX};
pub use resolver::{GenerationState, SchemaResolver, EXAMPLE_KEY};
pub use serialize::{SerializeLimits, OVERFLOW_DIAGNOSTIC};
pub use synth::ValueSynthesizer;
pub use types::{
    Composition, CompositionKind, Constraints, Discriminator, GenerateOptions, ObjectShape, Property,
    SchemaKind, SchemaNode, DEFAULT_ARRAY_SIZE, DEFAULT_SELF_REFERENCE_DEPTH,
};
pub use validator::{schema_pointer, validate_example};

#[cfg(feature = "remote")]
pub use loader::load_contract_url;
