//! Contract linting - static analysis of OpenAPI/Swagger contracts.
//!
//! Reports the problems that make generation degrade silently:
//! - JSON syntax errors and contracts without schema sections
//! - Broken `$ref` pointers, which generation omits
//! - Patterns that don't compile or that no bounded string satisfies
//! - Declared component examples that don't match their schema

use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use serde_json::Value;

use crate::error::{LoadError, ValidateError};
use crate::loader::{build_registry, load_contract, navigate_pointer};
use crate::pattern::{is_sentinel, PatternStringGenerator};
use crate::synth::DEFAULT_MAX_LENGTH;
use crate::validator::validate_example;

/// Keys whose values are instance data, not schemas.
const DATA_KEYWORDS: &[&str] = &["example", "examples", "default", "enum", "const"];

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A single diagnostic message from linting.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: String,
    pub file: PathBuf,
    /// JSON path to the issue (e.g., "/components/schemas/Pet/properties/id")
    pub path: String,
    pub message: String,
}

/// Result of linting a single file.
#[derive(Debug, Clone, Serialize)]
pub struct FileResult {
    pub file: PathBuf,
    pub status: FileStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

/// Status of a linted file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Ok,
    Error,
    Warning,
}

/// Result of linting a directory or set of files.
#[derive(Debug, Clone, Serialize)]
pub struct LintResult {
    pub path: PathBuf,
    pub files_checked: usize,
    pub passed: usize,
    pub failed: usize,
    pub errors: usize,
    pub warnings: usize,
    pub results: Vec<FileResult>,
}

impl LintResult {
    /// Returns true if all files passed (no errors).
    pub fn is_ok(&self) -> bool {
        self.errors == 0
    }
}

/// Lint a contract file or a directory of contracts.
///
/// Directories are searched recursively for `.json` files. With `strict`,
/// files that only have warnings count as failed.
pub fn lint(path: &Path, strict: bool) -> LintResult {
    let files = contract_files(path);
    let results: Vec<FileResult> = files.iter().map(|file| lint_file(file, path)).collect();

    let (errors, warnings) = results.iter().fold((0, 0), |(e, w), r| {
        (
            e + count(&r.diagnostics, Severity::Error),
            w + count(&r.diagnostics, Severity::Warning),
        )
    });
    let failed = results
        .iter()
        .filter(|r| match r.status {
            FileStatus::Error => true,
            FileStatus::Warning => strict,
            FileStatus::Ok => false,
        })
        .count();

    LintResult {
        path: path.to_path_buf(),
        files_checked: results.len(),
        passed: results.len() - failed,
        failed,
        errors,
        warnings,
        results,
    }
}

/// Lint a single contract file. Reported paths are relative to `base_path`.
pub fn lint_file(file: &Path, base_path: &Path) -> FileResult {
    let diagnostics = match load_contract(file) {
        Ok(document) => lint_document(&document, file),
        Err(e) => {
            let mut findings = Findings::new(file);
            findings.error("E001", "/", format!("syntax error: {}", e));
            findings.diagnostics
        }
    };

    let status = if count(&diagnostics, Severity::Error) > 0 {
        FileStatus::Error
    } else if diagnostics.is_empty() {
        FileStatus::Ok
    } else {
        FileStatus::Warning
    };

    FileResult {
        file: file.strip_prefix(base_path).unwrap_or(file).to_path_buf(),
        status,
        diagnostics,
    }
}

/// Lint an already loaded contract. `file` is only used for reporting.
pub fn lint_document(document: &Value, file: &Path) -> Vec<Diagnostic> {
    let mut findings = Findings::new(file);
    walk(document, "", document, &mut findings);
    check_examples(document, &mut findings);

    tracing::debug!(file = %file.display(), diagnostics = findings.diagnostics.len(), "linted contract");
    findings.diagnostics
}

// --- Internal implementation ---

fn count(diagnostics: &[Diagnostic], severity: Severity) -> usize {
    diagnostics.iter().filter(|d| d.severity == severity).count()
}

/// Diagnostics collected for one file.
struct Findings<'f> {
    file: &'f Path,
    diagnostics: Vec<Diagnostic>,
}

impl<'f> Findings<'f> {
    fn new(file: &'f Path) -> Self {
        Self {
            file,
            diagnostics: Vec::new(),
        }
    }

    fn error(&mut self, code: &str, path: &str, message: String) {
        self.push(Severity::Error, code, path, message);
    }

    fn warning(&mut self, code: &str, path: &str, message: String) {
        self.push(Severity::Warning, code, path, message);
    }

    fn push(&mut self, severity: Severity, code: &str, path: &str, message: String) {
        self.diagnostics.push(Diagnostic {
            severity,
            code: code.to_string(),
            file: self.file.to_path_buf(),
            path: path.to_string(),
            message,
        });
    }
}

/// Visit every schema object of the document, skipping instance data.
fn walk(value: &Value, path: &str, root: &Value, findings: &mut Findings<'_>) {
    match value {
        Value::Object(map) => {
            if let Some(Value::String(reference)) = map.get("$ref") {
                check_ref(reference, path, root, findings);
            }
            if let Some(Value::String(pattern)) = map.get("pattern") {
                let min = map.get("minLength").and_then(Value::as_u64).map_or(1, |m| m as usize);
                let max = map
                    .get("maxLength")
                    .and_then(Value::as_u64)
                    .map_or(DEFAULT_MAX_LENGTH, |m| m as usize)
                    .max(min);
                check_pattern(pattern, min, max, &format!("{path}/pattern"), findings);
            }
            for (key, child) in map.iter().filter(|(k, _)| !DATA_KEYWORDS.contains(&k.as_str())) {
                walk(child, &format!("{path}/{}", escape(key)), root, findings);
            }
        }
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                walk(item, &format!("{path}/{i}"), root, findings);
            }
        }
        _ => {}
    }
}

fn check_ref(reference: &str, path: &str, root: &Value, findings: &mut Findings<'_>) {
    if !reference.starts_with('#') {
        findings.warning(
            "W003",
            path,
            format!("external reference is not followed during generation: {}", reference),
        );
    } else if reference != "#" && navigate_pointer(root, reference).is_err() {
        findings.error("E003", path, format!("reference not found: {}", reference));
    }
}

/// The pattern must compile, and bounded generation must find a match.
fn check_pattern(pattern: &str, min: usize, max: usize, path: &str, findings: &mut Findings<'_>) {
    let generator = match PatternStringGenerator::new(pattern) {
        Ok(generator) => generator,
        Err(e) => {
            findings.error("E004", path, e.to_string());
            return;
        }
    };

    let mut rng = StdRng::seed_from_u64(0);
    if is_sentinel(&generator.generate(min, max, &mut rng)) {
        findings.warning(
            "W001",
            path,
            format!(
                "no string of length {}..={} matching {:?} was found; generation will emit a placeholder",
                min, max, pattern
            ),
        );
    }
}

/// Check declared component examples against their own schemas.
fn check_examples(document: &Value, findings: &mut Findings<'_>) {
    let registry = match build_registry(document.clone()) {
        Ok(registry) => registry,
        Err(LoadError::InvalidContract { message }) => {
            findings.error("E002", "/", format!("invalid contract: {}", message));
            return;
        }
        Err(_) => return,
    };

    for name in registry.declared_names() {
        let Some(example) = registry.get(name).and_then(|n| n.constraints.example.as_ref()) else {
            continue;
        };
        match validate_example(&registry, name, example) {
            Ok(()) => {}
            Err(ValidateError::Invalid { errors }) => {
                let detail = errors
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("; ");
                findings.warning(
                    "W002",
                    &example_path(document, name),
                    format!("example does not match schema {}: {}", name, detail),
                );
            }
            Err(e) => tracing::debug!(schema = name, error = %e, "skipping example check"),
        }
    }
}

/// JSON pointer escaping of one path segment.
fn escape(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

fn example_path(document: &Value, name: &str) -> String {
    let section = if document.pointer(&format!("/components/schemas/{}", escape(name))).is_some() {
        "/components/schemas"
    } else {
        "/definitions"
    };
    format!("{section}/{}/example", escape(name))
}

/// `path` itself if it is a `.json` file, else every `.json` file below it, sorted.
fn contract_files(path: &Path) -> Vec<PathBuf> {
    let is_json = |p: &Path| p.extension().is_some_and(|e| e == "json");
    if path.is_file() {
        return if is_json(path) { vec![path.to_path_buf()] } else { Vec::new() };
    }

    let mut files = Vec::new();
    let mut pending = vec![path.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let Ok(entries) = std::fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let entry = entry.path();
            if entry.is_dir() {
                pending.push(entry);
            } else if is_json(entry.as_path()) {
                files.push(entry);
            }
        }
    }
    files.sort();
    files
}
