//! Contract Seed CLI
//!
//! Command-line interface for generating and checking contract examples.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use contract_seed::{
    boundaries, lint, load_registry, validate_example, Boundaries, FileStatus, GenerateOptions,
    LintResult, LoadError, SchemaRegistry, SchemaResolver, Severity, ValidateError, DEFAULT_ARRAY_SIZE,
    DEFAULT_SELF_REFERENCE_DEPTH, EXAMPLE_KEY,
};
use serde_json::{json, Map, Value};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "contract-seed")]
#[command(about = "Generate constraint-satisfying examples from OpenAPI contracts")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate an example for one schema, or for every declared schema
    Generate {
        /// Contract source: file path or URL (http:// or https://)
        contract: String,

        /// Schema name (all declared schemas if omitted)
        schema: Option<String>,

        /// Prefer examples declared in the contract
        #[arg(long)]
        use_examples: bool,

        /// Use declared defaults for leaf values
        #[arg(long)]
        use_defaults: bool,

        /// How many times one schema may recur along a path
        #[arg(long, default_value_t = DEFAULT_SELF_REFERENCE_DEPTH)]
        self_reference_depth: usize,

        /// Preferred array length, clamped to minItems/maxItems
        #[arg(long, default_value_t = DEFAULT_ARRAY_SIZE)]
        array_size: usize,

        /// Seed for reproducible output
        #[arg(long)]
        seed: Option<u64>,

        /// Check every generated example against its schema
        #[arg(long)]
        validate: bool,

        /// Output file (stdout if not specified)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Lint contracts for broken refs, bad patterns and mismatched examples
    Lint {
        /// File or directory to lint
        path: PathBuf,

        /// Output format: text (default) or json
        #[arg(long, default_value = "text")]
        format: String,

        /// Treat warnings as errors
        #[arg(long)]
        strict: bool,

        /// Suppress progress output, only show errors
        #[arg(long, short)]
        quiet: bool,
    },

    /// Print numeric edge values of a schema or of its numeric properties
    Boundaries {
        /// Contract source: file path or URL (http:// or https://)
        contract: String,

        /// Schema name
        schema: String,
    },
}

struct GenerateArgs {
    contract: String,
    schema: Option<String>,
    options: GenerateOptions,
    validate: bool,
    output: Option<PathBuf>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Generate {
            contract,
            schema,
            use_examples,
            use_defaults,
            self_reference_depth,
            array_size,
            seed,
            validate,
            output,
        } => {
            let mut options = GenerateOptions::new()
                .use_examples(use_examples)
                .use_defaults(use_defaults)
                .self_reference_depth(self_reference_depth)
                .array_size(array_size);
            if let Some(seed) = seed {
                options = options.seed(seed);
            }
            run_generate(GenerateArgs {
                contract,
                schema,
                options,
                validate,
                output,
            })
        }

        Commands::Lint {
            path,
            format,
            strict,
            quiet,
        } => run_lint(&path, &format, strict, quiet),

        Commands::Boundaries { contract, schema } => run_boundaries(&contract, &schema),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

fn load(contract: &str) -> Result<SchemaRegistry, u8> {
    load_registry(contract).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })
}

fn unknown_schema(name: &str) -> u8 {
    let e = LoadError::UnknownSchema {
        name: name.to_string(),
    };
    eprintln!("Error: {}", e);
    e.exit_code() as u8
}

fn run_generate(args: GenerateArgs) -> Result<(), u8> {
    let registry = load(&args.contract)?;

    let names: Vec<String> = match &args.schema {
        Some(name) => {
            if !registry.declared_names().any(|n| n == name.as_str()) {
                return Err(unknown_schema(name));
            }
            vec![name.clone()]
        }
        None => registry.declared_names().map(String::from).collect(),
    };

    let mut resolver = SchemaResolver::new(&registry, args.options);
    let mut examples = Map::new();
    let mut texts = Vec::new();
    for name in &names {
        let mut generated = resolver.generate(name);
        let Some(text) = generated.remove(EXAMPLE_KEY) else {
            continue;
        };
        let value: Value = serde_json::from_str(&text).map_err(|e| {
            eprintln!("Error: example for {} is not valid JSON: {}", name, e);
            2u8
        })?;
        examples.insert(name.clone(), value);
        texts.push(text);
    }

    for diagnostic in resolver.diagnostics() {
        eprintln!("Warning: {}", diagnostic);
    }

    let mut invalid = 0;
    if args.validate {
        for (name, example) in &examples {
            match validate_example(&registry, name, example) {
                Ok(()) => {}
                Err(ValidateError::Invalid { errors }) => {
                    invalid += 1;
                    eprintln!("Example for {} does not match its schema:", name);
                    for error in errors {
                        eprintln!("  {}", error);
                    }
                }
                Err(e) => eprintln!("Warning: cannot validate {}: {}", name, e),
            }
        }
    }

    let output = match (&args.schema, texts.pop()) {
        (Some(_), Some(text)) => text,
        _ => serde_json::to_string_pretty(&Value::Object(examples)).map_err(|e| {
            eprintln!("Error serializing output: {}", e);
            2u8
        })?,
    };
    write_output(args.output.as_deref(), &output)?;

    if invalid > 0 {
        Err(1)
    } else {
        Ok(())
    }
}

fn write_output(path: Option<&Path>, content: &str) -> Result<(), u8> {
    match path {
        Some(path) => std::fs::write(path, content).map_err(|e| {
            eprintln!("Error writing to {}: {}", path.display(), e);
            3u8
        }),
        None => {
            println!("{}", content);
            Ok(())
        }
    }
}

fn run_boundaries(contract: &str, schema: &str) -> Result<(), u8> {
    let registry = load(contract)?;
    if !registry.declared_names().any(|n| n == schema) {
        return Err(unknown_schema(schema));
    }
    let Some(node) = registry.resolve(schema) else {
        return Err(unknown_schema(schema));
    };

    let output = match boundaries(&node) {
        Some(b) => boundaries_json(&b),
        None => {
            let mut properties = Map::new();
            for property in node.properties() {
                let resolved = match property.schema.ref_name() {
                    Some(reference) => registry.resolve(reference),
                    None => Some(std::borrow::Cow::Borrowed(&property.schema)),
                };
                if let Some(b) = resolved.as_deref().and_then(boundaries) {
                    properties.insert(property.name.clone(), boundaries_json(&b));
                }
            }
            if properties.is_empty() {
                eprintln!("Error: schema {} has no numeric values", schema);
                return Err(2);
            }
            Value::Object(properties)
        }
    };

    let text = serde_json::to_string_pretty(&output).map_err(|e| {
        eprintln!("Error serializing output: {}", e);
        2u8
    })?;
    println!("{}", text);
    Ok(())
}

fn boundaries_json(b: &Boundaries) -> Value {
    json!({
        "width": b.width,
        "left": b.left.to_json(),
        "right": b.right.to_json(),
        "extremeNegative": b.extreme_negative.to_json(),
        "extremePositive": b.extreme_positive.to_json(),
    })
}

fn run_lint(path: &Path, format: &str, strict: bool, quiet: bool) -> Result<(), u8> {
    if !path.exists() {
        eprintln!("Error: path not found: {}", path.display());
        return Err(3);
    }

    let result = lint(path, strict);
    let passed = result.is_ok() && (!strict || result.warnings == 0);

    if format == "json" {
        let text = serde_json::to_string_pretty(&result).map_err(|e| {
            eprintln!("Error serializing output: {}", e);
            2u8
        })?;
        println!("{}", text);
    } else {
        print_lint_report(&result, quiet, passed);
    }

    if passed {
        Ok(())
    } else {
        Err(1)
    }
}

const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";
const RESET: &str = "\x1b[0m";

fn print_lint_report(result: &LintResult, quiet: bool, passed: bool) {
    if !quiet {
        println!("Linting contracts in {} ...\n", result.path.display());
    }

    for file in &result.results {
        let (color, mark) = match file.status {
            FileStatus::Ok => (GREEN, "✓"),
            FileStatus::Warning => (YELLOW, "⚠"),
            FileStatus::Error => (RED, "✗"),
        };
        if !quiet || file.status != FileStatus::Ok {
            println!("  {color}{mark}{RESET} {}", file.file.display());
        }

        let shown = file
            .diagnostics
            .iter()
            .filter(|d| !quiet || d.severity == Severity::Error);
        for d in shown {
            let (color, label) = match d.severity {
                Severity::Error => (RED, "error"),
                Severity::Warning => (YELLOW, "warning"),
            };
            println!("    {color}{label}[{}]{RESET} {}: {}", d.code, d.path, d.message);
        }
    }

    println!();
    if passed {
        println!(
            "{GREEN}✓ {} contract(s) checked, all passed{RESET}",
            result.files_checked
        );
    } else {
        println!(
            "{RED}✗ {} contract(s) checked: {} passed, {} failed ({} errors, {} warnings){RESET}",
            result.files_checked, result.passed, result.failed, result.errors, result.warnings
        );
    }
}
