//! Command-line front door to the graph core.
//!
//! Provides the `ueg` binary. Fragments are read as JSON wire fragments from
//! a file or stdin; results go to stdout as JSON (or emitted source for
//! `lower`), diagnostics go to stderr through `tracing`.
//!
//! Exit codes: 0 = success, 1 = ingestion rejection or lowering failure,
//! 2 = validation rejection, 3 = I/O or decoding error, 4 = taxonomy violation.

mod config;

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use ueg_check::{EntropyReading, IngestionGate, ValidationError, ValidationReport, Validator};
use ueg_codegen::{Dispatcher, LowerError, Lowering, Pipeline};
use ueg_core::{hash_node, DecodeError, DischargedSet, HashRegistry, WireFragment};
use ueg_storage::SqliteRegistry;

use crate::config::UegConfig;

const EXIT_REJECTED: i32 = 1;
const EXIT_INVALID: i32 = 2;
const EXIT_IO: i32 = 3;
const EXIT_TAXONOMY: i32 = 4;

/// Universal executable graph tools.
#[derive(Parser)]
#[command(name = "ueg", about = "Universal executable graph tools")]
struct Cli {
    /// JSON configuration file (gate, validator and lowering sections).
    #[arg(long, global = true, env = "UEG_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Run the ingestion gate over source text and print its reading.
    Gate {
        /// Declared source language.
        #[arg(short, long)]
        language: String,

        /// Source file (default: stdin).
        input: Option<PathBuf>,
    },

    /// Print the semantic hash of a wire fragment.
    Hash {
        /// Wire fragment file (default: stdin).
        input: Option<PathBuf>,
    },

    /// Validate a wire fragment and print the report.
    Validate {
        /// Wire fragment file (default: stdin).
        input: Option<PathBuf>,

        #[command(flatten)]
        checks: CheckArgs,
    },

    /// Validate and lower a wire fragment for one backend.
    Lower {
        /// Wire fragment file (default: stdin).
        input: Option<PathBuf>,

        /// Backend name: rust, go, zig or python.
        #[arg(short, long)]
        target: String,

        /// Fail unless every node lowers.
        #[arg(long)]
        require_complete: bool,

        /// Print the full lowering as JSON instead of the emitted source.
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        checks: CheckArgs,
    },
}

/// Validation collaborators shared by `validate` and `lower`.
#[derive(clap::Args)]
struct CheckArgs {
    /// Proof reference reported discharged by the prover (repeatable).
    #[arg(short, long = "discharged")]
    discharged: Vec<String>,

    /// SQLite hash registry database.
    #[arg(long)]
    registry: Option<String>,

    /// Record accepted hashes in the registry.
    #[arg(long, requires = "registry")]
    register: bool,

    /// Origin recorded with registered hashes.
    #[arg(long, default_value = "ueg-cli")]
    origin: String,
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();
    let config = match config::UegConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(EXIT_IO);
        }
    };

    let exit_code = match cli.command {
        Commands::Gate { language, input } => run_gate(&config, &language, input.as_deref()),
        Commands::Hash { input } => run_hash(input.as_deref()),
        Commands::Validate { input, checks } => run_validate(&config, input.as_deref(), &checks),
        Commands::Lower {
            input,
            target,
            require_complete,
            json,
            checks,
        } => run_lower(&config, input.as_deref(), &checks, &target, require_complete, json),
    };
    process::exit(exit_code);
}

/// Execute the gate subcommand.
fn run_gate(config: &UegConfig, language: &str, input: Option<&Path>) -> i32 {
    let text = match read_input(input) {
        Ok(text) => text,
        Err(code) => return code,
    };
    match IngestionGate::new(config.gate).admit(&text, language) {
        Ok(admission) => {
            print_json(&GateOutput {
                language: &admission.language,
                reading: admission.reading,
                certificate: hex(admission.certificate.as_bytes()),
            });
            0
        }
        Err(rejection) => {
            eprintln!("Rejected: {}", rejection);
            EXIT_REJECTED
        }
    }
}

#[derive(Serialize)]
struct GateOutput<'a> {
    language: &'a str,
    reading: EntropyReading,
    certificate: String,
}

/// Execute the hash subcommand.
fn run_hash(input: Option<&Path>) -> i32 {
    let wire = match read_wire(input) {
        Ok(wire) => wire,
        Err(code) => return code,
    };
    let fragment = match wire.decode() {
        Ok(fragment) => fragment,
        Err(DecodeError::Taxonomy(violation)) => {
            eprintln!("Error: {}", violation);
            return EXIT_TAXONOMY;
        }
        Err(DecodeError::Malformed(issues)) => {
            eprintln!("Error: {} malformed node(s):", issues.len());
            for issue in &issues {
                eprintln!("  - {}", issue);
            }
            return EXIT_IO;
        }
    };

    let nodes = fragment
        .nodes()
        .iter()
        .map(|node| NodeHash {
            id: node.id().to_string(),
            kind: node.kind_tag().symbol(),
            hash: hash_node(node.kind_tag(), node.tags()).to_hex(),
        })
        .collect();
    print_json(&HashOutput {
        hash: fragment.semantic_hash().to_hex(),
        nodes,
    });
    0
}

#[derive(Serialize)]
struct HashOutput {
    hash: String,
    nodes: Vec<NodeHash>,
}

#[derive(Serialize)]
struct NodeHash {
    id: String,
    kind: &'static str,
    hash: String,
}

/// Execute the validate subcommand.
fn run_validate(config: &UegConfig, input: Option<&Path>, checks: &CheckArgs) -> i32 {
    let wire = match read_wire(input) {
        Ok(wire) => wire,
        Err(code) => return code,
    };
    let pipeline = match build_pipeline(config, checks) {
        Ok(pipeline) => pipeline,
        Err(code) => return code,
    };
    match pipeline.accept_wire(&wire) {
        Ok(validated) => {
            print_json(&ValidationReport {
                fragment_hash: validated.semantic_hash(),
                violations: Vec::new(),
                notices: validated.notices().to_vec(),
            });
            0
        }
        Err(err) => validation_exit_code(&err),
    }
}

/// Execute the lower subcommand.
fn run_lower(
    config: &UegConfig,
    input: Option<&Path>,
    checks: &CheckArgs,
    target: &str,
    require_complete: bool,
    json: bool,
) -> i32 {
    let wire = match read_wire(input) {
        Ok(wire) => wire,
        Err(code) => return code,
    };
    let pipeline = match build_pipeline(config, checks) {
        Ok(pipeline) => pipeline,
        Err(code) => return code,
    };
    debug!(target, require_complete, "lowering wire fragment");
    match pipeline.lower_wire(&wire, target, require_complete) {
        Ok(lowering) => {
            if json {
                print_json(&lowering);
            } else {
                println!("{}", lowering.source());
            }
            report_failures(&lowering)
        }
        Err(err) => lower_exit_code(&err),
    }
}

fn build_pipeline(config: &UegConfig, checks: &CheckArgs) -> Result<Pipeline, i32> {
    let discharged: DischargedSet = checks.discharged.iter().cloned().collect();
    let mut validator = Validator::new(config.validator.clone(), Arc::new(discharged));

    let registry: Option<Arc<dyn HashRegistry>> = match &checks.registry {
        Some(path) => match SqliteRegistry::new(path) {
            Ok(registry) => {
                info!(path = %path, "opened hash registry");
                Some(Arc::new(registry))
            }
            Err(e) => {
                eprintln!("Error: failed to open registry '{}': {}", path, e);
                return Err(EXIT_IO);
            }
        },
        None => None,
    };
    if let Some(registry) = &registry {
        validator = validator.with_registry(Arc::clone(registry));
    }

    let pipeline = Pipeline::new(
        IngestionGate::new(config.gate),
        validator,
        Dispatcher::with_builtin_backends(config.lowering.clone()),
    );
    Ok(match registry {
        Some(registry) if checks.register => pipeline.with_registration(registry, checks.origin.clone()),
        _ => pipeline,
    })
}

/// Partial lowerings still print their source; the failures go to stderr.
fn report_failures(lowering: &Lowering) -> i32 {
    if lowering.is_complete() {
        return 0;
    }
    eprintln!(
        "{} could not lower {} node(s):",
        lowering.backend,
        lowering.failures.len()
    );
    for failure in &lowering.failures {
        eprintln!("  - {}", failure);
    }
    EXIT_REJECTED
}

fn validation_exit_code(err: &ValidationError) -> i32 {
    match err {
        ValidationError::Taxonomy(violation) => {
            eprintln!("Error: {}", violation);
            EXIT_TAXONOMY
        }
        ValidationError::Rejected(report) => {
            print_json(report);
            eprintln!("Fragment rejected with {} violation(s):", report.violations.len());
            for violation in &report.violations {
                eprintln!("  - {}", violation);
            }
            EXIT_INVALID
        }
    }
}

fn lower_exit_code(err: &LowerError) -> i32 {
    match err {
        LowerError::Taxonomy(violation) => {
            eprintln!("Error: {}", violation);
            EXIT_TAXONOMY
        }
        LowerError::Rejected(report) => validation_exit_code(&ValidationError::Rejected(report.clone())),
        LowerError::Incomplete { failures, .. } => {
            eprintln!("Error: {}", err);
            for failure in failures {
                eprintln!("  - {}", failure);
            }
            EXIT_REJECTED
        }
        LowerError::UnknownBackend { .. } => {
            eprintln!("Error: {}", err);
            EXIT_REJECTED
        }
    }
}

fn read_wire(input: Option<&Path>) -> Result<WireFragment, i32> {
    let text = read_input(input)?;
    WireFragment::from_json(&text).map_err(|e| {
        eprintln!("Error: {}", e);
        EXIT_IO
    })
}

/// Reads `input`, or stdin when absent or `-`.
fn read_input(input: Option<&Path>) -> Result<String, i32> {
    let result = match input {
        Some(path) if path != Path::new("-") => fs::read_to_string(path),
        _ => {
            let mut text = String::new();
            io::stdin().read_to_string(&mut text).map(|_| text)
        }
    };
    result.map_err(|e| {
        eprintln!("Error: failed to read input: {}", e);
        EXIT_IO
    })
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    let json = serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize result: {}\"}}", e));
    println!("{}", json);
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use ueg_check::Violation;
    use std::io::Write;

    use ueg_core::{
        ConcurrencyModel, EntropyCertificate, FragmentBuilder, Node, NodeId, Param, PropertySet,
        SafetyLineage, SemanticHash, Tags, TaxonomyViolation, Type,
    };

    use super::*;

    fn report() -> ValidationReport {
        ValidationReport {
            fragment_hash: SemanticHash([0; 32]),
            violations: vec![Violation::MissingCertificate],
            notices: Vec::new(),
        }
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn register_requires_registry() {
        let parsed = Cli::try_parse_from(["ueg", "validate", "--register", "frag.json"]);
        assert!(parsed.is_err());
        let parsed = Cli::try_parse_from([
            "ueg", "validate", "--registry", "r.db", "--register", "-d", "ob-1", "frag.json",
        ]);
        assert!(parsed.is_ok());
    }

    #[test]
    fn exit_codes_follow_error_class() {
        let taxonomy = TaxonomyViolation {
            code: 7,
            node: Some(NodeId::new()),
        };
        assert_eq!(validation_exit_code(&ValidationError::Taxonomy(taxonomy.clone())), EXIT_TAXONOMY);
        assert_eq!(validation_exit_code(&ValidationError::Rejected(report())), EXIT_INVALID);
        assert_eq!(lower_exit_code(&LowerError::Taxonomy(taxonomy)), EXIT_TAXONOMY);
        assert_eq!(lower_exit_code(&LowerError::Rejected(report())), EXIT_INVALID);
        assert_eq!(
            lower_exit_code(&LowerError::UnknownBackend {
                target: "cobol".into(),
                available: vec!["rust".into()],
            }),
            EXIT_REJECTED
        );
    }

    #[test]
    fn missing_input_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(read_input(Some(dir.path().join("absent.json").as_path())), Err(EXIT_IO));
    }

    #[test]
    fn hash_reads_an_encoded_fragment() {
        let tags = || Tags::new(SafetyLineage::Owned, ConcurrencyModel::Seq, PropertySet::empty());
        let mut b = FragmentBuilder::new();
        let delta = b.add(Node::delta(vec![1, 2], tags()));
        let lambda = b.add(Node::lambda(vec![Param::new("x", Type::named("int"))], delta, tags()));
        b.entry(lambda)
            .record_step(b"front-end")
            .entropy_certificate(EntropyCertificate::attest(0.5, "python"));
        let fragment = b.build().unwrap();

        let mut file = tempfile::NamedTempFile::new().unwrap();
        let json = WireFragment::encode(&fragment).to_json_pretty().unwrap();
        file.write_all(json.as_bytes()).unwrap();

        assert_eq!(run_hash(Some(file.path())), 0);
    }

    #[test]
    fn hex_is_lowercase() {
        assert_eq!(hex(&[0x00, 0xab, 0x7f]), "00ab7f");
    }
}
