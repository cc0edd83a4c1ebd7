//! BIE Schema CLI
//!
//! Command-line interface for generating and checking JSON Schema documents
//! from model files.

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::process::ExitCode;

use bie_schema::{
    check_document, load_model_auto, DocumentKind, SchemaDocument, Workspace, FILE_EXTENSION,
};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "bie-schema")]
#[command(about = "Generate deterministic JSON Schema documents from BIE models")]
#[command(version)]
struct Cli {
    /// Log registration progress
    #[arg(long, short, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors
    #[arg(long, short, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a schema document from a model
    Generate {
        /// Model source: file path or URL (http:// or https://)
        model: String,

        /// Additional model merged into the document (repeatable)
        #[arg(long = "merge", value_name = "MODEL")]
        merge: Vec<String>,

        /// Output file or directory (stdout if not specified)
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,

        /// Document kind: message or operation (default: from the model)
        #[arg(long)]
        kind: Option<String>,

        /// Strict mode: set additionalProperties=false on every object
        #[arg(long)]
        strict: bool,

        /// Check that the generated document is a well-formed schema
        #[arg(long)]
        check: bool,
    },

    /// Build a model and report diagnostics and well-formedness
    Check {
        /// Model source: file path or URL (http:// or https://)
        model: String,

        /// Output results as JSON (for automation)
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let result = match cli.command {
        Commands::Generate {
            model,
            merge,
            output,
            pretty,
            kind,
            strict,
            check,
        } => run_generate(GenerateArgs {
            model,
            merge,
            output,
            pretty,
            kind,
            strict,
            check,
        }),
        Commands::Check { model, json } => run_check(&model, json),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

fn init_tracing(verbose: bool, quiet: bool) {
    let default = if verbose {
        "info"
    } else if quiet {
        "error"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

struct GenerateArgs {
    model: String,
    merge: Vec<String>,
    output: Option<PathBuf>,
    pretty: bool,
    kind: Option<String>,
    strict: bool,
    check: bool,
}

/// Load a model source and register it as a document.
fn load_document(
    source: &str,
    kind: Option<DocumentKind>,
    strict: bool,
) -> Result<SchemaDocument, u8> {
    let model = load_model_auto(source).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    let mut options = model.options();
    if let Some(kind) = kind {
        options.kind = kind;
    }
    if strict {
        options.strict = true;
    }

    model.into_document_with(options).map_err(|e| {
        eprintln!("Error in {}: {}", source, e);
        e.exit_code() as u8
    })
}

fn run_generate(args: GenerateArgs) -> Result<(), u8> {
    let kind = match args.kind.as_deref() {
        Some(value) => Some(DocumentKind::parse(value).ok_or_else(|| {
            eprintln!(
                "Error: invalid document kind \"{}\" (expected message or operation)",
                value
            );
            2u8
        })?),
        None => None,
    };

    let document = load_document(&args.model, kind, args.strict)?;
    let target = document.id().to_string();

    let mut workspace = Workspace::new();
    workspace.insert(document).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;
    for source in &args.merge {
        let other = load_document(source, None, false)?;
        let id = other.id().to_string();
        workspace.insert(other).map_err(|e| {
            eprintln!("Error merging {}: {}", source, e);
            e.exit_code() as u8
        })?;
        workspace.merge_into(&target, &id).map_err(|e| {
            eprintln!("Error merging {}: {}", source, e);
            e.exit_code() as u8
        })?;
    }
    let mut document = workspace.close(&target).ok_or(2u8)?;

    let built = document.build().map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    if args.check {
        check_document(&built).map_err(|e| {
            eprintln!("Error: {}", e);
            e.exit_code() as u8
        })?;
    }

    match args.output {
        Some(path) => {
            let path = output_path(path, &document);
            let file = File::create(&path).map_err(|e| {
                eprintln!("Error writing to {}: {}", path.display(), e);
                3u8
            })?;
            document.serialize(BufWriter::new(file), args.pretty).map_err(|e| {
                eprintln!("Error writing to {}: {}", path.display(), e);
                e.exit_code() as u8
            })?;
        }
        None => {
            let stdout = std::io::stdout();
            document.serialize(stdout.lock(), args.pretty).map_err(|e| {
                eprintln!("Error: {}", e);
                e.exit_code() as u8
            })?;
        }
    }

    Ok(())
}

/// A directory receives the document's own file name; a bare path gets the
/// schema file extension.
fn output_path(path: PathBuf, document: &SchemaDocument) -> PathBuf {
    if path.is_dir() {
        return path.join(document.file_name());
    }
    if path.extension().is_none() {
        let mut name = path.into_os_string();
        name.push(FILE_EXTENSION);
        return PathBuf::from(name);
    }
    path
}

fn run_check(source: &str, json_output: bool) -> Result<(), u8> {
    let mut document = match load_document(source, None, false) {
        Ok(document) => document,
        Err(code) => {
            if json_output {
                println!(r#"{{"valid":false}}"#);
            }
            return Err(code);
        }
    };

    let checked = document
        .build()
        .map_err(|e| (e.to_string(), e.exit_code() as u8))
        .and_then(|built| {
            check_document(&built).map_err(|e| (e.to_string(), e.exit_code() as u8))
        });

    if json_output {
        let mut output = serde_json::json!({
            "valid": checked.is_ok(),
            "diagnostics": document.diagnostics(),
        });
        if let Err((message, _)) = &checked {
            output["error"] = serde_json::Value::String(message.clone());
        }
        println!("{}", output);
    } else {
        for diagnostic in document.diagnostics().iter() {
            println!("warning: {}", diagnostic);
        }
        match &checked {
            Ok(()) => println!("Valid ({} warnings)", document.diagnostics().len()),
            Err((message, _)) => eprintln!("Error: {}", message),
        }
    }

    checked.map_err(|(_, code)| code)
}
