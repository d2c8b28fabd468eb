//! # sylva
//!
//! Command-line front-end: parses files of the reference statement
//! language and prints their AST, tokens or diagnostics.

mod config;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use config::CliConfig;
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use sylva_pipeline::{AstParser, ParsingResult, Token};
use sylva_schema::SchemaRegistry;
use sylva_simple::SimpleParser;
use sylva_tree::{Issue, debug_print};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sylva")]
#[command(about = "Parse and inspect sylva ASTs")]
#[command(version)]
struct Cli {
    /// Path to a YAML or JSON configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a file and print its AST and issues
    Parse {
        /// Input file path
        input: PathBuf,

        /// Drop origins and positions from the AST
        #[arg(long)]
        no_positions: bool,

        #[arg(short, long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },

    /// Tokenize a file and print its tokens
    Lex {
        /// Input file path
        input: PathBuf,

        /// Include whitespace and other hidden-channel tokens
        #[arg(long)]
        all_channels: bool,

        #[arg(short, long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },

    /// List the node types of the statement language
    Schema,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Serialize)]
struct ParseReport<'a> {
    file: String,
    correct: bool,
    issues: &'a [Issue],
    statistics: Statistics,
}

#[derive(Serialize)]
struct Statistics {
    tokens: usize,
    nodes: usize,
    time_ms: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    lexing_time_ms: Option<f64>,
}

#[derive(Serialize)]
struct LexReport<'a> {
    file: String,
    correct: bool,
    tokens: &'a [Token],
    issues: &'a [Issue],
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::from(2)
        }
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Run a command; `Ok(false)` means the input has blocking issues
fn run(cli: Cli) -> Result<bool> {
    let config = match &cli.config {
        Some(path) => CliConfig::load(path)?,
        None => CliConfig::default(),
    };
    debug!(?config, "Configuration loaded");

    let registry = Arc::new(SchemaRegistry::new());
    let parser = SimpleParser::with_config(Arc::clone(&registry), config.transformer.clone())?;

    match cli.command {
        Commands::Parse {
            input,
            no_positions,
            format,
        } => {
            let mut pipeline = config.pipeline;
            if no_positions {
                pipeline.track_positions = false;
            }
            info!(input = %input.display(), "Parsing");
            let result = parser
                .parse_file(&input, &pipeline)
                .with_context(|| format!("cannot parse {}", input.display()))?;
            print_parse(&input, &result, format)?;
            Ok(result.correct())
        }
        Commands::Lex {
            input,
            all_channels,
            format,
        } => {
            let code = std::fs::read_to_string(&input)
                .with_context(|| format!("cannot read {}", input.display()))?;
            let only_default = config.pipeline.only_default_channel && !all_channels;
            let result = parser.lex(&code, only_default)?;
            match format {
                Format::Text => {
                    for token in &result.tokens {
                        println!("{} {:?} {}", token.kind.name(), token.text, token.position());
                    }
                    print_issues(&result.issues);
                }
                Format::Json => {
                    let report = LexReport {
                        file: input.display().to_string(),
                        correct: result.correct(),
                        tokens: &result.tokens,
                        issues: &result.issues,
                    };
                    println!("{}", serde_json::to_string_pretty(&report)?);
                }
            }
            Ok(result.correct())
        }
        Commands::Schema => {
            sylva_simple::ast::register_all(&registry)?;
            for descriptor in registry.descriptors() {
                match descriptor.extends() {
                    Some(parent) => {
                        println!("{} extends {}", descriptor.qualified_name(), parent.qualified_name())
                    }
                    None => println!("{}", descriptor.qualified_name()),
                }
                for property in descriptor.properties() {
                    let cardinality = if property.multiple { "*" } else { "" };
                    println!(
                        "  {} {:?}{} {}",
                        property.name,
                        property.kind,
                        cardinality,
                        property.declared_type.as_deref().unwrap_or("")
                    );
                }
            }
            Ok(true)
        }
    }
}

fn print_parse(input: &std::path::Path, result: &ParsingResult, format: Format) -> Result<()> {
    match format {
        Format::Text => {
            if let Some(root) = &result.root {
                print!("{}", debug_print(root));
            }
            print_issues(&result.issues);
        }
        Format::Json => {
            let report = ParseReport {
                file: input.display().to_string(),
                correct: result.correct(),
                issues: &result.issues,
                statistics: Statistics {
                    tokens: result.token_count(),
                    nodes: result.node_count(),
                    time_ms: millis(result.time),
                    lexing_time_ms: result.lexing_time().map(millis),
                },
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }
    Ok(())
}

fn print_issues(issues: &[Issue]) {
    for issue in issues {
        eprintln!("{issue}");
    }
}

fn millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}
