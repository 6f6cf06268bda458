//! oxide-dql CLI
//!
//! Compiles SQL query expressions against a JSON catalog and prints the
//! compiled result as JSON.

use std::collections::BTreeSet;
use std::io::Read;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use serde::Serialize;
use thiserror::Error;
use tracing::{Level, debug, info};
use tracing_subscriber::FmtSubscriber;

use oxide_dql::{
    CompiledExpression, CompiledQuery, DialectMode, Lexer, MemoryCatalog, ParseError, ParserConfig,
    TokenKind,
};
use oxide_dql::subquery::TableDerived;

/// Compile SQL query expressions without executing them.
#[derive(Parser)]
#[command(name = "oxide-dql")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON catalog describing schemas, tables, views, sequences and routines.
    /// An empty PUBLIC schema is used when omitted.
    #[arg(short, long, env = "OXIDE_DQL_CATALOG")]
    catalog: Option<PathBuf>,

    /// Vendor compatibility mode: standard, mysql, postgres, oracle or db2.
    #[arg(short, long, default_value_t = DialectMode::Standard)]
    dialect: DialectMode,

    /// Maximum subquery and parenthesis nesting.
    #[arg(long)]
    max_depth: Option<usize>,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a query expression.
    Query {
        /// SQL text; read from stdin when omitted.
        sql: Option<String>,

        /// Include the full compiled tree in the output.
        #[arg(long)]
        tree: bool,
    },

    /// Compile a standalone value expression.
    Expression {
        /// SQL text; read from stdin when omitted.
        sql: Option<String>,

        /// Include the full compiled tree in the output.
        #[arg(long)]
        tree: bool,
    },

    /// Print the token stream of a statement.
    Tokens {
        /// SQL text; read from stdin when omitted.
        sql: Option<String>,
    },
}

#[derive(Debug, Error)]
enum CliError {
    #[error("No SQL given on the command line or stdin")]
    EmptyInput,

    #[error("Failed to read stdin: {0}")]
    Stdin(#[from] std::io::Error),

    #[error("Failed to read catalog {path}: {source}")]
    CatalogFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{0}")]
    Compile(#[from] ParseError),
}

/// What the tool prints for a compiled statement.
#[derive(Serialize)]
struct Report<'a, T: Serialize> {
    sql: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    columns: Option<&'a [String]>,
    parameters: Vec<String>,
    sequences: &'a BTreeSet<String>,
    routines: &'a BTreeSet<String>,
    schema_objects: &'a BTreeSet<String>,
    materialization_order: Vec<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tree: Option<&'a T>,
}

fn query_report(compiled: &CompiledQuery, tree: bool) -> Report<'_, CompiledQuery> {
    let writer = compiled.writer();
    Report {
        sql: compiled.to_sql(),
        columns: compiled.result.as_ref().map(TableDerived::columns),
        parameters: compiled
            .parameters
            .iter()
            .map(|p| writer.expression(p))
            .collect(),
        sequences: &compiled.sequences,
        routines: &compiled.routines,
        schema_objects: &compiled.schema_objects,
        materialization_order: compiled.materialization_order.iter().map(|id| id.0).collect(),
        tree: tree.then_some(compiled),
    }
}

fn expression_report(compiled: &CompiledExpression, tree: bool) -> Report<'_, CompiledExpression> {
    let writer = compiled.writer();
    Report {
        sql: compiled.to_sql(),
        columns: None,
        parameters: compiled
            .parameters
            .iter()
            .map(|p| writer.expression(p))
            .collect(),
        sequences: &compiled.sequences,
        routines: &compiled.routines,
        schema_objects: &compiled.schema_objects,
        materialization_order: compiled.materialization_order.iter().map(|id| id.0).collect(),
        tree: tree.then_some(compiled),
    }
}

fn read_sql(sql: Option<String>) -> Result<String, CliError> {
    let sql = match sql {
        Some(sql) => sql,
        None => {
            let mut buffer = String::new();
            std::io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };
    let sql = sql.trim().trim_end_matches(';').trim_end().to_string();
    if sql.is_empty() {
        return Err(CliError::EmptyInput);
    }
    Ok(sql)
}

fn load_catalog(path: Option<&Path>) -> anyhow::Result<MemoryCatalog> {
    let Some(path) = path else {
        return Ok(MemoryCatalog::new("PUBLIC", "PUBLIC"));
    };
    let document = std::fs::read_to_string(path).map_err(|source| CliError::CatalogFile {
        path: path.to_path_buf(),
        source,
    })?;
    let catalog = MemoryCatalog::from_json(&document)?;
    info!("Loaded catalog from {}", path.display());
    Ok(catalog)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging; stdout carries the JSON output
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut config = ParserConfig::default().with_dialect(cli.dialect);
    if let Some(depth) = cli.max_depth {
        config = config.with_max_depth(depth);
    }
    debug!(dialect = %cli.dialect, "Parser configured");

    match cli.command {
        Commands::Query { sql, tree } => {
            let sql = read_sql(sql)?;
            let catalog = load_catalog(cli.catalog.as_deref())?;
            let compiled =
                oxide_dql::compile(&sql, &catalog, config).map_err(CliError::Compile)?;
            println!(
                "{}",
                serde_json::to_string_pretty(&query_report(&compiled, tree))?
            );
        }

        Commands::Expression { sql, tree } => {
            let sql = read_sql(sql)?;
            let catalog = load_catalog(cli.catalog.as_deref())?;
            let compiled = oxide_dql::compile_expression(&sql, &catalog, config)
                .map_err(CliError::Compile)?;
            println!(
                "{}",
                serde_json::to_string_pretty(&expression_report(&compiled, tree))?
            );
        }

        Commands::Tokens { sql } => {
            let sql = read_sql(sql)?;
            for token in Lexer::new(&sql).tokenize() {
                if token.kind == TokenKind::Eof {
                    break;
                }
                println!("{:>4}..{:<4} {:?}", token.span.start, token.span.end, token.kind);
            }
        }
    }

    Ok(())
}
