//! # oxide-dql
//!
//! A compiler for SQL query expressions.
//!
//! This crate provides:
//! - A hand-written recursive descent parser over a rewindable token stream
//! - A compile context that tracks range variables, parameters and schema
//!   dependencies, and rewinds them together with the token cursor
//! - Subquery descriptors with derived tables and a materializer that
//!   re-runs correlated subqueries once per outer row
//!
//! ## Compiling a query
//!
//! Names are resolved against a [`Catalog`]. [`MemoryCatalog`] is the
//! in-memory implementation used by tests and the command-line tool:
//!
//! ```rust
//! use oxide_dql::ast::DataType;
//! use oxide_dql::catalog::{ColumnDescriptor, MemoryCatalog, TableDescriptor};
//! use oxide_dql::{compile, ParserConfig};
//!
//! let catalog = MemoryCatalog::new("PUBLIC", "PUBLIC");
//! catalog
//!     .add_table(TableDescriptor::new(
//!         "PUBLIC",
//!         "USERS",
//!         vec![
//!             ColumnDescriptor::new("ID", DataType::Integer),
//!             ColumnDescriptor::new("NAME", DataType::Varchar(Some(100))),
//!         ],
//!     ))
//!     .unwrap();
//!
//! let compiled = compile(
//!     "SELECT name FROM users WHERE id BETWEEN ? AND ? LIMIT 10",
//!     &catalog,
//!     ParserConfig::default(),
//! )
//! .unwrap();
//!
//! assert_eq!(compiled.root.columns, vec!["NAME"]);
//! assert_eq!(compiled.parameters.len(), 2);
//! assert!(compiled.schema_objects.contains("PUBLIC.USERS"));
//! ```
//!
//! ## Errors
//!
//! Every failure is a [`ParseError`] with a [`ErrorKind`], the source span
//! and the subquery depth it was raised at. When several alternatives of an
//! ambiguous construct fail, the error from the deepest one is reported.

pub mod ast;
pub mod catalog;
pub mod config;
pub mod context;
pub mod dialect;
pub mod eval;
pub mod lexer;
pub mod parser;
pub mod subquery;

pub use ast::{Expr, QueryExpression};
pub use catalog::{Catalog, MemoryCatalog};
pub use config::ParserConfig;
pub use dialect::{Dialect, DialectMode};
pub use lexer::{Lexer, Token, TokenKind};
pub use parser::{CompiledExpression, CompiledQuery, ErrorKind, ParseError, ParseResult, Parser};
pub use subquery::{Materializer, QueryExecutor};

/// Compiles one query expression.
///
/// # Errors
///
/// Returns the most specific [`ParseError`] if `sql` is not a valid query
/// for `catalog` under `config`.
pub fn compile(sql: &str, catalog: &dyn Catalog, config: ParserConfig) -> ParseResult<CompiledQuery> {
    Parser::with_config(sql, catalog, config).compile_query()
}

/// Compiles one standalone value expression, such as a CHECK condition.
///
/// # Errors
///
/// Returns a [`ParseError`] if `sql` is not a valid expression.
pub fn compile_expression(
    sql: &str,
    catalog: &dyn Catalog,
    config: ParserConfig,
) -> ParseResult<CompiledExpression> {
    Parser::with_config(sql, catalog, config).compile_expression()
}
