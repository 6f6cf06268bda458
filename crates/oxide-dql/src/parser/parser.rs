//! The statement compiler: token cursor, compile context and catalog.

use std::collections::BTreeSet;
use std::mem;

use serde::Serialize;
use tracing::debug;

use super::error::{describe, ParseError, ParseResult};
use super::operators::starts_query;
use super::resolve::Resolver;
use crate::ast::{Expr, QualifiedName, QueryExpression, SqlWriter};
use crate::catalog::Catalog;
use crate::config::ParserConfig;
use crate::context::{Checkpoint, CompileContext, RangeVariable, RangeVariableId};
use crate::lexer::{Keyword, Span, Token, TokenKind, TokenStream};
use crate::subquery::{IndexMode, Materializer, SubQuery, SubQueryId, TableDerived, TableRole};

/// The output of one successful compile.
///
/// Range variables and subqueries live in flat arenas; the tree refers to
/// them by id.
#[derive(Debug, Clone, Serialize)]
pub struct Compiled<T> {
    /// The compiled tree.
    pub root: T,
    /// Every range variable of the statement, indexed by [`RangeVariableId`].
    pub range_variables: Vec<RangeVariable>,
    /// Every subquery of the statement, indexed by [`SubQueryId`].
    pub subqueries: Vec<SubQuery>,
    /// Deepest-first evaluation order of the subqueries.
    pub materialization_order: Vec<SubQueryId>,
    /// Dynamic parameters in order of appearance.
    pub parameters: Vec<Expr>,
    /// Sequences referenced by `NEXT VALUE FOR` / `CURRENT VALUE FOR`.
    pub sequences: BTreeSet<String>,
    /// User routines called by the statement.
    pub routines: BTreeSet<String>,
    /// Every schema object the statement depends on.
    pub schema_objects: BTreeSet<String>,
    /// The table the statement's rows are delivered in. Only queries have
    /// one.
    pub result: Option<TableDerived>,
}

/// A compiled query expression.
pub type CompiledQuery = Compiled<QueryExpression>;

/// A compiled standalone value expression.
pub type CompiledExpression = Compiled<Expr>;

impl<T> Compiled<T> {
    /// Looks up a subquery.
    #[must_use]
    pub fn subquery(&self, id: SubQueryId) -> Option<&SubQuery> {
        self.subqueries.get(id.0)
    }

    /// Looks up a range variable.
    #[must_use]
    pub fn range_variable(&self, id: RangeVariableId) -> Option<&RangeVariable> {
        self.range_variables.get(id.0)
    }

    /// Subqueries in materialization order.
    pub fn subqueries_in_order(&self) -> impl Iterator<Item = &SubQuery> {
        self.materialization_order
            .iter()
            .filter_map(|id| self.subqueries.get(id.0))
    }

    /// A writer that renders this statement's trees back to SQL.
    #[must_use]
    pub fn writer(&self) -> SqlWriter<'_> {
        SqlWriter::new(&self.range_variables, &self.subqueries)
    }

    /// A materializer driving this statement's subqueries.
    #[must_use]
    pub fn materializer(&self) -> Materializer<'_> {
        Materializer::new(&self.subqueries, self.materialization_order.clone())
    }
}

impl CompiledQuery {
    /// Renders the compiled query as SQL.
    #[must_use]
    pub fn to_sql(&self) -> String {
        self.writer().query(&self.root)
    }
}

impl CompiledExpression {
    /// Renders the compiled expression as SQL.
    #[must_use]
    pub fn to_sql(&self) -> String {
        self.writer().expression(&self.root)
    }
}

/// SQL query compiler.
///
/// One parser compiles one statement at a time. It owns the token cursor
/// and the compile context; the catalog is shared and only read.
pub struct Parser<'c> {
    pub(super) stream: TokenStream,
    pub(super) ctx: CompileContext,
    pub(super) catalog: &'c dyn Catalog,
    pub(super) config: ParserConfig,
    /// Open parentheses in value and table expressions.
    nesting: usize,
}

impl<'c> Parser<'c> {
    /// Creates a parser with the default configuration.
    #[must_use]
    pub fn new(sql: &str, catalog: &'c dyn Catalog) -> Self {
        Self::with_config(sql, catalog, ParserConfig::default())
    }

    /// Creates a parser with an explicit configuration.
    #[must_use]
    pub fn with_config(sql: &str, catalog: &'c dyn Catalog, config: ParserConfig) -> Self {
        Self {
            stream: TokenStream::new(sql),
            ctx: CompileContext::new(config.max_depth),
            catalog,
            config,
            nesting: 0,
        }
    }

    /// Loads new statement text. Nothing from the previous statement,
    /// including WITH names, survives.
    pub fn reset(&mut self, sql: &str) {
        self.stream = TokenStream::new(sql);
        self.ctx.reset();
        self.nesting = 0;
    }

    /// The configuration in use.
    #[must_use]
    pub const fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// The compile context of the statement in progress.
    #[must_use]
    pub const fn context(&self) -> &CompileContext {
        &self.ctx
    }

    /// Saves the current cursor and context state.
    pub fn mark(&self) -> Checkpoint {
        Checkpoint::capture(&self.stream, &self.ctx)
    }

    /// Rewinds the cursor and the context to a saved state.
    pub fn restore(&mut self, checkpoint: Checkpoint) {
        checkpoint.restore(&mut self.stream, &mut self.ctx);
    }

    /// Compiles the statement as a query expression.
    ///
    /// # Errors
    ///
    /// Returns the most specific error found if the statement is not a
    /// valid query for the catalog and dialect in use.
    pub fn compile_query(&mut self) -> ParseResult<CompiledQuery> {
        self.begin()?;
        if !starts_query(self.stream.peek()) && !self.check(&TokenKind::LeftParen) {
            return Err(self.unexpected("SELECT, VALUES, TABLE, WITH or ("));
        }
        let query = self.parse_query_expression()?;
        self.finish_statement()?;
        let mut compiled = self.finish(query, false, |resolver, query| {
            resolver.resolve_query(query)
        })?;
        compiled.result = Some(TableDerived::new(
            "RESULT",
            TableRole::Result,
            compiled.root.columns.clone(),
            IndexMode::None,
        ));
        debug!(
            subqueries = compiled.subqueries.len(),
            range_variables = compiled.range_variables.len(),
            parameters = compiled.parameters.len(),
            "Compiled query"
        );
        Ok(compiled)
    }

    /// Compiles the statement as a standalone value expression. Column
    /// references that nothing binds are left free.
    ///
    /// # Errors
    ///
    /// Returns an error if the statement is not a valid expression.
    pub fn compile_expression(&mut self) -> ParseResult<CompiledExpression> {
        self.begin()?;
        let expr = self.parse_expression()?;
        self.finish_statement()?;
        let compiled = self.finish(expr, true, |resolver, expr| {
            resolver.resolve_expression(expr)
        })?;
        debug!(
            subqueries = compiled.subqueries.len(),
            parameters = compiled.parameters.len(),
            "Compiled expression"
        );
        Ok(compiled)
    }

    /// Starts a compile from the first token with an empty context.
    fn begin(&mut self) -> ParseResult<()> {
        self.stream.reset(0);
        self.ctx = CompileContext::new(self.config.max_depth);
        self.nesting = 0;
        if let Some(token) = self.stream.first_error() {
            return Err(ParseError::unexpected("a valid token", token));
        }
        Ok(())
    }

    /// Accepts an optional `;` and requires the end of input.
    fn finish_statement(&mut self) -> ParseResult<()> {
        self.eat(&TokenKind::Semicolon);
        if self.stream.current().is_eof() {
            return Ok(());
        }
        if let Some(error) = self.ctx.take_last_error() {
            if error.span.start >= self.stream.current().span.start {
                return Err(error);
            }
        }
        Err(self.unexpected("end of input"))
    }

    /// Moves the context's registries out and runs name resolution.
    fn finish<T>(
        &mut self,
        mut root: T,
        allow_free: bool,
        resolve: impl FnOnce(&mut Resolver<'_>, &mut T) -> ParseResult<()>,
    ) -> ParseResult<Compiled<T>> {
        let parameters = self.ctx.take_parameters();
        let sequences = self.ctx.sequences();
        let routines = self.ctx.routines();
        let schema_objects = self.ctx.schema_object_names();
        let materialization_order = self.ctx.materialization_order();
        let ctx = mem::replace(&mut self.ctx, CompileContext::new(self.config.max_depth));
        let (mut range_variables, mut subqueries) = ctx.into_parts();

        let mut resolver = Resolver::new(&mut range_variables, &mut subqueries, allow_free);
        resolve(&mut resolver, &mut root)?;
        resolver.finish();

        Ok(Compiled {
            root,
            range_variables,
            subqueries,
            materialization_order,
            parameters,
            sequences,
            routines,
            schema_objects,
            result: None,
        })
    }

    // --- Speculation ---

    /// Runs a production that may not apply. On failure the cursor and the
    /// context are rewound to where the production started.
    pub(super) fn speculate<T>(
        &mut self,
        production: impl FnOnce(&mut Self) -> ParseResult<T>,
    ) -> ParseResult<T> {
        let checkpoint = self.mark();
        let nesting = self.nesting;
        let result = production(self);
        if let Err(error) = &result {
            debug!(
                position = checkpoint.position(),
                message = %error.message,
                "Speculative parse failed, rewinding"
            );
            self.restore(checkpoint);
            self.nesting = nesting;
        }
        result
    }

    /// Chooses the error to report when both a speculative production and
    /// its fallback failed.
    pub(super) fn best_failure(&mut self, speculative: ParseError, fallback: ParseError) -> ParseError {
        self.ctx.record_failure(speculative);
        self.ctx.record_failure(fallback.clone());
        self.ctx.take_last_error().unwrap_or(fallback)
    }

    /// Returns true if the cursor is at one or more `(` followed by the
    /// start of a query.
    pub(super) fn subquery_follows(&self) -> bool {
        let mut n = 0;
        while matches!(self.stream.peek_nth(n), TokenKind::LeftParen) {
            n += 1;
        }
        n > 0 && starts_query(self.stream.peek_nth(n))
    }

    /// Runs `f` one parenthesis level deeper.
    pub(super) fn nested<T>(
        &mut self,
        span: Span,
        f: impl FnOnce(&mut Self) -> ParseResult<T>,
    ) -> ParseResult<T> {
        if self.nesting >= self.config.max_depth {
            return Err(self.syntax_error(
                format!(
                    "Expression nesting exceeds the limit of {}",
                    self.config.max_depth
                ),
                span,
            ));
        }
        self.nesting += 1;
        let result = f(self);
        self.nesting -= 1;
        result
    }

    // --- Helper methods ---

    /// The current token kind.
    pub(super) fn peek(&self) -> &TokenKind {
        self.stream.peek()
    }

    /// The token kind `n` places ahead of the cursor.
    pub(super) fn peek_nth(&self, n: usize) -> &TokenKind {
        self.stream.peek_nth(n)
    }

    /// The current keyword, if the current token is one.
    pub(super) fn keyword(&self) -> Option<Keyword> {
        self.stream.current().as_keyword()
    }

    /// Checks if the current token matches the given kind.
    pub(super) fn check(&self, kind: &TokenKind) -> bool {
        mem::discriminant(self.peek()) == mem::discriminant(kind)
    }

    /// Checks if the current token is the given keyword.
    pub(super) fn check_keyword(&self, keyword: Keyword) -> bool {
        self.keyword() == Some(keyword)
    }

    /// Checks if the token `n` places ahead is the given keyword.
    pub(super) fn check_keyword_nth(&self, n: usize, keyword: Keyword) -> bool {
        matches!(self.peek_nth(n), TokenKind::Keyword(kw) if *kw == keyword)
    }

    /// Consumes the current token if it matches the given kind.
    pub(super) fn eat(&mut self, kind: &TokenKind) -> bool {
        let matched = self.check(kind);
        if matched {
            self.stream.advance();
        }
        matched
    }

    /// Consumes the current token if it is the given keyword.
    pub(super) fn eat_keyword(&mut self, keyword: Keyword) -> bool {
        let matched = self.check_keyword(keyword);
        if matched {
            self.stream.advance();
        }
        matched
    }

    /// Expects the current token to be the given kind.
    pub(super) fn expect(&mut self, kind: &TokenKind) -> ParseResult<Token> {
        if self.check(kind) {
            Ok(self.stream.advance())
        } else {
            Err(self.unexpected(describe(kind)))
        }
    }

    /// Expects the current token to be the given keyword.
    pub(super) fn expect_keyword(&mut self, keyword: Keyword) -> ParseResult<Token> {
        if self.check_keyword(keyword) {
            Ok(self.stream.advance())
        } else {
            Err(self.unexpected(keyword.as_str()))
        }
    }

    /// Expects and returns a name: an identifier or a non-reserved keyword.
    pub(super) fn expect_name(&mut self) -> ParseResult<String> {
        match self.peek().name_text() {
            Some(name) => {
                self.stream.advance();
                Ok(name)
            }
            None => Err(self.unexpected("identifier")),
        }
    }

    /// Parses `name { . name }`, stopping before a `.*`.
    pub(super) fn parse_name_chain(&mut self) -> ParseResult<(Vec<String>, Span)> {
        let start = self.stream.current().span;
        let mut parts = vec![self.expect_name()?];
        while matches!(self.peek(), TokenKind::Dot) && self.peek_nth(1).is_name() {
            self.stream.advance();
            parts.push(self.expect_name()?);
        }
        Ok((parts, self.span_from(start)))
    }

    /// Parses `( name, ... )`, rejecting repeated names.
    pub(super) fn parse_column_name_list(&mut self) -> ParseResult<Vec<String>> {
        self.expect(&TokenKind::LeftParen)?;
        let mut names: Vec<String> = Vec::new();
        loop {
            let span = self.stream.current().span;
            let name = self.expect_name()?;
            if names.contains(&name) {
                return Err(self.semantic_error(format!("Duplicate column name: {name}"), span));
            }
            names.push(name);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RightParen)?;
        Ok(names)
    }

    /// Resolves the schema of a (possibly qualified) object name. A catalog
    /// prefix must name the default catalog.
    pub(super) fn resolve_schema(&self, name: &QualifiedName, span: Span) -> ParseResult<String> {
        if let Some(catalog) = &name.catalog {
            if catalog != self.catalog.default_catalog_name() {
                return Err(self.catalog_error(format!("Unknown catalog: {catalog}"), span));
            }
        }
        self.catalog
            .current_schema_name(name.schema.as_deref())
            .ok_or_else(|| {
                self.catalog_error(
                    format!("Unknown schema: {}", name.schema.as_deref().unwrap_or("")),
                    span,
                )
            })
    }

    /// Span from `start` to the end of the last consumed token.
    pub(super) fn span_from(&self, start: Span) -> Span {
        self.stream
            .previous()
            .map_or(start, |token| start.merge(token.span))
    }

    // --- Errors ---

    /// An "unexpected token" error at the cursor.
    pub(super) fn unexpected(&self, expected: impl Into<String>) -> ParseError {
        ParseError::unexpected(expected, self.stream.current()).at_depth(self.ctx.depth())
    }

    pub(super) fn syntax_error(&self, message: impl Into<String>, span: Span) -> ParseError {
        ParseError::syntax(message, span).at_depth(self.ctx.depth())
    }

    pub(super) fn semantic_error(&self, message: impl Into<String>, span: Span) -> ParseError {
        ParseError::semantic(message, span).at_depth(self.ctx.depth())
    }

    pub(super) fn catalog_error(&self, message: impl Into<String>, span: Span) -> ParseError {
        ParseError::catalog(message, span).at_depth(self.ctx.depth())
    }

    pub(super) fn unsupported(&self, message: impl Into<String>, span: Span) -> ParseError {
        ParseError::unsupported(message, span).at_depth(self.ctx.depth())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{ExprKind, QueryBody};
    use crate::parser::fixtures::catalog;
    use crate::parser::ErrorKind;
    use crate::subquery::SubQueryMode;

    fn compile(sql: &str) -> ParseResult<CompiledQuery> {
        let catalog = catalog();
        Parser::new(sql, &catalog).compile_query()
    }

    #[test]
    fn test_simple_select() {
        let compiled = compile("SELECT id, name FROM users").unwrap();
        assert_eq!(compiled.root.columns, vec!["ID", "NAME"]);
        assert_eq!(compiled.range_variables.len(), 1);
        assert!(compiled.schema_objects.contains("PUBLIC.USERS"));
    }

    #[test]
    fn test_query_has_result_table() {
        let compiled = compile("SELECT id, name FROM users").unwrap();
        let result = compiled.result.as_ref().unwrap();
        assert_eq!(result.role(), TableRole::Result);
        assert_eq!(result.columns(), compiled.root.columns.as_slice());
        assert_eq!(result.index(), IndexMode::None);

        let catalog = catalog();
        let expression = Parser::new("1 + 2", &catalog).compile_expression().unwrap();
        assert!(expression.result.is_none());
    }

    #[test]
    fn test_trailing_semicolon_and_garbage() {
        assert!(compile("SELECT 1;").is_ok());
        let err = compile("SELECT 1 2").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Syntax);
    }

    #[test]
    fn test_lexical_error_reported_first() {
        let err = compile("SELECT 'unterminated FROM users").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Lexical);
    }

    #[test]
    fn test_not_a_query() {
        let err = compile("DELETE FROM users").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Syntax);
        assert!(err.message.contains("SELECT"));
    }

    #[test]
    fn test_failed_speculation_leaves_no_trace() {
        let catalog = catalog();
        let mut parser = Parser::new("(SELECT id FROM users WHERE) + 1", &catalog);
        parser.stream.reset(0);
        let before = parser.mark();
        let result = parser.speculate(|p| p.parse_subquery(SubQueryMode::Plain));
        assert!(result.is_err());
        assert_eq!(parser.stream.position(), before.position());
        assert!(parser.ctx.range_variables().is_empty());
        assert!(parser.ctx.subqueries().is_empty());
        assert_eq!(parser.ctx.depth(), 0);
        assert_eq!(parser.ctx.parameter_count(), 0);
        assert!(parser.ctx.schema_object_names().is_empty());
    }

    #[test]
    fn test_speculation_rewinds_parameters() {
        let catalog = catalog();
        let mut parser = Parser::new("(SELECT ? FROM users WHERE id = ?) junk", &catalog);
        parser.stream.reset(0);
        let result = parser.speculate(|p| {
            p.parse_subquery(SubQueryMode::Plain)?;
            Err::<(), _>(p.unexpected("end of input"))
        });
        assert!(result.is_err());
        assert_eq!(parser.ctx.parameter_count(), 0);
        assert!(parser.ctx.subqueries().is_empty());
    }

    #[test]
    fn test_reset_forgets_with_names() {
        let catalog = catalog();
        let mut parser = Parser::new("WITH w AS (SELECT 1 AS x) SELECT x FROM w", &catalog);
        assert!(parser.compile_query().is_ok());
        parser.reset("SELECT x FROM w");
        let err = parser.compile_query().unwrap_err();
        assert_eq!(err.kind, ErrorKind::Catalog);
    }

    #[test]
    fn test_compile_expression_allows_free_columns() {
        let catalog = catalog();
        let mut parser = Parser::new("a + 1 > ?", &catalog);
        let compiled = parser.compile_expression().unwrap();
        assert_eq!(compiled.parameters.len(), 1);
        assert_eq!(compiled.to_sql(), "A + 1 > ?");
        assert!(matches!(compiled.root.kind, ExprKind::Binary { .. }));
    }

    #[test]
    fn test_depth_limit() {
        let catalog = catalog();
        let config = ParserConfig::default().with_max_depth(2);
        let sql = "SELECT (SELECT (SELECT (SELECT 1)))";
        let err = Parser::with_config(sql, &catalog, config)
            .compile_query()
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Syntax);
        assert!(err.message.contains("Query nesting"));
    }

    #[test]
    fn test_parenthesis_nesting_limit() {
        let catalog = catalog();
        let sql = format!("SELECT {}1{}", "(".repeat(200), ")".repeat(200));
        let err = Parser::new(&sql, &catalog).compile_query().unwrap_err();
        assert!(err.message.contains("nesting"));
    }

    #[test]
    fn test_compiled_lookups() {
        let compiled = compile("SELECT id FROM users WHERE EXISTS (SELECT 1 FROM orders)").unwrap();
        let QueryBody::Specification(spec) = &compiled.root.body else {
            panic!("expected a query specification");
        };
        let Some(selection) = &spec.selection else {
            panic!("expected a WHERE clause");
        };
        let ExprKind::Exists(id) = selection.kind else {
            panic!("expected EXISTS");
        };
        assert_eq!(compiled.subquery(id).map(SubQuery::mode), Some(SubQueryMode::Exists));
        assert_eq!(compiled.subqueries_in_order().count(), 1);
        assert!(compiled.range_variable(spec.from[0]).is_some());
    }
}
