//! Subquery descriptors.

use core::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use super::table::{IndexMode, TableDerived, TableRole};
use crate::ast::{Expr, QueryExpression};
use crate::catalog::TableDescriptor;
use crate::parser::{ParseError, ParseResult};

/// Index of a subquery in the compile context's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct SubQueryId(pub usize);

impl fmt::Display for SubQueryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// How a subquery's result is consumed. Fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SubQueryMode {
    /// `EXISTS (...)`
    Exists,
    /// `IN (...)`, `= ANY (...)`, `= SOME (...)`
    Unique,
    /// `ALL (...)`, `UNIQUE (...)`, `MATCH UNIQUE`
    FullOrder,
    /// Scalar subqueries and derived tables.
    Plain,
    /// A bare `VALUES` list evaluated without the execution engine.
    DataExpression,
    /// Rows of a view.
    View,
    /// A `WITH RECURSIVE` query.
    Recursive,
}

impl SubQueryMode {
    /// The index configuration this mode requires.
    #[must_use]
    pub const fn index_mode(&self) -> IndexMode {
        match self {
            Self::Exists | Self::Unique => IndexMode::UniqueRows,
            Self::FullOrder => IndexMode::FullOrder,
            Self::Plain | Self::DataExpression | Self::View | Self::Recursive => IndexMode::None,
        }
    }
}

/// Where a subquery's rows come from. A subquery holds exactly one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SubQuerySource {
    /// A query expression executed by the engine.
    Query(Box<QueryExpression>),
    /// A row-value list evaluated directly.
    Rows(Vec<Vec<Expr>>),
    /// A view read through the executor.
    View(Arc<TableDescriptor>),
}

/// One parenthesized query expression or table-valued expression.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubQuery {
    id: SubQueryId,
    mode: SubQueryMode,
    source: SubQuerySource,
    level: usize,
    correlated: bool,
    name: Option<String>,
    declared_columns: Option<Vec<String>>,
    table: Option<TableDerived>,
    position: usize,
}

impl SubQuery {
    /// Creates an unresolved subquery. `level` is the nesting depth of its
    /// body and `position` the token position it was created at.
    #[must_use]
    pub const fn new(
        mode: SubQueryMode,
        source: SubQuerySource,
        level: usize,
        position: usize,
    ) -> Self {
        Self {
            id: SubQueryId(0),
            mode,
            source,
            level,
            correlated: false,
            name: None,
            declared_columns: None,
            table: None,
            position,
        }
    }

    /// Wraps a parsed query expression. A bare `VALUES` list becomes a row
    /// source, and a plain one switches to data-expression mode.
    #[must_use]
    pub fn from_query(
        mode: SubQueryMode,
        query: QueryExpression,
        level: usize,
        position: usize,
    ) -> Self {
        if query.is_bare_values() {
            if let crate::ast::QueryBody::Values(values) = query.body {
                let mode = if mode == SubQueryMode::Plain {
                    SubQueryMode::DataExpression
                } else {
                    mode
                };
                let mut subquery = Self::new(mode, SubQuerySource::Rows(values.rows), level, position);
                subquery.declared_columns = Some(values.columns);
                return subquery;
            }
        }
        Self::new(mode, SubQuerySource::Query(Box::new(query)), level, position)
    }

    /// Creates a view-backed subquery.
    #[must_use]
    pub fn from_view(view: Arc<TableDescriptor>, level: usize, position: usize) -> Self {
        let name = view.name.clone();
        let mut subquery = Self::new(SubQueryMode::View, SubQuerySource::View(view), level, position);
        subquery.name = Some(name);
        subquery
    }

    pub(crate) fn set_id(&mut self, id: SubQueryId) {
        self.id = id;
    }

    /// Arena id.
    #[must_use]
    pub const fn id(&self) -> SubQueryId {
        self.id
    }

    /// Consumption mode.
    #[must_use]
    pub const fn mode(&self) -> SubQueryMode {
        self.mode
    }

    /// The row source.
    #[must_use]
    pub const fn source(&self) -> &SubQuerySource {
        &self.source
    }

    /// The query expression, for query-backed subqueries.
    #[must_use]
    pub fn query(&self) -> Option<&QueryExpression> {
        match &self.source {
            SubQuerySource::Query(q) => Some(q),
            _ => None,
        }
    }

    pub(crate) fn query_mut(&mut self) -> Option<&mut QueryExpression> {
        match &mut self.source {
            SubQuerySource::Query(q) => Some(q),
            _ => None,
        }
    }

    pub(crate) fn rows_mut(&mut self) -> Option<&mut Vec<Vec<Expr>>> {
        match &mut self.source {
            SubQuerySource::Rows(rows) => Some(rows),
            _ => None,
        }
    }

    /// Replaces the seed of a recursive subquery with the complete
    /// `seed UNION recursive-term` expression.
    pub(crate) fn complete_recursive(&mut self, query: QueryExpression) {
        if self.mode == SubQueryMode::Recursive {
            self.source = SubQuerySource::Query(Box::new(query));
        }
    }

    /// Nesting depth of the subquery body.
    #[must_use]
    pub const fn level(&self) -> usize {
        self.level
    }

    /// True when the subquery reads a column of an enclosing query.
    #[must_use]
    pub const fn is_correlated(&self) -> bool {
        self.correlated
    }

    pub(crate) fn mark_correlated(&mut self) {
        if !self.correlated {
            debug!(id = self.id.0, "Subquery marked correlated");
        }
        self.correlated = true;
    }

    /// WITH name or view name.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub(crate) fn set_name(&mut self, name: impl Into<String>) {
        self.name = Some(name.into());
    }

    /// Explicit column list from `WITH x(a, b)` or `AS t(a, b)`.
    #[must_use]
    pub fn declared_columns(&self) -> Option<&[String]> {
        self.declared_columns.as_deref()
    }

    pub(crate) fn set_declared_columns(&mut self, columns: Vec<String>) {
        self.declared_columns = Some(columns);
    }

    /// Token position the subquery was created at.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.position
    }

    /// The backing table, once prepared.
    #[must_use]
    pub const fn table(&self) -> Option<&TableDerived> {
        self.table.as_ref()
    }

    /// True once the backing table has been prepared.
    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        self.table.is_some()
    }

    /// Declaration order of the backing view, for view-backed subqueries.
    #[must_use]
    pub fn view_order(&self) -> Option<usize> {
        match &self.source {
            SubQuerySource::View(view) => view.view.as_ref().map(|v| v.declaration_order),
            _ => None,
        }
    }

    /// Number of columns the source produces.
    #[must_use]
    pub fn source_degree(&self) -> usize {
        match &self.source {
            SubQuerySource::Query(q) => q.degree(),
            SubQuerySource::Rows(rows) => rows.first().map_or(0, Vec::len),
            SubQuerySource::View(view) => view.columns.len(),
        }
    }

    fn source_columns(&self) -> Vec<String> {
        match &self.source {
            SubQuerySource::Query(q) => q.columns.clone(),
            SubQuerySource::Rows(_) => (1..=self.source_degree()).map(|i| format!("C{i}")).collect(),
            SubQuerySource::View(view) => view.column_names(),
        }
    }

    /// Fixes the backing table: column names and index configuration.
    ///
    /// Column names come from `column_names`, else the declared column
    /// list, else the source. Later calls are no-ops.
    ///
    /// # Errors
    ///
    /// Returns a semantic error if the column list does not match the
    /// source degree.
    pub fn prepare_table(&mut self, column_names: Option<&[String]>) -> ParseResult<()> {
        if self.is_resolved() {
            return Ok(());
        }
        let columns = match column_names.or(self.declared_columns.as_deref()) {
            Some(names) => {
                let degree = self.source_degree();
                if names.len() != degree {
                    return Err(ParseError::semantic(
                        format!(
                            "Column list of {} names does not match subquery degree {degree}",
                            names.len()
                        ),
                        crate::lexer::Span::ZERO,
                    )
                    .at_depth(self.level));
                }
                names.to_vec()
            }
            None => self.source_columns(),
        };
        let (name, role) = match self.mode {
            SubQueryMode::View => (
                self.name.clone().unwrap_or_default(),
                TableRole::View,
            ),
            _ => (
                self.name
                    .clone()
                    .unwrap_or_else(|| format!("SYSTEM_SUBQUERY_{}", self.id.0)),
                TableRole::SubqueryTemp,
            ),
        };
        let table = TableDerived::new(name, role, columns, self.mode.index_mode());
        debug!(
            id = self.id.0,
            mode = ?self.mode,
            columns = table.degree(),
            "Prepared subquery table"
        );
        self.table = Some(table);
        Ok(())
    }
}
