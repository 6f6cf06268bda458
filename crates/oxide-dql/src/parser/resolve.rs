//! Column resolution and correlation detection.
//!
//! Runs once the whole statement has been parsed, when every range
//! variable and subquery is known. Each query specification opens a scope
//! over its FROM list; a column binds to the innermost scope that has it.
//! A subquery whose columns bind outside its own scopes is correlated.

use std::collections::{BTreeSet, HashSet};
use std::mem;

use tracing::trace;

use super::error::{ParseError, ParseResult};
use crate::ast::{
    ColumnBinding, ColumnRef, Expr, ExprKind, OrderByItem, QueryBody, QueryExpression,
    QuerySpecification,
};
use crate::context::{RangeVariable, RangeVariableId};
use crate::lexer::Span;
use crate::subquery::{SubQuery, SubQueryId, SubQueryMode, SubQuerySource};

#[derive(Debug)]
struct Scope {
    ranges: Vec<RangeVariableId>,
    /// Length of the subquery stack when the scope was opened.
    entered: usize,
}

/// Binds column references over the arenas of one compiled statement.
pub(crate) struct Resolver<'a> {
    ranges: &'a mut [RangeVariable],
    subqueries: &'a mut [SubQuery],
    scopes: Vec<Scope>,
    stack: Vec<SubQueryId>,
    visited: HashSet<SubQueryId>,
    correlated: BTreeSet<SubQueryId>,
    allow_free: bool,
}

impl<'a> Resolver<'a> {
    /// With `allow_free`, a column nothing binds is left unbound instead of
    /// failing the compile.
    pub(crate) fn new(
        ranges: &'a mut [RangeVariable],
        subqueries: &'a mut [SubQuery],
        allow_free: bool,
    ) -> Self {
        Self {
            ranges,
            subqueries,
            scopes: Vec::new(),
            stack: Vec::new(),
            visited: HashSet::new(),
            correlated: BTreeSet::new(),
            allow_free,
        }
    }

    /// Resolves a query expression in the current scopes.
    pub(crate) fn resolve_query(&mut self, query: &mut QueryExpression) -> ParseResult<()> {
        for &id in &query.with {
            self.resolve_subquery(id)?;
        }
        match &mut query.body {
            QueryBody::Specification(spec) => self.resolve_specification(spec, &mut query.order_by)?,
            body => self.resolve_body(body)?,
        }
        if let Some(limit) = &mut query.limit {
            for expr in limit.offset.iter_mut().chain(limit.count.iter_mut()) {
                self.resolve_expression(expr)?;
            }
        }
        Ok(())
    }

    fn resolve_body(&mut self, body: &mut QueryBody) -> ParseResult<()> {
        match body {
            QueryBody::Specification(spec) => self.resolve_specification(spec, &mut []),
            QueryBody::Values(values) => values
                .rows
                .iter_mut()
                .flatten()
                .try_for_each(|expr| self.resolve_expression(expr)),
            QueryBody::Table(_) => Ok(()),
            QueryBody::SetOperation(op) => {
                self.resolve_body(&mut op.left)?;
                self.resolve_body(&mut op.right)
            }
            QueryBody::Nested(query) => self.resolve_query(query),
        }
    }

    fn resolve_specification(
        &mut self,
        spec: &mut QuerySpecification,
        order_by: &mut [OrderByItem],
    ) -> ParseResult<()> {
        for &id in &spec.from {
            if let Some(subquery) = self.ranges.get(id.0).and_then(RangeVariable::subquery) {
                self.resolve_subquery(subquery)?;
            }
        }

        for (i, &id) in spec.from.iter().enumerate() {
            let Some(join) = self.ranges.get_mut(id.0).and_then(|r| r.join.as_mut()) else {
                continue;
            };
            let width = join.width.max(1);
            let Some(mut condition) = join.condition.take() else {
                continue;
            };
            let end = (i + width).min(spec.from.len());
            self.push_scope(spec.from[..end].to_vec());
            let result = self.resolve_expression(&mut condition);
            self.pop_scope();
            if let Some(join) = self.ranges.get_mut(id.0).and_then(|r| r.join.as_mut()) {
                join.condition = Some(condition);
            }
            result?;
        }

        self.push_scope(spec.from.clone());
        let result = self.resolve_clauses(spec, order_by);
        self.pop_scope();
        result
    }

    fn resolve_clauses(
        &mut self,
        spec: &mut QuerySpecification,
        order_by: &mut [OrderByItem],
    ) -> ParseResult<()> {
        for expr in &mut spec.select_list {
            self.resolve_expression(expr)?;
        }
        if let Some(selection) = &mut spec.selection {
            self.resolve_expression(selection)?;
        }
        for expr in &mut spec.group_by {
            self.resolve_expression(expr)?;
        }
        if let Some(having) = &mut spec.having {
            self.resolve_expression(having)?;
        }
        for item in order_by.iter_mut().filter(|item| item.position.is_none()) {
            self.resolve_expression(&mut item.expr)?;
        }
        Ok(())
    }

    /// Resolves the body of a subquery once. The subquery is taken out of
    /// the arena while its body is walked.
    fn resolve_subquery(&mut self, id: SubQueryId) -> ParseResult<()> {
        if !self.visited.insert(id) {
            return Ok(());
        }
        let Some(slot) = self.subqueries.get_mut(id.0) else {
            return Ok(());
        };
        let placeholder = SubQuery::new(SubQueryMode::Plain, SubQuerySource::Rows(Vec::new()), 0, 0);
        let mut subquery = mem::replace(slot, placeholder);

        self.stack.push(id);
        let result = if let Some(query) = subquery.query_mut() {
            self.resolve_query(query)
        } else if let Some(rows) = subquery.rows_mut() {
            rows.iter_mut()
                .flatten()
                .try_for_each(|expr| self.resolve_expression(expr))
        } else {
            Ok(())
        };
        self.stack.pop();

        self.subqueries[id.0] = subquery;
        result
    }

    /// Binds every column reference in `expr` and resolves the subqueries
    /// it uses.
    pub(crate) fn resolve_expression(&mut self, expr: &mut Expr) -> ParseResult<()> {
        let span = expr.span;
        if let ExprKind::Column(column) = &mut expr.kind {
            if column.binding.is_none() {
                column.binding = self.bind(column, span)?;
            }
            return Ok(());
        }
        if let Some(id) = expr.subquery() {
            self.resolve_subquery(id)?;
        }
        let mut result = Ok(());
        expr.for_each_child_mut(|child| {
            if result.is_ok() {
                result = self.resolve_expression(child);
            }
        });
        result
    }

    fn bind(&mut self, column: &ColumnRef, span: Span) -> ParseResult<Option<ColumnBinding>> {
        let innermost = self.scopes.len();
        for level in (0..innermost).rev() {
            let Some((range_variable, index)) = self.lookup(level, column, span)? else {
                continue;
            };
            let entered = self.scopes[level].entered;
            self.correlated.extend(self.stack[entered..].iter().copied());
            trace!(
                column = %column.name,
                range_variable = range_variable.0,
                level,
                "Bound column"
            );
            return Ok(Some(ColumnBinding {
                range_variable,
                index,
                outer: level + 1 < innermost,
            }));
        }
        if self.allow_free {
            self.correlated.extend(self.stack.iter().copied());
            return Ok(None);
        }
        Err(self.error(format!("Column not found: {}", display_name(column)), span))
    }

    /// Looks a column up in one scope. A qualifier that names a range
    /// variable without that column ends the search.
    fn lookup(
        &self,
        level: usize,
        column: &ColumnRef,
        span: Span,
    ) -> ParseResult<Option<(RangeVariableId, usize)>> {
        let mut qualified_match = false;
        let mut hits: Vec<(RangeVariableId, usize, bool)> = Vec::new();
        for range in self.scopes[level]
            .ranges
            .iter()
            .filter_map(|id| self.ranges.get(id.0))
        {
            if !column.qualifier.is_empty() {
                if !range.matches_qualifier(&column.qualifier) {
                    continue;
                }
                qualified_match = true;
            }
            if let Some(index) = range.find_column(&column.name) {
                hits.push((range.id, index, range.is_merged_column(&column.name)));
            }
        }
        if hits.len() > 1 && hits.iter().any(|(_, _, merged)| !merged) {
            hits.retain(|(_, _, merged)| !merged);
        }
        match hits.as_slice() {
            [] if qualified_match => Err(self.error(
                format!("Column not found: {}", display_name(column)),
                span,
            )),
            [] => Ok(None),
            [(id, index, _)] => Ok(Some((*id, *index))),
            _ => Err(self.error(
                format!("Ambiguous column reference: {}", display_name(column)),
                span,
            )),
        }
    }

    fn push_scope(&mut self, ranges: Vec<RangeVariableId>) {
        self.scopes.push(Scope {
            ranges,
            entered: self.stack.len(),
        });
    }

    fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    fn error(&self, message: String, span: Span) -> ParseError {
        ParseError::semantic(message, span).at_depth(self.stack.len())
    }

    /// Marks every subquery that read an enclosing query's column.
    pub(crate) fn finish(self) {
        for id in self.correlated {
            if let Some(subquery) = self.subqueries.get_mut(id.0) {
                subquery.mark_correlated();
            }
        }
    }
}

fn display_name(column: &ColumnRef) -> String {
    if column.qualifier.is_empty() {
        column.name.clone()
    } else {
        format!("{}.{}", column.qualifier.join("."), column.name)
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::{ExprKind, QueryBody};
    use crate::parser::fixtures::catalog;
    use crate::parser::{CompiledQuery, ErrorKind, ParseResult, Parser};

    fn compile(sql: &str) -> ParseResult<CompiledQuery> {
        let catalog = catalog();
        Parser::new(sql, &catalog).compile_query()
    }

    fn first_select_binding(compiled: &CompiledQuery) -> Option<(usize, bool)> {
        let QueryBody::Specification(spec) = &compiled.root.body else {
            return None;
        };
        let column = spec.select_list.first()?.as_column()?;
        column.binding.map(|b| (b.index, b.outer))
    }

    #[test]
    fn test_columns_bind_to_their_range_variable() {
        let compiled = compile("SELECT name FROM users").unwrap();
        assert_eq!(first_select_binding(&compiled), Some((1, false)));
    }

    #[test]
    fn test_unknown_and_ambiguous_columns() {
        let err = compile("SELECT nope FROM users").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Semantic);
        assert!(err.message.contains("Column not found"));

        let err = compile("SELECT id FROM users, orders").unwrap_err();
        assert!(err.message.contains("Ambiguous"));

        assert!(compile("SELECT users.id FROM users, orders").is_ok());
    }

    #[test]
    fn test_alias_hides_table_name() {
        let err = compile("SELECT users.id FROM users u").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Semantic);
        assert!(compile("SELECT u.id FROM users u").is_ok());
    }

    #[test]
    fn test_qualified_miss_stops_outer_search() {
        let err =
            compile("SELECT 1 FROM users u WHERE EXISTS (SELECT 1 FROM orders o WHERE o.name = 'x')")
                .unwrap_err();
        assert!(err.message.contains("O.NAME"));
    }

    #[test]
    fn test_correlated_subquery_marked() {
        let compiled = compile(
            "SELECT id FROM users u WHERE EXISTS (SELECT 1 FROM orders o WHERE o.user_id = u.id)",
        )
        .unwrap();
        assert_eq!(compiled.subqueries.len(), 1);
        assert!(compiled.subqueries[0].is_correlated());

        let compiled =
            compile("SELECT id FROM users WHERE id IN (SELECT user_id FROM orders)").unwrap();
        assert!(!compiled.subqueries[0].is_correlated());
    }

    #[test]
    fn test_outer_flag_on_correlated_column() {
        let compiled = compile(
            "SELECT (SELECT MAX(total) FROM orders o WHERE o.user_id = u.id) FROM users u",
        )
        .unwrap();
        let query = compiled.subqueries[0].query().unwrap();
        let QueryBody::Specification(spec) = &query.body else {
            panic!("expected a query specification");
        };
        let ExprKind::Binary { right, .. } = &spec.selection.as_ref().unwrap().kind else {
            panic!("expected a comparison");
        };
        assert!(right.as_column().and_then(|c| c.binding).unwrap().outer);
    }

    #[test]
    fn test_merged_column_is_not_ambiguous() {
        assert!(compile("SELECT id FROM users NATURAL JOIN orders").is_ok());
        assert!(compile("SELECT id FROM users JOIN orders USING (id)").is_ok());
    }

    #[test]
    fn test_order_by_alias_and_hidden_column() {
        assert!(compile("SELECT id AS k FROM users ORDER BY k").is_ok());
        assert!(compile("SELECT id FROM users ORDER BY name").is_ok());
        assert!(compile("SELECT id FROM users ORDER BY nope").is_err());
    }

    #[test]
    fn test_join_condition_sees_only_earlier_tables() {
        let err = compile(
            "SELECT 1 FROM users u JOIN orders o ON o.user_id = x.id, users x",
        )
        .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Semantic);
    }
}
