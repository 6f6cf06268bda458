//! FROM clause: table references, derived tables and joins.

use std::sync::Arc;

use tracing::debug;

use super::error::ParseResult;
use super::parser::Parser;
use super::query::output_columns;
use crate::ast::{
    BinaryOp, ColumnBinding, ColumnRef, Expr, ExprKind, QualifiedName, QueryBody, QueryExpression,
    QuerySpecification,
};
use crate::context::{JoinKind, JoinSpec, RangeSource, RangeVariable, RangeVariableId};
use crate::lexer::{Keyword, Span, TokenKind};
use crate::subquery::{SubQuery, SubQueryId, SubQueryMode};

impl Parser<'_> {
    /// Parses the table references after FROM and returns their range
    /// variables in declaration order.
    pub(super) fn parse_from_clause(&mut self) -> ParseResult<Vec<RangeVariableId>> {
        let start = self.stream.current().span;
        let from = self.parse_join_chain()?;
        self.check_duplicate_names(&from, self.span_from(start))?;
        Ok(from)
    }

    /// Parses `reference { {, | join} reference [ON ... | USING ...] }`.
    fn parse_join_chain(&mut self) -> ParseResult<Vec<RangeVariableId>> {
        let mut from = self.parse_table_reference()?;
        loop {
            let start = self.stream.current().span;
            let join = if self.eat(&TokenKind::Comma) {
                JoinSpec::new(JoinKind::Comma)
            } else {
                match self.parse_join_operator()? {
                    Some(join) => join,
                    None => break,
                }
            };
            let right = self.parse_table_reference()?;
            self.complete_join(join, &from, &right, start)?;
            from.extend(right);
        }
        Ok(from)
    }

    /// Parses a join operator, or returns `None` if the next tokens are not
    /// one. `UNION` only counts when `JOIN` follows it.
    fn parse_join_operator(&mut self) -> ParseResult<Option<JoinSpec>> {
        let natural = self.eat_keyword(Keyword::Natural);
        let kind = match self.keyword() {
            Some(Keyword::Join) => {
                self.stream.advance();
                JoinKind::Inner
            }
            Some(Keyword::Inner) => {
                self.stream.advance();
                self.expect_keyword(Keyword::Join)?;
                JoinKind::Inner
            }
            Some(keyword @ (Keyword::Left | Keyword::Right | Keyword::Full)) => {
                self.stream.advance();
                self.eat_keyword(Keyword::Outer);
                self.expect_keyword(Keyword::Join)?;
                match keyword {
                    Keyword::Left => JoinKind::Left,
                    Keyword::Right => JoinKind::Right,
                    _ => JoinKind::Full,
                }
            }
            Some(Keyword::Cross) if !natural => {
                self.stream.advance();
                self.expect_keyword(Keyword::Join)?;
                JoinKind::Cross
            }
            Some(Keyword::Union) if !natural && self.check_keyword_nth(1, Keyword::Join) => {
                self.stream.advance();
                self.stream.advance();
                JoinKind::Union
            }
            _ if natural => return Err(self.unexpected("JOIN")),
            _ => return Ok(None),
        };
        let mut join = JoinSpec::new(kind);
        join.natural = natural;
        Ok(Some(join))
    }

    /// Reads the join condition and attaches the join to the first range
    /// variable of `right`.
    fn complete_join(
        &mut self,
        mut join: JoinSpec,
        left: &[RangeVariableId],
        right: &[RangeVariableId],
        start: Span,
    ) -> ParseResult<()> {
        let Some(&head) = right.first() else {
            return Ok(());
        };
        join.width = right.len();

        if join.natural {
            let common = self.natural_columns(left, right, start)?;
            join.condition = self.equi_join(&common, left, right, start)?;
            join.common_columns = common;
        } else {
            match join.kind {
                JoinKind::Comma | JoinKind::Cross => {}
                JoinKind::Union => {
                    if self.eat_keyword(Keyword::On) {
                        join.condition = Some(self.parse_expression()?);
                    }
                }
                _ if self.eat_keyword(Keyword::On) => {
                    join.condition = Some(self.parse_expression()?);
                }
                _ if self.eat_keyword(Keyword::Using) => {
                    let using = self.parse_column_name_list()?;
                    join.condition = self.equi_join(&using, left, right, start)?;
                    join.common_columns.clone_from(&using);
                    join.using = using;
                }
                _ => return Err(self.unexpected("ON or USING")),
            }
        }

        debug!(
            kind = join.kind.as_str(),
            natural = join.natural,
            common = join.common_columns.len(),
            "Joined table reference"
        );
        if let Some(range) = self.ctx.range_variable_mut(head) {
            range.join = Some(join);
        }
        Ok(())
    }

    /// Column names shared by both sides of a NATURAL join, in the order of
    /// the right side.
    fn natural_columns(
        &self,
        left: &[RangeVariableId],
        right: &[RangeVariableId],
        span: Span,
    ) -> ParseResult<Vec<String>> {
        let mut common = Vec::new();
        for column in self.visible_columns(right) {
            if self.visible_columns(left).any(|c| c == column) && !common.contains(&column) {
                common.push(column);
            }
        }
        for column in &common {
            self.find_unique(left, column, span)?;
        }
        Ok(common)
    }

    fn visible_columns<'a>(
        &'a self,
        ids: &'a [RangeVariableId],
    ) -> impl Iterator<Item = String> + 'a {
        ids.iter()
            .filter_map(|&id| self.ctx.range_variable(id))
            .flat_map(|range| {
                range
                    .columns
                    .iter()
                    .filter(|c| !range.is_merged_column(c))
                    .cloned()
                    .collect::<Vec<_>>()
            })
    }

    /// Builds `l.c = r.c AND ...` over the named columns, with every column
    /// reference already bound.
    fn equi_join(
        &self,
        columns: &[String],
        left: &[RangeVariableId],
        right: &[RangeVariableId],
        span: Span,
    ) -> ParseResult<Option<Expr>> {
        let mut condition: Option<Expr> = None;
        for column in columns {
            let (left_range, left_index) = self.find_unique(left, column, span)?;
            let (right_range, right_index) = self.find_unique(right, column, span)?;
            let eq = bound_column(left_range, left_index, span)
                .binary(BinaryOp::Eq, bound_column(right_range, right_index, span));
            condition = Some(match condition {
                Some(acc) => acc.and(eq),
                None => eq,
            });
        }
        Ok(condition)
    }

    /// Finds the one range variable among `ids` that exposes `column`.
    fn find_unique(
        &self,
        ids: &[RangeVariableId],
        column: &str,
        span: Span,
    ) -> ParseResult<(&RangeVariable, usize)> {
        let mut found = ids
            .iter()
            .filter_map(|&id| self.ctx.range_variable(id))
            .filter(|range| !range.is_merged_column(column))
            .filter_map(|range| range.find_column(column).map(|index| (range, index)));
        match (found.next(), found.next()) {
            (Some(hit), None) => Ok(hit),
            (None, _) => Err(self.semantic_error(
                format!("Join column not found: {column}"),
                span,
            )),
            (Some(_), Some(_)) => Err(self.semantic_error(
                format!("Ambiguous join column: {column}"),
                span,
            )),
        }
    }

    fn check_duplicate_names(&self, from: &[RangeVariableId], span: Span) -> ParseResult<()> {
        let ranges: Vec<&RangeVariable> = from
            .iter()
            .filter_map(|&id| self.ctx.range_variable(id))
            .collect();
        for (i, range) in ranges.iter().enumerate() {
            let clash = ranges[..i].iter().any(|other| {
                other.visible_name() == range.visible_name()
                    && (other.alias.is_some()
                        || range.alias.is_some()
                        || other.name.schema == range.name.schema)
            });
            if clash {
                return Err(self.semantic_error(
                    format!("Duplicate table name in FROM: {}", range.visible_name()),
                    span,
                ));
            }
        }
        Ok(())
    }

    // --- Table references ---

    /// Parses one table reference. A parenthesized join without a
    /// correlation name contributes all of its range variables.
    fn parse_table_reference(&mut self) -> ParseResult<Vec<RangeVariableId>> {
        if !self.check(&TokenKind::LeftParen) {
            return Ok(vec![self.parse_table_primary()?]);
        }
        if !self.subquery_follows() {
            return self.parse_joined_table();
        }
        match self.speculate(Self::parse_derived_table) {
            Ok(id) => Ok(vec![id]),
            Err(speculative) => match self.parse_joined_table() {
                Ok(ids) => Ok(ids),
                Err(fallback) => Err(self.best_failure(speculative, fallback)),
            },
        }
    }

    /// `name [[AS] alias [(columns)]]`
    fn parse_table_primary(&mut self) -> ParseResult<RangeVariableId> {
        let start = self.stream.current().span;
        let (source, name, mut columns) = self.parse_named_table()?;
        let (alias, declared) = self.parse_correlation()?;
        if let Some(declared) = &declared {
            if declared.len() != columns.len() {
                return Err(self.semantic_error(
                    format!(
                        "{} has {} columns but {} names were given",
                        name.name,
                        columns.len(),
                        declared.len()
                    ),
                    self.span_from(start),
                ));
            }
            columns.clone_from(declared);
        }
        let mut range = RangeVariable::new(source, name, columns);
        range.alias = alias;
        range.declared_columns = declared;
        Ok(self
            .ctx
            .register_range_variable(range, self.stream.position()))
    }

    /// Resolves a table name: a WITH name in scope, then a catalog table or
    /// view. Returns the row source, the resolved name and its columns.
    pub(super) fn parse_named_table(
        &mut self,
    ) -> ParseResult<(RangeSource, QualifiedName, Vec<String>)> {
        let (parts, span) = self.parse_name_chain()?;
        if let [name] = parts.as_slice() {
            if let Some(id) = self.ctx.named_subquery(name) {
                let columns = self.subquery_columns(id);
                return Ok((RangeSource::SubQuery(id), QualifiedName::bare(name.clone()), columns));
            }
        }

        let mut name = QualifiedName::from_parts(parts)
            .ok_or_else(|| self.semantic_error("Table name has too many parts", span))?;
        let schema = self.resolve_schema(&name, span)?;
        let table = self
            .catalog
            .lookup_table(&name.name, &schema)
            .ok_or_else(|| {
                self.catalog_error(format!("Table not found: {schema}.{}", name.name), span)
            })?;
        self.ctx
            .add_schema_object(table.qualified_name(), self.stream.position());
        name.schema = Some(schema);
        let columns = table.column_names();

        if table.is_view() {
            let level = self.ctx.depth() + 1;
            let view = SubQuery::from_view(Arc::clone(&table), level, self.stream.position());
            let id = self.add_subquery(view, None, span)?;
            return Ok((RangeSource::SubQuery(id), name, columns));
        }
        Ok((RangeSource::Table(table), name, columns))
    }

    /// Column names a subquery exposes, before or after it is prepared.
    fn subquery_columns(&self, id: SubQueryId) -> Vec<String> {
        let Some(subquery) = self.ctx.subquery(id) else {
            return Vec::new();
        };
        if let Some(table) = subquery.table() {
            return table.columns().to_vec();
        }
        if let Some(declared) = subquery.declared_columns() {
            return declared.to_vec();
        }
        subquery
            .query()
            .map(|query| query.columns.clone())
            .unwrap_or_default()
    }

    /// `[AS] alias [(columns)]`. Without AS only a plain identifier is
    /// taken as an alias, so keywords like LEFT or WHERE end the reference.
    fn parse_correlation(&mut self) -> ParseResult<(Option<String>, Option<Vec<String>>)> {
        let alias = if self.eat_keyword(Keyword::As) {
            Some(self.expect_name()?)
        } else if matches!(
            self.peek(),
            TokenKind::Identifier(_) | TokenKind::QuotedIdentifier(_)
        ) {
            Some(self.expect_name()?)
        } else {
            None
        };
        let columns = if alias.is_some() && self.check(&TokenKind::LeftParen) {
            Some(self.parse_column_name_list()?)
        } else {
            None
        };
        Ok((alias, columns))
    }

    /// `( query ) [[AS] alias [(columns)]]`
    fn parse_derived_table(&mut self) -> ParseResult<RangeVariableId> {
        let start = self.stream.current().span;
        let (query, level) = self.parse_parenthesized_query()?;
        let subquery =
            SubQuery::from_query(SubQueryMode::Plain, query, level, self.stream.position());
        let id = self.ctx.add_subquery(subquery);
        self.finish_derived(id, start)
    }

    /// Reads the correlation of a derived table, prepares its backing table
    /// and registers its range variable.
    fn finish_derived(&mut self, id: SubQueryId, start: Span) -> ParseResult<RangeVariableId> {
        let (alias, declared) = self.parse_correlation()?;
        let span = self.span_from(start);
        self.prepare_subquery(id, declared.as_deref(), span)?;
        self.check_unique_columns(id, span)?;

        let name = alias
            .clone()
            .unwrap_or_else(|| format!("SYSTEM_SUBQUERY_{}", id.0));
        if let Some(subquery) = self.ctx.subquery_mut(id) {
            subquery.set_name(name.clone());
        }
        let columns = self.subquery_columns(id);
        let mut range = RangeVariable::new(RangeSource::SubQuery(id), QualifiedName::bare(name), columns);
        range.alias = alias;
        range.declared_columns = declared;
        debug!(id = id.0, name = %range.visible_name(), "Registered derived table");
        Ok(self
            .ctx
            .register_range_variable(range, self.stream.position()))
    }

    /// `( joined-table ) [[AS] alias [(columns)]]`. With a correlation name
    /// the join becomes a `SELECT *` subquery; without one its range
    /// variables join the enclosing FROM list directly.
    fn parse_joined_table(&mut self) -> ParseResult<Vec<RangeVariableId>> {
        let open = self.expect(&TokenKind::LeftParen)?;
        let inner = self.nested(open.span, |p| {
            let inner = p.parse_join_chain()?;
            p.expect(&TokenKind::RightParen)?;
            Ok(inner)
        })?;
        let span = self.span_from(open.span);
        self.check_duplicate_names(&inner, span)?;

        let named = self.check_keyword(Keyword::As)
            || matches!(
                self.peek(),
                TokenKind::Identifier(_) | TokenKind::QuotedIdentifier(_)
            );
        if !named {
            return Ok(inner);
        }

        let select_list = self.expand_asterisk(None, &inner, span)?;
        let columns = output_columns(&select_list);
        let specification = QuerySpecification {
            quantifier: None,
            select_list,
            from: inner,
            selection: None,
            group_by: Vec::new(),
            having: None,
            columns,
            span,
        };
        let query = QueryExpression::from_body(
            QueryBody::Specification(Box::new(specification)),
            span,
        );
        let level = self.ctx.depth() + 1;
        let subquery =
            SubQuery::from_query(SubQueryMode::Plain, query, level, self.stream.position());
        let id = self.ctx.add_subquery(subquery);
        Ok(vec![self.finish_derived(id, open.span)?])
    }

    /// Expands `*` or `q.*` into bound column references. An unqualified
    /// asterisk lists a column merged by NATURAL or USING only once.
    pub(super) fn expand_asterisk(
        &self,
        qualifier: Option<&[String]>,
        from: &[RangeVariableId],
        span: Span,
    ) -> ParseResult<Vec<Expr>> {
        if from.is_empty() {
            return Err(self.semantic_error("* requires a FROM clause", span));
        }
        let mut items = Vec::new();
        let mut matched = false;
        for range in from.iter().filter_map(|&id| self.ctx.range_variable(id)) {
            if let Some(qualifier) = qualifier {
                if !range.matches_qualifier(qualifier) {
                    continue;
                }
            }
            matched = true;
            for (index, column) in range.columns.iter().enumerate() {
                if qualifier.is_none() && range.is_merged_column(column) {
                    continue;
                }
                items.push(bound_column(range, index, span));
            }
        }
        if !matched {
            let name = qualifier.map(|q| q.join(".")).unwrap_or_default();
            return Err(self.semantic_error(format!("Unknown table in {name}.*"), span));
        }
        Ok(items)
    }
}

/// A column reference already bound to `range`.
fn bound_column(range: &RangeVariable, index: usize, span: Span) -> Expr {
    let name = range.columns.get(index).cloned().unwrap_or_default();
    let column = ColumnRef {
        qualifier: vec![range.visible_name().to_string()],
        name,
        binding: Some(ColumnBinding {
            range_variable: range.id,
            index,
            outer: false,
        }),
    };
    Expr::new(ExprKind::Column(column), span)
}

#[cfg(test)]
mod tests {
    use crate::ast::{ExprKind, QueryBody};
    use crate::context::{JoinKind, RangeSource};
    use crate::parser::fixtures::catalog;
    use crate::parser::{CompiledQuery, ErrorKind, ParseResult, Parser};
    use crate::subquery::SubQueryMode;

    fn compile(sql: &str) -> ParseResult<CompiledQuery> {
        let catalog = catalog();
        Parser::new(sql, &catalog).compile_query()
    }

    fn from_of(compiled: &CompiledQuery) -> Vec<String> {
        let QueryBody::Specification(spec) = &compiled.root.body else {
            panic!("expected a query specification");
        };
        spec.from
            .iter()
            .filter_map(|&id| compiled.range_variable(id))
            .map(|range| range.visible_name().to_string())
            .collect()
    }

    #[test]
    fn test_asterisk_expansion() {
        let compiled = compile("SELECT * FROM users u, orders o").unwrap();
        assert_eq!(compiled.root.columns, vec!["ID", "NAME", "EMAIL", "ID", "USER_ID", "TOTAL"]);
        let compiled = compile("SELECT o.* FROM users u, orders o").unwrap();
        assert_eq!(compiled.root.columns, vec!["ID", "USER_ID", "TOTAL"]);
        let err = compile("SELECT x.* FROM users").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Semantic);
    }

    #[test]
    fn test_natural_join_merges_common_columns() {
        let compiled = compile("SELECT * FROM users NATURAL JOIN orders").unwrap();
        assert_eq!(compiled.root.columns, vec!["ID", "NAME", "EMAIL", "USER_ID", "TOTAL"]);
        let orders = compiled.range_variables.iter().find(|r| r.name.name == "ORDERS").unwrap();
        let join = orders.join.as_ref().unwrap();
        assert!(join.natural);
        assert_eq!(join.common_columns, vec!["ID"]);
        assert!(join.condition.is_some());
    }

    #[test]
    fn test_using_join() {
        let compiled =
            compile("SELECT id FROM users JOIN (SELECT user_id AS id FROM orders) t USING (id)")
                .unwrap();
        assert_eq!(compiled.root.columns, vec!["ID"]);
        let err = compile("SELECT 1 FROM users JOIN orders USING (name)").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Semantic);
    }

    #[test]
    fn test_join_requires_condition() {
        let err = compile("SELECT 1 FROM users JOIN orders").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Syntax);
        assert!(compile("SELECT 1 FROM users CROSS JOIN orders").is_ok());
    }

    #[test]
    fn test_union_join_is_not_a_set_operation() {
        let compiled = compile("SELECT u.id FROM users u UNION JOIN orders o").unwrap();
        assert!(matches!(compiled.root.body, QueryBody::Specification(_)));
        let orders = compiled.range_variables.iter().find(|r| r.name.name == "ORDERS").unwrap();
        assert_eq!(orders.join.as_ref().map(|j| j.kind), Some(JoinKind::Union));

        let compiled = compile("SELECT id FROM users UNION SELECT id FROM orders").unwrap();
        assert!(matches!(compiled.root.body, QueryBody::SetOperation(_)));
    }

    #[test]
    fn test_parenthesized_join_without_alias_is_spliced() {
        let compiled = compile(
            "SELECT u.name FROM users u LEFT JOIN (orders o JOIN orders p ON o.id = p.id) \
             ON u.id = p.user_id",
        )
        .unwrap();
        assert_eq!(from_of(&compiled), vec!["U", "O", "P"]);
        let o = compiled.range_variables.iter().find(|r| r.visible_name() == "O").unwrap();
        let join = o.join.as_ref().unwrap();
        assert_eq!(join.kind, JoinKind::Left);
        assert_eq!(join.width, 2);
    }

    #[test]
    fn test_parenthesized_join_with_alias_is_a_subquery() {
        let compiled = compile(
            "SELECT j.total FROM (users u JOIN orders o USING (id)) AS j",
        )
        .unwrap();
        assert_eq!(from_of(&compiled), vec!["J"]);
        let j = compiled.range_variables.iter().find(|r| r.visible_name() == "J").unwrap();
        assert!(matches!(j.source, RangeSource::SubQuery(_)));
    }

    #[test]
    fn test_derived_table_columns() {
        let compiled = compile("SELECT t.a FROM (SELECT id, name FROM users) AS t(a, b)").unwrap();
        assert_eq!(compiled.root.columns, vec!["A"]);
        let err = compile("SELECT 1 FROM (SELECT id FROM users) AS t(a, b)").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Semantic);
    }

    #[test]
    fn test_derived_table_duplicate_columns() {
        let err = compile("SELECT 1 FROM (SELECT u.id, o.id FROM users u, orders o) AS t")
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Semantic);
        assert!(compile("SELECT 1 FROM (SELECT u.id, o.id FROM users u, orders o) AS t(a, b)").is_ok());
    }

    #[test]
    fn test_derived_table_without_alias_gets_system_name() {
        let compiled = compile("SELECT * FROM (SELECT id FROM users)").unwrap();
        let name = &from_of(&compiled)[0];
        assert!(name.starts_with("SYSTEM_SUBQUERY_"));
    }

    #[test]
    fn test_view_becomes_subquery() {
        let compiled = compile("SELECT id FROM active_users").unwrap();
        assert!(compiled.schema_objects.contains("PUBLIC.ACTIVE_USERS"));
        assert_eq!(compiled.subqueries.len(), 1);
        assert_eq!(compiled.subqueries[0].mode(), SubQueryMode::View);
    }

    #[test]
    fn test_unknown_table_and_schema() {
        assert_eq!(compile("SELECT 1 FROM nope").unwrap_err().kind, ErrorKind::Catalog);
        assert_eq!(compile("SELECT 1 FROM other.users").unwrap_err().kind, ErrorKind::Catalog);
    }

    #[test]
    fn test_duplicate_range_name() {
        let err = compile("SELECT 1 FROM users, users").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Semantic);
        assert!(compile("SELECT 1 FROM users a, users b").is_ok());
    }

    #[test]
    fn test_join_condition_columns_are_bound() {
        let compiled = compile("SELECT 1 FROM users u JOIN orders o ON u.id = o.user_id").unwrap();
        let o = compiled.range_variables.iter().find(|r| r.visible_name() == "O").unwrap();
        let condition = o.join.as_ref().and_then(|j| j.condition.as_ref()).unwrap();
        let ExprKind::Binary { left, right, .. } = &condition.kind else {
            panic!("expected a comparison");
        };
        assert!(left.as_column().and_then(|c| c.binding).is_some());
        assert!(right.as_column().and_then(|c| c.binding).is_some());
    }
}
