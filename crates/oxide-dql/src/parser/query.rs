//! Query expression builder: WITH, set operations, SELECT, VALUES, TABLE,
//! ORDER BY and the LIMIT / OFFSET / FETCH / TOP family.

use tracing::debug;

use super::error::{ParseError, ParseResult};
use super::parser::Parser;
use crate::ast::{
    Corresponding, Expr, ExprKind, ExplicitTable, LimitClause, Literal, NullOrdering,
    OrderByItem, OrderDirection, QueryBody, QueryExpression, QuerySpecification, SetOperation,
    SetOperator, SetQuantifier, ValuesBody,
};
use crate::context::RangeVariable;
use crate::dialect::Dialect;
use crate::lexer::{Keyword, Span, TokenKind};
use crate::subquery::{SubQuery, SubQueryId, SubQueryMode, SubQuerySource};

/// Clauses written after a query body.
struct Tail {
    order_by: Vec<OrderByItem>,
    limit: Option<LimitClause>,
}

impl Parser<'_> {
    /// Parses `[WITH ...] body [ORDER BY ...] [limit]`.
    pub(super) fn parse_query_expression(&mut self) -> ParseResult<QueryExpression> {
        let start = self.stream.current().span;
        let (with, recursive) = if self.check_keyword(Keyword::With) {
            self.parse_with_clause()?
        } else {
            (Vec::new(), false)
        };
        let (body, top) = self.parse_query_body()?;

        let order_by = if self.check_keyword(Keyword::Order) {
            self.stream.advance();
            self.expect_keyword(Keyword::By)?;
            self.parse_order_by_list()?
        } else {
            Vec::new()
        };
        let limit_start = self.stream.current().span;
        let limit = match (top, self.parse_limit_clause()?) {
            (Some(_), Some(_)) => {
                return Err(self.semantic_error(
                    "TOP and LIMIT cannot both be specified",
                    self.span_from(limit_start),
                ));
            }
            (top, limit) => top.or(limit),
        };

        let mut query = self.merge_nested(body, Tail { order_by, limit }, start)?;
        if !with.is_empty() {
            let mut all = with;
            all.append(&mut query.with);
            query.with = all;
            query.recursive |= recursive;
        }
        query.span = self.span_from(start);
        self.bind_order_positions(&mut query)?;
        Ok(query)
    }

    /// Folds the clauses of a parenthesized query into the enclosing ones.
    ///
    /// An inner ORDER BY without LIMIT is replaced by an outer one. A
    /// LIMIT on both levels is an error. An inner LIMIT under an outer
    /// ORDER BY keeps the nesting, since the order applies to the limited
    /// rows.
    fn merge_nested(&self, body: QueryBody, tail: Tail, start: Span) -> ParseResult<QueryExpression> {
        let QueryBody::Nested(inner) = body else {
            let mut query = QueryExpression::from_body(body, start);
            query.order_by = tail.order_by;
            query.limit = tail.limit;
            return Ok(query);
        };
        let mut inner = *inner;
        if inner.limit.is_some() && tail.limit.is_some() {
            return Err(self.semantic_error(
                "LIMIT specified for both a parenthesized query and its enclosing query",
                self.span_from(start),
            ));
        }
        if inner.limit.is_some() && !tail.order_by.is_empty() {
            let mut query = QueryExpression::from_body(QueryBody::Nested(Box::new(inner)), start);
            query.order_by = tail.order_by;
            return Ok(query);
        }
        if !tail.order_by.is_empty() {
            inner.order_by = tail.order_by;
        }
        if tail.limit.is_some() {
            inner.limit = tail.limit;
        }
        Ok(inner)
    }

    /// Resolves ORDER BY items that name an output column or give its
    /// position. Other items are only allowed over a plain SELECT.
    fn bind_order_positions(&self, query: &mut QueryExpression) -> ParseResult<()> {
        let positional_only = !matches!(query.body, QueryBody::Specification(_));
        let columns = query.body.columns().to_vec();
        for item in &mut query.order_by {
            item.position = match &item.expr.kind {
                ExprKind::Literal(Literal::Integer(n)) => {
                    let position = usize::try_from(*n)
                        .ok()
                        .filter(|p| (1..=columns.len()).contains(p))
                        .ok_or_else(|| {
                            self.semantic_error(
                                format!("ORDER BY position {n} is out of range"),
                                item.expr.span,
                            )
                        })?;
                    Some(position - 1)
                }
                ExprKind::Column(column) if column.qualifier.is_empty() => {
                    columns.iter().position(|c| *c == column.name)
                }
                _ => None,
            };
            if item.position.is_none() && positional_only {
                return Err(self.semantic_error(
                    "ORDER BY over a set operation must name an output column",
                    item.expr.span,
                ));
            }
        }
        Ok(())
    }

    // --- Set operations ---

    /// Parses terms joined by UNION and EXCEPT, left-associative. Returns
    /// the body and a TOP limit that still has to be applied.
    fn parse_query_body(&mut self) -> ParseResult<(QueryBody, Option<LimitClause>)> {
        let start = self.stream.current().span;
        let (mut left, mut top) = self.parse_query_term()?;
        loop {
            let op = match self.keyword() {
                Some(Keyword::Union) => SetOperator::Union,
                Some(Keyword::Except) => SetOperator::Except,
                _ => break,
            };
            self.stream.advance();
            let quantifier = self.parse_set_quantifier();
            let corresponding = self.parse_corresponding()?;
            let (right, right_top) = self.parse_query_term()?;
            let span = self.span_from(start);
            let left_body = with_top(left, top.take(), span);
            let right_body = with_top(right, right_top, span);
            left = self.combine(op, quantifier, corresponding, left_body, right_body, span)?;
        }
        Ok((left, top))
    }

    /// Parses primaries joined by INTERSECT.
    fn parse_query_term(&mut self) -> ParseResult<(QueryBody, Option<LimitClause>)> {
        let start = self.stream.current().span;
        let (mut left, mut top) = self.parse_query_primary()?;
        while self.eat_keyword(Keyword::Intersect) {
            let quantifier = self.parse_set_quantifier();
            let corresponding = self.parse_corresponding()?;
            let (right, right_top) = self.parse_query_primary()?;
            let span = self.span_from(start);
            let left_body = with_top(left, top.take(), span);
            let right_body = with_top(right, right_top, span);
            left = self.combine(
                SetOperator::Intersect,
                quantifier,
                corresponding,
                left_body,
                right_body,
                span,
            )?;
        }
        Ok((left, top))
    }

    fn parse_set_quantifier(&mut self) -> SetQuantifier {
        if self.eat_keyword(Keyword::All) {
            SetQuantifier::All
        } else {
            self.eat_keyword(Keyword::Distinct);
            SetQuantifier::Distinct
        }
    }

    fn parse_corresponding(&mut self) -> ParseResult<Option<Corresponding>> {
        if !self.eat_keyword(Keyword::Corresponding) {
            return Ok(None);
        }
        let by = if self.eat_keyword(Keyword::By) {
            self.parse_column_name_list()?
        } else {
            Vec::new()
        };
        Ok(Some(Corresponding {
            by,
            columns: Vec::new(),
        }))
    }

    /// Builds a set operation after checking that the operands line up.
    fn combine(
        &self,
        op: SetOperator,
        quantifier: SetQuantifier,
        corresponding: Option<Corresponding>,
        left: QueryBody,
        right: QueryBody,
        span: Span,
    ) -> ParseResult<QueryBody> {
        let (columns, corresponding) = match corresponding {
            None => {
                if left.degree() != right.degree() {
                    return Err(self.semantic_error(
                        format!(
                            "{} operands have different degrees: {} and {}",
                            op.as_str(),
                            left.degree(),
                            right.degree()
                        ),
                        span,
                    ));
                }
                (left.columns().to_vec(), None)
            }
            Some(mut corresponding) => {
                for side in [&left, &right] {
                    if let Some(name) = first_duplicate(side.columns()) {
                        return Err(self.semantic_error(
                            format!("Column {name} appears twice in a CORRESPONDING operand"),
                            span,
                        ));
                    }
                }
                let common: Vec<String> = left
                    .columns()
                    .iter()
                    .filter(|c| right.columns().contains(c))
                    .cloned()
                    .collect();
                let columns = if corresponding.by.is_empty() {
                    common
                } else {
                    if let Some(missing) = corresponding.by.iter().find(|c| !common.contains(c)) {
                        return Err(self.semantic_error(
                            format!("CORRESPONDING column {missing} is not in both operands"),
                            span,
                        ));
                    }
                    corresponding.by.clone()
                };
                if columns.is_empty() {
                    return Err(self.semantic_error(
                        format!("{} CORRESPONDING has no common columns", op.as_str()),
                        span,
                    ));
                }
                corresponding.columns.clone_from(&columns);
                (columns, Some(corresponding))
            }
        };
        Ok(QueryBody::SetOperation(Box::new(SetOperation {
            op,
            quantifier,
            corresponding,
            left,
            right,
            columns,
        })))
    }

    fn parse_query_primary(&mut self) -> ParseResult<(QueryBody, Option<LimitClause>)> {
        match self.keyword() {
            Some(Keyword::Select) => {
                let (spec, top) = self.parse_query_specification()?;
                Ok((QueryBody::Specification(Box::new(spec)), top))
            }
            Some(Keyword::Values) => Ok((QueryBody::Values(self.parse_values()?), None)),
            Some(Keyword::Table) => Ok((QueryBody::Table(self.parse_explicit_table()?), None)),
            _ if self.check(&TokenKind::LeftParen) => {
                let start = self.stream.current().span;
                let query = self.nested(start, |p| {
                    p.stream.advance();
                    p.ctx.push_depth(start)?;
                    let query = p.parse_query_expression()?;
                    p.expect(&TokenKind::RightParen)?;
                    p.ctx.pop_depth();
                    Ok(query)
                })?;
                if query.with.is_empty() && query.order_by.is_empty() && query.limit.is_none() {
                    Ok((query.body, None))
                } else {
                    Ok((QueryBody::Nested(Box::new(query)), None))
                }
            }
            _ => Err(self.unexpected("SELECT, VALUES, TABLE or (")),
        }
    }

    fn parse_values(&mut self) -> ParseResult<ValuesBody> {
        let start = self.expect_keyword(Keyword::Values)?.span;
        let mut rows: Vec<Vec<Expr>> = Vec::new();
        loop {
            let row = self.parse_expression()?;
            let items = match row.kind {
                ExprKind::Row(items) => items,
                kind => vec![Expr { kind, ..row }],
            };
            if let Some(first) = rows.first() {
                if first.len() != items.len() {
                    return Err(self.semantic_error(
                        format!(
                            "VALUES rows have different degrees: {} and {}",
                            first.len(),
                            items.len()
                        ),
                        self.span_from(start),
                    ));
                }
            }
            rows.push(items);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        let degree = rows.first().map_or(0, Vec::len);
        let columns = (1..=degree).map(|i| format!("C{i}")).collect();
        Ok(ValuesBody { rows, columns })
    }

    fn parse_explicit_table(&mut self) -> ParseResult<ExplicitTable> {
        self.expect_keyword(Keyword::Table)?;
        let (source, name, columns) = self.parse_named_table()?;
        let range = RangeVariable::new(source, name.clone(), columns.clone());
        let range_variable = self
            .ctx
            .register_range_variable(range, self.stream.position());
        Ok(ExplicitTable {
            name,
            range_variable,
            columns,
        })
    }

    // --- SELECT ---

    /// Parses a SELECT specification. A `TOP n` prefix is returned
    /// separately so that it applies after ORDER BY.
    fn parse_query_specification(
        &mut self,
    ) -> ParseResult<(QuerySpecification, Option<LimitClause>)> {
        let start = self.expect_keyword(Keyword::Select)?.span;
        let mut top = self.parse_top()?;
        let quantifier = if self.eat_keyword(Keyword::Distinct) {
            Some(SetQuantifier::Distinct)
        } else if self.eat_keyword(Keyword::All) {
            Some(SetQuantifier::All)
        } else {
            None
        };
        if top.is_none() {
            top = self.parse_top()?;
        }

        let items = self.parse_select_list()?;
        let from = if self.eat_keyword(Keyword::From) {
            self.parse_from_clause()?
        } else {
            Vec::new()
        };
        let selection = if self.eat_keyword(Keyword::Where) {
            Some(self.parse_expression()?)
        } else {
            None
        };
        let group_by = if self.check_keyword(Keyword::Group) {
            self.stream.advance();
            self.expect_keyword(Keyword::By)?;
            self.parse_expression_list()?
        } else {
            Vec::new()
        };
        let having = if self.eat_keyword(Keyword::Having) {
            Some(self.parse_expression()?)
        } else {
            None
        };

        let mut select_list = Vec::with_capacity(items.len());
        for item in items {
            match &item.kind {
                ExprKind::Asterisk { qualifier } => {
                    select_list.extend(self.expand_asterisk(qualifier.as_deref(), &from, item.span)?);
                }
                _ => select_list.push(item),
            }
        }
        let columns = output_columns(&select_list);

        Ok((
            QuerySpecification {
                quantifier,
                select_list,
                from,
                selection,
                group_by,
                having,
                columns,
                span: self.span_from(start),
            },
            top,
        ))
    }

    /// Parses `TOP n` where the dialect allows it. `top` followed by
    /// anything but a count is an ordinary column name.
    fn parse_top(&mut self) -> ParseResult<Option<LimitClause>> {
        if !self.config.dialect.supports_top()
            || !self.check_keyword(Keyword::Top)
            || !matches!(
                self.peek_nth(1),
                TokenKind::Integer(_) | TokenKind::Question | TokenKind::LeftParen
            )
        {
            return Ok(None);
        }
        self.stream.advance();
        let count = self.parse_limit_value()?;
        Ok(Some(LimitClause {
            offset: None,
            count: Some(count),
            strict: false,
        }))
    }

    fn parse_select_list(&mut self) -> ParseResult<Vec<Expr>> {
        let mut items = vec![self.parse_select_item()?];
        while self.eat(&TokenKind::Comma) {
            items.push(self.parse_select_item()?);
        }
        Ok(items)
    }

    fn parse_select_item(&mut self) -> ParseResult<Expr> {
        let start = self.stream.current().span;
        if self.eat(&TokenKind::Star) {
            return Ok(Expr::new(ExprKind::Asterisk { qualifier: None }, start));
        }
        if let Some(qualifier) = self.parse_qualified_asterisk()? {
            return Ok(Expr::new(
                ExprKind::Asterisk {
                    qualifier: Some(qualifier),
                },
                self.span_from(start),
            ));
        }
        let mut expr = self.parse_expression()?;
        if self.eat_keyword(Keyword::As)
            || matches!(
                self.peek(),
                TokenKind::Identifier(_) | TokenKind::QuotedIdentifier(_)
            )
        {
            expr.alias = Some(self.expect_name()?);
        }
        Ok(expr)
    }

    /// Parses `name . [name .]* *` if that is what follows.
    fn parse_qualified_asterisk(&mut self) -> ParseResult<Option<Vec<String>>> {
        let mut n = 0;
        while self.peek_nth(n).is_name() && matches!(self.peek_nth(n + 1), TokenKind::Dot) {
            n += 2;
        }
        if n == 0 || !matches!(self.peek_nth(n), TokenKind::Star) {
            return Ok(None);
        }
        let mut qualifier = Vec::with_capacity(n / 2);
        while !self.check(&TokenKind::Star) {
            qualifier.push(self.expect_name()?);
            self.expect(&TokenKind::Dot)?;
        }
        self.stream.advance();
        Ok(Some(qualifier))
    }

    /// Parses ORDER BY items. Positions are bound later, once the output
    /// columns are known.
    pub(super) fn parse_order_by_list(&mut self) -> ParseResult<Vec<OrderByItem>> {
        let mut items = Vec::new();
        loop {
            let expr = self.parse_expression()?;
            let direction = if self.eat_keyword(Keyword::Desc) {
                OrderDirection::Desc
            } else {
                self.eat_keyword(Keyword::Asc);
                OrderDirection::Asc
            };
            let nulls = if self.eat_keyword(Keyword::Nulls) {
                if self.eat_keyword(Keyword::First) {
                    Some(NullOrdering::First)
                } else {
                    self.expect_keyword(Keyword::Last)?;
                    Some(NullOrdering::Last)
                }
            } else {
                None
            };
            items.push(OrderByItem {
                expr,
                direction,
                nulls,
                position: None,
            });
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        Ok(items)
    }

    // --- LIMIT / OFFSET / FETCH ---

    /// Parses any of `LIMIT n [OFFSET m]`, `LIMIT m, n`,
    /// `OFFSET m [ROWS] [LIMIT n | FETCH ...]` and `FETCH FIRST n ROWS ONLY`
    /// into one limit clause.
    fn parse_limit_clause(&mut self) -> ParseResult<Option<LimitClause>> {
        match self.keyword() {
            Some(Keyword::Limit) => {
                self.expect_limit_keyword()?;
                let first = self.parse_limit_value()?;
                if self.check(&TokenKind::Comma) {
                    let token = self.stream.advance();
                    if !self.config.dialect.limit_comma_offset_first() {
                        return Err(self.syntax_error(
                            format!(
                                "LIMIT offset, count is not supported in {} mode",
                                self.config.dialect
                            ),
                            token.span,
                        ));
                    }
                    let count = self.parse_limit_value()?;
                    return Ok(Some(LimitClause {
                        offset: Some(first),
                        count: Some(count),
                        strict: false,
                    }));
                }
                let offset = if self.eat_keyword(Keyword::Offset) {
                    let offset = self.parse_limit_value()?;
                    self.eat_rows_keyword();
                    Some(offset)
                } else {
                    None
                };
                Ok(Some(LimitClause {
                    offset,
                    count: Some(first),
                    strict: false,
                }))
            }
            Some(Keyword::Offset) => {
                self.stream.advance();
                let offset = Some(self.parse_limit_value()?);
                self.eat_rows_keyword();
                if self.check_keyword(Keyword::Limit) {
                    self.expect_limit_keyword()?;
                    let count = Some(self.parse_limit_value()?);
                    return Ok(Some(LimitClause {
                        offset,
                        count,
                        strict: false,
                    }));
                }
                if self.check_keyword(Keyword::Fetch) {
                    let count = Some(self.parse_fetch()?);
                    return Ok(Some(LimitClause {
                        offset,
                        count,
                        strict: true,
                    }));
                }
                Ok(Some(LimitClause {
                    offset,
                    count: None,
                    strict: false,
                }))
            }
            Some(Keyword::Fetch) => {
                let count = Some(self.parse_fetch()?);
                Ok(Some(LimitClause {
                    offset: None,
                    count,
                    strict: true,
                }))
            }
            _ => Ok(None),
        }
    }

    fn expect_limit_keyword(&mut self) -> ParseResult<()> {
        let token = self.expect_keyword(Keyword::Limit)?;
        if self.config.dialect.supports_limit() {
            Ok(())
        } else {
            Err(self.syntax_error(
                format!("LIMIT is not supported in {} mode", self.config.dialect),
                token.span,
            ))
        }
    }

    /// Parses `FETCH {FIRST | NEXT} [n] {ROW | ROWS} ONLY` and returns the
    /// count.
    fn parse_fetch(&mut self) -> ParseResult<Expr> {
        let start = self.expect_keyword(Keyword::Fetch)?.span;
        if !self.eat_keyword(Keyword::First) && !self.eat_keyword(Keyword::Next) {
            return Err(self.unexpected("FIRST or NEXT"));
        }
        let count = if self.check_keyword(Keyword::Row) || self.check_keyword(Keyword::Rows) {
            Expr::integer(1)
        } else {
            self.parse_limit_value()?
        };
        if !self.eat_rows_keyword() {
            return Err(self.unexpected("ROW or ROWS"));
        }
        if self.check_keyword(Keyword::With) && self.check_keyword_nth(1, Keyword::Ties) {
            return Err(self.unsupported("FETCH ... WITH TIES is not supported", self.span_from(start)));
        }
        self.expect_keyword(Keyword::Only)?;
        Ok(count)
    }

    fn eat_rows_keyword(&mut self) -> bool {
        self.eat_keyword(Keyword::Row) || self.eat_keyword(Keyword::Rows)
    }

    /// A row count: an integer literal, a parameter or a parenthesized
    /// expression. Negative literals are rejected.
    fn parse_limit_value(&mut self) -> ParseResult<Expr> {
        let value = self.parse_factor()?;
        match &value.kind {
            ExprKind::Literal(Literal::Integer(n)) if *n < 0 => Err(self.semantic_error(
                format!("Row count must not be negative: {n}"),
                value.span,
            )),
            ExprKind::Literal(Literal::Integer(_)) | ExprKind::Parameter { .. } => Ok(value),
            ExprKind::Literal(_) => Err(self.semantic_error("Row count must be an integer", value.span)),
            _ => Ok(value),
        }
    }

    // --- WITH ---

    fn parse_with_clause(&mut self) -> ParseResult<(Vec<SubQueryId>, bool)> {
        self.expect_keyword(Keyword::With)?;
        let recursive = self.eat_keyword(Keyword::Recursive);
        let mut elements = Vec::new();
        loop {
            elements.push(if recursive {
                self.parse_recursive_element()?
            } else {
                self.parse_with_element()?
            });
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        Ok((elements, recursive))
    }

    /// Parses `name [(columns)] AS (query)`. The name becomes visible to
    /// the following elements and to the main query.
    fn parse_with_element(&mut self) -> ParseResult<SubQueryId> {
        let start = self.stream.current().span;
        let name = self.expect_name()?;
        let columns = if self.check(&TokenKind::LeftParen) {
            Some(self.parse_column_name_list()?)
        } else {
            None
        };
        self.expect_keyword(Keyword::As)?;
        let (query, level) = self.parse_parenthesized_query()?;
        let span = self.span_from(start);

        let mut subquery =
            SubQuery::from_query(SubQueryMode::Plain, query, level, self.stream.position());
        subquery.set_name(name.clone());
        if let Some(columns) = &columns {
            subquery.set_declared_columns(columns.clone());
        }
        let id = self.add_subquery(subquery, columns.as_deref(), span)?;
        self.check_unique_columns(id, span)?;
        self.ctx.register_subquery(&name, id, span)?;
        Ok(id)
    }

    /// Parses a recursive element. The name is bound after the first term,
    /// so every later UNION or EXCEPT operand can refer to the element
    /// itself. Operands combine left to right.
    fn parse_recursive_element(&mut self) -> ParseResult<SubQueryId> {
        let start = self.stream.current().span;
        let name = self.expect_name()?;
        let declared = if self.check(&TokenKind::LeftParen) {
            Some(self.parse_column_name_list()?)
        } else {
            None
        };
        self.expect_keyword(Keyword::As)?;
        let open = self.expect(&TokenKind::LeftParen)?;
        self.ctx.push_depth(open.span)?;
        let level = self.ctx.depth();

        let body_start = self.stream.current().span;
        let (seed, seed_top) = self.parse_query_term()?;
        let seed = with_top(seed, seed_top, self.span_from(body_start));
        let columns = match declared {
            Some(columns) if columns.len() != seed.degree() => {
                return Err(self.semantic_error(
                    format!(
                        "{name} declares {} columns but its query returns {}",
                        columns.len(),
                        seed.degree()
                    ),
                    self.span_from(start),
                ));
            }
            Some(columns) => columns,
            None => seed.columns().to_vec(),
        };

        let mut placeholder = SubQuery::new(
            SubQueryMode::Recursive,
            SubQuerySource::Rows(Vec::new()),
            level,
            self.stream.position(),
        );
        placeholder.set_name(name.clone());
        placeholder.set_declared_columns(columns);
        let id = self.ctx.add_subquery(placeholder);

        self.ctx.pop_depth();
        self.ctx.register_subquery(&name, id, self.span_from(start))?;
        self.ctx.push_depth(open.span)?;

        let mut body = seed;
        loop {
            let op = if self.eat_keyword(Keyword::Union) {
                SetOperator::Union
            } else if self.eat_keyword(Keyword::Except) {
                SetOperator::Except
            } else {
                break;
            };
            let quantifier = self.parse_set_quantifier();
            let term_start = self.stream.current().span;
            let (term, term_top) = self.parse_query_term()?;
            let term = with_top(term, term_top, self.span_from(term_start));
            body = self.combine(op, quantifier, None, body, term, self.span_from(body_start))?;
        }
        let query = QueryExpression::from_body(body, self.span_from(body_start));
        self.expect(&TokenKind::RightParen)?;
        self.ctx.pop_depth();

        if self.check_keyword(Keyword::Cycle) || self.check_keyword(Keyword::Search) {
            return Err(self.unsupported(
                "CYCLE and SEARCH clauses are not supported",
                self.stream.current().span,
            ));
        }
        let span = self.span_from(start);
        if let Some(subquery) = self.ctx.subquery_mut(id) {
            subquery.complete_recursive(query);
            subquery
                .prepare_table(None)
                .map_err(|error| ParseError { span, ..error })?;
        }
        self.check_unique_columns(id, span)?;
        debug!(id = id.0, name = %name, level, "Created recursive subquery");
        Ok(id)
    }

    // --- Subqueries ---

    /// Parses `( query )` one nesting level deeper. Returns the query and
    /// the level it was parsed at.
    pub(super) fn parse_parenthesized_query(&mut self) -> ParseResult<(QueryExpression, usize)> {
        let open = self.expect(&TokenKind::LeftParen)?;
        self.ctx.push_depth(open.span)?;
        let level = self.ctx.depth();
        let query = self.parse_query_expression()?;
        self.expect(&TokenKind::RightParen)?;
        self.ctx.pop_depth();
        Ok((query, level))
    }

    /// Parses a parenthesized subquery in value position and registers it.
    pub(super) fn parse_subquery(&mut self, mode: SubQueryMode) -> ParseResult<SubQueryId> {
        let start = self.stream.current().span;
        let (query, level) = self.parse_parenthesized_query()?;
        let subquery = SubQuery::from_query(mode, query, level, self.stream.position());
        self.add_subquery(subquery, None, self.span_from(start))
    }

    /// Registers a subquery and builds its derived table.
    pub(super) fn add_subquery(
        &mut self,
        subquery: SubQuery,
        columns: Option<&[String]>,
        span: Span,
    ) -> ParseResult<SubQueryId> {
        let mode = subquery.mode();
        let level = subquery.level();
        let id = self.ctx.add_subquery(subquery);
        self.prepare_subquery(id, columns, span)?;
        debug!(id = id.0, ?mode, level, "Created subquery");
        Ok(id)
    }

    /// Builds the derived table of a registered subquery.
    pub(super) fn prepare_subquery(
        &mut self,
        id: SubQueryId,
        columns: Option<&[String]>,
        span: Span,
    ) -> ParseResult<()> {
        let depth = self.ctx.depth();
        match self.ctx.subquery_mut(id) {
            Some(subquery) => subquery
                .prepare_table(columns)
                .map_err(|error| ParseError { span, ..error }.at_depth(depth)),
            None => Ok(()),
        }
    }

    /// Rejects a named derived table whose columns repeat a name, since
    /// references to it could not be resolved.
    pub(super) fn check_unique_columns(&self, id: SubQueryId, span: Span) -> ParseResult<()> {
        let Some(table) = self.ctx.subquery(id).and_then(SubQuery::table) else {
            return Ok(());
        };
        match table.duplicate_column() {
            Some(column) => Err(self.semantic_error(
                format!("Duplicate column name {column} in derived table {}", table.name()),
                span,
            )),
            None => Ok(()),
        }
    }
}

/// Wraps a body that carries a TOP limit so the limit stays with it.
fn with_top(body: QueryBody, top: Option<LimitClause>, span: Span) -> QueryBody {
    match top {
        Some(limit) => {
            let mut query = QueryExpression::from_body(body, span);
            query.limit = Some(limit);
            QueryBody::Nested(Box::new(query))
        }
        None => body,
    }
}

/// Output column names: the alias or column name, else `C1`, `C2`, ...
pub(super) fn output_columns(select_list: &[Expr]) -> Vec<String> {
    select_list
        .iter()
        .enumerate()
        .map(|(i, expr)| {
            expr.output_name()
                .map_or_else(|| format!("C{}", i + 1), str::to_string)
        })
        .collect()
}

fn first_duplicate(names: &[String]) -> Option<&String> {
    names
        .iter()
        .enumerate()
        .find(|(i, name)| names[..*i].contains(name))
        .map(|(_, name)| name)
}
