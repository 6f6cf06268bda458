//! Expression builder.
//!
//! Precedence, lowest first: `OR`, `AND`, `NOT`, predicates, additive and
//! `||`, multiplicative, sign, postfix. CASE-family constructs and the
//! NULL-handling functions are reduced to [`ExprKind::Alternative`] here.

use tracing::trace;

use super::error::ParseResult;
use super::operators::{
    additive_op, comparison_op, multiplicative_op, sign_op, starts_predicate_suffix,
};
use super::parser::Parser;
use crate::ast::{
    AggregateFunction, BinaryOp, ColumnRef, DataType, Expr, ExprKind, IntervalField,
    IntervalQualifier, Literal, MatchType, QualifiedName, Quantifier, SetQuantifier, TruthValue,
    UnaryOp,
};
use crate::dialect::Dialect;
use crate::lexer::{Keyword, Span, TokenKind};
use crate::subquery::{SubQueryId, SubQueryMode};

/// Scalar functions accepted without a catalog lookup.
const BUILTIN_FUNCTIONS: &[&str] = &[
    "ABS",
    "CEIL",
    "CEILING",
    "CHARACTER_LENGTH",
    "CHAR_LENGTH",
    "CONCAT",
    "CURRENT_DATE",
    "CURRENT_TIME",
    "CURRENT_TIMESTAMP",
    "CURRENT_USER",
    "EXP",
    "FLOOR",
    "LCASE",
    "LENGTH",
    "LN",
    "LOCALTIME",
    "LOCALTIMESTAMP",
    "LOG10",
    "LOWER",
    "LTRIM",
    "MOD",
    "NOW",
    "OCTET_LENGTH",
    "POSITION",
    "POWER",
    "RAND",
    "REPLACE",
    "ROUND",
    "RTRIM",
    "SIGN",
    "SQRT",
    "SUBSTR",
    "SUBSTRING",
    "TRIM",
    "UCASE",
    "UPPER",
];

/// Built-ins that are written without parentheses.
const NILADIC_FUNCTIONS: &[&str] = &[
    "CURRENT_DATE",
    "CURRENT_TIME",
    "CURRENT_TIMESTAMP",
    "CURRENT_USER",
    "LOCALTIME",
    "LOCALTIMESTAMP",
];

/// Largest precision accepted for DECIMAL and NUMERIC.
const MAX_DECIMAL_PRECISION: u64 = 1000;

impl Parser<'_> {
    /// Parses a boolean value expression.
    pub(super) fn parse_expression(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_and()?;
        while self.eat_keyword(Keyword::Or) {
            let right = self.parse_and()?;
            left = left.or(right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_not()?;
        while self.eat_keyword(Keyword::And) {
            let right = self.parse_not()?;
            left = left.and(right);
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> ParseResult<Expr> {
        if !self.check_keyword(Keyword::Not) {
            return self.parse_predicate();
        }
        let start = self.stream.advance().span;
        let operand = self.nested(start, Self::parse_not)?;
        let mut expr = operand.not();
        expr.span = start.merge(expr.span);
        Ok(expr)
    }

    fn parse_predicate(&mut self) -> ParseResult<Expr> {
        let left = self.parse_value_expression()?;
        self.parse_predicate_suffix(left)
    }

    /// Returns true if the cursor is at a comparison or other predicate
    /// that can follow a value.
    pub(super) fn at_predicate_suffix(&self) -> bool {
        starts_predicate_suffix(self.peek(), self.peek_nth(1))
    }

    /// Applies the predicate at the cursor to `left`. Returns `left`
    /// unchanged when no predicate follows.
    pub(super) fn parse_predicate_suffix(&mut self, left: Expr) -> ParseResult<Expr> {
        if !self.at_predicate_suffix() {
            return Ok(left);
        }
        let start = left.span;
        let mut negate = self.eat_keyword(Keyword::Not);
        let predicate = match self.keyword() {
            Some(Keyword::Is) => {
                self.stream.advance();
                if self.eat_keyword(Keyword::Not) {
                    negate = !negate;
                }
                self.parse_is(left)?
            }
            Some(Keyword::Like) => self.parse_like(left)?,
            Some(Keyword::Between) => self.parse_between(left)?,
            Some(Keyword::In) => self.parse_in(left)?,
            Some(Keyword::Overlaps) => self.parse_overlaps(left)?,
            Some(Keyword::Match) => self.parse_match(left)?,
            _ => self.parse_comparison(left)?,
        };
        let mut predicate = if negate { predicate.not() } else { predicate };
        predicate.span = self.span_from(start);
        Ok(predicate)
    }

    fn parse_comparison(&mut self, left: Expr) -> ParseResult<Expr> {
        let Some(op) = comparison_op(self.peek()) else {
            return Err(self.unexpected("predicate"));
        };
        self.stream.advance();
        let quantifier = match self.keyword() {
            Some(Keyword::Any | Keyword::Some) => Some(Quantifier::Any),
            Some(Keyword::All) => Some(Quantifier::All),
            _ => None,
        };
        if let Some(quantifier) = quantifier {
            self.stream.advance();
            let mode = match quantifier {
                Quantifier::All => SubQueryMode::FullOrder,
                Quantifier::Any => SubQueryMode::Unique,
            };
            let subquery = self.parse_subquery(mode)?;
            self.check_subquery_degree(&left, subquery)?;
            return Ok(Expr::new(
                ExprKind::Quantified {
                    op,
                    quantifier,
                    left: Box::new(left),
                    subquery,
                },
                Span::ZERO,
            ));
        }
        let right = self.parse_value_expression()?;
        self.check_degrees(&left, &right)?;
        Ok(left.binary(op, right))
    }

    /// Parses the rest of `IS [NOT]`; the caller consumed `IS` and `NOT`.
    fn parse_is(&mut self, operand: Expr) -> ParseResult<Expr> {
        let span = operand.span;
        let value = match self.keyword() {
            Some(Keyword::Null) => {
                self.stream.advance();
                return Ok(operand.is_null());
            }
            Some(Keyword::Distinct) => {
                self.stream.advance();
                self.expect_keyword(Keyword::From)?;
                let right = self.parse_value_expression()?;
                self.check_degrees(&operand, &right)?;
                return Ok(Expr::new(
                    ExprKind::IsDistinctFrom {
                        left: Box::new(operand),
                        right: Box::new(right),
                    },
                    span,
                ));
            }
            Some(Keyword::True) => TruthValue::True,
            Some(Keyword::False) => TruthValue::False,
            Some(Keyword::Unknown) => TruthValue::Unknown,
            _ => return Err(self.unexpected("NULL, DISTINCT FROM, TRUE, FALSE or UNKNOWN")),
        };
        self.stream.advance();
        Ok(Expr::new(
            ExprKind::IsTruth {
                operand: Box::new(operand),
                value,
            },
            span,
        ))
    }

    fn parse_like(&mut self, operand: Expr) -> ParseResult<Expr> {
        self.expect_keyword(Keyword::Like)?;
        let pattern = self.parse_value_expression()?;
        let escape = if self.eat_keyword(Keyword::Escape) {
            Some(Box::new(self.parse_value_expression()?))
        } else {
            None
        };
        let span = operand.span;
        Ok(Expr::new(
            ExprKind::Like {
                operand: Box::new(operand),
                pattern: Box::new(pattern),
                escape,
            },
            span,
        ))
    }

    /// `x BETWEEN a AND b` becomes `a <= x AND x <= b`. The SYMMETRIC form
    /// also accepts the bounds in reverse order.
    fn parse_between(&mut self, operand: Expr) -> ParseResult<Expr> {
        self.expect_keyword(Keyword::Between)?;
        let symmetric = if self.eat_keyword(Keyword::Symmetric) {
            true
        } else {
            self.eat_keyword(Keyword::Asymmetric);
            false
        };
        let low = self.parse_value_expression()?;
        self.expect_keyword(Keyword::And)?;
        let high = self.parse_value_expression()?;
        self.check_degrees(&operand, &low)?;
        self.check_degrees(&operand, &high)?;

        if symmetric {
            let forward = between(&operand, low.clone(), high.clone());
            Ok(forward.or(between(&operand, high, low)))
        } else {
            Ok(between(&operand, low, high))
        }
    }

    fn parse_in(&mut self, operand: Expr) -> ParseResult<Expr> {
        self.expect_keyword(Keyword::In)?;
        if !self.subquery_follows() {
            return self.parse_in_list(operand);
        }
        let speculative = match self.speculate(|p| p.parse_subquery(SubQueryMode::Unique)) {
            Ok(subquery) => {
                self.check_subquery_degree(&operand, subquery)?;
                return Ok(Expr::new(
                    ExprKind::Quantified {
                        op: BinaryOp::Eq,
                        quantifier: Quantifier::Any,
                        left: Box::new(operand),
                        subquery,
                    },
                    Span::ZERO,
                ));
            }
            Err(error) => error,
        };
        self.parse_in_list(operand)
            .map_err(|error| self.best_failure(speculative, error))
    }

    fn parse_in_list(&mut self, operand: Expr) -> ParseResult<Expr> {
        self.expect(&TokenKind::LeftParen)?;
        let mut list = Vec::new();
        loop {
            let item = self.parse_value_expression()?;
            self.check_degrees(&operand, &item)?;
            list.push(item);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RightParen)?;
        let span = operand.span;
        Ok(Expr::new(
            ExprKind::InList {
                operand: Box::new(operand),
                list,
            },
            span,
        ))
    }

    fn parse_overlaps(&mut self, left: Expr) -> ParseResult<Expr> {
        let token = self.expect_keyword(Keyword::Overlaps)?;
        let right = self.parse_value_expression()?;
        if self.degree_of(&left) != 2 || self.degree_of(&right) != 2 {
            return Err(self.semantic_error("OVERLAPS requires two rows of degree 2", token.span));
        }
        let span = left.span;
        Ok(Expr::new(
            ExprKind::Overlaps {
                left: Box::new(left),
                right: Box::new(right),
            },
            span,
        ))
    }

    fn parse_match(&mut self, left: Expr) -> ParseResult<Expr> {
        self.expect_keyword(Keyword::Match)?;
        let unique = self.eat_keyword(Keyword::Unique);
        let match_type = if self.eat_keyword(Keyword::Partial) {
            MatchType::Partial
        } else if self.eat_keyword(Keyword::Full) {
            MatchType::Full
        } else {
            self.eat_keyword(Keyword::Simple);
            MatchType::Simple
        };
        let mode = if unique {
            SubQueryMode::FullOrder
        } else {
            SubQueryMode::Unique
        };
        let subquery = self.parse_subquery(mode)?;
        self.check_subquery_degree(&left, subquery)?;
        let span = left.span;
        Ok(Expr::new(
            ExprKind::Match {
                left: Box::new(left),
                subquery,
                unique,
                match_type,
            },
            span,
        ))
    }

    // --- Degree checks ---

    /// Degree of a row value; scalar subqueries report their select list
    /// width.
    pub(super) fn degree_of(&self, expr: &Expr) -> usize {
        match &expr.kind {
            ExprKind::ScalarSubquery(id) => self
                .ctx
                .subquery(*id)
                .map_or(1, |subquery| subquery.source_degree()),
            _ => expr.degree(),
        }
    }

    pub(super) fn check_degrees(&self, left: &Expr, right: &Expr) -> ParseResult<()> {
        let (l, r) = (self.degree_of(left), self.degree_of(right));
        if l == r {
            Ok(())
        } else {
            Err(self.semantic_error(
                format!("Row value degree mismatch: {l} and {r}"),
                left.span.merge(right.span),
            ))
        }
    }

    fn check_subquery_degree(&self, left: &Expr, subquery: SubQueryId) -> ParseResult<()> {
        let expected = self.degree_of(left);
        let actual = self
            .ctx
            .subquery(subquery)
            .map_or(expected, |s| s.source_degree());
        if expected == actual {
            Ok(())
        } else {
            Err(self.semantic_error(
                format!("Subquery returns {actual} columns, expected {expected}"),
                left.span,
            ))
        }
    }

    // --- Arithmetic ---

    /// Parses a value expression: everything below the predicate level.
    pub(super) fn parse_value_expression(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_term()?;
        while let Some(op) = additive_op(self.peek()) {
            self.stream.advance();
            let right = self.parse_term()?;
            left = left.binary(op, right);
        }
        Ok(left)
    }

    fn parse_term(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_factor()?;
        while let Some(op) = multiplicative_op(self.peek()) {
            self.stream.advance();
            let right = self.parse_factor()?;
            left = left.binary(op, right);
        }
        Ok(left)
    }

    /// Parses a signed primary with its postfix operators. A minus sign
    /// directly on a numeric literal is folded into the literal.
    pub(super) fn parse_factor(&mut self) -> ParseResult<Expr> {
        let Some(op) = sign_op(self.peek()) else {
            let primary = self.parse_primary()?;
            return self.parse_postfix(primary);
        };
        let start = self.stream.advance().span;
        let mut operand = self.nested(start, Self::parse_factor)?;
        let span = start.merge(operand.span);
        if op == UnaryOp::Plus {
            operand.span = span;
            return Ok(operand);
        }
        let folded = match &operand.kind {
            ExprKind::Literal(Literal::Integer(n)) => n.checked_neg().map(Literal::Integer),
            ExprKind::Literal(Literal::Float(f)) => Some(Literal::Float(-f)),
            _ => None,
        };
        Ok(match folded {
            Some(literal) => Expr::literal(literal, span),
            None => Expr::new(
                ExprKind::Unary {
                    op,
                    operand: Box::new(operand),
                },
                span,
            ),
        })
    }

    fn parse_postfix(&mut self, mut expr: Expr) -> ParseResult<Expr> {
        loop {
            let start = expr.span;
            match self.peek() {
                TokenKind::LeftBracket => {
                    self.stream.advance();
                    let index = self.parse_value_expression()?;
                    self.expect(&TokenKind::RightBracket)?;
                    expr = Expr::new(
                        ExprKind::ArrayElement {
                            array: Box::new(expr),
                            index: Box::new(index),
                        },
                        Span::ZERO,
                    );
                }
                TokenKind::DoubleColon if self.config.dialect.supports_double_colon_cast() => {
                    self.stream.advance();
                    let target = self.parse_data_type()?;
                    expr = Expr::new(
                        ExprKind::Cast {
                            operand: Box::new(expr),
                            target,
                        },
                        Span::ZERO,
                    );
                }
                TokenKind::Keyword(Keyword::Collate) => {
                    self.stream.advance();
                    let (parts, _) = self.parse_name_chain()?;
                    expr.collation = Some(parts.join("."));
                }
                TokenKind::Keyword(Keyword::At) => {
                    self.stream.advance();
                    let zone = if self.eat_keyword(Keyword::Local) {
                        None
                    } else {
                        self.expect_keyword(Keyword::Time)?;
                        self.expect_keyword(Keyword::Zone)?;
                        Some(Box::new(self.parse_factor()?))
                    };
                    expr = Expr::new(
                        ExprKind::AtTimeZone {
                            operand: Box::new(expr),
                            zone,
                        },
                        Span::ZERO,
                    );
                }
                _ => return Ok(expr),
            }
            expr.span = self.span_from(start);
        }
    }

    // --- Primaries ---

    fn parse_primary(&mut self) -> ParseResult<Expr> {
        let token = self.stream.current().clone();
        let span = token.span;
        let literal = match &token.kind {
            TokenKind::Integer(n) => Literal::Integer(*n),
            TokenKind::Float(f) => Literal::Float(*f),
            TokenKind::String(s) => Literal::String(s.clone()),
            TokenKind::Blob(b) => Literal::Blob(b.clone()),
            TokenKind::Question => {
                let position = self.stream.position();
                self.stream.advance();
                return Ok(self.parameter(None, span, position));
            }
            TokenKind::Colon => {
                let position = self.stream.position();
                self.stream.advance();
                let name = self.expect_name()?;
                let span = self.span_from(span);
                return Ok(self.parameter(Some(name), span, position));
            }
            TokenKind::LeftParen => return self.parse_parenthesized(),
            TokenKind::Keyword(keyword) => return self.parse_keyword_primary(*keyword, span),
            TokenKind::Identifier(_) | TokenKind::QuotedIdentifier(_) => {
                return self.parse_name_primary();
            }
            _ => return Err(self.unexpected("expression")),
        };
        self.stream.advance();
        Ok(Expr::literal(literal, span))
    }

    /// Creates the next dynamic parameter, recorded at the token position of
    /// its placeholder.
    fn parameter(&mut self, name: Option<String>, span: Span, position: usize) -> Expr {
        let index = self.ctx.parameter_count();
        let expr = Expr::new(ExprKind::Parameter { index, name }, span);
        self.ctx.add_parameter(expr.clone(), position);
        trace!(index, position, "Registered parameter");
        expr
    }

    fn parse_keyword_primary(&mut self, keyword: Keyword, span: Span) -> ParseResult<Expr> {
        let string_follows = matches!(self.peek_nth(1), TokenKind::String(_));
        match keyword {
            Keyword::Null | Keyword::Unknown => {
                self.stream.advance();
                Ok(Expr::null(span))
            }
            Keyword::True | Keyword::False => {
                self.stream.advance();
                Ok(Expr::literal(
                    Literal::Boolean(keyword == Keyword::True),
                    span,
                ))
            }
            Keyword::Date | Keyword::Time | Keyword::Timestamp if string_follows => {
                self.stream.advance();
                let text = self.expect_string()?;
                let literal = match keyword {
                    Keyword::Date => Literal::Date(text),
                    Keyword::Time => Literal::Time(text),
                    _ => Literal::Timestamp(text),
                };
                Ok(Expr::literal(literal, self.span_from(span)))
            }
            Keyword::Interval => {
                self.stream.advance();
                let value = self.expect_string()?;
                let qualifier = self.parse_interval_qualifier()?;
                Ok(Expr::literal(
                    Literal::Interval { value, qualifier },
                    self.span_from(span),
                ))
            }
            Keyword::Case => self.parse_case(),
            Keyword::Cast => self.parse_cast(),
            Keyword::Exists => {
                self.stream.advance();
                let subquery = self.parse_subquery(SubQueryMode::Exists)?;
                Ok(Expr::new(ExprKind::Exists(subquery), self.span_from(span)))
            }
            Keyword::Unique => {
                self.stream.advance();
                let subquery = self.parse_subquery(SubQueryMode::FullOrder)?;
                Ok(Expr::new(ExprKind::Unique(subquery), self.span_from(span)))
            }
            Keyword::Array => self.parse_array(),
            Keyword::Next | Keyword::Current if self.check_keyword_nth(1, Keyword::Value) => {
                let position = self.stream.position();
                self.stream.advance();
                self.stream.advance();
                self.expect_keyword(Keyword::For)?;
                let sequence = self.parse_sequence_reference(position)?;
                let kind = if keyword == Keyword::Next {
                    ExprKind::NextValue(sequence)
                } else {
                    ExprKind::CurrentValue(sequence)
                };
                Ok(Expr::new(kind, self.span_from(span)))
            }
            Keyword::Row if matches!(self.peek_nth(1), TokenKind::LeftParen) => {
                self.stream.advance();
                self.expect(&TokenKind::LeftParen)?;
                let items = self.parse_expression_list()?;
                self.expect(&TokenKind::RightParen)?;
                Ok(Expr::new(ExprKind::Row(items), self.span_from(span)))
            }
            _ if !keyword.is_reserved() => self.parse_name_primary(),
            _ => Err(self.unexpected("expression")),
        }
    }

    fn expect_string(&mut self) -> ParseResult<String> {
        match self.peek() {
            TokenKind::String(s) => {
                let s = s.clone();
                self.stream.advance();
                Ok(s)
            }
            _ => Err(self.unexpected("string literal")),
        }
    }

    /// Parses `expr { , expr }`.
    pub(super) fn parse_expression_list(&mut self) -> ParseResult<Vec<Expr>> {
        let mut items = vec![self.parse_expression()?];
        while self.eat(&TokenKind::Comma) {
            items.push(self.parse_expression()?);
        }
        Ok(items)
    }

    /// `(` at the start of a primary: a scalar or row subquery, a row value
    /// constructor, or a parenthesized expression.
    fn parse_parenthesized(&mut self) -> ParseResult<Expr> {
        if !self.subquery_follows() {
            return self.parse_row_or_nested();
        }
        let start = self.stream.current().span;
        let speculative = match self.speculate(|p| p.parse_subquery(SubQueryMode::Plain)) {
            Ok(subquery) => {
                return Ok(Expr::new(
                    ExprKind::ScalarSubquery(subquery),
                    self.span_from(start),
                ));
            }
            Err(error) => error,
        };
        self.parse_row_or_nested()
            .map_err(|error| self.best_failure(speculative, error))
    }

    fn parse_row_or_nested(&mut self) -> ParseResult<Expr> {
        let start = self.stream.current().span;
        self.nested(start, |p| {
            p.expect(&TokenKind::LeftParen)?;
            let mut items = p.parse_expression_list()?;
            p.expect(&TokenKind::RightParen)?;
            if items.len() == 1 {
                if let Some(inner) = items.pop() {
                    return Ok(inner);
                }
            }
            Ok(Expr::new(ExprKind::Row(items), p.span_from(start)))
        })
    }

    fn parse_case(&mut self) -> ParseResult<Expr> {
        let start = self.expect_keyword(Keyword::Case)?.span;
        let operand = if self.check_keyword(Keyword::When) {
            None
        } else {
            Some(self.parse_value_expression()?)
        };

        let mut branches = Vec::new();
        while self.eat_keyword(Keyword::When) {
            let condition = match &operand {
                Some(operand) => self.parse_when_operands(operand)?,
                None => self.parse_expression()?,
            };
            self.expect_keyword(Keyword::Then)?;
            let result = self.parse_expression()?;
            branches.push((condition, result));
        }
        if branches.is_empty() {
            return Err(self.unexpected("WHEN"));
        }
        let otherwise = if self.eat_keyword(Keyword::Else) {
            self.parse_expression()?
        } else {
            Expr::null(Span::ZERO)
        };
        self.expect_keyword(Keyword::End)?;

        let span = self.span_from(start);
        Ok(branches
            .into_iter()
            .rev()
            .fold(otherwise, |otherwise, (condition, then)| {
                Expr::alternative(condition, then, otherwise, span)
            }))
    }

    /// The comma-separated `WHEN` operands of a simple CASE. Each is either
    /// a predicate applied to the case operand or a value compared with it.
    fn parse_when_operands(&mut self, operand: &Expr) -> ParseResult<Expr> {
        let mut condition = self.parse_when_operand(operand)?;
        while self.eat(&TokenKind::Comma) {
            let next = self.parse_when_operand(operand)?;
            condition = condition.or(next);
        }
        Ok(condition)
    }

    fn parse_when_operand(&mut self, operand: &Expr) -> ParseResult<Expr> {
        if self.at_predicate_suffix() {
            return self.parse_predicate_suffix(operand.clone());
        }
        let value = self.parse_value_expression()?;
        self.check_degrees(operand, &value)?;
        Ok(operand.clone().binary(BinaryOp::Eq, value))
    }

    fn parse_cast(&mut self) -> ParseResult<Expr> {
        let start = self.expect_keyword(Keyword::Cast)?.span;
        self.expect(&TokenKind::LeftParen)?;
        let operand = self.parse_expression()?;
        self.expect_keyword(Keyword::As)?;
        let target = self.parse_data_type()?;
        self.expect(&TokenKind::RightParen)?;
        Ok(Expr::new(
            ExprKind::Cast {
                operand: Box::new(operand),
                target,
            },
            self.span_from(start),
        ))
    }

    fn parse_array(&mut self) -> ParseResult<Expr> {
        let start = self.expect_keyword(Keyword::Array)?.span;
        if self.eat(&TokenKind::LeftBracket) {
            let items = if self.check(&TokenKind::RightBracket) {
                Vec::new()
            } else {
                self.parse_expression_list()?
            };
            self.expect(&TokenKind::RightBracket)?;
            return Ok(Expr::new(ExprKind::Array(items), self.span_from(start)));
        }
        if self.check(&TokenKind::LeftParen) {
            let subquery = self.parse_subquery(SubQueryMode::Plain)?;
            return Ok(Expr::new(
                ExprKind::ArraySubquery(subquery),
                self.span_from(start),
            ));
        }
        Err(self.unexpected("[ or ("))
    }

    fn parse_sequence_reference(&mut self, position: usize) -> ParseResult<String> {
        let (parts, span) = self.parse_name_chain()?;
        let name = QualifiedName::from_parts(parts)
            .ok_or_else(|| self.semantic_error("Sequence name has too many parts", span))?;
        let schema = self.resolve_schema(&name, span)?;
        let sequence = self
            .catalog
            .lookup_sequence(&name.name, &schema)
            .ok_or_else(|| {
                self.catalog_error(format!("Sequence not found: {schema}.{}", name.name), span)
            })?;
        let qualified = sequence.qualified_name();
        self.ctx.add_sequence(qualified.clone(), position);
        Ok(qualified)
    }

    // --- Names and function calls ---

    /// A column reference, a niladic built-in, or a function call.
    fn parse_name_primary(&mut self) -> ParseResult<Expr> {
        let start = self.stream.current().span;
        let position = self.stream.position();
        let (mut parts, span) = self.parse_name_chain()?;
        if self.check(&TokenKind::LeftParen) {
            return self.parse_function(parts, start, position);
        }
        if let [name] = parts.as_slice() {
            if NILADIC_FUNCTIONS.contains(&name.as_str()) {
                return Ok(Expr::new(
                    ExprKind::Function {
                        name: QualifiedName::bare(name.clone()),
                        args: Vec::new(),
                        routine: None,
                    },
                    span,
                ));
            }
        }
        if parts.len() > 4 {
            return Err(self.semantic_error("Column reference has too many parts", span));
        }
        if parts.len() == 4 && parts[0] != self.catalog.default_catalog_name() {
            return Err(self.catalog_error(format!("Unknown catalog: {}", parts[0]), span));
        }
        let name = parts.pop().unwrap_or_default();
        Ok(Expr::new(ExprKind::Column(ColumnRef::new(parts, name)), span))
    }

    fn parse_function(
        &mut self,
        parts: Vec<String>,
        start: Span,
        position: usize,
    ) -> ParseResult<Expr> {
        if let [name] = parts.as_slice() {
            let name = name.as_str();
            let dialect = self.config.dialect;
            if let Some(function) = AggregateFunction::from_name(name) {
                if function == AggregateFunction::GroupConcat && !dialect.supports_group_concat() {
                    return Err(self.unsupported(
                        format!("GROUP_CONCAT is not available in {dialect} mode"),
                        start,
                    ));
                }
                return self.parse_aggregate(function, start);
            }
            let oracle = dialect.supports_oracle_functions();
            match name {
                "COALESCE" => return self.parse_coalesce(start, 1, usize::MAX),
                "IFNULL" => return self.parse_coalesce(start, 2, 2),
                "NVL" if oracle => return self.parse_coalesce(start, 2, 2),
                "NVL2" if oracle => return self.parse_nvl2(start),
                "NULLIF" => return self.parse_nullif(start),
                "DECODE" if oracle => return self.parse_decode(start),
                "GREATEST" => return self.parse_extremum(start, BinaryOp::GtEq),
                "LEAST" => return self.parse_extremum(start, BinaryOp::LtEq),
                _ => {}
            }
            if BUILTIN_FUNCTIONS.contains(&name) {
                let name = QualifiedName::bare(name);
                let args = self.parse_call_arguments()?;
                return Ok(Expr::new(
                    ExprKind::Function {
                        name,
                        args,
                        routine: None,
                    },
                    self.span_from(start),
                ));
            }
        }

        let span = self.span_from(start);
        let name = QualifiedName::from_parts(parts)
            .ok_or_else(|| self.semantic_error("Function name has too many parts", span))?;
        let schema = self.resolve_schema(&name, span)?;
        let routine = self
            .catalog
            .lookup_routine(&name.name, &schema)
            .ok_or_else(|| {
                self.catalog_error(format!("Unknown function: {schema}.{}", name.name), span)
            })?;
        let args = self.parse_call_arguments()?;
        if let Some(expected) = routine.parameter_count {
            if expected != args.len() {
                return Err(self.semantic_error(
                    format!(
                        "Function {} expects {expected} arguments, got {}",
                        routine.qualified_name(),
                        args.len()
                    ),
                    self.span_from(start),
                ));
            }
        }
        let qualified = routine.qualified_name();
        self.ctx.add_routine(qualified.clone(), position);
        Ok(Expr::new(
            ExprKind::Function {
                name,
                args,
                routine: Some(qualified),
            },
            self.span_from(start),
        ))
    }

    /// Parses `( [expr, ...] )`.
    fn parse_call_arguments(&mut self) -> ParseResult<Vec<Expr>> {
        self.expect(&TokenKind::LeftParen)?;
        if self.eat(&TokenKind::RightParen) {
            return Ok(Vec::new());
        }
        let args = self.parse_expression_list()?;
        self.expect(&TokenKind::RightParen)?;
        Ok(args)
    }

    /// Parses call arguments and checks their count.
    fn parse_arguments_between(
        &mut self,
        start: Span,
        min: usize,
        max: usize,
    ) -> ParseResult<Vec<Expr>> {
        let args = self.parse_call_arguments()?;
        if args.len() < min || args.len() > max {
            return Err(self.syntax_error(
                format!("Wrong number of arguments: {}", args.len()),
                self.span_from(start),
            ));
        }
        Ok(args)
    }

    /// `COALESCE(a, b, ...)`: the first operand that is not NULL.
    fn parse_coalesce(&mut self, start: Span, min: usize, max: usize) -> ParseResult<Expr> {
        let args = self.parse_arguments_between(start, min, max)?;
        let span = self.span_from(start);
        let mut args = args.into_iter().rev();
        let last = args.next().unwrap_or_else(|| Expr::null(span));
        Ok(args.fold(last, |otherwise, arg| {
            Expr::alternative(arg.clone().is_null().not(), arg, otherwise, span)
        }))
    }

    /// `NVL2(a, b, c)`: `b` when `a` is not NULL, else `c`.
    fn parse_nvl2(&mut self, start: Span) -> ParseResult<Expr> {
        let args = self.parse_arguments_between(start, 3, 3)?;
        let span = self.span_from(start);
        let [test, then, otherwise]: [Expr; 3] = args
            .try_into()
            .map_err(|_| self.syntax_error("NVL2 takes three arguments", span))?;
        Ok(Expr::alternative(test.is_null().not(), then, otherwise, span))
    }

    /// `NULLIF(a, b)`: NULL when `a = b`, else `a`.
    fn parse_nullif(&mut self, start: Span) -> ParseResult<Expr> {
        let args = self.parse_arguments_between(start, 2, 2)?;
        let span = self.span_from(start);
        let [left, right]: [Expr; 2] = args
            .try_into()
            .map_err(|_| self.syntax_error("NULLIF takes two arguments", span))?;
        self.check_degrees(&left, &right)?;
        let condition = left.clone().binary(BinaryOp::Eq, right);
        Ok(Expr::alternative(condition, Expr::null(span), left, span))
    }

    /// `DECODE(x, s1, r1, ..., [default])`. Matching uses IS NOT DISTINCT
    /// FROM, so a NULL search value matches a NULL `x`.
    fn parse_decode(&mut self, start: Span) -> ParseResult<Expr> {
        let mut args = self.parse_arguments_between(start, 3, usize::MAX)?;
        let span = self.span_from(start);
        let operand = args.remove(0);
        let otherwise = if args.len() % 2 == 1 {
            args.pop().unwrap_or_else(|| Expr::null(span))
        } else {
            Expr::null(span)
        };
        let mut pairs = Vec::with_capacity(args.len() / 2);
        let mut args = args.into_iter();
        while let (Some(search), Some(result)) = (args.next(), args.next()) {
            pairs.push((search, result));
        }
        Ok(pairs
            .into_iter()
            .rev()
            .fold(otherwise, |otherwise, (search, result)| {
                let matches = Expr::new(
                    ExprKind::IsDistinctFrom {
                        left: Box::new(operand.clone()),
                        right: Box::new(search),
                    },
                    span,
                )
                .not();
                Expr::alternative(matches, result, otherwise, span)
            }))
    }

    /// `GREATEST` / `LEAST` as a flat alternative chain. Branch `i` picks
    /// operand `i` when it is not NULL and wins against every other operand
    /// that is not NULL, so the result is NULL only when every operand is.
    fn parse_extremum(&mut self, start: Span, wins: BinaryOp) -> ParseResult<Expr> {
        let args = self.parse_arguments_between(start, 1, usize::MAX)?;
        let span = self.span_from(start);
        let branches: Vec<(Expr, Expr)> = args
            .iter()
            .enumerate()
            .map(|(i, candidate)| {
                let condition = args
                    .iter()
                    .enumerate()
                    .filter(|(j, _)| *j != i)
                    .fold(candidate.clone().is_null().not(), |acc, (_, other)| {
                        let beaten = other
                            .clone()
                            .is_null()
                            .or(candidate.clone().binary(wins, other.clone()));
                        acc.and(beaten)
                    });
                (condition, candidate.clone())
            })
            .collect();
        Ok(branches
            .into_iter()
            .rev()
            .fold(Expr::null(span), |otherwise, (condition, result)| {
                Expr::alternative(condition, result, otherwise, span)
            }))
    }

    fn parse_aggregate(&mut self, function: AggregateFunction, start: Span) -> ParseResult<Expr> {
        self.expect(&TokenKind::LeftParen)?;
        let quantifier = if self.eat_keyword(Keyword::Distinct) {
            Some(SetQuantifier::Distinct)
        } else if self.eat_keyword(Keyword::All) {
            Some(SetQuantifier::All)
        } else {
            None
        };
        if quantifier.is_some() && function.is_statistical() {
            return Err(self.syntax_error(
                format!("{} does not accept DISTINCT or ALL", function.as_str()),
                self.span_from(start),
            ));
        }

        let argument = if self.check(&TokenKind::Star) {
            if function != AggregateFunction::Count || quantifier.is_some() {
                return Err(self.unexpected("expression"));
            }
            self.stream.advance();
            None
        } else {
            Some(Box::new(self.parse_expression()?))
        };

        let order_by = if function.accepts_order_by() && self.check_keyword(Keyword::Order) {
            self.stream.advance();
            self.expect_keyword(Keyword::By)?;
            self.parse_order_by_list()?
        } else {
            Vec::new()
        };
        let separator = if function == AggregateFunction::GroupConcat
            && self.eat_keyword(Keyword::Separator)
        {
            Some(self.expect_string()?)
        } else {
            None
        };
        self.expect(&TokenKind::RightParen)?;

        Ok(Expr::new(
            ExprKind::Aggregate {
                function,
                quantifier,
                argument,
                order_by,
                separator,
            },
            self.span_from(start),
        ))
    }

    // --- Data types ---

    /// Parses a data type, including domains looked up in the catalog and
    /// trailing `ARRAY` suffixes.
    pub(super) fn parse_data_type(&mut self) -> ParseResult<DataType> {
        let start = self.stream.current().span;
        let simple = match self.keyword() {
            Some(Keyword::Int | Keyword::Integer) => Some(DataType::Integer),
            Some(Keyword::Smallint) => Some(DataType::Smallint),
            Some(Keyword::Bigint) => Some(DataType::Bigint),
            Some(Keyword::Real) => Some(DataType::Real),
            Some(Keyword::Clob | Keyword::Text) => Some(DataType::Clob),
            Some(Keyword::Blob) => Some(DataType::Blob),
            Some(Keyword::Boolean) => Some(DataType::Boolean),
            Some(Keyword::Date) => Some(DataType::Date),
            _ => None,
        };
        let mut data_type = if let Some(simple) = simple {
            self.stream.advance();
            simple
        } else {
            match self.keyword() {
                Some(Keyword::Double) => {
                    self.stream.advance();
                    self.eat_keyword(Keyword::Precision);
                    DataType::Double
                }
                Some(Keyword::Float) => {
                    self.stream.advance();
                    self.parse_optional_length(start)?;
                    DataType::Double
                }
                Some(Keyword::Decimal | Keyword::Numeric) => {
                    self.stream.advance();
                    let (precision, scale) = self.parse_precision_scale(start)?;
                    DataType::Decimal { precision, scale }
                }
                Some(Keyword::Char | Keyword::Character) => {
                    self.stream.advance();
                    let varying = self.eat_keyword(Keyword::Varying);
                    let length = self.parse_optional_length(start)?;
                    if varying {
                        DataType::Varchar(length)
                    } else {
                        DataType::Char(length)
                    }
                }
                Some(Keyword::Varchar) => {
                    self.stream.advance();
                    DataType::Varchar(self.parse_optional_length(start)?)
                }
                Some(Keyword::Time) => {
                    self.stream.advance();
                    self.parse_optional_length(start)?;
                    DataType::Time {
                        with_time_zone: self.parse_time_zone_flag()?,
                    }
                }
                Some(Keyword::Timestamp) => {
                    self.stream.advance();
                    self.parse_optional_length(start)?;
                    DataType::Timestamp {
                        with_time_zone: self.parse_time_zone_flag()?,
                    }
                }
                Some(Keyword::Interval) => {
                    self.stream.advance();
                    DataType::Interval(self.parse_interval_qualifier()?)
                }
                _ => self.parse_domain_type()?,
            }
        };
        while self.eat_keyword(Keyword::Array) {
            if self.eat(&TokenKind::LeftBracket) {
                self.parse_positive_integer(start)?;
                self.expect(&TokenKind::RightBracket)?;
            }
            data_type = DataType::Array(Box::new(data_type));
        }
        Ok(data_type)
    }

    fn parse_domain_type(&mut self) -> ParseResult<DataType> {
        let position = self.stream.position();
        if !self.peek().is_name() {
            return Err(self.unexpected("data type"));
        }
        let (parts, span) = self.parse_name_chain()?;
        let name = QualifiedName::from_parts(parts)
            .ok_or_else(|| self.semantic_error("Type name has too many parts", span))?;
        let schema = self.resolve_schema(&name, span)?;
        let data_type = self
            .catalog
            .lookup_type(&name.name, &schema)
            .ok_or_else(|| {
                self.catalog_error(format!("Type not found: {schema}.{}", name.name), span)
            })?;
        self.ctx
            .add_schema_object(format!("{schema}.{}", name.name), position);
        Ok(data_type)
    }

    /// Parses `[ ( n ) ]`.
    fn parse_optional_length(&mut self, start: Span) -> ParseResult<Option<u32>> {
        if !self.eat(&TokenKind::LeftParen) {
            return Ok(None);
        }
        let length = self.parse_positive_integer(start)?;
        self.expect(&TokenKind::RightParen)?;
        Ok(Some(length))
    }

    /// Parses `[ ( p [, s] ) ]` and validates `1 <= p` and `s <= p`.
    fn parse_precision_scale(&mut self, start: Span) -> ParseResult<(Option<u16>, Option<u16>)> {
        if !self.eat(&TokenKind::LeftParen) {
            return Ok((None, None));
        }
        let precision = self.parse_positive_integer(start)?;
        let scale = if self.eat(&TokenKind::Comma) {
            match self.peek() {
                TokenKind::Integer(n) if *n >= 0 => {
                    let n = *n;
                    self.stream.advance();
                    Some(n)
                }
                _ => return Err(self.unexpected("scale")),
            }
        } else {
            None
        };
        self.expect(&TokenKind::RightParen)?;
        let span = self.span_from(start);
        if u64::from(precision) > MAX_DECIMAL_PRECISION {
            return Err(self.semantic_error(format!("Invalid precision: {precision}"), span));
        }
        if let Some(scale) = scale {
            if scale > i64::from(precision) {
                return Err(self.semantic_error(format!("Invalid scale: {scale}"), span));
            }
        }
        let precision = u16::try_from(precision)
            .map_err(|_| self.semantic_error(format!("Invalid precision: {precision}"), span))?;
        let scale = scale
            .map(u16::try_from)
            .transpose()
            .map_err(|_| self.semantic_error("Invalid scale", span))?;
        Ok((Some(precision), scale))
    }

    fn parse_positive_integer(&mut self, start: Span) -> ParseResult<u32> {
        let value = match self.peek() {
            TokenKind::Integer(n) => *n,
            _ => return Err(self.unexpected("length")),
        };
        self.stream.advance();
        u32::try_from(value)
            .ok()
            .filter(|n| *n >= 1)
            .ok_or_else(|| {
                self.semantic_error(format!("Invalid length: {value}"), self.span_from(start))
            })
    }

    /// Parses `[WITH | WITHOUT] TIME ZONE`.
    fn parse_time_zone_flag(&mut self) -> ParseResult<bool> {
        let with = if self.check_keyword(Keyword::With) && self.check_keyword_nth(1, Keyword::Time)
        {
            true
        } else if matches!(self.peek(), TokenKind::Identifier(s) if s == "WITHOUT") {
            false
        } else {
            return Ok(false);
        };
        self.stream.advance();
        self.expect_keyword(Keyword::Time)?;
        self.expect_keyword(Keyword::Zone)?;
        Ok(with)
    }

    /// Parses `field [(p)] [TO field [(p)]]`.
    fn parse_interval_qualifier(&mut self) -> ParseResult<IntervalQualifier> {
        let start_span = self.stream.current().span;
        let start = self.parse_interval_field()?;
        let end = if self.eat_keyword(Keyword::To) {
            let end = self.parse_interval_field()?;
            if end <= start {
                return Err(self.semantic_error(
                    format!("Invalid interval qualifier: {} TO {}", start.as_str(), end.as_str()),
                    self.span_from(start_span),
                ));
            }
            Some(end)
        } else {
            None
        };
        Ok(IntervalQualifier { start, end })
    }

    fn parse_interval_field(&mut self) -> ParseResult<IntervalField> {
        let start = self.stream.current().span;
        let field = match self.keyword() {
            Some(Keyword::Year) => IntervalField::Year,
            Some(Keyword::Month) => IntervalField::Month,
            Some(Keyword::Day) => IntervalField::Day,
            Some(Keyword::Hour) => IntervalField::Hour,
            Some(Keyword::Minute) => IntervalField::Minute,
            Some(Keyword::Second) => IntervalField::Second,
            _ => return Err(self.unexpected("interval field")),
        };
        self.stream.advance();
        self.parse_optional_length(start)?;
        Ok(field)
    }
}

/// `low <= operand AND operand <= high`
fn between(operand: &Expr, low: Expr, high: Expr) -> Expr {
    low.binary(BinaryOp::LtEq, operand.clone())
        .and(operand.clone().binary(BinaryOp::LtEq, high))
}
