//! SQL text rendering for compiled trees.

use core::fmt;

use super::expression::{Expr, ExprKind, Literal, MatchType, Quantifier, TruthValue, UnaryOp};
use super::query::{
    LimitClause, OrderByItem, OrderDirection, QueryBody, QueryExpression, QuerySpecification,
    SetOperator,
};
use crate::context::{JoinKind, RangeSource, RangeVariable, RangeVariableId};
use crate::dialect::{Dialect, DialectMode};
use crate::subquery::{SubQuery, SubQueryId, SubQuerySource};

const PREDICATE: u8 = 4;
const UNARY: u8 = 7;

/// Renders expressions and query expressions back to SQL.
///
/// Subqueries and FROM entries live in the compile context's arenas, so the
/// writer borrows both. A detached writer renders subquery references as
/// placeholders.
#[derive(Debug, Clone, Copy)]
pub struct SqlWriter<'a> {
    range_variables: &'a [RangeVariable],
    subqueries: &'a [SubQuery],
    dialect: DialectMode,
}

impl<'a> SqlWriter<'a> {
    /// Creates a writer over a compiled statement's arenas.
    #[must_use]
    pub const fn new(range_variables: &'a [RangeVariable], subqueries: &'a [SubQuery]) -> Self {
        Self {
            range_variables,
            subqueries,
            dialect: DialectMode::Standard,
        }
    }

    /// A writer with no arenas.
    #[must_use]
    pub const fn detached() -> SqlWriter<'static> {
        SqlWriter {
            range_variables: &[],
            subqueries: &[],
            dialect: DialectMode::Standard,
        }
    }

    /// Quotes identifiers the way `dialect` does.
    #[must_use]
    pub const fn with_dialect(mut self, dialect: DialectMode) -> Self {
        self.dialect = dialect;
        self
    }

    /// Renders an expression.
    #[must_use]
    pub fn expression(&self, expr: &Expr) -> String {
        let mut sql = String::new();
        self.write_expr(&mut sql, expr, 0);
        sql
    }

    /// Renders a query expression.
    #[must_use]
    pub fn query(&self, query: &QueryExpression) -> String {
        let mut sql = String::new();
        self.write_query(&mut sql, query);
        sql
    }

    fn ident(&self, sql: &mut String, name: &str) {
        sql.push_str(&self.dialect.quote_identifier(name));
    }

    fn idents(&self, sql: &mut String, names: &[String]) {
        for (i, name) in names.iter().enumerate() {
            if i > 0 {
                sql.push_str(", ");
            }
            self.ident(sql, name);
        }
    }

    fn list(&self, sql: &mut String, items: &[Expr]) {
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                sql.push_str(", ");
            }
            self.write_expr(sql, item, 0);
        }
    }

    #[allow(clippy::too_many_lines)]
    fn write_expr(&self, sql: &mut String, expr: &Expr, parent: u8) {
        match &expr.kind {
            ExprKind::Literal(literal) => write_literal(sql, literal),
            ExprKind::Column(column) => {
                for part in &column.qualifier {
                    self.ident(sql, part);
                    sql.push('.');
                }
                self.ident(sql, &column.name);
            }
            ExprKind::Asterisk { qualifier } => {
                for part in qualifier.iter().flatten() {
                    self.ident(sql, part);
                    sql.push('.');
                }
                sql.push('*');
            }
            ExprKind::Parameter { name: Some(name), .. } => {
                sql.push(':');
                sql.push_str(name);
            }
            ExprKind::Parameter { name: None, .. } => sql.push('?'),
            ExprKind::Binary { op, left, right } => {
                let prec = op.precedence();
                let paren = prec < parent;
                if paren {
                    sql.push('(');
                }
                self.write_expr(sql, left, prec);
                sql.push(' ');
                sql.push_str(op.as_str());
                sql.push(' ');
                self.write_expr(sql, right, prec + 1);
                if paren {
                    sql.push(')');
                }
            }
            ExprKind::Unary { op, operand } => {
                let (prec, inner) = if *op == UnaryOp::Not {
                    (3, 3)
                } else {
                    (UNARY, UNARY + 1)
                };
                let paren = prec < parent;
                if paren {
                    sql.push('(');
                }
                sql.push_str(op.as_str());
                if *op == UnaryOp::Not {
                    sql.push(' ');
                }
                self.write_expr(sql, operand, inner);
                if paren {
                    sql.push(')');
                }
            }
            ExprKind::Alternative { .. } => self.write_case(sql, expr),
            ExprKind::Exists(id) => {
                sql.push_str("EXISTS ");
                self.write_subquery(sql, *id);
            }
            ExprKind::Unique(id) => {
                sql.push_str("UNIQUE ");
                self.write_subquery(sql, *id);
            }
            ExprKind::ScalarSubquery(id) => self.write_subquery(sql, *id),
            ExprKind::Row(items) => {
                sql.push('(');
                self.list(sql, items);
                sql.push(')');
            }
            ExprKind::Aggregate {
                function,
                quantifier,
                argument,
                order_by,
                separator,
            } => {
                sql.push_str(function.as_str());
                sql.push('(');
                if let Some(q) = quantifier {
                    sql.push_str(q.as_str());
                    sql.push(' ');
                }
                match argument {
                    Some(arg) => self.write_expr(sql, arg, 0),
                    None => sql.push('*'),
                }
                if !order_by.is_empty() {
                    sql.push_str(" ORDER BY ");
                    self.write_order_by(sql, order_by);
                }
                if let Some(sep) = separator {
                    sql.push_str(" SEPARATOR ");
                    write_literal(sql, &Literal::String(sep.clone()));
                }
                sql.push(')');
            }
            ExprKind::Function { name, args, .. } => {
                for part in [&name.catalog, &name.schema].into_iter().flatten() {
                    self.ident(sql, part);
                    sql.push('.');
                }
                sql.push_str(&name.name);
                sql.push('(');
                self.list(sql, args);
                sql.push(')');
            }
            ExprKind::Cast { operand, target } => {
                sql.push_str("CAST(");
                self.write_expr(sql, operand, 0);
                sql.push_str(" AS ");
                sql.push_str(&target.to_sql());
                sql.push(')');
            }
            ExprKind::Array(items) => {
                sql.push_str("ARRAY[");
                self.list(sql, items);
                sql.push(']');
            }
            ExprKind::ArraySubquery(id) => {
                sql.push_str("ARRAY");
                self.write_subquery(sql, *id);
            }
            ExprKind::ArrayElement { array, index } => {
                self.write_expr(sql, array, UNARY + 1);
                sql.push('[');
                self.write_expr(sql, index, 0);
                sql.push(']');
            }
            ExprKind::NextValue(sequence) => {
                sql.push_str("NEXT VALUE FOR ");
                sql.push_str(sequence);
            }
            ExprKind::CurrentValue(sequence) => {
                sql.push_str("CURRENT VALUE FOR ");
                sql.push_str(sequence);
            }
            _ => {
                let paren = PREDICATE < parent;
                if paren {
                    sql.push('(');
                }
                self.write_predicate(sql, &expr.kind);
                if paren {
                    sql.push(')');
                }
            }
        }
        if let Some(collation) = &expr.collation {
            sql.push_str(" COLLATE ");
            self.ident(sql, collation);
        }
    }

    /// Postfix and infix predicates, all at comparison precedence.
    fn write_predicate(&self, sql: &mut String, kind: &ExprKind) {
        let operand = PREDICATE + 1;
        match kind {
            ExprKind::IsNull(e) => {
                self.write_expr(sql, e, operand);
                sql.push_str(" IS NULL");
            }
            ExprKind::IsDistinctFrom { left, right } => {
                self.write_expr(sql, left, operand);
                sql.push_str(" IS DISTINCT FROM ");
                self.write_expr(sql, right, operand);
            }
            ExprKind::IsTruth { operand: e, value } => {
                self.write_expr(sql, e, operand);
                sql.push_str(match value {
                    TruthValue::True => " IS TRUE",
                    TruthValue::False => " IS FALSE",
                    TruthValue::Unknown => " IS UNKNOWN",
                });
            }
            ExprKind::Like {
                operand: e,
                pattern,
                escape,
            } => {
                self.write_expr(sql, e, operand);
                sql.push_str(" LIKE ");
                self.write_expr(sql, pattern, operand);
                if let Some(escape) = escape {
                    sql.push_str(" ESCAPE ");
                    self.write_expr(sql, escape, operand);
                }
            }
            ExprKind::InList { operand: e, list } => {
                self.write_expr(sql, e, operand);
                sql.push_str(" IN (");
                self.list(sql, list);
                sql.push(')');
            }
            ExprKind::Quantified {
                op,
                quantifier,
                left,
                subquery,
            } => {
                self.write_expr(sql, left, operand);
                sql.push(' ');
                sql.push_str(op.as_str());
                sql.push_str(match quantifier {
                    Quantifier::Any => " ANY ",
                    Quantifier::All => " ALL ",
                });
                self.write_subquery(sql, *subquery);
            }
            ExprKind::Overlaps { left, right } => {
                self.write_expr(sql, left, operand);
                sql.push_str(" OVERLAPS ");
                self.write_expr(sql, right, operand);
            }
            ExprKind::Match {
                left,
                subquery,
                unique,
                match_type,
            } => {
                self.write_expr(sql, left, operand);
                sql.push_str(" MATCH ");
                if *unique {
                    sql.push_str("UNIQUE ");
                }
                sql.push_str(match match_type {
                    MatchType::Simple => "SIMPLE ",
                    MatchType::Partial => "PARTIAL ",
                    MatchType::Full => "FULL ",
                });
                self.write_subquery(sql, *subquery);
            }
            ExprKind::AtTimeZone { operand: e, zone } => {
                self.write_expr(sql, e, operand);
                match zone {
                    Some(zone) => {
                        sql.push_str(" AT TIME ZONE ");
                        self.write_expr(sql, zone, operand);
                    }
                    None => sql.push_str(" AT LOCAL"),
                }
            }
            _ => {}
        }
    }

    /// Renders a chain of alternatives as one searched CASE.
    fn write_case(&self, sql: &mut String, expr: &Expr) {
        sql.push_str("CASE");
        let mut current = expr;
        while let ExprKind::Alternative {
            condition,
            then,
            otherwise,
        } = &current.kind
        {
            sql.push_str(" WHEN ");
            self.write_expr(sql, condition, 0);
            sql.push_str(" THEN ");
            self.write_expr(sql, then, 0);
            current = otherwise;
            if current.collation.is_some() {
                break;
            }
        }
        sql.push_str(" ELSE ");
        self.write_expr(sql, current, 0);
        sql.push_str(" END");
    }

    fn write_subquery(&self, sql: &mut String, id: SubQueryId) {
        sql.push('(');
        match self.subqueries.get(id.0) {
            Some(subquery) => self.write_source(sql, subquery),
            None => {
                sql.push_str("<subquery ");
                sql.push_str(&id.to_string());
                sql.push('>');
            }
        }
        sql.push(')');
    }

    fn write_source(&self, sql: &mut String, subquery: &SubQuery) {
        match subquery.source() {
            SubQuerySource::Query(query) => self.write_query(sql, query),
            SubQuerySource::Rows(rows) => self.write_values(sql, rows),
            SubQuerySource::View(view) => {
                sql.push_str("TABLE ");
                self.ident(sql, &view.schema);
                sql.push('.');
                self.ident(sql, &view.name);
            }
        }
    }

    fn write_values(&self, sql: &mut String, rows: &[Vec<Expr>]) {
        sql.push_str("VALUES ");
        for (i, row) in rows.iter().enumerate() {
            if i > 0 {
                sql.push_str(", ");
            }
            sql.push('(');
            self.list(sql, row);
            sql.push(')');
        }
    }

    fn write_query(&self, sql: &mut String, query: &QueryExpression) {
        if !query.with.is_empty() {
            sql.push_str("WITH ");
            if query.recursive {
                sql.push_str("RECURSIVE ");
            }
            for (i, id) in query.with.iter().enumerate() {
                if i > 0 {
                    sql.push_str(", ");
                }
                match self.subqueries.get(id.0) {
                    Some(subquery) => {
                        self.ident(sql, subquery.name().unwrap_or_default());
                        if let Some(columns) = subquery.declared_columns() {
                            sql.push('(');
                            self.idents(sql, columns);
                            sql.push(')');
                        }
                    }
                    None => sql.push_str(&id.to_string()),
                }
                sql.push_str(" AS ");
                self.write_subquery(sql, *id);
            }
            sql.push(' ');
        }

        self.write_body(sql, &query.body);

        if !query.order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            self.write_order_by(sql, &query.order_by);
        }
        if let Some(limit) = &query.limit {
            self.write_limit(sql, limit);
        }
    }

    fn write_body(&self, sql: &mut String, body: &QueryBody) {
        match body {
            QueryBody::Specification(spec) => self.write_specification(sql, spec),
            QueryBody::Values(values) => self.write_values(sql, &values.rows),
            QueryBody::Table(table) => {
                sql.push_str("TABLE ");
                for part in [&table.name.catalog, &table.name.schema].into_iter().flatten() {
                    self.ident(sql, part);
                    sql.push('.');
                }
                self.ident(sql, &table.name.name);
            }
            QueryBody::SetOperation(op) => {
                // INTERSECT binds tighter than UNION and EXCEPT.
                let left_paren = op.op == SetOperator::Intersect
                    && matches!(&op.left, QueryBody::SetOperation(inner) if inner.op != SetOperator::Intersect);
                self.write_operand(sql, &op.left, left_paren);
                sql.push(' ');
                sql.push_str(op.op.as_str());
                sql.push(' ');
                sql.push_str(op.quantifier.as_str());
                if let Some(corresponding) = &op.corresponding {
                    sql.push_str(" CORRESPONDING");
                    if !corresponding.by.is_empty() {
                        sql.push_str(" BY (");
                        self.idents(sql, &corresponding.by);
                        sql.push(')');
                    }
                }
                sql.push(' ');
                self.write_operand(sql, &op.right, matches!(op.right, QueryBody::SetOperation(_)));
            }
            QueryBody::Nested(query) => {
                sql.push('(');
                self.write_query(sql, query);
                sql.push(')');
            }
        }
    }

    fn write_operand(&self, sql: &mut String, body: &QueryBody, paren: bool) {
        if paren {
            sql.push('(');
        }
        self.write_body(sql, body);
        if paren {
            sql.push(')');
        }
    }

    fn write_specification(&self, sql: &mut String, spec: &QuerySpecification) {
        sql.push_str("SELECT ");
        if let Some(q) = spec.quantifier {
            sql.push_str(q.as_str());
            sql.push(' ');
        }
        for (i, item) in spec.select_list.iter().enumerate() {
            if i > 0 {
                sql.push_str(", ");
            }
            self.write_expr(sql, item, 0);
            if let Some(alias) = &item.alias {
                sql.push_str(" AS ");
                self.ident(sql, alias);
            }
        }
        if !spec.from.is_empty() {
            sql.push_str(" FROM ");
            self.write_from(sql, &spec.from);
        }
        if let Some(selection) = &spec.selection {
            sql.push_str(" WHERE ");
            self.write_expr(sql, selection, 0);
        }
        if !spec.group_by.is_empty() {
            sql.push_str(" GROUP BY ");
            self.list(sql, &spec.group_by);
        }
        if let Some(having) = &spec.having {
            sql.push_str(" HAVING ");
            self.write_expr(sql, having, 0);
        }
    }

    fn write_from(&self, sql: &mut String, from: &[RangeVariableId]) {
        for (i, id) in from.iter().enumerate() {
            let Some(range) = self.range_variables.get(id.0) else {
                sql.push_str(if i > 0 { ", ?" } else { "?" });
                continue;
            };
            match (&range.join, i) {
                (_, 0) => {}
                (Some(join), _) if join.kind != JoinKind::Comma => {
                    sql.push(' ');
                    if join.natural {
                        sql.push_str("NATURAL ");
                    }
                    sql.push_str(join.kind.as_str());
                    sql.push(' ');
                }
                _ => sql.push_str(", "),
            }
            self.write_table_reference(sql, range);
            if let Some(join) = &range.join {
                if !join.using.is_empty() {
                    sql.push_str(" USING (");
                    self.idents(sql, &join.using);
                    sql.push(')');
                } else if let (false, Some(condition)) = (join.natural, &join.condition) {
                    sql.push_str(" ON ");
                    self.write_expr(sql, condition, 0);
                }
            }
        }
    }

    fn write_table_reference(&self, sql: &mut String, range: &RangeVariable) {
        let derived = match &range.source {
            RangeSource::Table(_) => None,
            RangeSource::SubQuery(id) => self
                .subqueries
                .get(id.0)
                .filter(|s| s.name().is_none())
                .map(|_| *id),
        };
        match derived {
            Some(id) => self.write_subquery(sql, id),
            None => {
                for part in [&range.name.catalog, &range.name.schema].into_iter().flatten() {
                    self.ident(sql, part);
                    sql.push('.');
                }
                self.ident(sql, &range.name.name);
            }
        }
        if let Some(alias) = &range.alias {
            sql.push_str(" AS ");
            self.ident(sql, alias);
        }
        if let Some(columns) = &range.declared_columns {
            sql.push('(');
            self.idents(sql, columns);
            sql.push(')');
        }
    }

    fn write_order_by(&self, sql: &mut String, items: &[OrderByItem]) {
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                sql.push_str(", ");
            }
            self.write_expr(sql, &item.expr, 0);
            if item.direction != OrderDirection::Asc {
                sql.push(' ');
                sql.push_str(item.direction.as_str());
            }
            if let Some(nulls) = item.nulls {
                sql.push(' ');
                sql.push_str(nulls.as_str());
            }
        }
    }

    fn write_limit(&self, sql: &mut String, limit: &LimitClause) {
        if limit.strict {
            if let Some(offset) = &limit.offset {
                sql.push_str(" OFFSET ");
                self.write_expr(sql, offset, 0);
                sql.push_str(" ROWS");
            }
            if let Some(count) = &limit.count {
                sql.push_str(" FETCH FIRST ");
                self.write_expr(sql, count, 0);
                sql.push_str(" ROWS ONLY");
            }
            return;
        }
        if let Some(count) = &limit.count {
            sql.push_str(" LIMIT ");
            self.write_expr(sql, count, 0);
        }
        if let Some(offset) = &limit.offset {
            sql.push_str(" OFFSET ");
            self.write_expr(sql, offset, 0);
        }
    }
}

fn write_literal(sql: &mut String, literal: &Literal) {
    let quoted = |sql: &mut String, s: &str| {
        sql.push('\'');
        sql.push_str(&s.replace('\'', "''"));
        sql.push('\'');
    };
    match literal {
        Literal::Null => sql.push_str("NULL"),
        Literal::Boolean(true) => sql.push_str("TRUE"),
        Literal::Boolean(false) => sql.push_str("FALSE"),
        Literal::Integer(n) => sql.push_str(&n.to_string()),
        Literal::Float(x) => sql.push_str(&format!("{x:?}")),
        Literal::String(s) => quoted(sql, s),
        Literal::Blob(bytes) => {
            sql.push_str("X'");
            for b in bytes {
                sql.push_str(&format!("{b:02X}"));
            }
            sql.push('\'');
        }
        Literal::Date(s) => {
            sql.push_str("DATE ");
            quoted(sql, s);
        }
        Literal::Time(s) => {
            sql.push_str("TIME ");
            quoted(sql, s);
        }
        Literal::Timestamp(s) => {
            sql.push_str("TIMESTAMP ");
            quoted(sql, s);
        }
        Literal::Interval { value, qualifier } => {
            sql.push_str("INTERVAL ");
            quoted(sql, value);
            sql.push(' ');
            sql.push_str(&qualifier.to_string());
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&SqlWriter::detached().expression(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::BinaryOp;
    use crate::lexer::Span;

    #[test]
    fn test_precedence_parentheses() {
        let sum = Expr::integer(1).binary(BinaryOp::Add, Expr::integer(2));
        let product = sum.binary(BinaryOp::Mul, Expr::integer(3));
        assert_eq!(product.to_string(), "(1 + 2) * 3");

        let flat = Expr::integer(1).binary(
            BinaryOp::Add,
            Expr::integer(2).binary(BinaryOp::Mul, Expr::integer(3)),
        );
        assert_eq!(flat.to_string(), "1 + 2 * 3");
    }

    #[test]
    fn test_alternative_chain_renders_as_case() {
        let inner = Expr::alternative(
            Expr::column("B").is_null().not(),
            Expr::column("B"),
            Expr::null(Span::ZERO),
            Span::ZERO,
        );
        let outer = Expr::alternative(
            Expr::column("A").is_null().not(),
            Expr::column("A"),
            inner,
            Span::ZERO,
        );
        assert_eq!(
            outer.to_string(),
            "CASE WHEN NOT A IS NULL THEN A WHEN NOT B IS NULL THEN B ELSE NULL END"
        );
    }

    #[test]
    fn test_literals_and_quoting() {
        let s = Expr::literal(Literal::String("it's".into()), Span::ZERO);
        assert_eq!(s.to_string(), "'it''s'");
        let mut column = Expr::column("Mixed Case");
        column.collation = Some("SQL_TEXT".into());
        assert_eq!(column.to_string(), "\"Mixed Case\" COLLATE SQL_TEXT");
    }

    #[test]
    fn test_detached_subquery_placeholder() {
        let exists = Expr::new(ExprKind::Exists(SubQueryId(2)), Span::ZERO);
        assert_eq!(exists.to_string(), "EXISTS (<subquery #2>)");
    }
}
