//! Query expression AST types.

use serde::Serialize;

use super::expression::{Expr, ExprKind, Literal, QualifiedName, SetQuantifier};
use crate::context::RangeVariableId;
use crate::lexer::Span;
use crate::subquery::SubQueryId;

/// Order direction for ORDER BY.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum OrderDirection {
    /// Ascending order (default).
    #[default]
    Asc,
    /// Descending order.
    Desc,
}

impl OrderDirection {
    /// Returns the SQL representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Null ordering for ORDER BY.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NullOrdering {
    /// NULLs come first.
    First,
    /// NULLs come last.
    Last,
}

impl NullOrdering {
    /// Returns the SQL representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::First => "NULLS FIRST",
            Self::Last => "NULLS LAST",
        }
    }
}

/// An ORDER BY entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderByItem {
    /// The sort key.
    pub expr: Expr,
    /// The direction (ASC or DESC).
    pub direction: OrderDirection,
    /// Null ordering (optional).
    pub nulls: Option<NullOrdering>,
    /// Zero-based output column the key refers to, when it names one.
    pub position: Option<usize>,
}

/// The normalized `(offset, count, strict)` triple every
/// TOP / LIMIT / OFFSET / FETCH spelling reduces to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LimitClause {
    /// Rows to skip; `None` means zero.
    pub offset: Option<Expr>,
    /// Maximum rows to return; `None` means unbounded.
    pub count: Option<Expr>,
    /// Set by the `FETCH ... ONLY` form.
    pub strict: bool,
}

impl LimitClause {
    /// The offset when it is a constant. An absent offset is zero.
    #[must_use]
    pub fn offset_value(&self) -> Option<i64> {
        match &self.offset {
            None => Some(0),
            Some(expr) => constant_integer(expr),
        }
    }

    /// The row count when it is a constant.
    #[must_use]
    pub fn count_value(&self) -> Option<i64> {
        self.count.as_ref().and_then(constant_integer)
    }
}

fn constant_integer(expr: &Expr) -> Option<i64> {
    match &expr.kind {
        ExprKind::Literal(Literal::Integer(n)) => Some(*n),
        _ => None,
    }
}

/// Set operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SetOperator {
    Union,
    Intersect,
    Except,
}

impl SetOperator {
    /// Returns the SQL keyword.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Union => "UNION",
            Self::Intersect => "INTERSECT",
            Self::Except => "EXCEPT",
        }
    }
}

/// A `CORRESPONDING [BY (...)]` modifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Corresponding {
    /// The explicit BY list; empty when BY was omitted.
    pub by: Vec<String>,
    /// The column names the operation actually combines.
    pub columns: Vec<String>,
}

/// A binary set operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SetOperation {
    pub op: SetOperator,
    pub quantifier: SetQuantifier,
    pub corresponding: Option<Corresponding>,
    pub left: QueryBody,
    pub right: QueryBody,
    /// Output column names.
    pub columns: Vec<String>,
}

/// `SELECT ... FROM ... WHERE ... GROUP BY ... HAVING ...`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuerySpecification {
    /// DISTINCT or ALL.
    pub quantifier: Option<SetQuantifier>,
    /// Select list with asterisks expanded.
    pub select_list: Vec<Expr>,
    /// FROM range variables in declaration order. Join conditions live on
    /// the range variables themselves.
    pub from: Vec<RangeVariableId>,
    /// WHERE condition.
    pub selection: Option<Expr>,
    /// GROUP BY keys.
    pub group_by: Vec<Expr>,
    /// HAVING condition.
    pub having: Option<Expr>,
    /// Output column names.
    pub columns: Vec<String>,
    /// Source span.
    pub span: Span,
}

/// `VALUES (...), (...)` as a query primary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValuesBody {
    /// One entry per row; every row has the same degree.
    pub rows: Vec<Vec<Expr>>,
    /// Generated column names `C1..Cn`.
    pub columns: Vec<String>,
}

/// `TABLE name` as a query primary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExplicitTable {
    pub name: QualifiedName,
    pub range_variable: RangeVariableId,
    pub columns: Vec<String>,
}

/// The body of a query expression.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum QueryBody {
    Specification(Box<QuerySpecification>),
    Values(ValuesBody),
    Table(ExplicitTable),
    SetOperation(Box<SetOperation>),
    /// A parenthesized query expression whose ORDER BY / LIMIT could not be
    /// merged into the enclosing one.
    Nested(Box<QueryExpression>),
}

impl QueryBody {
    /// Output column names.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        match self {
            Self::Specification(spec) => &spec.columns,
            Self::Values(values) => &values.columns,
            Self::Table(table) => &table.columns,
            Self::SetOperation(op) => &op.columns,
            Self::Nested(query) => &query.columns,
        }
    }

    /// Number of output columns.
    #[must_use]
    pub fn degree(&self) -> usize {
        self.columns().len()
    }
}

/// A complete query expression: optional WITH list, body, ORDER BY and
/// limit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryExpression {
    /// Named subqueries declared by this expression's WITH clause.
    pub with: Vec<SubQueryId>,
    /// True for `WITH RECURSIVE`.
    pub recursive: bool,
    /// The body.
    pub body: QueryBody,
    /// ORDER BY entries.
    pub order_by: Vec<OrderByItem>,
    /// Normalized limit.
    pub limit: Option<LimitClause>,
    /// Output column names.
    pub columns: Vec<String>,
    /// Source span.
    pub span: Span,
}

impl QueryExpression {
    /// Wraps a body with no WITH, ORDER BY or limit.
    #[must_use]
    pub fn from_body(body: QueryBody, span: Span) -> Self {
        let columns = body.columns().to_vec();
        Self {
            with: Vec::new(),
            recursive: false,
            body,
            order_by: Vec::new(),
            limit: None,
            columns,
            span,
        }
    }

    /// Number of output columns.
    #[must_use]
    pub fn degree(&self) -> usize {
        self.columns.len()
    }

    /// Returns true if the expression is a bare `VALUES` list.
    #[must_use]
    pub fn is_bare_values(&self) -> bool {
        self.with.is_empty()
            && self.order_by.is_empty()
            && self.limit.is_none()
            && matches!(self.body, QueryBody::Values(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(rows: Vec<Vec<Expr>>) -> QueryBody {
        let degree = rows.first().map_or(0, Vec::len);
        QueryBody::Values(ValuesBody {
            rows,
            columns: (1..=degree).map(|i| format!("C{i}")).collect(),
        })
    }

    #[test]
    fn test_limit_values() {
        let limit = LimitClause {
            offset: None,
            count: Some(Expr::integer(5)),
            strict: false,
        };
        assert_eq!(limit.offset_value(), Some(0));
        assert_eq!(limit.count_value(), Some(5));

        let unbounded = LimitClause {
            offset: Some(Expr::integer(10)),
            count: None,
            strict: false,
        };
        assert_eq!(unbounded.offset_value(), Some(10));
        assert_eq!(unbounded.count_value(), None);
    }

    #[test]
    fn test_query_expression_from_body_copies_columns() {
        let query = QueryExpression::from_body(
            values(vec![vec![Expr::integer(1), Expr::integer(2)]]),
            Span::ZERO,
        );
        assert_eq!(query.columns, vec!["C1", "C2"]);
        assert_eq!(query.degree(), 2);
        assert!(query.is_bare_values());
    }
}
