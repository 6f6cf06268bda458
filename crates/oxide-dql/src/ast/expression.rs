//! Expression AST types.

use serde::Serialize;

use super::query::OrderByItem;
use super::types::{DataType, IntervalQualifier};
use crate::context::RangeVariableId;
use crate::lexer::Span;
use crate::subquery::SubQueryId;

/// A literal value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Literal {
    /// NULL literal.
    Null,
    /// Boolean literal.
    Boolean(bool),
    /// Integer literal.
    Integer(i64),
    /// Float literal.
    Float(f64),
    /// String literal.
    String(String),
    /// Blob literal.
    Blob(Vec<u8>),
    /// `DATE '...'`
    Date(String),
    /// `TIME '...'`
    Time(String),
    /// `TIMESTAMP '...'`
    Timestamp(String),
    /// `INTERVAL '...' <qualifier>`
    Interval {
        /// The quoted interval text.
        value: String,
        /// The interval qualifier.
        qualifier: IntervalQualifier,
    },
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BinaryOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Concat,

    // Comparison
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,

    // Logical
    And,
    Or,
}

impl BinaryOp {
    /// Returns the SQL representation of the operator.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::Concat => "||",
            Self::Eq => "=",
            Self::NotEq => "<>",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
            Self::And => "AND",
            Self::Or => "OR",
        }
    }

    /// Returns the precedence of the operator (higher = binds tighter).
    #[must_use]
    pub const fn precedence(&self) -> u8 {
        match self {
            Self::Or => 1,
            Self::And => 2,
            Self::Eq | Self::NotEq | Self::Lt | Self::LtEq | Self::Gt | Self::GtEq => 4,
            Self::Add | Self::Sub | Self::Concat => 5,
            Self::Mul | Self::Div | Self::Mod => 6,
        }
    }

    /// Returns true for the six comparison operators.
    #[must_use]
    pub const fn is_comparison(&self) -> bool {
        matches!(
            self,
            Self::Eq | Self::NotEq | Self::Lt | Self::LtEq | Self::Gt | Self::GtEq
        )
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UnaryOp {
    /// Negation (-)
    Neg,
    /// Unary plus (+)
    Plus,
    /// Logical NOT
    Not,
}

impl UnaryOp {
    /// Returns the SQL representation of the operator.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Neg => "-",
            Self::Plus => "+",
            Self::Not => "NOT",
        }
    }
}

/// The right-hand side of `IS [NOT] {TRUE|FALSE|UNKNOWN}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TruthValue {
    True,
    False,
    Unknown,
}

/// Quantifier of a quantified comparison. `SOME` is parsed as `Any`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Quantifier {
    Any,
    All,
}

/// `MATCH` predicate flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MatchType {
    Simple,
    Partial,
    Full,
}

/// `DISTINCT` / `ALL` set quantifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SetQuantifier {
    Distinct,
    All,
}

impl SetQuantifier {
    /// Returns the SQL keyword.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Distinct => "DISTINCT",
            Self::All => "ALL",
        }
    }
}

/// Aggregate functions recognized by the expression builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AggregateFunction {
    Count,
    Sum,
    Avg,
    Min,
    Max,
    Every,
    ArrayAgg,
    GroupConcat,
    Median,
    StddevPop,
    StddevSamp,
    VarPop,
    VarSamp,
}

impl AggregateFunction {
    /// Looks up an aggregate by (upper-case) name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "COUNT" => Self::Count,
            "SUM" => Self::Sum,
            "AVG" => Self::Avg,
            "MIN" => Self::Min,
            "MAX" => Self::Max,
            "EVERY" => Self::Every,
            "ARRAY_AGG" => Self::ArrayAgg,
            "GROUP_CONCAT" => Self::GroupConcat,
            "MEDIAN" => Self::Median,
            "STDDEV_POP" => Self::StddevPop,
            "STDDEV_SAMP" => Self::StddevSamp,
            "VAR_POP" => Self::VarPop,
            "VAR_SAMP" => Self::VarSamp,
            _ => return None,
        })
    }

    /// Returns the SQL name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Count => "COUNT",
            Self::Sum => "SUM",
            Self::Avg => "AVG",
            Self::Min => "MIN",
            Self::Max => "MAX",
            Self::Every => "EVERY",
            Self::ArrayAgg => "ARRAY_AGG",
            Self::GroupConcat => "GROUP_CONCAT",
            Self::Median => "MEDIAN",
            Self::StddevPop => "STDDEV_POP",
            Self::StddevSamp => "STDDEV_SAMP",
            Self::VarPop => "VAR_POP",
            Self::VarSamp => "VAR_SAMP",
        }
    }

    /// Statistical aggregates take neither `DISTINCT` nor `ALL`.
    #[must_use]
    pub const fn is_statistical(&self) -> bool {
        matches!(
            self,
            Self::StddevPop | Self::StddevSamp | Self::VarPop | Self::VarSamp
        )
    }

    /// Aggregates that accept an `ORDER BY` sub-clause.
    #[must_use]
    pub const fn accepts_order_by(&self) -> bool {
        matches!(self, Self::ArrayAgg | Self::GroupConcat)
    }
}

/// A possibly qualified object name: `[catalog.][schema.]name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct QualifiedName {
    /// Catalog prefix.
    pub catalog: Option<String>,
    /// Schema prefix.
    pub schema: Option<String>,
    /// Object name.
    pub name: String,
}

impl QualifiedName {
    /// Creates an unqualified name.
    #[must_use]
    pub fn bare(name: impl Into<String>) -> Self {
        Self {
            catalog: None,
            schema: None,
            name: name.into(),
        }
    }

    /// Creates a schema-qualified name.
    #[must_use]
    pub fn qualified(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            catalog: None,
            schema: Some(schema.into()),
            name: name.into(),
        }
    }

    /// Builds a name from its dotted parts (1 to 3 of them).
    #[must_use]
    pub fn from_parts(mut parts: Vec<String>) -> Option<Self> {
        let name = parts.pop()?;
        let schema = parts.pop();
        let catalog = parts.pop();
        if !parts.is_empty() {
            return None;
        }
        Some(Self {
            catalog,
            schema,
            name,
        })
    }
}

/// Where a column reference was bound by the resolution pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ColumnBinding {
    /// The range variable supplying the column.
    pub range_variable: RangeVariableId,
    /// Index into the range variable's column list.
    pub index: usize,
    /// True when the range variable belongs to an enclosing query.
    pub outer: bool,
}

/// A column reference with its optional prefix chain.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnRef {
    /// `[catalog.][schema.]table` prefix, outermost first.
    pub qualifier: Vec<String>,
    /// Column name.
    pub name: String,
    /// Filled in by the resolution pass.
    pub binding: Option<ColumnBinding>,
}

impl ColumnRef {
    /// Creates an unresolved reference.
    #[must_use]
    pub fn new(qualifier: Vec<String>, name: impl Into<String>) -> Self {
        Self {
            qualifier,
            name: name.into(),
            binding: None,
        }
    }

    /// The table qualifier, if any.
    #[must_use]
    pub fn table(&self) -> Option<&str> {
        self.qualifier.last().map(String::as_str)
    }
}

/// The kind of an expression node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ExprKind {
    /// A literal value.
    Literal(Literal),
    /// A column reference.
    Column(ColumnRef),
    /// `*` or `t.*`; expanded in select lists, kept inside `COUNT(*)`.
    Asterisk {
        /// Table qualifier (optional).
        qualifier: Option<Vec<String>>,
    },
    /// A dynamic parameter (`?` or `:name`).
    Parameter {
        /// Zero-based order of appearance.
        index: usize,
        /// Name for `:name` placeholders.
        name: Option<String>,
    },
    /// A binary expression.
    Binary {
        /// Operator.
        op: BinaryOp,
        /// Left operand.
        left: Box<Expr>,
        /// Right operand.
        right: Box<Expr>,
    },
    /// A unary expression.
    Unary {
        /// Operator.
        op: UnaryOp,
        /// Operand.
        operand: Box<Expr>,
    },
    /// `x IS NULL`
    IsNull(Box<Expr>),
    /// `x IS DISTINCT FROM y`
    IsDistinctFrom {
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// `x IS {TRUE|FALSE|UNKNOWN}`
    IsTruth {
        operand: Box<Expr>,
        value: TruthValue,
    },
    /// `x LIKE pattern [ESCAPE e]`
    Like {
        operand: Box<Expr>,
        pattern: Box<Expr>,
        escape: Option<Box<Expr>>,
    },
    /// `x IN (v1, v2, ...)` with an inline value list.
    InList {
        operand: Box<Expr>,
        list: Vec<Expr>,
    },
    /// `x <op> {ANY|SOME|ALL} (subquery)`; `x IN (subquery)` is `= ANY`.
    Quantified {
        op: BinaryOp,
        quantifier: Quantifier,
        left: Box<Expr>,
        subquery: SubQueryId,
    },
    /// `(a, b) OVERLAPS (c, d)`
    Overlaps {
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// `x MATCH [UNIQUE] [SIMPLE|PARTIAL|FULL] (subquery)`
    Match {
        left: Box<Expr>,
        subquery: SubQueryId,
        unique: bool,
        match_type: MatchType,
    },
    /// `EXISTS (subquery)`
    Exists(SubQueryId),
    /// `UNIQUE (subquery)`
    Unique(SubQueryId),
    /// A scalar or row subquery in value position.
    ScalarSubquery(SubQueryId),
    /// Row value constructor `(a, b, ...)` or `ROW(a, b)`.
    Row(Vec<Expr>),
    /// The single conditional primitive every CASE-family construct
    /// reduces to. A missing `otherwise` branch yields NULL.
    Alternative {
        condition: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    /// An aggregate function call. `argument` is `None` for `COUNT(*)`.
    Aggregate {
        function: AggregateFunction,
        quantifier: Option<SetQuantifier>,
        argument: Option<Box<Expr>>,
        order_by: Vec<OrderByItem>,
        separator: Option<String>,
    },
    /// A built-in scalar function or user routine call.
    Function {
        /// Function name as written.
        name: QualifiedName,
        /// Arguments.
        args: Vec<Expr>,
        /// Resolved `schema.name` for catalog routines, `None` for built-ins.
        routine: Option<String>,
    },
    /// `CAST(x AS type)` or `x::type`.
    Cast {
        operand: Box<Expr>,
        target: DataType,
    },
    /// `ARRAY[a, b, ...]`
    Array(Vec<Expr>),
    /// `ARRAY(subquery)`
    ArraySubquery(SubQueryId),
    /// `a[i]`
    ArrayElement {
        array: Box<Expr>,
        index: Box<Expr>,
    },
    /// `NEXT VALUE FOR seq`
    NextValue(String),
    /// `CURRENT VALUE FOR seq`
    CurrentValue(String),
    /// `x AT TIME ZONE z`, or `x AT LOCAL` when `zone` is `None`.
    AtTimeZone {
        operand: Box<Expr>,
        zone: Option<Box<Expr>>,
    },
}

/// An SQL expression node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Expr {
    /// The node kind and its children.
    pub kind: ExprKind,
    /// Resolved data type; unset until type resolution.
    pub data_type: Option<DataType>,
    /// `AS alias` in a select list.
    pub alias: Option<String>,
    /// `COLLATE name` override.
    pub collation: Option<String>,
    /// Source span.
    pub span: Span,
}

impl Expr {
    /// Creates a node with no type, alias or collation.
    #[must_use]
    pub const fn new(kind: ExprKind, span: Span) -> Self {
        Self {
            kind,
            data_type: None,
            alias: None,
            collation: None,
            span,
        }
    }

    /// Creates a literal node.
    #[must_use]
    pub const fn literal(literal: Literal, span: Span) -> Self {
        Self::new(ExprKind::Literal(literal), span)
    }

    /// Creates a NULL literal.
    #[must_use]
    pub const fn null(span: Span) -> Self {
        Self::literal(Literal::Null, span)
    }

    /// Creates an integer literal.
    #[must_use]
    pub const fn integer(value: i64) -> Self {
        Self::literal(Literal::Integer(value), Span::ZERO)
    }

    /// Creates an unqualified, unresolved column reference.
    #[must_use]
    pub fn column(name: impl Into<String>) -> Self {
        Self::new(ExprKind::Column(ColumnRef::new(Vec::new(), name)), Span::ZERO)
    }

    /// Creates a binary expression spanning both operands.
    #[must_use]
    pub fn binary(self, op: BinaryOp, right: Self) -> Self {
        let span = self.span.merge(right.span);
        Self::new(
            ExprKind::Binary {
                op,
                left: Box::new(self),
                right: Box::new(right),
            },
            span,
        )
    }

    /// Creates an AND expression.
    #[must_use]
    pub fn and(self, right: Self) -> Self {
        self.binary(BinaryOp::And, right)
    }

    /// Creates an OR expression.
    #[must_use]
    pub fn or(self, right: Self) -> Self {
        self.binary(BinaryOp::Or, right)
    }

    /// Wraps the expression in a logical NOT.
    #[must_use]
    pub fn not(self) -> Self {
        let span = self.span;
        Self::new(
            ExprKind::Unary {
                op: UnaryOp::Not,
                operand: Box::new(self),
            },
            span,
        )
    }

    /// Creates an IS NULL test.
    #[must_use]
    pub fn is_null(self) -> Self {
        let span = self.span;
        Self::new(ExprKind::IsNull(Box::new(self)), span)
    }

    /// Creates an `Alternative` node.
    #[must_use]
    pub fn alternative(condition: Self, then: Self, otherwise: Self, span: Span) -> Self {
        Self::new(
            ExprKind::Alternative {
                condition: Box::new(condition),
                then: Box::new(then),
                otherwise: Box::new(otherwise),
            },
            span,
        )
    }

    /// Returns true if this node is the `*` marker.
    #[must_use]
    pub const fn is_asterisk(&self) -> bool {
        matches!(self.kind, ExprKind::Asterisk { .. })
    }

    /// Returns the column reference if this is a column node.
    #[must_use]
    pub const fn as_column(&self) -> Option<&ColumnRef> {
        match &self.kind {
            ExprKind::Column(c) => Some(c),
            _ => None,
        }
    }

    /// Degree of a row value: the element count for row constructors, 1
    /// otherwise.
    #[must_use]
    pub fn degree(&self) -> usize {
        match &self.kind {
            ExprKind::Row(items) => items.len(),
            _ => 1,
        }
    }

    /// The name a select-list item contributes to the output column list.
    #[must_use]
    pub fn output_name(&self) -> Option<&str> {
        if let Some(alias) = &self.alias {
            return Some(alias);
        }
        match &self.kind {
            ExprKind::Column(c) => Some(&c.name),
            _ => None,
        }
    }

    /// Calls `f` on every direct child expression.
    pub fn for_each_child_mut(&mut self, mut f: impl FnMut(&mut Self)) {
        match &mut self.kind {
            ExprKind::Literal(_)
            | ExprKind::Column(_)
            | ExprKind::Asterisk { .. }
            | ExprKind::Parameter { .. }
            | ExprKind::Exists(_)
            | ExprKind::Unique(_)
            | ExprKind::ScalarSubquery(_)
            | ExprKind::ArraySubquery(_)
            | ExprKind::NextValue(_)
            | ExprKind::CurrentValue(_) => {}
            ExprKind::Binary { left, right, .. }
            | ExprKind::IsDistinctFrom { left, right }
            | ExprKind::Overlaps { left, right } => {
                f(left);
                f(right);
            }
            ExprKind::Unary { operand, .. }
            | ExprKind::IsNull(operand)
            | ExprKind::IsTruth { operand, .. }
            | ExprKind::Cast { operand, .. } => f(operand),
            ExprKind::Like {
                operand,
                pattern,
                escape,
            } => {
                f(operand);
                f(pattern);
                if let Some(e) = escape {
                    f(e);
                }
            }
            ExprKind::InList { operand, list } => {
                f(operand);
                list.iter_mut().for_each(&mut f);
            }
            ExprKind::Quantified { left, .. } | ExprKind::Match { left, .. } => f(left),
            ExprKind::Row(items) | ExprKind::Array(items) => items.iter_mut().for_each(&mut f),
            ExprKind::Function { args, .. } => args.iter_mut().for_each(&mut f),
            ExprKind::Alternative {
                condition,
                then,
                otherwise,
            } => {
                f(condition);
                f(then);
                f(otherwise);
            }
            ExprKind::Aggregate {
                argument, order_by, ..
            } => {
                if let Some(arg) = argument {
                    f(arg);
                }
                for item in order_by {
                    f(&mut item.expr);
                }
            }
            ExprKind::ArrayElement { array, index } => {
                f(array);
                f(index);
            }
            ExprKind::AtTimeZone { operand, zone } => {
                f(operand);
                if let Some(z) = zone {
                    f(z);
                }
            }
        }
    }

    /// Returns the subquery referenced directly by this node, if any.
    #[must_use]
    pub const fn subquery(&self) -> Option<SubQueryId> {
        match &self.kind {
            ExprKind::Quantified { subquery, .. }
            | ExprKind::Match { subquery, .. }
            | ExprKind::Exists(subquery)
            | ExprKind::Unique(subquery)
            | ExprKind::ScalarSubquery(subquery)
            | ExprKind::ArraySubquery(subquery) => Some(*subquery),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qualified_name_from_parts() {
        let name = QualifiedName::from_parts(vec!["C".into(), "S".into(), "T".into()]);
        assert_eq!(
            name,
            Some(QualifiedName {
                catalog: Some("C".into()),
                schema: Some("S".into()),
                name: "T".into(),
            })
        );
        assert!(QualifiedName::from_parts(Vec::new()).is_none());
        assert!(QualifiedName::from_parts(vec!["A".into(); 4]).is_none());
    }

    #[test]
    fn test_binary_span_covers_operands() {
        let mut left = Expr::integer(1);
        left.span = Span::new(0, 1);
        let mut right = Expr::integer(2);
        right.span = Span::new(4, 5);
        let sum = left.binary(BinaryOp::Add, right);
        assert_eq!(sum.span, Span::new(0, 5));
    }

    #[test]
    fn test_output_name_prefers_alias() {
        let mut expr = Expr::column("A");
        assert_eq!(expr.output_name(), Some("A"));
        expr.alias = Some("X".into());
        assert_eq!(expr.output_name(), Some("X"));
        assert_eq!(Expr::integer(1).output_name(), None);
    }

    #[test]
    fn test_aggregate_classification() {
        assert_eq!(AggregateFunction::from_name("VAR_POP"), Some(AggregateFunction::VarPop));
        assert!(AggregateFunction::VarPop.is_statistical());
        assert!(!AggregateFunction::Count.is_statistical());
        assert!(AggregateFunction::GroupConcat.accepts_order_by());
    }

    #[test]
    fn test_for_each_child_visits_alternative_branches() {
        let mut alt = Expr::alternative(
            Expr::column("A").is_null(),
            Expr::integer(1),
            Expr::integer(2),
            Span::ZERO,
        );
        let mut count = 0;
        alt.for_each_child_mut(|_| count += 1);
        assert_eq!(count, 3);
    }
}
