//! Abstract Syntax Tree (AST) types for compiled query expressions.

mod display;
mod expression;
mod query;
mod types;

pub use display::SqlWriter;
pub use expression::{
    AggregateFunction, BinaryOp, ColumnBinding, ColumnRef, Expr, ExprKind, Literal, MatchType,
    QualifiedName, Quantifier, SetQuantifier, TruthValue, UnaryOp,
};
pub use query::{
    Corresponding, ExplicitTable, LimitClause, NullOrdering, OrderByItem, OrderDirection,
    QueryBody, QueryExpression, QuerySpecification, SetOperation, SetOperator, ValuesBody,
};
pub use types::{DataType, IntervalField, IntervalQualifier};
