//! Row-at-a-time evaluation of compiled expressions.
//!
//! This is the small evaluator data-expression subqueries use to turn a
//! `VALUES` list into rows without an execution engine. It covers the
//! scalar core of the expression tree with SQL three-valued logic; anything
//! that needs a table (aggregates, subqueries, sequences) is reported as
//! unsupported.

use core::cmp::Ordering;
use core::fmt;
use std::collections::HashMap;

use serde::Serialize;
use thiserror::Error;

use crate::ast::{BinaryOp, ColumnBinding, DataType, Expr, ExprKind, Literal, TruthValue, UnaryOp};
use crate::context::RangeVariableId;

/// A runtime value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Value {
    /// Returns true for SQL NULL.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// A total order over all values, used for sorting and duplicate
    /// removal. NULL sorts first; integers and floats compare numerically.
    #[must_use]
    pub fn cmp_total(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a.cmp(b),
            (Self::Float(a), Self::Float(b)) => a.total_cmp(b),
            (Self::Int(a), Self::Float(b)) => (*a as f64).total_cmp(b),
            (Self::Float(a), Self::Int(b)) => a.total_cmp(&(*b as f64)),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }

    const fn rank(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Bool(_) => 1,
            Self::Int(_) | Self::Float(_) => 2,
            Self::Text(_) => 3,
        }
    }

    const fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "NULL",
            Self::Bool(_) => "BOOLEAN",
            Self::Int(_) => "INTEGER",
            Self::Float(_) => "DOUBLE",
            Self::Text(_) => "VARCHAR",
        }
    }

    fn truth(&self) -> Result<Option<bool>, EvalError> {
        match self {
            Self::Null => Ok(None),
            Self::Bool(b) => Ok(Some(*b)),
            other => Err(EvalError::TypeMismatch {
                expected: "BOOLEAN",
                found: other.type_name(),
            }),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Bool(b) => f.write_str(if *b { "TRUE" } else { "FALSE" }),
            Self::Int(n) => write!(f, "{n}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<Option<bool>> for Value {
    fn from(value: Option<bool>) -> Self {
        value.map_or(Self::Null, Self::Bool)
    }
}

/// Evaluation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Numeric overflow")]
    Overflow,

    #[error("Column {0} is not bound in this row")]
    UnboundColumn(String),

    #[error("Parameter {0} has no value")]
    UnboundParameter(usize),

    #[error("Row values of degree {left} and {right} cannot be compared")]
    DegreeMismatch { left: usize, right: usize },

    #[error("Cannot evaluate {0} outside the execution engine")]
    Unsupported(String),
}

/// Column and parameter values visible to one evaluation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowContext {
    columns: HashMap<(RangeVariableId, usize), Value>,
    parameters: Vec<Value>,
}

impl RowContext {
    /// An empty context: no columns, no parameters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A context with the given parameter values, in parameter order.
    #[must_use]
    pub fn with_parameters(parameters: Vec<Value>) -> Self {
        Self {
            columns: HashMap::new(),
            parameters,
        }
    }

    /// Binds column `index` of `range_variable` to `value`.
    pub fn bind(&mut self, range_variable: RangeVariableId, index: usize, value: Value) {
        self.columns.insert((range_variable, index), value);
    }

    /// Binds every column of one row of `range_variable`.
    pub fn bind_row(&mut self, range_variable: RangeVariableId, row: &[Value]) {
        for (index, value) in row.iter().enumerate() {
            self.bind(range_variable, index, value.clone());
        }
    }

    fn column(&self, binding: ColumnBinding) -> Option<&Value> {
        self.columns.get(&(binding.range_variable, binding.index))
    }
}

/// Evaluates a scalar expression against `row`.
///
/// # Errors
///
/// Fails on type mismatches, division by zero, unbound columns or
/// parameters, and on nodes that need the execution engine.
pub fn evaluate(expr: &Expr, row: &RowContext) -> Result<Value, EvalError> {
    match &expr.kind {
        ExprKind::Literal(literal) => literal_value(literal),
        ExprKind::Column(column) => column
            .binding
            .and_then(|b| row.column(b))
            .cloned()
            .ok_or_else(|| EvalError::UnboundColumn(column.name.clone())),
        ExprKind::Parameter { index, .. } => row
            .parameters
            .get(*index)
            .cloned()
            .ok_or(EvalError::UnboundParameter(*index)),
        ExprKind::Binary { op, left, right } => match op {
            BinaryOp::And => {
                let l = evaluate(left, row)?.truth()?;
                if l == Some(false) {
                    return Ok(Value::Bool(false));
                }
                let r = evaluate(right, row)?.truth()?;
                Ok(match (l, r) {
                    (_, Some(false)) => Value::Bool(false),
                    (Some(true), Some(true)) => Value::Bool(true),
                    _ => Value::Null,
                })
            }
            BinaryOp::Or => {
                let l = evaluate(left, row)?.truth()?;
                if l == Some(true) {
                    return Ok(Value::Bool(true));
                }
                let r = evaluate(right, row)?.truth()?;
                Ok(match (l, r) {
                    (_, Some(true)) => Value::Bool(true),
                    (Some(false), Some(false)) => Value::Bool(false),
                    _ => Value::Null,
                })
            }
            op if op.is_comparison() => compare(*op, left, right, row),
            op => arithmetic(*op, evaluate(left, row)?, evaluate(right, row)?),
        },
        ExprKind::Unary { op, operand } => {
            let value = evaluate(operand, row)?;
            match (op, value) {
                (_, Value::Null) => Ok(Value::Null),
                (UnaryOp::Not, v) => Ok(v.truth()?.map(|b| !b).into()),
                (UnaryOp::Plus, v @ (Value::Int(_) | Value::Float(_))) => Ok(v),
                (UnaryOp::Neg, Value::Int(n)) => n.checked_neg().map(Value::Int).ok_or(EvalError::Overflow),
                (UnaryOp::Neg, Value::Float(x)) => Ok(Value::Float(-x)),
                (_, v) => Err(EvalError::TypeMismatch {
                    expected: "numeric",
                    found: v.type_name(),
                }),
            }
        }
        ExprKind::IsNull(operand) => {
            let values = row_values(operand, row)?;
            Ok(Value::Bool(values.iter().all(Value::is_null)))
        }
        ExprKind::IsDistinctFrom { left, right } => {
            let l = row_values(left, row)?;
            let r = row_values(right, row)?;
            check_degree(&l, &r)?;
            let distinct = l.iter().zip(&r).any(|(a, b)| match (a.is_null(), b.is_null()) {
                (true, true) => false,
                (true, false) | (false, true) => true,
                (false, false) => a.cmp_total(b) != Ordering::Equal,
            });
            Ok(Value::Bool(distinct))
        }
        ExprKind::IsTruth { operand, value } => {
            let truth = evaluate(operand, row)?.truth()?;
            Ok(Value::Bool(match value {
                TruthValue::True => truth == Some(true),
                TruthValue::False => truth == Some(false),
                TruthValue::Unknown => truth.is_none(),
            }))
        }
        ExprKind::Like {
            operand,
            pattern,
            escape,
        } => {
            let value = evaluate(operand, row)?;
            let pattern = evaluate(pattern, row)?;
            let escape = match escape {
                Some(e) => Some(evaluate(e, row)?),
                None => None,
            };
            like(&value, &pattern, escape.as_ref())
        }
        ExprKind::InList { operand, list } => {
            let mut result = Some(false);
            for item in list {
                match compare_values(BinaryOp::Eq, operand, item, row)? {
                    Some(true) => return Ok(Value::Bool(true)),
                    None => result = None,
                    Some(false) => {}
                }
            }
            Ok(result.into())
        }
        ExprKind::Alternative {
            condition,
            then,
            otherwise,
        } => {
            if evaluate(condition, row)?.truth()? == Some(true) {
                evaluate(then, row)
            } else {
                evaluate(otherwise, row)
            }
        }
        ExprKind::Cast { operand, target } => cast(evaluate(operand, row)?, target),
        ExprKind::Function { name, args, routine: None } => builtin(&name.name, args, row),
        other => Err(EvalError::Unsupported(node_name(other).to_string())),
    }
}

fn literal_value(literal: &Literal) -> Result<Value, EvalError> {
    Ok(match literal {
        Literal::Null => Value::Null,
        Literal::Boolean(b) => Value::Bool(*b),
        Literal::Integer(n) => Value::Int(*n),
        Literal::Float(x) => Value::Float(*x),
        Literal::String(s) | Literal::Date(s) | Literal::Time(s) | Literal::Timestamp(s) => {
            Value::Text(s.clone())
        }
        Literal::Blob(_) => return Err(EvalError::Unsupported("binary literal".into())),
        Literal::Interval { .. } => return Err(EvalError::Unsupported("interval literal".into())),
    })
}

/// Evaluates a row value constructor element-wise; any other expression is
/// a row of degree one.
fn row_values(expr: &Expr, row: &RowContext) -> Result<Vec<Value>, EvalError> {
    match &expr.kind {
        ExprKind::Row(items) => items.iter().map(|e| evaluate(e, row)).collect(),
        _ => Ok(vec![evaluate(expr, row)?]),
    }
}

const fn check_degree(left: &[Value], right: &[Value]) -> Result<(), EvalError> {
    if left.len() == right.len() {
        Ok(())
    } else {
        Err(EvalError::DegreeMismatch {
            left: left.len(),
            right: right.len(),
        })
    }
}

fn compare(op: BinaryOp, left: &Expr, right: &Expr, row: &RowContext) -> Result<Value, EvalError> {
    Ok(compare_values(op, left, right, row)?.into())
}

/// Row-value comparison: element pairs are compared left to right and the
/// first unequal pair decides. A NULL before that point makes the result
/// unknown.
fn compare_values(
    op: BinaryOp,
    left: &Expr,
    right: &Expr,
    row: &RowContext,
) -> Result<Option<bool>, EvalError> {
    let l = row_values(left, row)?;
    let r = row_values(right, row)?;
    check_degree(&l, &r)?;

    if matches!(op, BinaryOp::Eq | BinaryOp::NotEq) {
        let mut equal = Some(true);
        for (a, b) in l.iter().zip(&r) {
            match sql_cmp(a, b)? {
                None => equal = None,
                Some(Ordering::Equal) => {}
                Some(_) => {
                    equal = Some(false);
                    break;
                }
            }
        }
        return Ok(if op == BinaryOp::Eq {
            equal
        } else {
            equal.map(|e| !e)
        });
    }

    for (a, b) in l.iter().zip(&r) {
        match sql_cmp(a, b)? {
            None => return Ok(None),
            Some(Ordering::Equal) => {}
            Some(ordering) => return Ok(Some(ordering_satisfies(op, ordering))),
        }
    }
    Ok(Some(matches!(op, BinaryOp::LtEq | BinaryOp::GtEq)))
}

const fn ordering_satisfies(op: BinaryOp, ordering: Ordering) -> bool {
    match op {
        BinaryOp::Lt => matches!(ordering, Ordering::Less),
        BinaryOp::LtEq => !matches!(ordering, Ordering::Greater),
        BinaryOp::Gt => matches!(ordering, Ordering::Greater),
        BinaryOp::GtEq => !matches!(ordering, Ordering::Less),
        BinaryOp::Eq => matches!(ordering, Ordering::Equal),
        _ => !matches!(ordering, Ordering::Equal),
    }
}

fn sql_cmp(a: &Value, b: &Value) -> Result<Option<Ordering>, EvalError> {
    match (a, b) {
        (Value::Null, _) | (_, Value::Null) => Ok(None),
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_))
        | (Value::Text(_), Value::Text(_))
        | (Value::Bool(_), Value::Bool(_)) => Ok(Some(a.cmp_total(b))),
        _ => Err(EvalError::TypeMismatch {
            expected: a.type_name(),
            found: b.type_name(),
        }),
    }
}

fn arithmetic(op: BinaryOp, left: Value, right: Value) -> Result<Value, EvalError> {
    if left.is_null() || right.is_null() {
        return Ok(Value::Null);
    }
    if op == BinaryOp::Concat {
        return Ok(Value::Text(format!("{left}{right}")));
    }
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => {
            let result = match op {
                BinaryOp::Add => a.checked_add(b),
                BinaryOp::Sub => a.checked_sub(b),
                BinaryOp::Mul => a.checked_mul(b),
                BinaryOp::Div | BinaryOp::Mod if b == 0 => return Err(EvalError::DivisionByZero),
                BinaryOp::Div => a.checked_div(b),
                BinaryOp::Mod => a.checked_rem(b),
                _ => return Err(EvalError::Unsupported(op.as_str().to_string())),
            };
            result.map(Value::Int).ok_or(EvalError::Overflow)
        }
        (a, b) => {
            let (x, y) = match (numeric(&a), numeric(&b)) {
                (Some(x), Some(y)) => (x, y),
                (None, _) => return Err(mismatch("numeric", &a)),
                (_, None) => return Err(mismatch("numeric", &b)),
            };
            Ok(Value::Float(match op {
                BinaryOp::Add => x + y,
                BinaryOp::Sub => x - y,
                BinaryOp::Mul => x * y,
                BinaryOp::Div if y == 0.0 => return Err(EvalError::DivisionByZero),
                BinaryOp::Div => x / y,
                _ => return Err(EvalError::Unsupported(op.as_str().to_string())),
            }))
        }
    }
}

fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Int(n) => Some(*n as f64),
        Value::Float(x) => Some(*x),
        _ => None,
    }
}

const fn mismatch(expected: &'static str, found: &Value) -> EvalError {
    EvalError::TypeMismatch {
        expected,
        found: found.type_name(),
    }
}

fn like(value: &Value, pattern: &Value, escape: Option<&Value>) -> Result<Value, EvalError> {
    let (text, pattern) = match (value, pattern) {
        (Value::Null, _) | (_, Value::Null) => return Ok(Value::Null),
        (Value::Text(t), Value::Text(p)) => (t, p),
        (Value::Text(_), other) | (other, _) => return Err(mismatch("VARCHAR", other)),
    };
    let escape = match escape {
        None => None,
        Some(Value::Null) => return Ok(Value::Null),
        Some(Value::Text(e)) if e.chars().count() == 1 => e.chars().next(),
        Some(other) => return Err(mismatch("single character", other)),
    };
    let text: Vec<char> = text.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();
    Ok(Value::Bool(like_match(&text, &pattern, escape)))
}

fn like_match(text: &[char], pattern: &[char], escape: Option<char>) -> bool {
    match pattern.split_first() {
        None => text.is_empty(),
        Some((&c, rest)) if Some(c) == escape => match rest.split_first() {
            Some((&literal, rest)) => text
                .split_first()
                .is_some_and(|(&t, text)| t == literal && like_match(text, rest, escape)),
            None => false,
        },
        Some(('%', rest)) => (0..=text.len()).any(|skip| like_match(&text[skip..], rest, escape)),
        Some(('_', rest)) => text
            .split_first()
            .is_some_and(|(_, text)| like_match(text, rest, escape)),
        Some((&c, rest)) => text
            .split_first()
            .is_some_and(|(&t, text)| t == c && like_match(text, rest, escape)),
    }
}

fn cast(value: Value, target: &DataType) -> Result<Value, EvalError> {
    if value.is_null() {
        return Ok(Value::Null);
    }
    match target {
        DataType::Domain { base, .. } => cast(value, base),
        DataType::Smallint | DataType::Integer | DataType::Bigint
        | DataType::Decimal { scale: None | Some(0), .. } => match value {
            Value::Int(n) => Ok(Value::Int(n)),
            #[allow(clippy::cast_possible_truncation)]
            Value::Float(x) if x.is_finite() => Ok(Value::Int(x.trunc() as i64)),
            Value::Text(s) => s
                .trim()
                .parse()
                .map(Value::Int)
                .map_err(|_| mismatch("INTEGER", &Value::Text(s))),
            other => Err(mismatch("INTEGER", &other)),
        },
        DataType::Real | DataType::Double | DataType::Decimal { .. } => match value {
            Value::Text(s) => s
                .trim()
                .parse()
                .map(Value::Float)
                .map_err(|_| mismatch("DOUBLE", &Value::Text(s))),
            other => numeric(&other)
                .map(Value::Float)
                .ok_or_else(|| mismatch("DOUBLE", &other)),
        },
        DataType::Char(_) | DataType::Varchar(_) | DataType::Clob => {
            Ok(Value::Text(value.to_string()))
        }
        DataType::Boolean => match value {
            Value::Bool(b) => Ok(Value::Bool(b)),
            Value::Text(s) if s.eq_ignore_ascii_case("TRUE") => Ok(Value::Bool(true)),
            Value::Text(s) if s.eq_ignore_ascii_case("FALSE") => Ok(Value::Bool(false)),
            other => Err(mismatch("BOOLEAN", &other)),
        },
        other => Err(EvalError::Unsupported(format!("CAST to {other}"))),
    }
}

fn builtin(name: &str, args: &[Expr], row: &RowContext) -> Result<Value, EvalError> {
    let values = args
        .iter()
        .map(|a| evaluate(a, row))
        .collect::<Result<Vec<_>, _>>()?;
    match (name, values.as_slice()) {
        (_, [Value::Null]) => Ok(Value::Null),
        ("ABS", [Value::Int(n)]) => n.checked_abs().map(Value::Int).ok_or(EvalError::Overflow),
        ("ABS", [Value::Float(x)]) => Ok(Value::Float(x.abs())),
        ("UPPER", [Value::Text(s)]) => Ok(Value::Text(s.to_uppercase())),
        ("LOWER", [Value::Text(s)]) => Ok(Value::Text(s.to_lowercase())),
        ("CHAR_LENGTH" | "CHARACTER_LENGTH" | "LENGTH", [Value::Text(s)]) => {
            i64::try_from(s.chars().count())
                .map(Value::Int)
                .map_err(|_| EvalError::Overflow)
        }
        _ => Err(EvalError::Unsupported(format!("function {name}"))),
    }
}

const fn node_name(kind: &ExprKind) -> &'static str {
    match kind {
        ExprKind::Asterisk { .. } => "asterisk",
        ExprKind::Quantified { .. } => "quantified comparison",
        ExprKind::Overlaps { .. } => "OVERLAPS",
        ExprKind::Match { .. } => "MATCH",
        ExprKind::Exists(_) => "EXISTS",
        ExprKind::Unique(_) => "UNIQUE",
        ExprKind::ScalarSubquery(_) | ExprKind::ArraySubquery(_) => "subquery",
        ExprKind::Row(_) => "row value in scalar position",
        ExprKind::Aggregate { .. } => "aggregate",
        ExprKind::Function { .. } => "routine call",
        ExprKind::Array(_) | ExprKind::ArrayElement { .. } => "array",
        ExprKind::NextValue(_) | ExprKind::CurrentValue(_) => "sequence reference",
        ExprKind::AtTimeZone { .. } => "AT TIME ZONE",
        _ => "expression",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Span;

    fn int(n: i64) -> Expr {
        Expr::integer(n)
    }

    fn null() -> Expr {
        Expr::null(Span::ZERO)
    }

    fn eval(expr: &Expr) -> Value {
        evaluate(expr, &RowContext::new()).unwrap()
    }

    #[test]
    fn test_three_valued_logic() {
        let t = Expr::literal(Literal::Boolean(true), Span::ZERO);
        let f = Expr::literal(Literal::Boolean(false), Span::ZERO);
        assert_eq!(eval(&null().and(f.clone())), Value::Bool(false));
        assert_eq!(eval(&null().and(t.clone())), Value::Null);
        assert_eq!(eval(&null().or(t)), Value::Bool(true));
        assert_eq!(eval(&null().or(f)), Value::Null);
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(eval(&int(7).binary(BinaryOp::Mul, int(6))), Value::Int(42));
        assert_eq!(eval(&int(7).binary(BinaryOp::Add, null())), Value::Null);
        let err = evaluate(&int(1).binary(BinaryOp::Div, int(0)), &RowContext::new());
        assert_eq!(err, Err(EvalError::DivisionByZero));
        let mixed = int(1).binary(BinaryOp::Add, Expr::literal(Literal::Float(0.5), Span::ZERO));
        assert_eq!(eval(&mixed), Value::Float(1.5));
    }

    #[test]
    fn test_row_comparison() {
        let row = |a, b| Expr::new(ExprKind::Row(vec![int(a), int(b)]), Span::ZERO);
        assert_eq!(eval(&row(1, 2).binary(BinaryOp::Lt, row(1, 3))), Value::Bool(true));
        assert_eq!(eval(&row(1, 2).binary(BinaryOp::Eq, row(1, 2))), Value::Bool(true));
        let with_null = Expr::new(ExprKind::Row(vec![int(1), null()]), Span::ZERO);
        assert_eq!(eval(&with_null.binary(BinaryOp::Eq, row(1, 2))), Value::Null);
    }

    #[test]
    fn test_bound_columns_and_parameters() {
        let mut ctx = RowContext::with_parameters(vec![Value::Int(10)]);
        ctx.bind(RangeVariableId(0), 1, Value::Int(5));
        let mut column = Expr::column("B");
        if let ExprKind::Column(c) = &mut column.kind {
            c.binding = Some(ColumnBinding {
                range_variable: RangeVariableId(0),
                index: 1,
                outer: false,
            });
        }
        let param = Expr::new(ExprKind::Parameter { index: 0, name: None }, Span::ZERO);
        let sum = column.binary(BinaryOp::Add, param);
        assert_eq!(evaluate(&sum, &ctx), Ok(Value::Int(15)));

        let unbound = Expr::column("C");
        assert!(matches!(
            evaluate(&unbound, &ctx),
            Err(EvalError::UnboundColumn(name)) if name == "C"
        ));
    }

    #[test]
    fn test_like_patterns() {
        let text = |s: &str| Value::Text(s.into());
        assert_eq!(like(&text("abc"), &text("a%"), None), Ok(Value::Bool(true)));
        assert_eq!(like(&text("abc"), &text("_b_"), None), Ok(Value::Bool(true)));
        assert_eq!(like(&text("abc"), &text("b%"), None), Ok(Value::Bool(false)));
        assert_eq!(
            like(&text("10%"), &text("10!%"), Some(&text("!"))),
            Ok(Value::Bool(true))
        );
        assert_eq!(like(&Value::Null, &text("%"), None), Ok(Value::Null));
    }

    #[test]
    fn test_cast() {
        assert_eq!(cast(Value::Text(" 12 ".into()), &DataType::Integer), Ok(Value::Int(12)));
        assert_eq!(cast(Value::Int(3), &DataType::Varchar(None)), Ok(Value::Text("3".into())));
        assert!(cast(Value::Text("x".into()), &DataType::Integer).is_err());
    }

    #[test]
    fn test_cmp_total_orders_nulls_first() {
        let mut values = vec![Value::Int(2), Value::Null, Value::Float(1.5), Value::Text("a".into())];
        values.sort_by(Value::cmp_total);
        assert_eq!(
            values,
            vec![Value::Null, Value::Float(1.5), Value::Int(2), Value::Text("a".into())]
        );
    }
}
