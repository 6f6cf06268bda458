//! Tests that desugared predicates and CASE-family functions keep their
//! meaning when evaluated.

mod common;
use common::*;

use oxide_dql::eval::{evaluate, RowContext, Value};

fn eval_with(sql: &str, parameters: Vec<Value>) -> Value {
    let compiled = expression(sql);
    evaluate(&compiled.root, &RowContext::with_parameters(parameters))
        .unwrap_or_else(|e| panic!("Failed to evaluate: {sql}\nError: {e}"))
}

#[test]
fn between_is_two_comparisons() {
    let params = || vec![Value::Int(5), Value::Int(10), Value::Int(1)];
    assert_eq!(eval_with("? BETWEEN ? AND ?", params()), Value::Bool(false));
    assert_eq!(
        eval_with("? BETWEEN SYMMETRIC ? AND ?", params()),
        Value::Bool(true)
    );
    assert_eq!(
        eval_with("? NOT BETWEEN ? AND ?", params()),
        Value::Bool(true)
    );
    assert_eq!(
        eval_with(
            "? BETWEEN ? AND ?",
            vec![Value::Int(5), Value::Int(1), Value::Int(10)]
        ),
        Value::Bool(true)
    );
}

#[test]
fn between_renders_expanded() {
    assert_eq!(expression("a BETWEEN 1 AND 10").to_sql(), "1 <= A AND A <= 10");
}

#[test]
fn coalesce_short_circuits_left_to_right() {
    assert_eq!(
        eval_with(
            "COALESCE(?, ?, ?)",
            vec![Value::Null, Value::Null, Value::Int(7)]
        ),
        Value::Int(7)
    );
    assert_eq!(
        eval_with(
            "COALESCE(?, ?, ?)",
            vec![Value::Int(3), Value::Null, Value::Int(7)]
        ),
        Value::Int(3)
    );
    assert_eq!(
        eval_with("COALESCE(?, ?)", vec![Value::Null, Value::Null]),
        Value::Null
    );
}

#[test]
fn nullif_and_case() {
    assert_eq!(
        eval_with("NULLIF(?, ?)", vec![Value::Int(4), Value::Int(4)]),
        Value::Null
    );
    assert_eq!(
        eval_with("NULLIF(?, ?)", vec![Value::Int(4), Value::Int(5)]),
        Value::Int(4)
    );
    assert_eq!(
        eval_with(
            "CASE ? WHEN 1 THEN 'one' WHEN 2 THEN 'two' ELSE 'many' END",
            vec![Value::Int(2)]
        ),
        Value::Text("two".into())
    );
    assert_eq!(
        eval_with("CASE WHEN ? > 0 THEN 'pos' END", vec![Value::Int(-1)]),
        Value::Null
    );
}

#[test]
fn in_list_is_disjunction() {
    assert_eq!(
        eval_with("? IN (1, 2, 3)", vec![Value::Int(2)]),
        Value::Bool(true)
    );
    assert_eq!(
        eval_with("? NOT IN (1, 2, 3)", vec![Value::Int(2)]),
        Value::Bool(false)
    );
    assert_eq!(
        eval_with("? IN (1, NULL)", vec![Value::Int(2)]),
        Value::Null
    );
}

#[test]
fn greatest_and_least_skip_nulls() {
    assert_eq!(
        eval_with(
            "GREATEST(?, ?, ?)",
            vec![Value::Int(1), Value::Null, Value::Int(3)]
        ),
        Value::Int(3)
    );
    assert_eq!(
        eval_with("LEAST(?, ?, ?)", vec![Value::Int(4), Value::Int(2), Value::Null]),
        Value::Int(2)
    );
    assert_eq!(
        eval_with("GREATEST(?, ?)", vec![Value::Null, Value::Int(5)]),
        Value::Int(5)
    );
    assert_eq!(
        eval_with("LEAST(?, ?)", vec![Value::Null, Value::Null]),
        Value::Null
    );
}

#[test]
fn greatest_over_many_operands_stays_small() {
    let operands: Vec<String> = (0..40).map(|i| ((i * 7) % 40).to_string()).collect();
    let greatest = format!("GREATEST({})", operands.join(", "));
    let compiled = expression(&greatest);
    assert!(compiled.to_sql().len() < 500_000);
    assert_eq!(
        evaluate(&compiled.root, &RowContext::new()).unwrap(),
        Value::Int(39)
    );

    let least = format!("LEAST(NULL, {})", operands.join(", "));
    assert_eq!(eval_with(&least, Vec::new()), Value::Int(0));
}

#[test]
fn greatest_keeps_ties() {
    assert_eq!(
        eval_with("GREATEST(?, ?)", vec![Value::Int(2), Value::Int(2)]),
        Value::Int(2)
    );
}
