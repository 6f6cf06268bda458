//! Tests for checkpoint and rewind of the token cursor and compile context.

mod common;
use common::*;

use oxide_dql::ast::{Expr, QualifiedName};
use oxide_dql::context::{Checkpoint, CompileContext, RangeSource, RangeVariable};
use oxide_dql::lexer::{Span, TokenStream};
use oxide_dql::subquery::{SubQuery, SubQueryId, SubQueryMode, SubQuerySource};
use oxide_dql::Parser;

fn range(name: &str) -> RangeVariable {
    RangeVariable::new(
        RangeSource::SubQuery(SubQueryId(0)),
        QualifiedName::bare(name),
        vec!["A".into()],
    )
}

fn rows(position: usize) -> SubQuery {
    SubQuery::new(
        SubQueryMode::Plain,
        SubQuerySource::Rows(Vec::new()),
        1,
        position,
    )
}

#[test]
fn rewind_restores_cursor_and_registries() {
    let mut stream = TokenStream::new("SELECT a FROM t WHERE b = ? AND c = ?");
    let mut context = CompileContext::default();
    stream.advance();
    context.register_range_variable(range("BEFORE"), 1);
    context.add_parameter(Expr::integer(0), 0);
    context.add_schema_object("PUBLIC.T", 0);

    let checkpoint = Checkpoint::capture(&stream, &context);
    let ranges_before = context.range_variables().to_vec();
    let subqueries_before = context.subqueries().len();
    let objects_before = context.schema_object_names();

    for _ in 0..6 {
        stream.advance();
    }
    context.register_range_variable(range("DURING"), 4);
    context.add_parameter(Expr::integer(1), 6);
    context.add_sequence("PUBLIC.S", 5);
    context.add_schema_object("PUBLIC.U", 5);
    let id = context.add_subquery(rows(5));
    context.register_subquery("W", id, Span::ZERO).unwrap();
    context.push_depth(Span::ZERO).unwrap();

    checkpoint.restore(&mut stream, &mut context);

    assert_eq!(stream.position(), 1);
    assert_eq!(context.range_variables(), ranges_before.as_slice());
    assert_eq!(context.parameter_count(), 1);
    assert_eq!(context.subqueries().len(), subqueries_before);
    assert_eq!(context.schema_object_names(), objects_before);
    assert!(context.sequences().is_empty());
    assert_eq!(context.named_subquery("W"), None);
    assert_eq!(context.depth(), 0);
}

#[test]
fn abandoned_derived_table_leaves_no_trace() {
    // The first `(` looks like a derived table; the parser only learns it
    // is a parenthesized join after the inner query has been built.
    let compiled = compile(
        "SELECT x.id FROM ((SELECT id FROM users WHERE id = ?) x JOIN orders o ON x.id = o.user_id)",
    );
    assert_eq!(compiled.parameters.len(), 1);
    let names: Vec<&str> = compiled
        .range_variables
        .iter()
        .map(RangeVariable::visible_name)
        .collect();
    assert_eq!(names, vec!["USERS", "X", "O"]);
    assert_eq!(compiled.subqueries.len(), 1);
}

#[test]
fn abandoned_subquery_keeps_parameter_order() {
    // `((SELECT ?), ?)` is first tried as a subquery, then as a row.
    let compiled = compile("SELECT id FROM users WHERE ((SELECT ?), ?) = (id, ?)");
    let indexes: Vec<_> = compiled
        .parameters
        .iter()
        .map(|p| match &p.kind {
            oxide_dql::ast::ExprKind::Parameter { index, .. } => *index,
            other => panic!("expected a parameter, got {other:?}"),
        })
        .collect();
    assert_eq!(indexes, vec![0, 1, 2]);
}

#[test]
fn parser_mark_and_restore() {
    let catalog = catalog();
    let mut parser = Parser::new("SELECT id FROM users", &catalog);
    let mark = parser.mark();
    assert_eq!(mark.position(), 0);
    parser.restore(mark);
    assert!(parser.context().range_variables().is_empty());
    assert!(parser.compile_query().is_ok());
}
