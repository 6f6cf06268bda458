#![allow(dead_code)]

use oxide_dql::ast::DataType;
use oxide_dql::catalog::{
    ColumnDescriptor, MemoryCatalog, RoutineDescriptor, SequenceDescriptor, TableDescriptor,
};
use oxide_dql::{CompiledExpression, CompiledQuery, DialectMode, ParseError, ParserConfig};

/// `USERS(ID, NAME, EMAIL)`, `ORDERS(ID, USER_ID, TOTAL)`, a view, a
/// sequence and a routine, all in schema `PUBLIC`.
pub fn catalog() -> MemoryCatalog {
    let catalog = MemoryCatalog::new("PUBLIC", "PUBLIC");
    catalog
        .add_table(TableDescriptor::new(
            "PUBLIC",
            "USERS",
            vec![
                ColumnDescriptor::new("ID", DataType::Integer),
                ColumnDescriptor::new("NAME", DataType::Varchar(Some(100))),
                ColumnDescriptor::new("EMAIL", DataType::Varchar(Some(200))),
            ],
        ))
        .unwrap();
    catalog
        .add_table(TableDescriptor::new(
            "PUBLIC",
            "ORDERS",
            vec![
                ColumnDescriptor::new("ID", DataType::Integer),
                ColumnDescriptor::new("USER_ID", DataType::Integer),
                ColumnDescriptor::new(
                    "TOTAL",
                    DataType::Decimal {
                        precision: Some(10),
                        scale: Some(2),
                    },
                ),
            ],
        ))
        .unwrap();
    catalog
        .add_view(
            "PUBLIC",
            "BIG_ORDERS",
            vec![
                ColumnDescriptor::new("ID", DataType::Integer),
                ColumnDescriptor::new("TOTAL", DataType::Integer),
            ],
            "SELECT id, total FROM orders WHERE total > 100",
        )
        .unwrap();
    catalog
        .add_sequence(SequenceDescriptor {
            schema: "PUBLIC".into(),
            name: "ORDER_IDS".into(),
            data_type: DataType::Bigint,
        })
        .unwrap();
    catalog
        .add_routine(RoutineDescriptor {
            schema: "PUBLIC".into(),
            name: "ADD_TAX".into(),
            parameter_count: Some(1),
            return_type: None,
        })
        .unwrap();
    catalog
}

pub fn compile_in(sql: &str, dialect: DialectMode) -> Result<CompiledQuery, ParseError> {
    oxide_dql::compile(sql, &catalog(), ParserConfig::default().with_dialect(dialect))
}

pub fn compile(sql: &str) -> CompiledQuery {
    compile_in(sql, DialectMode::Standard)
        .unwrap_or_else(|e| panic!("Failed to compile: {sql}\nError: {e:?}"))
}

pub fn compile_err(sql: &str) -> ParseError {
    compile_in(sql, DialectMode::Standard)
        .expect_err(&format!("Expected compile error for: {sql}"))
}

pub fn expression(sql: &str) -> CompiledExpression {
    oxide_dql::compile_expression(sql, &catalog(), ParserConfig::default())
        .unwrap_or_else(|e| panic!("Failed to compile: {sql}\nError: {e:?}"))
}
