//! SQL query compiler
//!
//! A hand-written recursive descent parser over a rewindable token stream.
//! Ambiguous prefixes are parsed speculatively and rewound on failure.

mod error;
mod expr;
mod from;
mod operators;
#[allow(clippy::module_inception)]
mod parser;
mod query;
mod resolve;

pub use error::{ErrorKind, ParseError, ParseResult};
pub use parser::{Compiled, CompiledExpression, CompiledQuery, Parser};

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::ast::DataType;
    use crate::catalog::{
        ColumnDescriptor, MemoryCatalog, RoutineDescriptor, SequenceDescriptor, TableDescriptor,
    };

    /// `PUBLIC.USERS`, `PUBLIC.ORDERS`, a view over users, a sequence, a
    /// one-argument routine and a domain.
    pub(crate) fn catalog() -> MemoryCatalog {
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
                "ACTIVE_USERS",
                vec![
                    ColumnDescriptor::new("ID", DataType::Integer),
                    ColumnDescriptor::new("NAME", DataType::Varchar(Some(100))),
                ],
                "SELECT id, name FROM users",
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
            .add_domain(
                "PUBLIC",
                "MONEY",
                DataType::Decimal {
                    precision: Some(12),
                    scale: Some(2),
                },
            )
            .unwrap();
        catalog
    }
}
