//! Read-only interface to schema metadata.
//!
//! The parser never owns catalog objects. It asks a [`Catalog`] for tables,
//! types, sequences and routines by name and treats a miss as a normal
//! compile error: a concurrent DDL drop simply shows up as "not found".

mod memory;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::ast::DataType;

pub use memory::{CatalogError, MemoryCatalog};

/// A column of a base table or view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    /// Column name.
    pub name: String,
    /// Declared type.
    pub data_type: DataType,
    /// Whether the column accepts NULL.
    #[serde(default = "default_nullable")]
    pub nullable: bool,
}

const fn default_nullable() -> bool {
    true
}

impl ColumnDescriptor {
    /// Creates a nullable column.
    #[must_use]
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable: true,
        }
    }
}

/// Stored definition of a view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewDefinition {
    /// Position of the view in schema declaration order.
    pub declaration_order: usize,
    /// The defining query text.
    #[serde(default)]
    pub query: String,
}

/// A table or view known to the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDescriptor {
    /// Owning schema.
    pub schema: String,
    /// Table name.
    pub name: String,
    /// Columns in declaration order.
    pub columns: Vec<ColumnDescriptor>,
    /// Present for views.
    #[serde(default)]
    pub view: Option<ViewDefinition>,
}

impl TableDescriptor {
    /// Creates a base table descriptor.
    #[must_use]
    pub fn new(
        schema: impl Into<String>,
        name: impl Into<String>,
        columns: Vec<ColumnDescriptor>,
    ) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
            columns,
            view: None,
        }
    }

    /// Returns true if the descriptor describes a view.
    #[must_use]
    pub const fn is_view(&self) -> bool {
        self.view.is_some()
    }

    /// Column names in declaration order.
    #[must_use]
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// `schema.name`
    #[must_use]
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.schema, self.name)
    }
}

/// A sequence generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceDescriptor {
    pub schema: String,
    pub name: String,
    #[serde(default = "default_sequence_type")]
    pub data_type: DataType,
}

const fn default_sequence_type() -> DataType {
    DataType::Bigint
}

impl SequenceDescriptor {
    /// `schema.name`
    #[must_use]
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.schema, self.name)
    }
}

/// A user-defined function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutineDescriptor {
    pub schema: String,
    pub name: String,
    /// Expected argument count; `None` accepts any.
    #[serde(default)]
    pub parameter_count: Option<usize>,
    #[serde(default)]
    pub return_type: Option<DataType>,
}

impl RoutineDescriptor {
    /// `schema.name`
    #[must_use]
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.schema, self.name)
    }
}

/// Name lookups the parser performs against shared schema metadata.
///
/// Implementations are shared between sessions compiling concurrently, so
/// they must be `Send + Sync`. Every lookup is a point-in-time read.
pub trait Catalog: Send + Sync {
    /// Finds a table or view in `schema`.
    fn lookup_table(&self, name: &str, schema: &str) -> Option<Arc<TableDescriptor>>;

    /// Finds a domain or user-defined type in `schema`.
    fn lookup_type(&self, name: &str, schema: &str) -> Option<DataType>;

    /// Finds a sequence in `schema`.
    fn lookup_sequence(&self, name: &str, schema: &str) -> Option<Arc<SequenceDescriptor>>;

    /// Finds a user routine in `schema`.
    fn lookup_routine(&self, name: &str, schema: &str) -> Option<Arc<RoutineDescriptor>>;

    /// Resolves a schema prefix. `None` asks for the session's current
    /// schema; an unknown prefix returns `None`.
    fn current_schema_name(&self, prefix: Option<&str>) -> Option<String>;

    /// The only catalog name accepted as a three-part prefix.
    fn default_catalog_name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_descriptor_helpers() {
        let table = TableDescriptor::new(
            "PUBLIC",
            "T",
            vec![
                ColumnDescriptor::new("A", DataType::Integer),
                ColumnDescriptor::new("B", DataType::Varchar(Some(10))),
            ],
        );
        assert_eq!(table.column_names(), vec!["A", "B"]);
        assert_eq!(table.qualified_name(), "PUBLIC.T");
        assert!(!table.is_view());
    }

    #[test]
    fn test_column_descriptor_defaults_to_nullable() {
        let column: ColumnDescriptor =
            serde_json::from_str(r#"{"name": "A", "data_type": "Integer"}"#).unwrap();
        assert!(column.nullable);
        assert_eq!(column.data_type, DataType::Integer);
    }
}
