//! Derived table descriptors.

use std::collections::HashSet;

use serde::Serialize;

/// The role a derived table plays in a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TableRole {
    /// Temporary table backing a subquery.
    SubqueryTemp,
    /// Rows of a view.
    View,
    /// Output of the top-level query expression.
    Result,
}

/// Index built over the materialized rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum IndexMode {
    /// Rows kept as produced.
    None,
    /// Duplicate rows removed (IN / EXISTS).
    UniqueRows,
    /// Rows kept in a total order over all columns (ALL / UNIQUE / MATCH).
    FullOrder,
}

/// A table whose rows come from a query expression rather than storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableDerived {
    name: String,
    role: TableRole,
    columns: Vec<String>,
    index: IndexMode,
}

impl TableDerived {
    /// Creates a derived table.
    pub fn new(
        name: impl Into<String>,
        role: TableRole,
        columns: Vec<String>,
        index: IndexMode,
    ) -> Self {
        Self {
            name: name.into(),
            role,
            columns,
            index,
        }
    }

    /// Table name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Table role.
    #[must_use]
    pub const fn role(&self) -> TableRole {
        self.role
    }

    /// Column names.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of columns.
    #[must_use]
    pub fn degree(&self) -> usize {
        self.columns.len()
    }

    /// Index configuration.
    #[must_use]
    pub const fn index(&self) -> IndexMode {
        self.index
    }

    /// The first column name that appears more than once.
    #[must_use]
    pub fn duplicate_column(&self) -> Option<&str> {
        let mut seen = HashSet::new();
        self.columns
            .iter()
            .find(|c| !seen.insert(c.as_str()))
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_table() {
        let table = TableDerived::new(
            "D",
            TableRole::SubqueryTemp,
            vec!["A".into(), "B".into()],
            IndexMode::UniqueRows,
        );
        assert_eq!(table.degree(), 2);
        assert_eq!(table.columns(), ["A", "B"]);
        assert_eq!(table.role(), TableRole::SubqueryTemp);
        assert_eq!(table.index(), IndexMode::UniqueRows);
    }

    #[test]
    fn test_duplicate_column() {
        let table = TableDerived::new(
            "D",
            TableRole::SubqueryTemp,
            vec!["A".into(), "B".into(), "A".into()],
            IndexMode::None,
        );
        assert_eq!(table.duplicate_column(), Some("A"));
    }
}
