//! FROM-clause range variables.

use std::sync::Arc;

use serde::Serialize;

use crate::ast::{Expr, QualifiedName};
use crate::catalog::TableDescriptor;
use crate::subquery::SubQueryId;

/// Index of a range variable in the compile context's registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct RangeVariableId(pub usize);

/// What a range variable ranges over.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum RangeSource {
    /// A base table from the catalog.
    Table(Arc<TableDescriptor>),
    /// A derived table, view, named subquery or VALUES list.
    SubQuery(SubQueryId),
}

/// How a range variable is joined to the ones before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum JoinKind {
    /// `a, b`
    Comma,
    Cross,
    Inner,
    Left,
    Right,
    Full,
    /// `a UNION JOIN b`
    Union,
}

impl JoinKind {
    /// Returns the SQL keywords, without NATURAL.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Comma => ",",
            Self::Cross => "CROSS JOIN",
            Self::Inner => "INNER JOIN",
            Self::Left => "LEFT JOIN",
            Self::Right => "RIGHT JOIN",
            Self::Full => "FULL JOIN",
            Self::Union => "UNION JOIN",
        }
    }

    /// True when rows of the left side survive without a match.
    #[must_use]
    pub const fn is_left_outer(&self) -> bool {
        matches!(self, Self::Left | Self::Full | Self::Union)
    }

    /// True when rows of the right side survive without a match.
    #[must_use]
    pub const fn is_right_outer(&self) -> bool {
        matches!(self, Self::Right | Self::Full | Self::Union)
    }
}

/// Join information attached to every range variable after the first in a
/// FROM clause.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JoinSpec {
    pub kind: JoinKind,
    pub natural: bool,
    /// `ON` condition, or the equi-join built for NATURAL / USING.
    pub condition: Option<Expr>,
    /// Explicit USING list.
    pub using: Vec<String>,
    /// Columns merged by NATURAL or USING.
    pub common_columns: Vec<String>,
    /// Range variables on the right side of the join. More than one when
    /// the right side is a parenthesized join.
    pub width: usize,
}

impl JoinSpec {
    /// A join with no condition.
    #[must_use]
    pub const fn new(kind: JoinKind) -> Self {
        Self {
            kind,
            natural: false,
            condition: None,
            using: Vec::new(),
            common_columns: Vec::new(),
            width: 1,
        }
    }
}

/// One table reference visible to column resolution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RangeVariable {
    /// Registry index, assigned on registration.
    pub id: RangeVariableId,
    /// The table or subquery supplying rows.
    pub source: RangeSource,
    /// Resolved object name.
    pub name: QualifiedName,
    /// Correlation name.
    pub alias: Option<String>,
    /// Explicit `AS t(a, b)` column list.
    pub declared_columns: Option<Vec<String>>,
    /// Effective column names.
    pub columns: Vec<String>,
    /// Join to the preceding range variables.
    pub join: Option<JoinSpec>,
    /// Token position at registration.
    pub position: usize,
    /// Subquery depth at registration.
    pub depth: usize,
}

impl RangeVariable {
    /// Creates an unregistered range variable.
    #[must_use]
    pub const fn new(source: RangeSource, name: QualifiedName, columns: Vec<String>) -> Self {
        Self {
            id: RangeVariableId(0),
            source,
            name,
            alias: None,
            declared_columns: None,
            columns,
            join: None,
            position: 0,
            depth: 0,
        }
    }

    /// The name column qualifiers are matched against.
    #[must_use]
    pub fn visible_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name.name)
    }

    /// Returns true if a column qualifier (`t`, `s.t` or `c.s.t`) designates
    /// this range variable. An alias hides the underlying table name.
    #[must_use]
    pub fn matches_qualifier(&self, qualifier: &[String]) -> bool {
        match qualifier {
            [table] => self.visible_name() == table,
            [schema, table] | [_, schema, table] => {
                self.alias.is_none()
                    && self.name.schema.as_deref() == Some(schema.as_str())
                    && &self.name.name == table
            }
            _ => false,
        }
    }

    /// Position of a column by name.
    #[must_use]
    pub fn find_column(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Returns true if `name` is merged into a column of an earlier range
    /// variable by NATURAL or USING.
    #[must_use]
    pub fn is_merged_column(&self, name: &str) -> bool {
        self.join
            .as_ref()
            .is_some_and(|join| join.common_columns.iter().any(|c| c == name))
    }

    /// The subquery backing this range variable, if any.
    #[must_use]
    pub const fn subquery(&self) -> Option<SubQueryId> {
        match self.source {
            RangeSource::SubQuery(id) => Some(id),
            RangeSource::Table(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn orders() -> RangeVariable {
        RangeVariable::new(
            RangeSource::SubQuery(SubQueryId(0)),
            QualifiedName::qualified("PUBLIC", "ORDERS"),
            vec!["ID".into(), "TOTAL".into()],
        )
    }

    #[test]
    fn test_qualifier_matching() {
        let mut rv = orders();
        assert!(rv.matches_qualifier(&["ORDERS".into()]));
        assert!(rv.matches_qualifier(&["PUBLIC".into(), "ORDERS".into()]));
        assert!(rv.matches_qualifier(&["CAT".into(), "PUBLIC".into(), "ORDERS".into()]));
        assert!(!rv.matches_qualifier(&["OTHER".into(), "ORDERS".into()]));

        rv.alias = Some("O".into());
        assert!(rv.matches_qualifier(&["O".into()]));
        assert!(!rv.matches_qualifier(&["ORDERS".into()]));
        assert!(!rv.matches_qualifier(&["PUBLIC".into(), "ORDERS".into()]));
    }

    #[test]
    fn test_find_column_and_merged() {
        let mut rv = orders();
        assert_eq!(rv.find_column("TOTAL"), Some(1));
        assert_eq!(rv.find_column("NOPE"), None);
        assert!(!rv.is_merged_column("ID"));

        let mut join = JoinSpec::new(JoinKind::Inner);
        join.common_columns = vec!["ID".into()];
        rv.join = Some(join);
        assert!(rv.is_merged_column("ID"));
    }

    #[test]
    fn test_join_kind_outer_flags() {
        assert!(JoinKind::Left.is_left_outer());
        assert!(!JoinKind::Left.is_right_outer());
        assert!(JoinKind::Full.is_right_outer());
        assert!(!JoinKind::Inner.is_left_outer());
    }
}
