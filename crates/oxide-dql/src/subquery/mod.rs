//! Subquery descriptors, derived tables and materialization.

mod descriptor;
mod materialize;
mod table;

pub use descriptor::{SubQuery, SubQueryId, SubQueryMode, SubQuerySource};
pub use materialize::{MaterializeError, MaterializedTable, Materializer, QueryExecutor};
pub use table::{IndexMode, TableDerived, TableRole};

/// Orders subqueries for materialization: deepest nesting level first, and
/// view-backed subqueries in view declaration order among themselves.
///
/// View subqueries keep the slots the level sort gives them; those slots are
/// then refilled with the views sorted by declaration order.
#[must_use]
pub fn materialization_order(subqueries: &[SubQuery]) -> Vec<SubQueryId> {
    let mut order: Vec<&SubQuery> = subqueries.iter().collect();
    order.sort_by(|a, b| b.level().cmp(&a.level()));

    let slots: Vec<usize> = order
        .iter()
        .enumerate()
        .filter(|(_, s)| s.view_order().is_some())
        .map(|(i, _)| i)
        .collect();
    let mut views: Vec<&SubQuery> = slots.iter().map(|&i| order[i]).collect();
    views.sort_by_key(|s| s.view_order());
    for (slot, view) in slots.into_iter().zip(views) {
        order[slot] = view;
    }

    order.into_iter().map(SubQuery::id).collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::ast::DataType;
    use crate::catalog::{ColumnDescriptor, TableDescriptor, ViewDefinition};

    fn plain(id: usize, level: usize) -> SubQuery {
        let mut sq = SubQuery::new(
            SubQueryMode::Plain,
            SubQuerySource::Rows(Vec::new()),
            level,
            0,
        );
        sq.set_id(SubQueryId(id));
        sq
    }

    fn view(id: usize, level: usize, declaration_order: usize) -> SubQuery {
        let descriptor = TableDescriptor {
            schema: "PUBLIC".into(),
            name: format!("V{declaration_order}"),
            columns: vec![ColumnDescriptor::new("A", DataType::Integer)],
            view: Some(ViewDefinition {
                declaration_order,
                query: String::new(),
            }),
        };
        let mut sq = SubQuery::from_view(Arc::new(descriptor), level, 0);
        sq.set_id(SubQueryId(id));
        sq
    }

    #[test]
    fn test_deepest_level_first() {
        let subqueries = vec![plain(0, 1), plain(1, 3), plain(2, 2), plain(3, 3)];
        assert_eq!(
            materialization_order(&subqueries),
            vec![SubQueryId(1), SubQueryId(3), SubQueryId(2), SubQueryId(0)]
        );
    }

    #[test]
    fn test_views_follow_declaration_order() {
        // The view declared first sits at a shallower level, yet must come
        // before the later-declared view.
        let subqueries = vec![view(0, 1, 0), plain(1, 2), view(2, 3, 1)];
        assert_eq!(
            materialization_order(&subqueries),
            vec![SubQueryId(0), SubQueryId(1), SubQueryId(2)]
        );
    }
}
