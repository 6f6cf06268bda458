//! Materialize-on-demand for subquery tables.
//!
//! A [`Materializer`] fills the backing tables of one compiled statement at
//! execution time. Uncorrelated subqueries are filled once per execution;
//! correlated ones again for every outer row.

use std::collections::HashMap;

use thiserror::Error;
use tracing::debug;

use super::descriptor::{SubQuery, SubQueryId, SubQuerySource};
use super::table::IndexMode;
use crate::ast::QueryExpression;
use crate::catalog::TableDescriptor;
use crate::eval::{self, EvalError, RowContext, Value};

/// Errors raised while materializing subquery tables.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MaterializeError {
    #[error("Execution cancelled")]
    Cancelled,

    #[error("Executor error: {0}")]
    Executor(String),

    #[error("Evaluation error: {0}")]
    Eval(#[from] EvalError),

    #[error("Subquery {0} has no prepared table")]
    NotPrepared(SubQueryId),

    #[error("Unknown subquery {0}")]
    UnknownSubquery(SubQueryId),

    #[error("Subquery {id} returned a row of degree {found}, expected {expected}")]
    DegreeMismatch {
        id: SubQueryId,
        expected: usize,
        found: usize,
    },
}

/// The execution engine, as seen from the subquery layer.
pub trait QueryExecutor {
    /// Runs a query-backed subquery with the outer row bound.
    ///
    /// # Errors
    ///
    /// Implementations report engine failures as
    /// [`MaterializeError::Executor`].
    fn execute(
        &mut self,
        subquery: &SubQuery,
        query: &QueryExpression,
        outer: &RowContext,
    ) -> Result<Vec<Vec<Value>>, MaterializeError>;

    /// Reads the rows of a view.
    ///
    /// # Errors
    ///
    /// Implementations report engine failures as
    /// [`MaterializeError::Executor`].
    fn execute_view(&mut self, view: &TableDescriptor) -> Result<Vec<Vec<Value>>, MaterializeError>;

    /// Polled before every materialization.
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// The rows of one materialized subquery table.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterializedTable {
    rows: Vec<Vec<Value>>,
    index: IndexMode,
    execution: u64,
    row_generation: u64,
}

impl MaterializedTable {
    /// Rows in index order.
    #[must_use]
    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if the table holds no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index configuration the rows were stored with.
    #[must_use]
    pub const fn index(&self) -> IndexMode {
        self.index
    }

    /// Returns true if an identical row is present.
    #[must_use]
    pub fn contains(&self, row: &[Value]) -> bool {
        match self.index {
            IndexMode::None => self.rows.iter().any(|r| rows_equal(r, row)),
            IndexMode::UniqueRows | IndexMode::FullOrder => self
                .rows
                .binary_search_by(|r| compare_rows(r, row))
                .is_ok(),
        }
    }
}

fn compare_rows(a: &[Value], b: &[Value]) -> core::cmp::Ordering {
    a.iter()
        .zip(b)
        .map(|(x, y)| x.cmp_total(y))
        .find(|o| o.is_ne())
        .unwrap_or_else(|| a.len().cmp(&b.len()))
}

fn rows_equal(a: &[Value], b: &[Value]) -> bool {
    compare_rows(a, b).is_eq()
}

/// Per-statement materialization state.
#[derive(Debug)]
pub struct Materializer<'a> {
    subqueries: &'a [SubQuery],
    order: Vec<SubQueryId>,
    tables: HashMap<SubQueryId, MaterializedTable>,
    execution: u64,
    row_generation: u64,
}

impl<'a> Materializer<'a> {
    /// Creates the state for a compiled statement. `order` is the
    /// materialization order computed at compile time.
    #[must_use]
    pub fn new(subqueries: &'a [SubQuery], order: Vec<SubQueryId>) -> Self {
        Self {
            subqueries,
            order,
            tables: HashMap::new(),
            execution: 0,
            row_generation: 0,
        }
    }

    /// Starts a new statement execution. Every table becomes stale.
    pub fn start_execution(&mut self) {
        self.execution += 1;
        self.row_generation = 0;
        self.tables.clear();
        debug!(execution = self.execution, "Started statement execution");
    }

    /// Moves to the next outer row. Correlated tables become stale.
    pub fn advance_row(&mut self) {
        self.row_generation += 1;
    }

    /// The current rows of a materialized table, if it has been filled.
    #[must_use]
    pub fn table(&self, id: SubQueryId) -> Option<&MaterializedTable> {
        self.tables.get(&id)
    }

    fn is_fresh(&self, table: &MaterializedTable, correlated: bool) -> bool {
        table.execution == self.execution
            && (!correlated || table.row_generation == self.row_generation)
    }

    /// Fills the table of subquery `id` unless it is already current.
    ///
    /// # Errors
    ///
    /// Fails when execution is cancelled, the subquery was never prepared,
    /// the executor fails, or a row has the wrong degree.
    pub fn materialize(
        &mut self,
        id: SubQueryId,
        executor: &mut dyn QueryExecutor,
        outer: &RowContext,
    ) -> Result<&MaterializedTable, MaterializeError> {
        let subquery = self
            .subqueries
            .get(id.0)
            .ok_or(MaterializeError::UnknownSubquery(id))?;
        let fresh = self
            .tables
            .get(&id)
            .is_some_and(|t| self.is_fresh(t, subquery.is_correlated()));

        if !fresh {
            if executor.is_cancelled() {
                return Err(MaterializeError::Cancelled);
            }
            let table = subquery.table().ok_or(MaterializeError::NotPrepared(id))?;
            let mut rows = match subquery.source() {
                SubQuerySource::Query(query) => executor.execute(subquery, query, outer)?,
                SubQuerySource::View(view) => executor.execute_view(view)?,
                SubQuerySource::Rows(rows) => rows
                    .iter()
                    .map(|row| {
                        row.iter()
                            .map(|e| eval::evaluate(e, outer))
                            .collect::<Result<Vec<_>, _>>()
                    })
                    .collect::<Result<Vec<_>, _>>()?,
            };
            if let Some(bad) = rows.iter().find(|r| r.len() != table.degree()) {
                return Err(MaterializeError::DegreeMismatch {
                    id,
                    expected: table.degree(),
                    found: bad.len(),
                });
            }
            match table.index() {
                IndexMode::None => {}
                IndexMode::FullOrder => rows.sort_by(|a, b| compare_rows(a, b)),
                IndexMode::UniqueRows => {
                    rows.sort_by(|a, b| compare_rows(a, b));
                    rows.dedup_by(|a, b| rows_equal(a, b));
                }
            }
            debug!(
                id = id.0,
                rows = rows.len(),
                correlated = subquery.is_correlated(),
                "Materialized subquery"
            );
            self.tables.insert(
                id,
                MaterializedTable {
                    rows,
                    index: table.index(),
                    execution: self.execution,
                    row_generation: self.row_generation,
                },
            );
        }

        self.tables
            .get(&id)
            .ok_or(MaterializeError::UnknownSubquery(id))
    }

    /// Fills every uncorrelated table in materialization order. Correlated
    /// tables are filled per outer row through [`Materializer::materialize`].
    ///
    /// # Errors
    ///
    /// Stops at the first failing subquery.
    pub fn materialize_all(
        &mut self,
        executor: &mut dyn QueryExecutor,
        outer: &RowContext,
    ) -> Result<(), MaterializeError> {
        let order = self.order.clone();
        for id in order {
            let correlated = self
                .subqueries
                .get(id.0)
                .ok_or(MaterializeError::UnknownSubquery(id))?
                .is_correlated();
            if !correlated {
                self.materialize(id, executor, outer)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Expr, Literal, QueryBody, ValuesBody};
    use crate::lexer::Span;
    use crate::subquery::SubQueryMode;

    #[derive(Default)]
    struct CountingExecutor {
        calls: usize,
        rows: Vec<Vec<Value>>,
        cancelled: bool,
    }

    impl QueryExecutor for CountingExecutor {
        fn execute(
            &mut self,
            _subquery: &SubQuery,
            _query: &QueryExpression,
            _outer: &RowContext,
        ) -> Result<Vec<Vec<Value>>, MaterializeError> {
            self.calls += 1;
            Ok(self.rows.clone())
        }

        fn execute_view(
            &mut self,
            _view: &TableDescriptor,
        ) -> Result<Vec<Vec<Value>>, MaterializeError> {
            self.calls += 1;
            Ok(self.rows.clone())
        }

        fn is_cancelled(&self) -> bool {
            self.cancelled
        }
    }

    fn query_subquery(mode: SubQueryMode, correlated: bool) -> SubQuery {
        let body = QueryBody::Values(ValuesBody {
            rows: vec![vec![Expr::integer(1)], vec![Expr::integer(2)]],
            columns: vec!["C1".into()],
        });
        let mut query = QueryExpression::from_body(body, Span::ZERO);
        query.limit = Some(crate::ast::LimitClause {
            offset: None,
            count: Some(Expr::integer(10)),
            strict: false,
        });
        let mut subquery = SubQuery::from_query(mode, query, 1, 0);
        if correlated {
            subquery.mark_correlated();
        }
        subquery.prepare_table(None).unwrap();
        subquery
    }

    #[test]
    fn test_uncorrelated_materializes_once() {
        let subqueries = vec![query_subquery(SubQueryMode::Plain, false)];
        let mut materializer = Materializer::new(&subqueries, vec![SubQueryId(0)]);
        let mut executor = CountingExecutor::default();
        materializer.start_execution();
        for _ in 0..5 {
            materializer.advance_row();
            materializer
                .materialize(SubQueryId(0), &mut executor, &RowContext::new())
                .unwrap();
        }
        assert_eq!(executor.calls, 1);

        materializer.start_execution();
        materializer
            .materialize(SubQueryId(0), &mut executor, &RowContext::new())
            .unwrap();
        assert_eq!(executor.calls, 2);
    }

    #[test]
    fn test_correlated_materializes_per_row() {
        let subqueries = vec![query_subquery(SubQueryMode::Plain, true)];
        let mut materializer = Materializer::new(&subqueries, vec![SubQueryId(0)]);
        let mut executor = CountingExecutor::default();
        materializer.start_execution();
        for _ in 0..5 {
            materializer.advance_row();
            materializer
                .materialize(SubQueryId(0), &mut executor, &RowContext::new())
                .unwrap();
            materializer
                .materialize(SubQueryId(0), &mut executor, &RowContext::new())
                .unwrap();
        }
        assert_eq!(executor.calls, 5);
    }

    #[test]
    fn test_unique_rows_are_deduplicated() {
        let subqueries = vec![query_subquery(SubQueryMode::Unique, false)];
        let mut materializer = Materializer::new(&subqueries, vec![SubQueryId(0)]);
        let mut executor = CountingExecutor {
            rows: vec![
                vec![Value::Int(3)],
                vec![Value::Int(1)],
                vec![Value::Int(3)],
                vec![Value::Null],
            ],
            ..CountingExecutor::default()
        };
        materializer.start_execution();
        let table = materializer
            .materialize(SubQueryId(0), &mut executor, &RowContext::new())
            .unwrap();
        assert_eq!(
            table.rows(),
            &[vec![Value::Null], vec![Value::Int(1)], vec![Value::Int(3)]]
        );
        assert!(table.contains(&[Value::Int(3)]));
        assert!(!table.contains(&[Value::Int(2)]));
    }

    #[test]
    fn test_data_expression_rows_evaluated_directly() {
        let body = QueryBody::Values(ValuesBody {
            rows: vec![
                vec![Expr::integer(1), Expr::literal(Literal::String("a".into()), Span::ZERO)],
                vec![Expr::integer(2), Expr::null(Span::ZERO)],
            ],
            columns: vec!["C1".into(), "C2".into()],
        });
        let query = QueryExpression::from_body(body, Span::ZERO);
        let mut subquery = SubQuery::from_query(SubQueryMode::Plain, query, 1, 0);
        subquery.prepare_table(None).unwrap();
        let subqueries = vec![subquery];

        let mut materializer = Materializer::new(&subqueries, vec![SubQueryId(0)]);
        let mut executor = CountingExecutor::default();
        materializer.start_execution();
        materializer
            .materialize_all(&mut executor, &RowContext::new())
            .unwrap();
        assert_eq!(executor.calls, 0);
        let table = materializer.table(SubQueryId(0)).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows()[0], vec![Value::Int(1), Value::Text("a".into())]);
    }

    #[test]
    fn test_cancellation_is_polled() {
        let subqueries = vec![query_subquery(SubQueryMode::Plain, false)];
        let mut materializer = Materializer::new(&subqueries, vec![SubQueryId(0)]);
        let mut executor = CountingExecutor {
            cancelled: true,
            ..CountingExecutor::default()
        };
        materializer.start_execution();
        let err = materializer
            .materialize_all(&mut executor, &RowContext::new())
            .unwrap_err();
        assert_eq!(err, MaterializeError::Cancelled);
        assert_eq!(executor.calls, 0);
    }

    #[test]
    fn test_unprepared_subquery_is_rejected() {
        let mut subquery = query_subquery(SubQueryMode::Plain, false);
        subquery = SubQuery::new(
            SubQueryMode::Plain,
            subquery.source().clone(),
            subquery.level(),
            subquery.position(),
        );
        let subqueries = vec![subquery];
        let mut materializer = Materializer::new(&subqueries, vec![SubQueryId(0)]);
        let mut executor = CountingExecutor::default();
        materializer.start_execution();
        let err = materializer
            .materialize(SubQueryId(0), &mut executor, &RowContext::new())
            .unwrap_err();
        assert_eq!(err, MaterializeError::NotPrepared(SubQueryId(0)));
    }

    #[test]
    fn test_degree_mismatch() {
        let subqueries = vec![query_subquery(SubQueryMode::Plain, false)];
        let mut materializer = Materializer::new(&subqueries, vec![SubQueryId(0)]);
        let mut executor = CountingExecutor {
            rows: vec![vec![Value::Int(1), Value::Int(2)]],
            ..CountingExecutor::default()
        };
        materializer.start_execution();
        assert!(matches!(
            materializer.materialize(SubQueryId(0), &mut executor, &RowContext::new()),
            Err(MaterializeError::DegreeMismatch { expected: 1, found: 2, .. })
        ));
    }
}
