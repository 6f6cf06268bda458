//! Per-statement scope and dependency bookkeeping.

use std::collections::{BTreeSet, HashMap};

use tracing::{trace, warn};

use super::range_variable::{RangeVariable, RangeVariableId};
use crate::ast::Expr;
use crate::config::DEFAULT_MAX_DEPTH;
use crate::lexer::Span;
use crate::parser::{ParseError, ParseResult};
use crate::subquery::{self, SubQuery, SubQueryId};

#[derive(Debug, Clone, PartialEq)]
enum Dependency {
    Sequence(String),
    Routine(String),
    SchemaObject(String),
}

/// State shared by every production while one statement compiles.
///
/// Everything that a speculative parse can create is stamped with the token
/// position it was created at, so [`CompileContext::rewind`] can drop it
/// again when the attempt is abandoned. Range variables and subqueries are
/// pruned when stamped past the rewind position; parameters and recorded
/// dependencies when stamped at or past it.
#[derive(Debug, Clone)]
pub struct CompileContext {
    range_variables: Vec<RangeVariable>,
    subqueries: Vec<SubQuery>,
    named_subqueries: Vec<HashMap<String, SubQueryId>>,
    parameters: Vec<(usize, Expr)>,
    dependencies: Vec<(usize, Dependency)>,
    depth: usize,
    max_depth: usize,
    last_error: Option<ParseError>,
}

impl Default for CompileContext {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DEPTH)
    }
}

impl CompileContext {
    /// Creates an empty context at depth zero.
    #[must_use]
    pub fn new(max_depth: usize) -> Self {
        Self {
            range_variables: Vec::new(),
            subqueries: Vec::new(),
            named_subqueries: vec![HashMap::new()],
            parameters: Vec::new(),
            dependencies: Vec::new(),
            depth: 0,
            max_depth,
            last_error: None,
        }
    }

    /// Discards everything from a previous compile.
    pub fn reset(&mut self) {
        *self = Self::new(self.max_depth);
    }

    // --- Range variables ---

    /// Stamps `range` with `position` and the current depth, and appends
    /// it to the registry.
    pub fn register_range_variable(
        &mut self,
        mut range: RangeVariable,
        position: usize,
    ) -> RangeVariableId {
        let id = RangeVariableId(self.range_variables.len());
        range.id = id;
        range.position = position;
        range.depth = self.depth;
        trace!(id = id.0, name = %range.visible_name(), position, "Registered range variable");
        self.range_variables.push(range);
        id
    }

    /// Looks up a range variable.
    #[must_use]
    pub fn range_variable(&self, id: RangeVariableId) -> Option<&RangeVariable> {
        self.range_variables.get(id.0)
    }

    /// Looks up a range variable for modification.
    pub fn range_variable_mut(&mut self, id: RangeVariableId) -> Option<&mut RangeVariable> {
        self.range_variables.get_mut(id.0)
    }

    /// All live range variables in registration order.
    #[must_use]
    pub fn range_variables(&self) -> &[RangeVariable] {
        &self.range_variables
    }

    // --- Rewind ---

    /// Drops everything an abandoned parse created after `position`.
    ///
    /// Must run together with the token cursor reset; use a
    /// [`Checkpoint`](super::Checkpoint) so the two cannot drift apart.
    pub fn rewind(&mut self, position: usize) {
        self.range_variables.retain(|r| r.position <= position);
        self.subqueries.retain(|s| s.position() <= position);
        self.parameters.retain(|(p, _)| *p < position);
        self.dependencies.retain(|(p, _)| *p < position);

        let live = self.subqueries.len();
        for names in &mut self.named_subqueries {
            names.retain(|_, id| id.0 < live);
        }
    }

    // --- Depth ---

    /// Current subquery depth.
    #[must_use]
    pub const fn depth(&self) -> usize {
        self.depth
    }

    /// Enters a nested query expression. The named-subquery scope of the
    /// new depth starts empty.
    ///
    /// # Errors
    ///
    /// Returns a syntax error when nesting exceeds the configured limit.
    pub fn push_depth(&mut self, span: Span) -> ParseResult<()> {
        if self.depth >= self.max_depth {
            return Err(ParseError::syntax(
                format!("Query nesting exceeds the limit of {}", self.max_depth),
                span,
            )
            .at_depth(self.depth));
        }
        self.depth += 1;
        self.named_subqueries.truncate(self.depth);
        self.named_subqueries.push(HashMap::new());
        Ok(())
    }

    /// Leaves a nested query expression.
    pub fn pop_depth(&mut self) {
        self.restore_depth(self.depth.saturating_sub(1));
    }

    pub(crate) fn restore_depth(&mut self, depth: usize) {
        self.depth = depth;
        self.named_subqueries.truncate(depth + 1);
        while self.named_subqueries.len() < depth + 1 {
            self.named_subqueries.push(HashMap::new());
        }
    }

    // --- Subqueries ---

    /// Adds a subquery to the arena and returns its id.
    pub fn add_subquery(&mut self, mut subquery: SubQuery) -> SubQueryId {
        let id = SubQueryId(self.subqueries.len());
        subquery.set_id(id);
        self.subqueries.push(subquery);
        id
    }

    /// Looks up a subquery.
    #[must_use]
    pub fn subquery(&self, id: SubQueryId) -> Option<&SubQuery> {
        self.subqueries.get(id.0)
    }

    /// Looks up a subquery for modification.
    pub fn subquery_mut(&mut self, id: SubQueryId) -> Option<&mut SubQuery> {
        self.subqueries.get_mut(id.0)
    }

    /// All live subqueries in creation order.
    #[must_use]
    pub fn subqueries(&self) -> &[SubQuery] {
        &self.subqueries
    }

    /// Subquery ids in the order they must be materialized.
    #[must_use]
    pub fn materialization_order(&self) -> Vec<SubQueryId> {
        subquery::materialization_order(&self.subqueries)
    }

    // --- Named subqueries (WITH) ---

    /// Clears the WITH names declared at the current depth.
    pub fn init_subquery_names(&mut self) {
        if let Some(names) = self.named_subqueries.get_mut(self.depth) {
            names.clear();
        }
    }

    /// Binds a WITH name at the current depth.
    ///
    /// # Errors
    ///
    /// Returns a semantic error if the name is already bound at this depth.
    pub fn register_subquery(&mut self, name: &str, id: SubQueryId, span: Span) -> ParseResult<()> {
        let depth = self.depth;
        let names = self
            .named_subqueries
            .get_mut(depth)
            .ok_or_else(|| ParseError::syntax("Named subquery scope missing", span))?;
        if names.contains_key(name) {
            return Err(ParseError::semantic(
                format!("Duplicate WITH name: {name}"),
                span,
            )
            .at_depth(depth));
        }
        names.insert(name.to_string(), id);
        Ok(())
    }

    /// Finds the innermost WITH binding for `name`, walking from the current
    /// depth out to depth zero.
    #[must_use]
    pub fn named_subquery(&self, name: &str) -> Option<SubQueryId> {
        self.named_subqueries
            .iter()
            .take(self.depth + 1)
            .rev()
            .find_map(|names| names.get(name).copied())
    }

    // --- Parameters ---

    /// Records a dynamic parameter seen at `position`.
    pub fn add_parameter(&mut self, expr: Expr, position: usize) {
        self.parameters.push((position, expr));
    }

    /// Number of parameters recorded so far.
    #[must_use]
    pub fn parameter_count(&self) -> usize {
        self.parameters.len()
    }

    /// The recorded parameters, without clearing them.
    pub fn parameters(&self) -> impl Iterator<Item = &Expr> {
        self.parameters.iter().map(|(_, e)| e)
    }

    /// Returns the parameters in order and clears the registry.
    pub fn take_parameters(&mut self) -> Vec<Expr> {
        self.parameters.drain(..).map(|(_, e)| e).collect()
    }

    // --- Dependencies ---

    /// Records a sequence used by the statement.
    pub fn add_sequence(&mut self, name: impl Into<String>, position: usize) {
        self.dependencies
            .push((position, Dependency::Sequence(name.into())));
    }

    /// Records a user routine called by the statement.
    pub fn add_routine(&mut self, name: impl Into<String>, position: usize) {
        self.dependencies
            .push((position, Dependency::Routine(name.into())));
    }

    /// Records a table, view or type the statement depends on.
    pub fn add_schema_object(&mut self, name: impl Into<String>, position: usize) {
        self.dependencies
            .push((position, Dependency::SchemaObject(name.into())));
    }

    /// Sequences used by the statement.
    #[must_use]
    pub fn sequences(&self) -> BTreeSet<String> {
        self.collect(|d| match d {
            Dependency::Sequence(n) => Some(n),
            _ => None,
        })
    }

    /// Routines called by the statement.
    #[must_use]
    pub fn routines(&self) -> BTreeSet<String> {
        self.collect(|d| match d {
            Dependency::Routine(n) => Some(n),
            _ => None,
        })
    }

    /// Every schema object the compiled statement depends on: tables, views,
    /// types, sequences and routines.
    #[must_use]
    pub fn schema_object_names(&self) -> BTreeSet<String> {
        self.collect(|d| match d {
            Dependency::Sequence(n) | Dependency::Routine(n) | Dependency::SchemaObject(n) => {
                Some(n)
            }
        })
    }

    fn collect(&self, pick: impl Fn(&Dependency) -> Option<&String>) -> BTreeSet<String> {
        self.dependencies
            .iter()
            .filter_map(|(_, d)| pick(d).cloned())
            .collect()
    }

    // --- Best-candidate error ---

    /// Keeps the more specific of the recorded failure and `error`.
    pub fn record_failure(&mut self, error: ParseError) {
        self.last_error = Some(match self.last_error.take() {
            None => error,
            Some(previous) => {
                let best = ParseError::deeper(previous.clone(), error);
                if best != previous {
                    warn!(
                        depth = best.depth,
                        message = %best.message,
                        "Replaced best-candidate parse error"
                    );
                }
                best
            }
        });
    }

    /// The most specific failure recorded by abandoned speculative parses.
    #[must_use]
    pub const fn last_error(&self) -> Option<&ParseError> {
        self.last_error.as_ref()
    }

    /// Removes and returns the recorded failure.
    pub fn take_last_error(&mut self) -> Option<ParseError> {
        self.last_error.take()
    }

    /// Splits the context into its range variables and subqueries.
    #[must_use]
    pub fn into_parts(self) -> (Vec<RangeVariable>, Vec<SubQuery>) {
        (self.range_variables, self.subqueries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::QualifiedName;
    use crate::context::RangeSource;
    use crate::subquery::{SubQuery, SubQueryMode, SubQuerySource};

    fn placeholder(level: usize, position: usize) -> SubQuery {
        SubQuery::new(
            SubQueryMode::Plain,
            SubQuerySource::Rows(Vec::new()),
            level,
            position,
        )
    }

    fn range(name: &str) -> RangeVariable {
        RangeVariable::new(
            RangeSource::SubQuery(SubQueryId(0)),
            QualifiedName::bare(name),
            Vec::new(),
        )
    }

    fn parameter(index: usize) -> Expr {
        Expr::new(
            crate::ast::ExprKind::Parameter { index, name: None },
            Span::ZERO,
        )
    }

    #[test]
    fn test_rewind_prunes_by_position() {
        let mut ctx = CompileContext::default();
        ctx.register_range_variable(range("A"), 2);
        ctx.register_range_variable(range("B"), 5);
        ctx.add_parameter(parameter(0), 4);
        ctx.add_parameter(parameter(1), 5);
        ctx.add_sequence("PUBLIC.S", 5);

        ctx.rewind(5);
        assert_eq!(ctx.range_variables().len(), 2);
        assert_eq!(ctx.parameter_count(), 1);
        assert!(ctx.sequences().is_empty());

        ctx.rewind(3);
        assert_eq!(ctx.range_variables().len(), 1);
        assert_eq!(ctx.range_variables()[0].name.name, "A");
    }

    #[test]
    fn test_register_stamps_depth() {
        let mut ctx = CompileContext::default();
        ctx.push_depth(Span::ZERO).unwrap();
        let id = ctx.register_range_variable(range("A"), 1);
        assert_eq!(ctx.range_variable(id).unwrap().depth, 1);
        ctx.pop_depth();
        assert_eq!(ctx.depth(), 0);
    }

    #[test]
    fn test_named_subquery_scoping() {
        let mut ctx = CompileContext::default();
        let outer = ctx.add_subquery(placeholder(1, 0));
        ctx.register_subquery("X", outer, Span::ZERO).unwrap();

        ctx.push_depth(Span::ZERO).unwrap();
        assert_eq!(ctx.named_subquery("X"), Some(outer));

        let inner = ctx.add_subquery(placeholder(2, 0));
        ctx.register_subquery("X", inner, Span::ZERO).unwrap();
        assert_eq!(ctx.named_subquery("X"), Some(inner));

        ctx.pop_depth();
        assert_eq!(ctx.named_subquery("X"), Some(outer));

        ctx.push_depth(Span::ZERO).unwrap();
        assert_eq!(ctx.named_subquery("X"), Some(outer));
    }

    #[test]
    fn test_duplicate_name_at_same_depth() {
        let mut ctx = CompileContext::default();
        let id = ctx.add_subquery(placeholder(1, 0));
        ctx.register_subquery("X", id, Span::ZERO).unwrap();
        let err = ctx.register_subquery("X", id, Span::ZERO).unwrap_err();
        assert_eq!(err.kind, crate::parser::ErrorKind::Semantic);
    }

    #[test]
    fn test_reset_forgets_names() {
        let mut ctx = CompileContext::default();
        let id = ctx.add_subquery(placeholder(1, 0));
        ctx.register_subquery("X", id, Span::ZERO).unwrap();
        ctx.reset();
        assert_eq!(ctx.named_subquery("X"), None);
        assert!(ctx.subqueries().is_empty());
    }

    #[test]
    fn test_rewind_drops_names_of_pruned_subqueries() {
        let mut ctx = CompileContext::default();
        let id = ctx.add_subquery(placeholder(1, 7));
        ctx.register_subquery("X", id, Span::ZERO).unwrap();
        ctx.rewind(3);
        assert_eq!(ctx.named_subquery("X"), None);
    }

    #[test]
    fn test_take_parameters_clears() {
        let mut ctx = CompileContext::default();
        ctx.add_parameter(parameter(0), 1);
        ctx.add_parameter(parameter(1), 3);
        let params = ctx.take_parameters();
        assert_eq!(params.len(), 2);
        assert_eq!(ctx.parameter_count(), 0);
    }

    #[test]
    fn test_depth_limit() {
        let mut ctx = CompileContext::new(1);
        ctx.push_depth(Span::ZERO).unwrap();
        assert!(ctx.push_depth(Span::ZERO).is_err());
    }

    #[test]
    fn test_record_failure_keeps_deepest() {
        let mut ctx = CompileContext::default();
        ctx.record_failure(ParseError::syntax("outer", Span::new(1, 2)).at_depth(0));
        ctx.record_failure(ParseError::syntax("inner", Span::new(0, 1)).at_depth(2));
        ctx.record_failure(ParseError::syntax("middle", Span::new(9, 10)).at_depth(1));
        assert_eq!(ctx.last_error().unwrap().message, "inner");
    }

    #[test]
    fn test_dependency_sets() {
        let mut ctx = CompileContext::default();
        ctx.add_sequence("PUBLIC.S", 1);
        ctx.add_routine("PUBLIC.F", 2);
        ctx.add_schema_object("PUBLIC.T", 3);
        ctx.add_schema_object("PUBLIC.T", 4);
        assert_eq!(ctx.sequences().len(), 1);
        assert_eq!(ctx.routines().len(), 1);
        assert_eq!(
            ctx.schema_object_names().into_iter().collect::<Vec<_>>(),
            vec!["PUBLIC.F", "PUBLIC.S", "PUBLIC.T"]
        );
    }
}
