//! Paired rewind of the token cursor and the compile context.

use tracing::trace;

use super::CompileContext;
use crate::lexer::TokenStream;

/// A saved parse state.
///
/// Captures the token position together with the context depth, so that a
/// speculative production can only ever be undone as a whole: restoring a
/// checkpoint resets the cursor and rewinds the context in one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub struct Checkpoint {
    position: usize,
    depth: usize,
}

impl Checkpoint {
    /// Captures the current state.
    pub fn capture(stream: &TokenStream, context: &CompileContext) -> Self {
        Self {
            position: stream.position(),
            depth: context.depth(),
        }
    }

    /// The token position the checkpoint was taken at.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.position
    }

    /// Returns the cursor and context to the captured state.
    pub fn restore(self, stream: &mut TokenStream, context: &mut CompileContext) {
        trace!(
            from = stream.position(),
            to = self.position,
            "Restoring checkpoint"
        );
        stream.reset(self.position);
        context.rewind(self.position);
        context.restore_depth(self.depth);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Expr, ExprKind, QualifiedName};
    use crate::context::{RangeSource, RangeVariable};
    use crate::lexer::Span;
    use crate::subquery::SubQueryId;

    #[test]
    fn test_restore_rewinds_both() {
        let mut stream = TokenStream::new("SELECT a FROM t WHERE b = ?");
        let mut ctx = CompileContext::default();
        stream.advance();
        let mark = Checkpoint::capture(&stream, &ctx);

        for _ in 0..6 {
            stream.advance();
        }
        ctx.push_depth(Span::ZERO).unwrap();
        ctx.register_range_variable(
            RangeVariable::new(
                RangeSource::SubQuery(SubQueryId(0)),
                QualifiedName::bare("T"),
                Vec::new(),
            ),
            4,
        );
        ctx.add_parameter(
            Expr::new(ExprKind::Parameter { index: 0, name: None }, Span::ZERO),
            7,
        );

        mark.restore(&mut stream, &mut ctx);
        assert_eq!(stream.position(), 1);
        assert_eq!(ctx.depth(), 0);
        assert!(ctx.range_variables().is_empty());
        assert_eq!(ctx.parameter_count(), 0);
    }
}
