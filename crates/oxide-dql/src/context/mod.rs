//! Compile context: scope, parameter and dependency tracking for one
//! statement compile.

mod checkpoint;
mod compile_context;
mod range_variable;

pub use checkpoint::Checkpoint;
pub use compile_context::CompileContext;
pub use range_variable::{JoinKind, JoinSpec, RangeSource, RangeVariable, RangeVariableId};
