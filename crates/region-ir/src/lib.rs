//! Region-nested IR substrate.
//!
//! Programs are organized as functions whose bodies are regions: ordered
//! lists of blocks, each holding operations, each of which may itself own
//! nested regions (conditionals, loops). All IR objects live in per-function
//! arenas and are addressed by small copyable IDs, so analyses can key their
//! results by handle without borrowing into the IR.

mod builder;
mod function;
mod program;

pub use builder::FunctionBuilder;
pub use function::{
    Block, BlockId, Function, OpId, Operation, Region, RegionId, Value, ValueDef, ValueId,
    ValueKind,
};
pub use program::{Diag, FuncId, FunctionEnv, Program};
