//! The in-memory SSA IR this crate owns end-to-end: modules, functions,
//! basic blocks, instructions and dominator trees, plus the mutation
//! primitives (`builder`) the obfuscation passes build on.
//!
//! See `SPEC_FULL.md` §3-4.0 for the data model and the IR substrate
//! contract this module implements.

pub mod builder;
pub mod dom;
pub mod function;
pub mod inst;
pub mod module;
pub mod types;
pub mod value;

pub use builder::*;
pub use dom::DominatorTree;
pub use function::{BasicBlock, BlockId, Function, InstId, Linkage};
pub use inst::{
    FloatBinOp, FloatPredicate, Inst, InstKind, IntBinOp, IntPredicate, Terminator, TerminatorKind,
};
pub use module::{FunctionId, Global, GlobalId, Module};
pub use types::Ty;
pub use value::{Const, ValueId};
