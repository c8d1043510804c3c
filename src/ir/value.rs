//! SSA value identities.
//!
//! An [`Inst`](crate::ir::inst::Inst)'s own [`InstId`] doubles as the SSA
//! value it defines (a function producing "at most one SSA value" per
//! instruction, per the data model), so a region of the CFG can be cloned by
//! copying a slab of instructions alongside an index-remapping table rather
//! than rebuilding a shared-ownership node graph.

use crate::ir::function::InstId;
use crate::ir::module::GlobalId;
use crate::ir::types::Ty;

/// A reference to an SSA value: an instruction result, a function
/// parameter, a constant, or a global's address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueId {
    /// The `n`th formal parameter of the enclosing function.
    Param(u32),
    /// The value defined by the instruction at this index.
    Inst(InstId),
    /// A compile-time constant.
    Const(Const),
    /// The address of a module-scope global.
    Global(GlobalId),
}

/// A compile-time constant operand.
///
/// `Float`'s payload is compared and hashed by bit pattern (`f64::to_bits`)
/// rather than IEEE-754 equality, so `Const` (and therefore `ValueId`, which
/// is used as a `HashMap` key throughout the builder) can implement `Eq` and
/// `Hash`. The only floats this crate ever constructs are the opaque-stub
/// literal `1.0`, so bit-pattern identity and value identity coincide in
/// practice.
#[derive(Debug, Clone, Copy)]
pub enum Const {
    Int(Ty, i64),
    Float(Ty, f64),
    /// `undef` of the given type, used by Flatten to fill dispatch-block PHI
    /// incomings for edges that never happen at runtime.
    Undef(Ty),
}

impl Const {
    pub fn ty(self) -> Ty {
        match self {
            Const::Int(ty, _) => ty,
            Const::Float(ty, _) => ty,
            Const::Undef(ty) => ty,
        }
    }
}

impl PartialEq for Const {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Const::Int(t1, v1), Const::Int(t2, v2)) => t1 == t2 && v1 == v2,
            (Const::Float(t1, v1), Const::Float(t2, v2)) => t1 == t2 && v1.to_bits() == v2.to_bits(),
            (Const::Undef(t1), Const::Undef(t2)) => t1 == t2,
            _ => false,
        }
    }
}

impl Eq for Const {}

impl std::hash::Hash for Const {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Const::Int(ty, v) => {
                ty.hash(state);
                v.hash(state);
            }
            Const::Float(ty, v) => {
                ty.hash(state);
                v.to_bits().hash(state);
            }
            Const::Undef(ty) => ty.hash(state),
        }
    }
}
