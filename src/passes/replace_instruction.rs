//! `ReplaceInstruction`: mutates instructions inside a statically-dead arm
//! into semantically-incorrect but syntactically valid look-alikes (§4.6).

use log::warn;

use crate::config::ReplaceInstructionConfig;
use crate::error::Result;
use crate::ir::function::{BlockId, InstId};
use crate::ir::inst::{FloatBinOp, FloatPredicate, InstKind, IntBinOp, IntPredicate};
use crate::ir::module::Module;
use crate::ir::Function;
use crate::passes::opaque_predicate::OpaquePredicateLib;
use crate::rng::Rng;

pub struct ReplaceInstruction {
    config: ReplaceInstructionConfig,
}

impl ReplaceInstruction {
    pub fn new(config: ReplaceInstructionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn run(&self, module: &mut Module) -> Result<usize> {
        let mut rng = Rng::from_config_seed(&self.config.replace_seed);
        let mut mutated_blocks = 0;

        for fid in module.function_ids() {
            let function = module.function_mut(fid);
            let dead_blocks: Vec<BlockId> = function
                .block_ids()
                .filter(|&b| OpaquePredicateLib::is_block_unreachable(function, b).is_some())
                .collect();

            for block in dead_blocks {
                if mutate_block(function, block, &mut rng)? {
                    mutated_blocks += 1;
                }
                OpaquePredicateLib::clear_unreachable(function, block);
            }
        }
        Ok(mutated_blocks)
    }
}

/// Batches and applies replacements for every non-terminator instruction in
/// `block` at once (to avoid iterator invalidation while still reading
/// every instruction's original opcode), returning whether any instruction
/// was eligible.
fn mutate_block(function: &mut Function, block: BlockId, rng: &mut Rng) -> Result<bool> {
    let insts: Vec<InstId> = function.block(block).insts.clone();
    let mut replacements: Vec<(InstId, InstKind)> = Vec::new();

    for id in insts {
        let kind = function.inst(id).kind.clone();
        let replacement = match kind {
            InstKind::IntBinOp { op, lhs, rhs } => {
                let new_op = pick_other(&IntBinOp::FAMILY, op, rng);
                Some(InstKind::IntBinOp {
                    op: new_op,
                    lhs,
                    rhs,
                })
            }
            InstKind::FloatBinOp { op, lhs, rhs } => {
                let new_op = pick_other(&FloatBinOp::FAMILY, op, rng);
                Some(InstKind::FloatBinOp {
                    op: new_op,
                    lhs,
                    rhs,
                })
            }
            InstKind::ICmp { pred, lhs, rhs } => {
                let new_pred = pick_other(&IntPredicate::FAMILY, pred, rng);
                Some(InstKind::ICmp {
                    pred: new_pred,
                    lhs,
                    rhs,
                })
            }
            InstKind::FCmp { pred, lhs, rhs } if pred != FloatPredicate::AlwaysTrue => {
                let new_pred = pick_other(&FloatPredicate::FAMILY, pred, rng);
                Some(InstKind::FCmp {
                    pred: new_pred,
                    lhs,
                    rhs,
                })
            }
            InstKind::Load { .. } | InstKind::Store { .. } => {
                // Loads/stores have no sibling opcode family to substitute
                // into; left untouched regardless of element type (§4.6).
                None
            }
            InstKind::Phi(_)
            | InstKind::Alloca { .. }
            | InstKind::Select { .. }
            | InstKind::Call { .. }
            | InstKind::DebugAnnotation
            | InstKind::FCmp { .. } => None,
        };
        if let Some(new_kind) = replacement {
            replacements.push((id, new_kind));
        }
    }

    let any = !replacements.is_empty();
    for (id, kind) in replacements {
        function.inst_mut(id).kind = kind;
    }
    if !any {
        warn!(
            "replace_instruction: dead block {:?} had no eligible instruction to mutate \
             (CFG-simplify will fold it away, reducing obfuscation)",
            block
        );
    }
    Ok(any)
}

fn pick_other<T: Copy + PartialEq>(family: &[T], current: T, rng: &mut Rng) -> T {
    loop {
        let candidate = family[rng.index(family.len())];
        if candidate != current {
            return candidate;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opcode_families_match_the_documented_sizes() {
        assert_eq!(IntBinOp::FAMILY.len(), 13);
        assert_eq!(FloatBinOp::FAMILY.len(), 5);
        assert_eq!(IntPredicate::FAMILY.len(), 10);
        assert_eq!(FloatPredicate::FAMILY.len(), 14);
    }

    #[test]
    fn pick_other_always_differs_and_stays_in_family() {
        let mut rng = Rng::from_seed_str("replace-instruction");
        for _ in 0..200 {
            let picked = pick_other(&IntBinOp::FAMILY, IntBinOp::Add, &mut rng);
            assert_ne!(picked, IntBinOp::Add);
            assert!(IntBinOp::FAMILY.contains(&picked));
        }
    }

    #[test]
    fn float_family_closure() {
        let mut rng = Rng::from_seed_str("replace-instruction-float");
        for _ in 0..200 {
            let picked = pick_other(&FloatBinOp::FAMILY, FloatBinOp::FDiv, &mut rng);
            assert_ne!(picked, FloatBinOp::FDiv);
        }
    }
}
