//! `Flatten`: lowers a function's structured control flow to a single
//! dispatcher block switching on a runtime state index (§4.4).

use std::collections::HashMap;

use log::debug;

use crate::config::FlattenConfig;
use crate::error::{Error, Result};
use crate::ir::builder::demote_all_phis;
use crate::ir::dom::DominatorTree;
use crate::ir::function::{BasicBlock, BlockId, InstId};
use crate::ir::inst::{Inst, InstKind, TerminatorKind};
use crate::ir::module::Module;
use crate::ir::types::Ty;
use crate::ir::value::{Const, ValueId};
use crate::ir::Function;
use crate::passes::metadata::ObfMetadata;
use crate::passes::{ObfKind, PassOutcome};
use crate::rng::Rng;

pub struct Flatten {
    config: FlattenConfig,
}

impl Flatten {
    pub fn new(config: FlattenConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Static eligibility predicate, also queried by `Copy` (§4.4).
    pub fn is_eligible(function: &Function) -> bool {
        if function.is_declaration() || has_unsupported_terminator(function) {
            return false;
        }
        let candidates = candidate_blocks(function);
        if candidates.len() < 2 {
            return false;
        }
        let entry_successors = function.block(function.entry).term.kind.successors().len();
        entry_successors < candidates.len()
    }

    pub fn run(&self, module: &mut Module) -> Result<usize> {
        // Unused today but kept so seeded reruns of Flatten alone are
        // reproducible even before any per-function child stream is drawn.
        let _top_rng = Rng::from_config_seed(&self.config.flatten_seed);
        let mut transformed = 0;

        for fid in module.function_ids() {
            let name = module.function(fid).name.clone();
            if !self.config.flatten_func.is_empty() && !self.config.flatten_func.contains(&name) {
                continue;
            }
            let function = module.function_mut(fid);
            if let Some(mandate) = ObfMetadata::is_tagged(function, ObfKind::Copy) {
                if mandate != "flatten" {
                    debug!("flatten: skipping {name}, obf_copy mandates {mandate} instead");
                    continue;
                }
            }
            if !Self::is_eligible(function) {
                debug!("flatten: skipping {name}, not eligible");
                continue;
            }
            flatten_function(function)?;
            let dom = DominatorTree::compute(function);
            ObfMetadata::promote_allocas(function, &dom);
            ObfMetadata::tag(function, ObfKind::Flatten, None);
            transformed += 1;
        }
        Ok(transformed)
    }
}

fn has_unsupported_terminator(function: &Function) -> bool {
    function.block_ids().any(|b| {
        matches!(
            function.block(b).term.kind,
            TerminatorKind::IndirectBr(_) | TerminatorKind::Switch { .. } | TerminatorKind::Invoke { .. }
        )
    })
}

fn candidate_blocks(function: &Function) -> Vec<BlockId> {
    function
        .block_ids()
        .filter(|&b| b != function.entry && !function.block(b).is_landing_pad)
        .collect()
}

fn flatten_function(function: &mut Function) -> Result<PassOutcome> {
    demote_all_phis(function);

    let candidates = candidate_blocks(function);
    let index_of: HashMap<BlockId, usize> = candidates.iter().enumerate().map(|(i, &b)| (b, i)).collect();

    let initial = match function.block(function.entry).term.kind.successors().len() {
        1 => function.block(function.entry).term.kind.successors()[0],
        _ => crate::ir::builder::split_before_terminator(function, function.entry),
    };

    let dispatch = function.push_block(BasicBlock::new("dispatch", TerminatorKind::Unreachable));
    let jump_index = function.push_front_inst(dispatch, Inst::new(InstKind::Phi(Vec::new()), Ty::I32));

    function.block_mut(function.entry).term = crate::ir::inst::Terminator::new(TerminatorKind::Br(dispatch));
    push_incoming(function, jump_index, index_const(index_of[&initial]), function.entry);

    let mut zero_successor: Vec<BlockId> = Vec::new();

    for &b in &candidates {
        let term_kind = function.block(b).term.kind.clone();
        match term_kind {
            TerminatorKind::Ret(_) | TerminatorKind::Resume(_) | TerminatorKind::Unreachable => {
                zero_successor.push(b);
            }
            TerminatorKind::Br(succ) => {
                push_incoming(function, jump_index, index_const(index_of[&succ]), b);
                function.block_mut(b).term = crate::ir::inst::Terminator::new(TerminatorKind::Br(dispatch));
            }
            TerminatorKind::CondBr {
                cond,
                true_succ,
                false_succ,
            } => {
                let select = function.push_inst(
                    b,
                    Inst::new(
                        InstKind::Select {
                            cond,
                            if_true: index_const(index_of[&true_succ]),
                            if_false: index_const(index_of[&false_succ]),
                        },
                        Ty::I32,
                    ),
                );
                push_incoming(function, jump_index, ValueId::Inst(select), b);
                function.block_mut(b).term = crate::ir::inst::Terminator::new(TerminatorKind::Br(dispatch));
            }
            TerminatorKind::Switch { .. }
            | TerminatorKind::IndirectBr(_)
            | TerminatorKind::Invoke { .. } => {
                return Err(Error::Invariant(
                    "Flatten encountered an unsupported terminator past eligibility check"
                        .to_string(),
                ));
            }
        }
    }

    let cases: Vec<(i64, BlockId)> = candidates.iter().map(|&b| (index_of[&b] as i64, b)).collect();
    function.block_mut(dispatch).term = crate::ir::inst::Terminator::new(TerminatorKind::Switch {
        value: ValueId::Inst(jump_index),
        default: initial,
        cases,
    });
    function
        .block_mut(dispatch)
        .term
        .tag("FlattenSwitch", "true");

    reconcile_external_values(function, &candidates, dispatch, &zero_successor);

    Ok(PassOutcome::Modified)
}

fn index_const(i: usize) -> ValueId {
    ValueId::Const(Const::Int(Ty::I32, i as i64))
}

fn push_incoming(function: &mut Function, phi: InstId, value: ValueId, from: BlockId) {
    if let InstKind::Phi(incoming) = &mut function.inst_mut(phi).kind {
        incoming.push((value, from));
    }
}

/// Implements §4.4 steps 6-7: every value defined in a candidate block and
/// used outside it gets a dispatch-resident PHI; every candidate block that
/// still loops back to dispatch but doesn't define the value contributes a
/// self-referencing incoming edge so the value survives the dispatcher loop.
fn reconcile_external_values(
    function: &mut Function,
    candidates: &[BlockId],
    dispatch: BlockId,
    zero_successor: &[BlockId],
) {
    for &def_block in candidates {
        let defs: Vec<InstId> = function.block(def_block).insts.clone();
        for def in defs {
            let v = ValueId::Inst(def);
            if !used_outside(function, v, def_block) {
                continue;
            }
            let ty = function.inst(def).ty;
            let phi =
                function.push_front_inst(dispatch, Inst::new(InstKind::Phi(vec![]), ty));
            rewrite_value_except(function, v, ValueId::Inst(phi), def_block);
            push_incoming(function, phi, v, def_block);

            if let InstKind::Phi(incoming) = &mut function.inst_mut(phi).kind {
                incoming.push((Const::Undef(ty).into(), function.entry));
            }
            for &other in candidates {
                if other == def_block || zero_successor.contains(&other) {
                    continue;
                }
                if let InstKind::Phi(incoming) = &mut function.inst_mut(phi).kind {
                    incoming.push((ValueId::Inst(phi), other));
                }
            }
        }
    }
}

fn used_outside(function: &Function, value: ValueId, def_block: BlockId) -> bool {
    for b in function.block_ids() {
        if b == def_block {
            continue;
        }
        if function
            .block(b)
            .insts
            .iter()
            .any(|&id| function.inst(id).kind.operands().contains(&value))
        {
            return true;
        }
        if terminator_reads(function, b, value) {
            return true;
        }
    }
    false
}

fn terminator_reads(function: &Function, block: BlockId, value: ValueId) -> bool {
    match &function.block(block).term.kind {
        TerminatorKind::CondBr { cond, .. } => *cond == value,
        TerminatorKind::Switch { value: v, .. } => *v == value,
        TerminatorKind::Invoke { args, .. } => args.contains(&value),
        TerminatorKind::Ret(Some(v)) => *v == value,
        TerminatorKind::Resume(v) => *v == value,
        _ => false,
    }
}

fn rewrite_value_except(function: &mut Function, old: ValueId, new: ValueId, except: BlockId) {
    let blocks: Vec<BlockId> = function.block_ids().filter(|&b| b != except).collect();
    for b in blocks {
        for &id in function.block(b).insts.clone().iter() {
            let mut kind = function.inst(id).kind.clone();
            kind.map_operands(|v| if v == old { new } else { v });
            function.inst_mut(id).kind = kind;
        }
        let mut term = function.block(b).term.clone();
        let replace = |v: &mut ValueId| {
            if *v == old {
                *v = new;
            }
        };
        match &mut term.kind {
            TerminatorKind::CondBr { cond, .. } => replace(cond),
            TerminatorKind::Switch { value, .. } => replace(value),
            TerminatorKind::Invoke { args, .. } => args.iter_mut().for_each(replace),
            TerminatorKind::Ret(Some(v)) => replace(v),
            TerminatorKind::Resume(v) => replace(v),
            _ => {}
        }
        function.block_mut(b).term = term;
    }
}
