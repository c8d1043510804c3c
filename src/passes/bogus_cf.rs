//! `BogusCf`: probabilistic basic-block duplication guarded by an opaque
//! predicate (§4.3).

use std::collections::HashMap;

use log::{debug, trace};

use crate::config::BcfConfig;
use crate::error::Result;
use crate::ir::builder::{
    clone_block, demote_all_phis, demote_phi_to_stack, split_before_terminator, split_block,
};
use crate::ir::dom::DominatorTree;
use crate::ir::function::{BlockId, InstId};
use crate::ir::inst::{Inst, InstKind, TerminatorKind};
use crate::ir::module::Module;
use crate::ir::value::ValueId;
use crate::ir::Function;
use crate::passes::metadata::ObfMetadata;
use crate::passes::opaque_predicate::{OpaquePredicateLib, PredicateKind};
use crate::passes::ObfKind;
use crate::rng::Rng;

/// Bookkeeping key `BogusCf` writes on every stub branch it creates. Purely
/// informational (no later stage reads it back): `opaque_stub`, written by
/// `OpaquePredicateLib::create_stub` on the same terminator, is what the
/// separately-scheduled `OpaquePredicatePass` actually scans for.
const PLACEHOLDER_KEY: &str = "opaqueStub";

/// Per-function statistics, reported after a `BogusCf` run (§4.3).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BcfStats {
    pub blocks_seen: usize,
    pub blocks_skipped: usize,
    pub blocks_transformed: usize,
}

impl BcfStats {
    fn merge(&mut self, other: BcfStats) {
        self.blocks_seen += other.blocks_seen;
        self.blocks_skipped += other.blocks_skipped;
        self.blocks_transformed += other.blocks_transformed;
    }
}

pub struct BogusCf {
    config: BcfConfig,
}

impl BogusCf {
    pub fn new(config: BcfConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Static eligibility predicate `Copy` queries: does `function` have at
    /// least one block that would survive the candidate filter below?
    pub fn is_eligible(function: &Function) -> bool {
        !function.is_declaration()
            && !has_invoke(function)
            && candidate_blocks(function).next().is_some()
    }

    pub fn run(&self, module: &mut Module) -> Result<BcfStats> {
        let mut top_rng = Rng::from_config_seed(&self.config.bcf_seed);
        let mut stats = BcfStats::default();

        for fid in module.function_ids() {
            let name = module.function(fid).name.clone();
            if !self.config.bcf_func.is_empty() && !self.config.bcf_func.contains(&name) {
                continue;
            }
            let function = module.function_mut(fid);
            if function.is_declaration() {
                continue;
            }
            if ObfMetadata::is_tagged(function, ObfKind::BogusCf).is_some() {
                debug!("bcf: skipping {name}, already tagged obf_boguscf");
                continue;
            }
            if let Some(mandate) = ObfMetadata::is_tagged(function, ObfKind::Copy) {
                if mandate != "boguscf" {
                    debug!("bcf: skipping {name}, obf_copy mandates {mandate} instead");
                    continue;
                }
            }
            if has_invoke(function) {
                debug!("bcf: skipping {name}, contains an invoke terminator");
                continue;
            }

            let mut fn_rng = top_rng.child(&name);
            let fn_stats = self.run_function(function, &mut fn_rng);
            stats.merge(fn_stats);
            if fn_stats.blocks_transformed > 0 {
                trace!("bcf: transformed {} block(s) in {name}", fn_stats.blocks_transformed);
                let dom = DominatorTree::compute(function);
                ObfMetadata::promote_allocas(function, &dom);
                ObfMetadata::tag(function, ObfKind::BogusCf, None);
            }
        }

        // Ensure the globals every stub will eventually draw from already
        // exist, so the separately-scheduled `OpaquePredicatePass` always
        // finds at least `bcf_global` of them regardless of run order
        // relative to its own `opaque_global` (both calls are idempotent).
        if stats.blocks_transformed > 0 {
            OpaquePredicateLib::prepare_module(module, self.config.bcf_global);
        }
        Ok(stats)
    }

    fn run_function(&self, function: &mut Function, rng: &mut Rng) -> BcfStats {
        let mut stats = BcfStats::default();
        let mut candidates: Vec<BlockId> = candidate_blocks(function).collect();
        stats.blocks_seen = function.blocks.len();
        stats.blocks_skipped = function.blocks.len() - candidates.len();

        demote_all_phis(function);
        rng.shuffle(&mut candidates);

        for candidate in candidates {
            if !rng.bernoulli(self.config.bcf_probability) {
                continue;
            }
            stats.blocks_transformed += 1;
            transform_block(function, candidate);
        }
        stats
    }
}

fn has_invoke(function: &Function) -> bool {
    function
        .block_ids()
        .any(|b| matches!(function.block(b).term.kind, TerminatorKind::Invoke { .. }))
}

fn candidate_blocks(function: &Function) -> impl Iterator<Item = BlockId> + '_ {
    function.block_ids().filter(move |&b| {
        b != function.entry
            && !function.block(b).is_landing_pad
            && first_real_inst(function, b).is_some()
    })
}

/// The first instruction that is neither a PHI nor a debug annotation, if
/// any real instruction precedes the terminator.
fn first_real_inst(function: &Function, block: BlockId) -> Option<InstId> {
    function
        .block(block)
        .insts
        .iter()
        .copied()
        .find(|&id| {
            let k = &function.inst(id).kind;
            !k.is_phi() && !k.is_debug_annotation()
        })
}

/// Applies the per-block transformation of §4.3 to `candidate`, returning
/// the id of the block now carrying the (Random-kind) stub branch, for the
/// caller to remember and materialise during finalisation.
fn transform_block(function: &mut Function, candidate: BlockId) -> BlockId {
    let successors = function.block(candidate).term.kind.successors();
    let successor = match successors.len() {
        0 => None,
        1 => Some(successors[0]),
        _ => Some(split_before_terminator(function, candidate)),
    };

    // By this point all PHIs are demoted, so the split point is just the
    // first non-debug-annotation instruction.
    let split_at = function
        .block(candidate)
        .insts
        .iter()
        .position(|&id| !function.inst(id).kind.is_debug_annotation())
        .unwrap_or(0);
    let original = split_block(function, candidate, split_at);

    let mut value_map: HashMap<ValueId, ValueId> = HashMap::new();
    let cloned = clone_block(function, original, &mut value_map);

    if let Some(successor) = successor {
        reconcile_values(function, original, cloned, successor, &value_map);
    }

    OpaquePredicateLib::create_stub(
        function,
        candidate,
        original,
        cloned,
        PredicateKind::Random,
        true,
    );
    function.block_mut(candidate).term.tag(PLACEHOLDER_KEY, "1");
    candidate
}

/// For every value defined in `original` and used outside `{original,
/// cloned}`, reconciles the two arms by either extending an existing PHI in
/// `successor` or creating a fresh one (demoted to a stack slot
/// immediately, per §4.3).
fn reconcile_values(
    function: &mut Function,
    original: BlockId,
    cloned: BlockId,
    successor: BlockId,
    value_map: &HashMap<ValueId, ValueId>,
) {
    let defined_in_original: Vec<InstId> = function.block(original).insts.clone();

    for def in defined_in_original {
        let v = ValueId::Inst(def);
        let cloned_v = *value_map.get(&v).unwrap_or(&v);
        if !has_use_outside(function, v, &[original, cloned]) {
            continue;
        }

        if let Some(phi_id) = find_incoming_phi(function, successor, v, original) {
            if let InstKind::Phi(incoming) = &mut function.inst_mut(phi_id).kind {
                incoming.push((cloned_v, cloned));
            }
            continue;
        }

        let ty = function.inst(def).ty;
        let phi_id =
            function.push_front_inst(successor, Inst::new(InstKind::Phi(vec![]), ty));
        rewrite_value_everywhere_except(function, v, ValueId::Inst(phi_id), &[original, cloned]);
        if let InstKind::Phi(incoming) = &mut function.inst_mut(phi_id).kind {
            incoming.push((v, original));
            incoming.push((cloned_v, cloned));
        }
        demote_phi_to_stack(function, successor, phi_id);
    }
}

fn has_use_outside(function: &Function, value: ValueId, exclude: &[BlockId]) -> bool {
    for b in function.block_ids() {
        if exclude.contains(&b) {
            continue;
        }
        for &id in &function.block(b).insts {
            if function.inst(id).kind.operands().contains(&value) {
                return true;
            }
        }
        if terminator_operands(function, b).contains(&value) {
            return true;
        }
    }
    false
}

fn find_incoming_phi(
    function: &Function,
    succ: BlockId,
    value: ValueId,
    from: BlockId,
) -> Option<InstId> {
    function.block(succ).insts.iter().copied().find(|&id| {
        matches!(&function.inst(id).kind, InstKind::Phi(incoming)
            if incoming.iter().any(|&(v, b)| v == value && b == from))
    })
}

fn rewrite_value_everywhere_except(
    function: &mut Function,
    old: ValueId,
    new: ValueId,
    exclude: &[BlockId],
) {
    let blocks: Vec<BlockId> = function.block_ids().filter(|b| !exclude.contains(b)).collect();
    for b in blocks {
        for &id in function.block(b).insts.clone().iter() {
            let mut kind = function.inst(id).kind.clone();
            kind.map_operands(|v| if v == old { new } else { v });
            function.inst_mut(id).kind = kind;
        }
        rewrite_terminator_operand(function, b, old, new);
    }
}

fn terminator_operands(function: &Function, block: BlockId) -> Vec<ValueId> {
    match &function.block(block).term.kind {
        TerminatorKind::CondBr { cond, .. } => vec![*cond],
        TerminatorKind::Switch { value, .. } => vec![*value],
        TerminatorKind::Invoke { args, .. } => args.clone(),
        TerminatorKind::Ret(Some(v)) => vec![*v],
        TerminatorKind::Resume(v) => vec![*v],
        _ => vec![],
    }
}

fn rewrite_terminator_operand(function: &mut Function, block: BlockId, old: ValueId, new: ValueId) {
    let mut term = function.block(block).term.clone();
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
    function.block_mut(block).term = term;
}

