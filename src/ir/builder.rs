//! IR mutation primitives shared by every pass: block splitting, block and
//! function cloning with value remapping, PHI demotion/promotion, and
//! terminator replacement. This is the "IR library contract" of §6 — owned
//! in-crate, since this crate does not depend on a host compiler for its
//! IR, rather than supplied by an external collaborator.

use std::collections::HashMap;

use crate::ir::dom::DominatorTree;
use crate::ir::function::{BasicBlock, BlockId, Function, InstId};
use crate::ir::inst::{Inst, InstKind, Terminator, TerminatorKind};
use crate::ir::types::Ty;
use crate::ir::value::{Const, ValueId};

/// Rewrites `operand` through `map`, returning it unchanged if absent
/// ("ignore missing entries" mode, per §6).
pub fn remap_operand(operand: ValueId, map: &HashMap<ValueId, ValueId>) -> ValueId {
    map.get(&operand).copied().unwrap_or(operand)
}

fn remap_terminator(term: &mut Terminator, map: &HashMap<ValueId, ValueId>) {
    match &mut term.kind {
        TerminatorKind::CondBr { cond, .. } => *cond = remap_operand(*cond, map),
        TerminatorKind::Switch { value, .. } => *value = remap_operand(*value, map),
        TerminatorKind::Invoke { args, .. } => {
            for a in args.iter_mut() {
                *a = remap_operand(*a, map);
            }
        }
        TerminatorKind::Ret(Some(v)) => *v = remap_operand(*v, map),
        TerminatorKind::Resume(v) => *v = remap_operand(*v, map),
        TerminatorKind::Br(_)
        | TerminatorKind::IndirectBr(_)
        | TerminatorKind::Ret(None)
        | TerminatorKind::Unreachable => {}
    }
}

/// Splits `block` at instruction index `at`: a new suffix block is created
/// holding `block`'s instructions from `at` onward plus its original
/// terminator; `block` itself becomes the prefix, keeping its predecessors
/// and gaining a fresh unconditional branch to the suffix.
///
/// Returns the new suffix block's id.
pub fn split_block(function: &mut Function, block: BlockId, at: usize) -> BlockId {
    let bb = function.block_mut(block);
    let tail_insts: Vec<InstId> = bb.insts.split_off(at);
    let old_term = std::mem::replace(&mut bb.term, Terminator::new(TerminatorKind::Unreachable));
    let is_landing_pad = bb.is_landing_pad;
    let suffix_name = format!("{}.split", function.block(block).name);

    let mut suffix = BasicBlock::new(suffix_name, TerminatorKind::Unreachable);
    suffix.insts = tail_insts;
    suffix.term = old_term;
    suffix.is_landing_pad = is_landing_pad;
    let suffix_id = function.push_block(suffix);

    function.block_mut(block).term = Terminator::new(TerminatorKind::Br(suffix_id));
    suffix_id
}

/// Splits `block` just before its terminator, returning a fresh block that
/// carries the terminator and becomes `block`'s unique successor. Used by
/// `BogusCf` when a candidate's terminator has more than one successor (the
/// "joiner" in §4.3).
pub fn split_before_terminator(function: &mut Function, block: BlockId) -> BlockId {
    let at = function.block(block).insts.len();
    split_block(function, block, at)
}

/// Deep-clones `block`'s instructions and terminator into a new block in
/// the same function. Operands referencing values defined inside `block`
/// are remapped to their clones; operands referencing anything else are
/// looked up in `value_map` (falling back to identity), and entries mapping
/// each original instruction to its clone are added to `value_map` as they
/// are created so callers can continue remapping uses outside the block
/// afterward.
///
/// The clone's terminator keeps the same successor block ids as the
/// original (cloning a block does not, by itself, redirect control flow;
/// callers splice in new edges separately).
pub fn clone_block(
    function: &mut Function,
    block: BlockId,
    value_map: &mut HashMap<ValueId, ValueId>,
) -> BlockId {
    let src_insts = function.block(block).insts.clone();
    let src_term = function.block(block).term.clone();
    let is_landing_pad = function.block(block).is_landing_pad;
    let clone_name = format!("{}.clone", function.block(block).name);

    let new_block = function.push_block(BasicBlock::new(clone_name, TerminatorKind::Unreachable));
    function.block_mut(new_block).is_landing_pad = is_landing_pad;

    // Phase 1: allocate new instruction slots up front so forward/backward
    // references within the cloned region (e.g. a PHI referencing a value
    // defined later in the block) resolve correctly once phase 2 remaps.
    let mut local_map: Vec<(InstId, InstId)> = Vec::with_capacity(src_insts.len());
    for &old_id in &src_insts {
        let src_inst = function.inst(old_id).clone();
        let new_id = function.push_inst(new_block, src_inst);
        local_map.push((old_id, new_id));
        value_map.insert(ValueId::Inst(old_id), ValueId::Inst(new_id));
    }

    // Phase 2: remap operands now that every clone in this block has an id.
    for (_, new_id) in &local_map {
        let mut kind = function.inst(*new_id).kind.clone();
        kind.map_operands(|v| remap_operand(v, value_map));
        function.inst_mut(*new_id).kind = kind;
    }

    let mut term = src_term;
    remap_terminator(&mut term, value_map);
    function.block_mut(new_block).term = term;

    new_block
}

/// Deep-clones every block of `src` into `dest`, which must already exist
/// with the same parameter list (so `ValueId::Param` operands need no
/// remapping) and no blocks of its own yet. Returns the block-id mapping
/// from `src` to `dest` so callers can adjust the entry block id.
pub fn clone_function_into(dest: &mut Function, src: &Function) -> HashMap<BlockId, BlockId> {
    let mut block_map: HashMap<BlockId, BlockId> = HashMap::new();
    for b in src.block_ids() {
        let srcb = src.block(b);
        let mut nb = BasicBlock::new(srcb.name.clone(), TerminatorKind::Unreachable);
        nb.is_landing_pad = srcb.is_landing_pad;
        let nid = dest.push_block(nb);
        block_map.insert(b, nid);
    }

    let mut value_map: HashMap<ValueId, ValueId> = HashMap::new();
    let mut local_map: Vec<(InstId, InstId)> = Vec::new();
    for b in src.block_ids() {
        let new_b = block_map[&b];
        for &old_id in &src.block(b).insts {
            let inst = src.inst(old_id).clone();
            let new_id = dest.push_inst(new_b, inst);
            local_map.push((old_id, new_id));
            value_map.insert(ValueId::Inst(old_id), ValueId::Inst(new_id));
        }
    }

    for (old_id, new_id) in &local_map {
        let _ = old_id;
        let mut kind = dest.inst(*new_id).kind.clone();
        kind.map_operands(|v| remap_operand(v, &value_map));
        dest.inst_mut(*new_id).kind = kind;
    }

    for b in src.block_ids() {
        let new_b = block_map[&b];
        let mut term = src.block(b).term.clone();
        remap_terminator(&mut term, &value_map);
        // Successor block ids refer to the source function's blocks; remap
        // them to the destination's.
        remap_terminator_blocks(&mut term, &block_map);
        dest.block_mut(new_b).term = term;
    }

    dest.entry = block_map[&src.entry];
    block_map
}

fn remap_terminator_blocks(term: &mut Terminator, block_map: &HashMap<BlockId, BlockId>) {
    let m = |b: BlockId| *block_map.get(&b).unwrap_or(&b);
    term.kind = match term.kind.clone() {
        TerminatorKind::Br(b) => TerminatorKind::Br(m(b)),
        TerminatorKind::CondBr {
            cond,
            true_succ,
            false_succ,
        } => TerminatorKind::CondBr {
            cond,
            true_succ: m(true_succ),
            false_succ: m(false_succ),
        },
        TerminatorKind::Switch {
            value,
            default,
            cases,
        } => TerminatorKind::Switch {
            value,
            default: m(default),
            cases: cases.into_iter().map(|(c, b)| (c, m(b))).collect(),
        },
        TerminatorKind::IndirectBr(targets) => {
            TerminatorKind::IndirectBr(targets.into_iter().map(m).collect())
        }
        TerminatorKind::Invoke {
            callee,
            args,
            normal,
            unwind,
        } => TerminatorKind::Invoke {
            callee,
            args,
            normal: m(normal),
            unwind: m(unwind),
        },
        other @ (TerminatorKind::Ret(_) | TerminatorKind::Resume(_) | TerminatorKind::Unreachable) => {
            other
        }
    };
}

/// Replaces `block`'s terminator outright, discarding the old one. A thin
/// splice primitive used by every pass that installs a new control-flow
/// edge (stub branches, dispatcher branches, ...).
pub fn replace_terminator(function: &mut Function, block: BlockId, new_term: TerminatorKind) {
    function.block_mut(block).term = Terminator::new(new_term);
}

/// Demotes a single PHI instruction to a stack slot: creates an `alloca` in
/// the function's entry block, stores each incoming value at the end of its
/// predecessor block, and turns the PHI itself into a `load` from the new
/// slot (keeping its `InstId`, so existing uses of the PHI's value need no
/// rewriting). Returns the new alloca's `InstId`.
pub fn demote_phi_to_stack(function: &mut Function, block: BlockId, phi: InstId) -> InstId {
    let ty = function.inst(phi).ty;
    let incoming = match &function.inst(phi).kind {
        InstKind::Phi(incoming) => incoming.clone(),
        _ => panic!("demote_phi_to_stack called on a non-PHI instruction"),
    };

    let entry = function.entry;
    let alloca = function.push_front_inst(entry, Inst::new(InstKind::Alloca { ty }, Ty::Ptr));

    for (value, pred) in incoming {
        let store = Inst::new(
            InstKind::Store {
                ptr: ValueId::Inst(alloca),
                value,
            },
            Ty::Void,
        );
        let at = function.block(pred).insts.len();
        let id = InstId(function.insts.len() as u32);
        function.insts.push(store);
        function.block_mut(pred).insts.insert(at, id);
    }

    function.inst_mut(phi).kind = InstKind::Load {
        ptr: ValueId::Inst(alloca),
    };
    let _ = block;
    alloca
}

/// Demotes every PHI in `function` to a stack slot, per BCF step 3 and
/// Flatten step 1 ("demote every PHI ... to a stack slot"). Returns the
/// allocas created, for a later `promote_allocas_to_registers` call.
pub fn demote_all_phis(function: &mut Function) -> Vec<InstId> {
    let mut allocas = Vec::new();
    for b in function.block_ids() {
        let phis: Vec<InstId> = function
            .block(b)
            .insts
            .iter()
            .copied()
            .take_while(|id| function.inst(*id).kind.is_phi())
            .collect();
        for phi in phis {
            allocas.push(demote_phi_to_stack(function, b, phi));
        }
    }
    allocas
}

/// Promotes promotable stack slots (`alloca`s only ever stored/loaded
/// within this function, with no escaping address-of use) back into SSA
/// values, using the standard dominance-frontier PHI-placement algorithm.
/// Non-promotable allocas (e.g. one whose address is passed to a call) are
/// left untouched.
pub fn promote_allocas_to_registers(
    function: &mut Function,
    allocas: &[InstId],
    dom: &DominatorTree,
) {
    for &alloca in allocas {
        if !is_promotable(function, alloca) {
            continue;
        }
        promote_one_alloca(function, alloca, dom);
    }
}

fn is_promotable(function: &Function, alloca: InstId) -> bool {
    let ptr = ValueId::Inst(alloca);
    for inst in &function.insts {
        match &inst.kind {
            InstKind::Load { ptr: p } if *p == ptr => {}
            InstKind::Store { ptr: p, value } if *p == ptr => {
                if *value == ptr {
                    return false; // storing the address itself: escapes.
                }
            }
            other => {
                if other.operands().contains(&ptr) {
                    return false; // used as something other than load/store target.
                }
            }
        }
    }
    true
}

fn promote_one_alloca(function: &mut Function, alloca: InstId, dom: &DominatorTree) {
    let ptr = ValueId::Inst(alloca);
    let ty = match function.inst(alloca).kind {
        InstKind::Alloca { ty } => ty,
        _ => return,
    };

    let def_blocks: Vec<BlockId> = function
        .block_ids()
        .filter(|&b| {
            function.block(b).insts.iter().any(|&id| {
                matches!(&function.inst(id).kind, InstKind::Store { ptr: p, .. } if *p == ptr)
            })
        })
        .collect();

    // Iterated dominance frontier.
    let mut phi_blocks: Vec<BlockId> = Vec::new();
    let mut worklist = def_blocks.clone();
    while let Some(b) = worklist.pop() {
        for &f in dom.dominance_frontier(b) {
            if !phi_blocks.contains(&f) {
                phi_blocks.push(f);
                worklist.push(f);
            }
        }
    }

    let mut phi_for_block: HashMap<BlockId, InstId> = HashMap::new();
    for &b in &phi_blocks {
        let id = function.push_front_inst(b, Inst::new(InstKind::Phi(Vec::new()), ty));
        phi_for_block.insert(b, id);
    }

    let mut substitutions: HashMap<ValueId, ValueId> = HashMap::new();
    let mut dead: Vec<InstId> = Vec::new();
    let children = dominator_children(function, dom);

    rename_walk(
        function,
        function.entry,
        ptr,
        Const::Undef(ty).into(),
        &phi_for_block,
        &children,
        &mut substitutions,
        &mut dead,
    );

    for inst in function.insts.iter_mut() {
        inst.kind
            .map_operands(|v| remap_operand(v, &substitutions));
    }
    for b in function.block_ids() {
        let mut term = function.block(b).term.clone();
        remap_terminator(&mut term, &substitutions);
        function.block_mut(b).term = term;
    }

    for b in function.block_ids() {
        function
            .block_mut(b)
            .insts
            .retain(|id| !dead.contains(id) && *id != alloca);
    }
}

impl From<Const> for ValueId {
    fn from(c: Const) -> Self {
        ValueId::Const(c)
    }
}

fn dominator_children(
    function: &Function,
    dom: &DominatorTree,
) -> HashMap<BlockId, Vec<BlockId>> {
    let mut children: HashMap<BlockId, Vec<BlockId>> = HashMap::new();
    for b in function.block_ids() {
        if let Some(idom) = dom.immediate_dominator(b) {
            children.entry(idom).or_default().push(b);
        }
    }
    children
}

#[allow(clippy::too_many_arguments)]
fn rename_walk(
    function: &mut Function,
    block: BlockId,
    ptr: ValueId,
    mut current: ValueId,
    phi_for_block: &HashMap<BlockId, InstId>,
    children: &HashMap<BlockId, Vec<BlockId>>,
    substitutions: &mut HashMap<ValueId, ValueId>,
    dead: &mut Vec<InstId>,
) {
    if let Some(&phi_id) = phi_for_block.get(&block) {
        current = ValueId::Inst(phi_id);
    }

    let insts = function.block(block).insts.clone();
    for id in insts {
        match &function.inst(id).kind {
            InstKind::Store { ptr: p, value } if *p == ptr => {
                current = *value;
                dead.push(id);
            }
            InstKind::Load { ptr: p } if *p == ptr => {
                substitutions.insert(ValueId::Inst(id), current);
                dead.push(id);
            }
            _ => {}
        }
    }

    for succ in function.block(block).term.kind.successors() {
        if let Some(&phi_id) = phi_for_block.get(&succ) {
            if let InstKind::Phi(incoming) = &mut function.inst_mut(phi_id).kind {
                incoming.push((current, block));
            }
        }
    }

    if let Some(kids) = children.get(&block).cloned() {
        for child in kids {
            rename_walk(
                function,
                child,
                ptr,
                current,
                phi_for_block,
                children,
                substitutions,
                dead,
            );
        }
    }
}
