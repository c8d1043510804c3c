//! Arena-indexed functions, basic blocks and instructions.
//!
//! A [`Function`] owns two flat arenas — `blocks` and `insts` — and every
//! other reference to a block or instruction is a dense index (`BlockId`,
//! `InstId`) into one of them, per the systems-language rendition called
//! for in the design notes rather than a shared-ownership node graph.
//! Cloning a region of the CFG is therefore a copy of arena slabs plus an
//! index-remapping table (see [`crate::ir::builder`]).

use crate::ir::inst::{Inst, Terminator, TerminatorKind};
use crate::ir::types::Ty;

/// Index of a basic block within its owning function's `blocks` arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub u32);

/// Index of an instruction within its owning function's `insts` arena. An
/// instruction's own `InstId` doubles as the SSA value it defines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstId(pub u32);

impl BlockId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl InstId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A function's linkage kind, as distinguished in §3.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Linkage {
    Internal,
    Private,
    External,
}

/// An ordered sequence of instructions ending in exactly one terminator.
///
/// `insts` holds the block's non-terminator instructions in order (any
/// leading PHI nodes first, per the data model's invariant); the
/// terminator is stored separately as `term` since it is structurally
/// distinguished (every block has exactly one, never zero or more than
/// one).
#[derive(Debug, Clone, PartialEq)]
pub struct BasicBlock {
    pub name: String,
    pub insts: Vec<InstId>,
    pub term: Terminator,
    /// Landing pads are never touched by BCF or Flatten (§4.3, §4.4).
    pub is_landing_pad: bool,
}

impl BasicBlock {
    pub fn new(name: impl Into<String>, term: TerminatorKind) -> Self {
        Self {
            name: name.into(),
            insts: Vec::new(),
            term: Terminator::new(term),
            is_landing_pad: false,
        }
    }

    /// The first non-PHI instruction id, if any exist before the
    /// terminator. Used by the "already a terminator" BCF candidate filter
    /// and by Flatten's PHI-demotion pass.
    pub fn first_non_phi(&self, insts: &[Inst]) -> Option<InstId> {
        self.insts.iter().copied().find(|id| !insts[id.index()].kind.is_phi())
    }

    pub fn phis(&self) -> impl Iterator<Item = InstId> + '_ {
        self.insts.iter().copied()
    }
}

/// An ordered list of basic blocks with a designated entry, typed
/// parameters, a return type and a linkage kind.
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: String,
    pub params: Vec<Ty>,
    pub ret_ty: Ty,
    pub linkage: Linkage,
    pub blocks: Vec<BasicBlock>,
    pub insts: Vec<Inst>,
    pub entry: BlockId,
}

impl Function {
    /// A declaration: no blocks, hence no entry and no body to transform.
    pub fn declaration(name: impl Into<String>, params: Vec<Ty>, ret_ty: Ty, linkage: Linkage) -> Self {
        Self {
            name: name.into(),
            params,
            ret_ty,
            linkage,
            blocks: Vec::new(),
            insts: Vec::new(),
            entry: BlockId(0),
        }
    }

    pub fn is_declaration(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn inst(&self, id: InstId) -> &Inst {
        &self.insts[id.index()]
    }

    pub fn inst_mut(&mut self, id: InstId) -> &mut Inst {
        &mut self.insts[id.index()]
    }

    pub fn block(&self, id: BlockId) -> &BasicBlock {
        &self.blocks[id.index()]
    }

    pub fn block_mut(&mut self, id: BlockId) -> &mut BasicBlock {
        &mut self.blocks[id.index()]
    }

    /// Appends a new instruction, returning the `InstId` that is also its
    /// defined SSA value.
    pub fn push_inst(&mut self, block: BlockId, inst: Inst) -> InstId {
        let id = InstId(self.insts.len() as u32);
        self.insts.push(inst);
        self.blocks[block.index()].insts.push(id);
        id
    }

    /// Inserts a new instruction at the front of `block` (used for PHI
    /// nodes, which must precede every other instruction).
    pub fn push_front_inst(&mut self, block: BlockId, inst: Inst) -> InstId {
        let id = InstId(self.insts.len() as u32);
        self.insts.push(inst);
        self.blocks[block.index()].insts.insert(0, id);
        id
    }

    /// Appends a new, empty block, returning its id.
    pub fn push_block(&mut self, block: BasicBlock) -> BlockId {
        let id = BlockId(self.blocks.len() as u32);
        self.blocks.push(block);
        id
    }

    /// All block ids in declaration order.
    pub fn block_ids(&self) -> impl Iterator<Item = BlockId> + '_ {
        (0..self.blocks.len() as u32).map(BlockId)
    }

    pub fn predecessors(&self, target: BlockId) -> Vec<BlockId> {
        self.block_ids()
            .filter(|&b| self.block(b).term.kind.successors().contains(&target))
            .collect()
    }
}
