//! `ObfMetadata`: tag/untag functions and instructions with the named
//! metadata keys obfuscation passes coordinate through (§4.1).

use crate::ir::builder::promote_allocas_to_registers;
use crate::ir::dom::DominatorTree;
use crate::ir::function::InstId;
use crate::ir::{Function, InstKind};
use crate::passes::ObfKind;

/// Stateless namespace for the tag/untag/promote operations of §4.1; kept
/// as a unit struct (rather than free functions) to mirror the reference
/// implementation's `ObfUtils` static-method class.
pub struct ObfMetadata;

impl ObfMetadata {
    /// Attaches a metadata entry recording `kind` (and, for `Copy`, which
    /// obfuscation the clone should receive via `extra`) to `function`. Tags
    /// the first instruction of the entry block when there is one; an entry
    /// block that only branches into a body (no instructions of its own,
    /// common straight out of a front end) gets the tag on its terminator
    /// instead, mirroring `OpaquePredicateLib`'s dead-arm marking fallback.
    pub fn tag(function: &mut Function, kind: ObfKind, extra: Option<&str>) {
        let entry = function.entry;
        let payload = extra.unwrap_or("true").to_string();
        match function.block(entry).insts.first().copied() {
            Some(first) => function.inst_mut(first).tag(kind.metadata_key(), payload),
            None => function.block_mut(entry).term.tag(kind.metadata_key(), payload),
        }
    }

    /// Returns the tag payload for `kind` on `function`, if tagged.
    pub fn is_tagged(function: &Function, kind: ObfKind) -> Option<String> {
        let entry = function.entry;
        match function.block(entry).insts.first().copied() {
            Some(first) => function.inst(first).tagged(kind.metadata_key()).map(str::to_string),
            None => function
                .block(entry)
                .term
                .tagged(kind.metadata_key())
                .map(str::to_string),
        }
    }

    /// Removes a metadata entry keyed `key` from `inst`, returning whether
    /// it was present.
    pub fn remove_tag(function: &mut Function, inst: InstId, key: &str) -> bool {
        function.inst_mut(inst).untag(key)
    }

    /// Converts promotable stack slots in `function` back into SSA values,
    /// using the supplied (freshly recomputed) dominator tree.
    pub fn promote_allocas(function: &mut Function, dom: &DominatorTree) {
        let allocas: Vec<InstId> = function
            .insts
            .iter()
            .enumerate()
            .filter(|(_, inst)| matches!(inst.kind, InstKind::Alloca { .. }))
            .map(|(i, _)| InstId(i as u32))
            .collect();
        promote_allocas_to_registers(function, &allocas, dom);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::function::{BasicBlock, Linkage};
    use crate::ir::inst::{Inst, TerminatorKind};
    use crate::ir::types::Ty;
    use crate::ir::value::ValueId;

    fn trivial_function() -> Function {
        let mut f = Function::declaration("f", vec![Ty::I32], Ty::I32, Linkage::Internal);
        let entry = f.push_block(BasicBlock::new("entry", TerminatorKind::Unreachable));
        f.entry = entry;
        f.push_inst(
            entry,
            Inst::new(
                crate::ir::inst::InstKind::DebugAnnotation,
                Ty::Void,
            ),
        );
        f.block_mut(entry).term = crate::ir::inst::Terminator::new(TerminatorKind::Ret(Some(
            ValueId::Param(0),
        )));
        f
    }

    #[test]
    fn tag_and_is_tagged_round_trip() {
        let mut f = trivial_function();
        assert!(ObfMetadata::is_tagged(&f, ObfKind::BogusCf).is_none());
        ObfMetadata::tag(&mut f, ObfKind::BogusCf, None);
        assert_eq!(
            ObfMetadata::is_tagged(&f, ObfKind::BogusCf),
            Some("true".to_string())
        );
    }

    #[test]
    fn copy_tag_carries_extra_payload() {
        let mut f = trivial_function();
        ObfMetadata::tag(&mut f, ObfKind::Copy, Some("boguscf"));
        assert_eq!(
            ObfMetadata::is_tagged(&f, ObfKind::Copy),
            Some("boguscf".to_string())
        );
    }

    #[test]
    fn remove_tag_reports_presence() {
        let mut f = trivial_function();
        ObfMetadata::tag(&mut f, ObfKind::Flatten, None);
        let entry = f.entry;
        let first = f.block(entry).insts[0];
        assert!(ObfMetadata::remove_tag(&mut f, first, "obf_flatten"));
        assert!(!ObfMetadata::remove_tag(&mut f, first, "obf_flatten"));
    }
}
