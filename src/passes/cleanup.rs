//! `Cleanup`: strips every obfuscation-tagging metadata key the pipeline
//! wrote, leaving downstream compiler stages oblivious to the obfuscation
//! history (§2, §7).

use crate::ir::module::Module;
use crate::ir::Function;

/// Every metadata key any pass in this crate ever writes. Kept as one list
/// so `Cleanup` and its test stay in sync with new passes by construction.
const ALL_KEYS: &[&str] = &[
    "obf_boguscf",
    "obf_flatten",
    "obf_copy",
    "obf_inline",
    "opaqueStub",
    "FlattenSwitch",
    "opaque_stub",
    "opaque_unreachable",
    "opaque_mark",
];

pub struct Cleanup;

impl Cleanup {
    pub fn run(module: &mut Module) {
        for fid in module.function_ids() {
            Self::run_function(module.function_mut(fid));
        }
    }

    fn run_function(function: &mut Function) {
        for inst in function.insts.iter_mut() {
            for key in ALL_KEYS {
                inst.metadata.remove(*key);
            }
        }
        for b in function.block_ids() {
            for key in ALL_KEYS {
                function.block_mut(b).term.metadata.remove(*key);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::function::{BasicBlock, Linkage};
    use crate::ir::inst::{Inst, InstKind, TerminatorKind};
    use crate::ir::types::Ty;
    use crate::ir::value::ValueId;
    use crate::passes::metadata::ObfMetadata;
    use crate::passes::ObfKind;

    #[test]
    fn strips_every_obf_tag() {
        let mut module = Module::new();
        let mut f = Function::declaration("f", vec![], Ty::I32, Linkage::Internal);
        let entry = f.push_block(BasicBlock::new("entry", TerminatorKind::Unreachable));
        f.entry = entry;
        f.push_inst(entry, Inst::new(InstKind::DebugAnnotation, Ty::Void));
        f.block_mut(entry).term = crate::ir::inst::Terminator::new(TerminatorKind::Ret(Some(
            ValueId::Const(crate::ir::value::Const::Int(Ty::I32, 0)),
        )));
        ObfMetadata::tag(&mut f, ObfKind::BogusCf, None);
        module.add_function(f);

        Cleanup::run(&mut module);

        let f = module.function(module.function_id_by_name("f").unwrap());
        assert!(ObfMetadata::is_tagged(f, ObfKind::BogusCf).is_none());
    }
}
