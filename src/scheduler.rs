//! `Scheduler`: assembles the five obfuscation passes plus `Cleanup` into a
//! compiler-driver pipeline (§4.7).

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::ir::dom::DominatorTree;
use crate::ir::module::Module;
use crate::passes::metadata::ObfMetadata;
use crate::passes::{BogusCf, Cleanup, Flatten, OpaquePredicatePass, ReplaceInstruction};
use crate::passes::Copy as CopyPass;

/// One stage in a scheduled pipeline. Variants name passes, not
/// implementations, so `Scheduler::from_stages` can reorder or subset them
/// (§4.7's "explicit enumeration" mode).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Copy,
    BogusCf,
    OpaquePredicate,
    ReplaceInstruction,
    Flatten,
    Cleanup,
}

/// The default full pipeline from §2, after the register-to-memory demotion
/// every pass already performs internally on its own candidates.
const DEFAULT_PIPELINE: [Stage; 6] = [
    Stage::Copy,
    Stage::BogusCf,
    Stage::OpaquePredicate,
    Stage::ReplaceInstruction,
    Stage::Flatten,
    Stage::Cleanup,
];

/// The "trivial" preset: `Copy -> Cleanup`, since `Inline`/`IdentifierRenamer`
/// are out-of-scope no-ops here (§4.7).
const TRIVIAL_PIPELINE: [Stage; 2] = [Stage::Copy, Stage::Cleanup];

pub struct Scheduler {
    config: PipelineConfig,
    stages: Vec<Stage>,
}

impl Scheduler {
    /// Builds a scheduler from `config.scheduler`'s mode flags: an empty
    /// pipeline if `no_obf_schedule`, the trivial preset if
    /// `trivial_obfuscation`, otherwise the default full pipeline.
    pub fn build(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let stages = if config.scheduler.no_obf_schedule {
            Vec::new()
        } else if config.scheduler.trivial_obfuscation {
            TRIVIAL_PIPELINE.to_vec()
        } else {
            DEFAULT_PIPELINE.to_vec()
        };
        Ok(Self { config, stages })
    }

    /// Builds a scheduler running exactly `stages`, in the given order,
    /// ignoring the scheduler mode flags (§4.7's "explicit enumeration").
    pub fn from_stages(config: PipelineConfig, stages: Vec<Stage>) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, stages })
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Runs every scheduled stage over `module` in order, inserting a
    /// register-promotion safety net between non-trivial stages (each pass
    /// already promotes the allocas it introduces; this catches anything
    /// left behind by a reordered or partial pipeline). CFG-simplify is not
    /// implemented by this crate (see `DESIGN.md`); its glue slot is a no-op.
    pub fn run(&self, module: &mut Module) -> Result<()> {
        for &stage in &self.stages {
            self.run_stage(stage, module)?;
            if stage != Stage::Cleanup {
                promote_stray_allocas(module);
            }
        }
        Ok(())
    }

    fn run_stage(&self, stage: Stage, module: &mut Module) -> Result<()> {
        match stage {
            Stage::Copy => {
                CopyPass::new(self.config.copy.clone())?.run(module)?;
            }
            Stage::BogusCf => {
                BogusCf::new(self.config.bcf.clone())?.run(module)?;
            }
            Stage::OpaquePredicate => {
                OpaquePredicatePass::new(self.config.opaque.clone())?.run(module)?;
            }
            Stage::ReplaceInstruction => {
                ReplaceInstruction::new(self.config.replace_instruction.clone())?.run(module)?;
            }
            Stage::Flatten => {
                Flatten::new(self.config.flatten.clone())?.run(module)?;
            }
            Stage::Cleanup => {
                Cleanup::run(module);
            }
        }
        Ok(())
    }
}

fn promote_stray_allocas(module: &mut Module) {
    for fid in module.function_ids() {
        let function = module.function_mut(fid);
        if function.is_declaration() {
            continue;
        }
        let dom = DominatorTree::compute(function);
        ObfMetadata::promote_allocas(function, &dom);
    }
}
