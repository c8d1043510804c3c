//! `Copy`: produces functionally identical clones of functions, redirecting
//! a subset of call sites to them (§4.5).

use log::debug;

use crate::config::CopyConfig;
use crate::error::Result;
use crate::ir::builder::clone_function_into;
use crate::ir::function::InstId;
use crate::ir::inst::InstKind;
use crate::ir::module::{FunctionId, Module};
use crate::ir::Function;
use crate::passes::metadata::ObfMetadata;
use crate::passes::{BogusCf, Flatten, ObfKind};
use crate::rng::Rng;

pub struct Copy {
    config: CopyConfig,
}

/// Which obfuscation a clone is mandated to receive, recorded in its
/// `obf_copy` tag payload so `BogusCf`/`Flatten` know to pick it up (and
/// skip the original).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MandatedKind {
    BogusCf,
    Flatten,
}

impl MandatedKind {
    fn as_str(self) -> &'static str {
        match self {
            MandatedKind::BogusCf => "boguscf",
            MandatedKind::Flatten => "flatten",
        }
    }
}

impl Copy {
    pub fn new(config: CopyConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn run(&self, module: &mut Module) -> Result<usize> {
        let mut rng = Rng::from_config_seed(&self.config.copy_seed);
        let candidates: Vec<FunctionId> = self.clone_list(module, &mut rng);
        let mut cloned = 0;

        for fid in candidates {
            if self.clone_one(module, fid, &mut rng)? {
                cloned += 1;
            }
        }
        Ok(cloned)
    }

    fn clone_list(&self, module: &Module, rng: &mut Rng) -> Vec<FunctionId> {
        module
            .function_ids()
            .filter(|&fid| {
                let f = module.function(fid);
                if f.is_declaration() {
                    return false;
                }
                if !self.config.copy_func.is_empty() {
                    self.config.copy_func.contains(&f.name)
                } else {
                    rng.bernoulli(self.config.copy_probability)
                }
            })
            .collect()
    }

    fn clone_one(&self, module: &mut Module, fid: FunctionId, rng: &mut Rng) -> Result<bool> {
        let name = module.function(fid).name.clone();

        let mandated = if self.config.copy_ensure_eligibility {
            match eligible_kinds(module.function(fid)) {
                kinds if kinds.is_empty() => {
                    debug!("copy: skipping {name}, ineligible for BogusCf or Flatten");
                    return Ok(false);
                }
                kinds => kinds[rng.index(kinds.len())],
            }
        } else {
            MandatedKind::BogusCf
        };

        let call_sites = find_call_sites(module, fid);
        if self.config.copy_ensure_replacement && call_sites.len() < 2 {
            debug!("copy: skipping {name}, fewer than two call sites to redirect");
            return Ok(false);
        }

        let clone_name = format!("{name}.obf_copy");
        let src = module.function(fid);
        let mut clone_fn = Function::declaration(
            clone_name.clone(),
            src.params.clone(),
            src.ret_ty,
            src.linkage,
        );
        clone_function_into(&mut clone_fn, src);
        ObfMetadata::tag(&mut clone_fn, ObfKind::Copy, Some(mandated.as_str()));
        let clone_id = module.add_function(clone_fn);
        module.reindex_names();

        let mut replaced_any = false;
        loop {
            for &(caller, call_inst) in &call_sites {
                if rng.bernoulli(self.config.copy_replace_probability) {
                    redirect_call(module.function_mut(caller), call_inst, clone_id);
                    replaced_any = true;
                }
            }
            if !self.config.copy_ensure_replacement || replaced_any {
                break;
            }
            // copy_replace_probability > 0.0 is enforced by CopyConfig::validate
            // whenever copy_ensure_replacement is set, so this retry loop
            // terminates with probability 1.
        }

        debug!("copy: cloned {name} as {clone_name} ({} call sites redirected)", call_sites.len());
        Ok(true)
    }
}

fn eligible_kinds(function: &Function) -> Vec<MandatedKind> {
    let mut kinds = Vec::new();
    if BogusCf::is_eligible(function) {
        kinds.push(MandatedKind::BogusCf);
    }
    if Flatten::is_eligible(function) {
        kinds.push(MandatedKind::Flatten);
    }
    kinds
}

/// Every `call` instruction across the module targeting `callee`, as
/// `(calling function, call instruction)` pairs. `invoke` call sites are
/// not tracked: every function BogusCf or Flatten would accept already
/// excludes `invoke` terminators entirely, and a clone made with
/// `copy_ensure_eligibility = false` is unreachable by either downstream
/// pass anyway, so the only call sites worth redirecting are plain `call`s.
fn find_call_sites(module: &Module, callee: FunctionId) -> Vec<(FunctionId, InstId)> {
    let mut sites = Vec::new();
    for fid in module.function_ids() {
        let f = module.function(fid);
        for b in f.block_ids() {
            for &id in &f.block(b).insts {
                if let InstKind::Call { callee: c, .. } = &f.inst(id).kind {
                    if *c == callee {
                        sites.push((fid, id));
                    }
                }
            }
        }
    }
    sites
}

fn redirect_call(function: &mut Function, call_inst: InstId, new_callee: FunctionId) {
    if let InstKind::Call { callee, .. } = &mut function.inst_mut(call_inst).kind {
        *callee = new_callee;
    }
}
