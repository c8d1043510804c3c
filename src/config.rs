//! Per-pass configuration surface (§6).
//!
//! Every pass reads its tunables from one of these `serde`-(de)serializable
//! structs rather than from a CLI, so a host binary can load a pipeline
//! configuration from JSON/YAML/TOML without this crate caring which.
//! Field names are normative (they appear verbatim in `SPEC_FULL.md` §6)
//! for test reproducibility against the table there.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BcfConfig {
    pub bcf_func: Vec<String>,
    pub bcf_probability: f64,
    pub bcf_seed: String,
    pub bcf_global: u32,
}

impl Default for BcfConfig {
    fn default() -> Self {
        Self {
            bcf_func: Vec::new(),
            bcf_probability: 0.2,
            bcf_seed: String::new(),
            bcf_global: 4,
        }
    }
}

impl BcfConfig {
    pub fn validate(&self) -> Result<()> {
        validate_probability("bcf_probability", self.bcf_probability)?;
        validate_global_count("bcf_global", self.bcf_global)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct FlattenConfig {
    pub flatten_func: Vec<String>,
    pub flatten_seed: String,
}

impl FlattenConfig {
    pub fn validate(&self) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CopyConfig {
    pub copy_func: Vec<String>,
    pub copy_probability: f64,
    pub copy_replace_probability: f64,
    pub copy_seed: String,
    pub copy_ensure_eligibility: bool,
    pub copy_ensure_replacement: bool,
}

impl Default for CopyConfig {
    fn default() -> Self {
        Self {
            copy_func: Vec::new(),
            copy_probability: 0.5,
            copy_replace_probability: 0.5,
            copy_seed: String::new(),
            copy_ensure_eligibility: true,
            copy_ensure_replacement: true,
        }
    }
}

impl CopyConfig {
    pub fn validate(&self) -> Result<()> {
        validate_probability("copy_probability", self.copy_probability)?;
        validate_probability("copy_replace_probability", self.copy_replace_probability)?;
        if self.copy_ensure_replacement && self.copy_replace_probability <= 0.0 {
            return Err(Error::Config(
                "copy_replace_probability must be > 0.0 when copy_ensure_replacement is set, \
                 otherwise the replace-at-least-one retry loop never terminates"
                    .to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpaqueConfig {
    pub opaque_seed: String,
    pub opaque_global: u32,
}

impl Default for OpaqueConfig {
    fn default() -> Self {
        Self {
            opaque_seed: String::new(),
            opaque_global: 4,
        }
    }
}

impl OpaqueConfig {
    pub fn validate(&self) -> Result<()> {
        validate_global_count("opaque_global", self.opaque_global)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ReplaceInstructionConfig {
    pub replace_seed: String,
}

impl ReplaceInstructionConfig {
    pub fn validate(&self) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SchedulerConfig {
    pub no_obf_schedule: bool,
    pub trivial_obfuscation: bool,
}

/// The top-level configuration handed to [`crate::Scheduler::build`],
/// bundling every pass's controls plus the scheduler's own mode flags.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PipelineConfig {
    pub bcf: BcfConfig,
    pub flatten: FlattenConfig,
    pub copy: CopyConfig,
    pub opaque: OpaqueConfig,
    pub replace_instruction: ReplaceInstructionConfig,
    pub scheduler: SchedulerConfig,
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        self.bcf.validate()?;
        self.flatten.validate()?;
        self.copy.validate()?;
        self.opaque.validate()?;
        self.replace_instruction.validate()?;
        Ok(())
    }
}

fn validate_probability(field: &str, value: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(Error::Config(format!(
            "{field} must be within [0.0, 1.0], got {value}"
        )));
    }
    Ok(())
}

fn validate_global_count(field: &str, value: u32) -> Result<()> {
    if value < 2 {
        return Err(Error::Config(format!(
            "{field} must be >= 2 (an opaque predicate needs two distinct globals), got {value}"
        )));
    }
    Ok(())
}
