//! The five obfuscation passes plus `Cleanup`, scheduled by [`crate::Scheduler`].

pub mod bogus_cf;
pub mod cleanup;
pub mod copy;
pub mod flatten;
pub mod metadata;
pub mod opaque_predicate;
pub mod replace_instruction;

pub use bogus_cf::{BcfStats, BogusCf};
pub use cleanup::Cleanup;
pub use copy::Copy;
pub use flatten::Flatten;
pub use metadata::ObfMetadata;
pub use opaque_predicate::{OpaquePredicateLib, OpaquePredicatePass, PredicateKind};
pub use replace_instruction::ReplaceInstruction;

/// The obfuscation kind a function is tagged with, driving which metadata
/// key `ObfMetadata::tag` writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObfKind {
    BogusCf,
    Flatten,
    Copy,
    /// Out of scope (§1): `Inline` is recognised as a tag kind (the
    /// reference implementation's inliner writes it) but this crate never
    /// produces it itself.
    Inline,
}

impl ObfKind {
    pub fn metadata_key(self) -> &'static str {
        match self {
            ObfKind::BogusCf => "obf_boguscf",
            ObfKind::Flatten => "obf_flatten",
            ObfKind::Copy => "obf_copy",
            ObfKind::Inline => "obf_inline",
        }
    }
}

/// Whether a pass's run over a given function actually changed anything.
/// Unsupported-IR conditions (§7) surface as `Unmodified` rather than an
/// `Err`, so the scheduler and sibling functions can keep going.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    Modified,
    Unmodified,
}

impl PassOutcome {
    pub fn modified(self) -> bool {
        matches!(self, PassOutcome::Modified)
    }

    pub fn merge(self, other: PassOutcome) -> PassOutcome {
        if self.modified() || other.modified() {
            PassOutcome::Modified
        } else {
            PassOutcome::Unmodified
        }
    }
}
