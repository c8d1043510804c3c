//! Crate-wide error taxonomy.
//!
//! Three kinds of failure are distinguished: configuration errors are fatal
//! and reported before any IR is touched;
//! unsupported-IR conditions are not represented here at all (a pass that
//! hits one returns [`crate::passes::PassOutcome::Unmodified`] instead of an
//! `Err`, so other functions/passes can keep going); and invariant
//! violations indicate a bug in pass ordering or IR corruption.

use std::{error, fmt};

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Crate-wide error type.
#[derive(Debug, Clone)]
pub enum Error {
    /// A configuration value was out of range (probability outside
    /// `[0.0, 1.0]`, fewer than two opaque-predicate globals requested, ...).
    Config(String),
    /// An internal invariant was violated: a stub branch did not have the
    /// expected shape at materialisation time, a predicate kind or opcode
    /// was unrecognised, or a pass was re-entered on IR it should have
    /// skipped. These are bugs, not recoverable input conditions.
    Invariant(String),
    /// [`crate::passes::opaque_predicate::PredicateKind::Indeterminate`] was
    /// requested somewhere that must materialise a concrete predicate.
    /// Recognised as a valid enum discriminant but never implemented,
    /// matching the reference implementation; callers must handle this
    /// explicitly rather than have it silently treated as always-true.
    UnsupportedPredicateKind,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {msg}"),
            Self::Invariant(msg) => write!(f, "internal invariant violated: {msg}"),
            Self::UnsupportedPredicateKind => {
                write!(f, "indeterminate opaque predicates are not implemented")
            }
        }
    }
}

impl error::Error for Error {}
