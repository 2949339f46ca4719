//! Error types for the score tree
//!
//! One error enum covers every fatal condition. Structural and duration
//! errors are raised at the point of violation; advisory wellformedness
//! findings live in [`crate::diagnostics`] and are never raised.

use thiserror::Error;

use crate::score::{ComponentId, SpannerId};

/// Top-level error type for tree, spanner, mutation and formatting operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScoreError {
    /// Invalid parent/child operation (non-container target, already
    /// parented child, cycle, out-of-range index)
    #[error("structure error: {0}")]
    Structure(String),

    /// Component id does not refer to a live component
    #[error("no component {0}")]
    MissingComponent(ComponentId),

    /// Spanner id does not refer to a spanner
    #[error("no spanner {0}")]
    MissingSpanner(SpannerId),

    /// Leaves are not one uninterrupted run in a single logical voice
    #[error("contiguity error: {0}")]
    Contiguity(String),

    /// Spanner already holds leaves (or is a tombstone)
    #[error("spanner {0} is already attached")]
    AlreadyAttached(SpannerId),

    /// A spanner was given (or found holding) a component that is not a leaf
    #[error("component {0} is not a leaf")]
    NotALeaf(ComponentId),

    /// Spanner- or indicator-specific attachment test failed
    #[error("can not attach: {0}")]
    InvalidAttachment(String),

    /// A second persistent indicator of the same kind on the same component
    #[error("component {component} already carries a {kind} indicator")]
    PersistentIndicator {
        component: ComponentId,
        kind: &'static str,
    },

    /// Container contents shorter than the declared duration
    #[error("underfull container {component}: contents {actual}, declared {expected}")]
    UnderfullContainer {
        component: ComponentId,
        actual: String,
        expected: String,
    },

    /// Container contents longer than the declared duration
    #[error("overfull container {component}: contents {actual}, declared {expected}")]
    OverfullContainer {
        component: ComponentId,
        actual: String,
        expected: String,
    },

    /// Duration can not be written as a (tied run of) note value(s)
    #[error("duration {0} is not assignable")]
    Assignability(String),

    /// Operands of a fuse/fracture are of incompatible type or configuration
    #[error("incompatible operands: {0}")]
    IncompatibleOperand(String),

    /// Tuplets in a fuse carry different multipliers
    #[error("tuplets must carry the same multiplier: {first} vs {other}")]
    IncompatibleTuplets { first: String, other: String },

    /// Note-string input could not be parsed
    #[error("parse error at '{token}': {reason}")]
    Parse { token: String, reason: String },

    /// Configuration could not be loaded
    #[error("configuration error: {0}")]
    Config(String),

    /// Template rendering failed
    #[error("template error: {0}")]
    Template(String),

    /// Filesystem error while persisting
    #[error("io error: {0}")]
    Io(String),

    /// External renderer failed to run or timed out
    #[error("render error: {0}")]
    Render(String),
}

impl From<std::io::Error> for ScoreError {
    fn from(err: std::io::Error) -> Self {
        ScoreError::Io(err.to_string())
    }
}

impl From<mustache::Error> for ScoreError {
    fn from(err: mustache::Error) -> Self {
        ScoreError::Template(err.to_string())
    }
}

impl ScoreError {
    /// True for both operand-mismatch variants
    pub fn is_incompatible_operand(&self) -> bool {
        matches!(
            self,
            ScoreError::IncompatibleOperand(_) | ScoreError::IncompatibleTuplets { .. }
        )
    }

    /// True for fixed-duration mismatches found while formatting
    pub fn is_duration_mismatch(&self) -> bool {
        matches!(
            self,
            ScoreError::UnderfullContainer { .. } | ScoreError::OverfullContainer { .. }
        )
    }
}

/// Result alias used throughout the crate
pub type ScoreResult<T> = Result<T, ScoreError>;
