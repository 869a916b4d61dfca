//! Error types for selection primitives.
//!
//! These errors describe generator-authoring mistakes rather than runtime
//! conditions. Callers propagate them up to the session, which aborts.

use thiserror::Error;

/// Errors raised when a choice cannot be made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChoiceError {
    /// Selection was attempted over an empty sequence.
    #[error("cannot choose from an empty set")]
    EmptySet,

    /// A weighted option carried a weight of zero.
    #[error("weighted option {index} has zero weight")]
    ZeroWeight { index: usize },

    /// The weights of a set do not fit in a `u32`.
    #[error("total weight overflows u32")]
    WeightOverflow,
}

/// Result type alias for selection operations.
pub type Result<T> = std::result::Result<T, ChoiceError>;
