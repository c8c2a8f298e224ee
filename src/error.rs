//! Error types for puzzle loading, validation and state manipulation.

use thiserror::Error;

/// Main error type for puzzle operations
#[derive(Debug, Error)]
pub enum PuzzleError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Capacity must be at least one unit
    #[error("invalid capacity {0}: must be positive")]
    InvalidCapacity(usize),

    /// A container was declared with more units than the capacity allows
    #[error("container {container} holds {len} units but capacity is {capacity}")]
    Overfull {
        container: usize,
        len: usize,
        capacity: usize,
    },

    /// More distinct colors than a `Color` id can address
    #[error("too many distinct colors (limit {0})")]
    TooManyColors(usize),

    /// A move referenced a container index that does not exist
    #[error("container {} out of range (puzzle has {len} containers)", .index + 1)]
    IndexOutOfRange { index: usize, len: usize },

    /// A 1-based container number outside `1..=len`
    #[error("container {number} out of range (puzzle has {len} containers)")]
    InvalidContainerNumber { number: usize, len: usize },

    /// A replayed move was not a legal pour at the point it was applied.
    /// `from` and `to` are indices; the message shows container numbers.
    #[error("move {step}: pour from {} into {} is not legal", .from + 1, .to + 1)]
    IllegalPour { step: usize, from: usize, to: usize },

    /// Undo was requested with no recorded pour
    #[error("undo called with empty history")]
    HistoryUnderflow,
}

/// Result type alias for puzzle operations
pub type Result<T> = std::result::Result<T, PuzzleError>;
