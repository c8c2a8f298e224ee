//! Water sort puzzle solver.
//!
//! This crate models a set of fixed-capacity containers holding stacked
//! color units and searches, depth first and exhaustively, for a sequence
//! of pours that leaves every container holding a single color.

pub mod container;
pub mod error;
pub mod puzzle;
pub mod solver;
pub mod state;

// Re-export main types
pub use container::Container;
pub use error::{PuzzleError, Result};
pub use puzzle::{Color, Palette, PuzzleConfig, StackOrder};
pub use solver::{
    search, solve, verify_solution, SearchOutcome, SolverConfig, SolverResult, StopReason,
};
pub use state::{Move, PourRecord, PuzzleState};
