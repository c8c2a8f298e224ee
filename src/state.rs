//! Puzzle state: the containers plus a LIFO log of applied pours.
//!
//! Every forward pour is recorded in the history so it can be reverted
//! exactly by [`PuzzleState::undo`]. The solver relies on this to explore
//! the pour graph in place without cloning states.

use std::collections::BTreeMap;
use std::fmt;

use tracing::trace;

use crate::container::{Container, Units};
use crate::error::{PuzzleError, Result};
use crate::puzzle::{Color, Palette};

/// A recorded pour: `units` moved from `source` to `dest`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Move {
    pub source: usize,
    pub dest: usize,
    pub units: usize,
}

/// A pour as reported to the user, with the colors involved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PourRecord {
    pub source: usize,
    pub dest: usize,
    /// Color taken from the source
    pub poured: Color,
    /// Top color of the destination before the pour, `None` if it was empty
    pub onto: Option<Color>,
    pub units: usize,
}

impl PourRecord {
    /// Describe the pour with color names from `palette`, 1-based indices.
    pub fn describe(&self, palette: &Palette) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = self.write_with(&mut out, |c| palette.label(c));
        out
    }

    fn write_with<W: fmt::Write>(
        &self,
        out: &mut W,
        label: impl Fn(Color) -> String,
    ) -> fmt::Result {
        write!(
            out,
            "pour {} into {}, from {} into {}",
            self.source + 1,
            self.dest + 1,
            label(self.poured),
            self.onto.map(&label).unwrap_or_else(|| "empty".to_string())
        )
    }
}

impl fmt::Display for PourRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_with(f, |c| c.to_string())
    }
}

/// Hashable snapshot of all container contents
pub type StateKey = Vec<Units>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PuzzleState {
    containers: Vec<Container>,
    history: Vec<Move>,
}

impl PuzzleState {
    pub fn new(containers: Vec<Container>) -> Self {
        Self {
            containers,
            history: Vec::new(),
        }
    }

    /// Number of containers
    pub fn len(&self) -> usize {
        self.containers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }

    pub fn containers(&self) -> &[Container] {
        &self.containers
    }

    /// Pours still applied, oldest first
    pub fn history(&self) -> &[Move] {
        &self.history
    }

    /// Every container holds at most one color
    pub fn is_solved(&self) -> bool {
        self.containers.iter().all(Container::is_homogeneous)
    }

    /// Check whether the top run of `src` may be poured into `dst`.
    ///
    /// Pouring a homogeneous container into an empty one is never legal: it
    /// changes nothing but the container index.
    pub fn is_legal_pour(&self, src: usize, dst: usize) -> bool {
        if src == dst {
            return false;
        }
        let (Some(orig), Some(dest)) = (self.containers.get(src), self.containers.get(dst)) else {
            return false;
        };
        if orig.is_homogeneous() && dest.is_empty() {
            return false;
        }

        let (orig_color, orig_run) = orig.surface();
        let (dest_color, _) = dest.surface();
        (dest_color.is_none() || dest_color == orig_color) && orig_run <= dest.free_space()
    }

    /// Pour the top run of `src` into `dst` and record it in the history.
    ///
    /// The caller must have checked [`is_legal_pour`](Self::is_legal_pour).
    /// The returned record carries the top colors of `src` and `dst` before
    /// the pour.
    ///
    /// Panics if `src` is empty.
    pub fn pour(&mut self, src: usize, dst: usize) -> PourRecord {
        let (Some(poured), units) = self.containers[src].surface() else {
            panic!("pour from empty container {}", src + 1);
        };
        let onto = self.containers[dst].top();

        self.transfer(src, dst, units);
        self.history.push(Move {
            source: src,
            dest: dst,
            units,
        });
        trace!(from = src, to = dst, units, depth = self.history.len(), "pour");
        PourRecord {
            source: src,
            dest: dst,
            poured,
            onto,
            units,
        }
    }

    /// Revert the most recent pour.
    pub fn undo(&mut self) -> Result<Move> {
        let last = self.history.pop().ok_or(PuzzleError::HistoryUnderflow)?;
        self.transfer(last.dest, last.source, last.units);
        trace!(from = last.source, to = last.dest, units = last.units, "undo");
        Ok(last)
    }

    // Moves exactly `units` units without touching the history.
    fn transfer(&mut self, src: usize, dst: usize, units: usize) {
        for _ in 0..units {
            if let Some(color) = self.containers[src].pop() {
                self.containers[dst].push(color);
            }
        }
    }

    /// Apply a sequence of `(source, dest)` pours, checking each against the
    /// state it is applied to.
    pub fn apply_moves(&mut self, moves: &[(usize, usize)]) -> Result<Vec<PourRecord>> {
        let len = self.len();
        let mut records = Vec::with_capacity(moves.len());
        for (step, &(src, dst)) in moves.iter().enumerate() {
            for index in [src, dst] {
                if index >= len {
                    return Err(PuzzleError::IndexOutOfRange { index, len });
                }
            }
            if !self.is_legal_pour(src, dst) {
                return Err(PuzzleError::IllegalPour {
                    step: step + 1,
                    from: src,
                    to: dst,
                });
            }
            records.push(self.pour(src, dst));
        }
        Ok(records)
    }

    /// Convert 1-based container numbers, as shown to users, into indices.
    pub fn indices_from_numbers(
        &self,
        numbers: &[(usize, usize)],
    ) -> Result<Vec<(usize, usize)>> {
        let len = self.len();
        let index = |number: usize| {
            if (1..=len).contains(&number) {
                Ok(number - 1)
            } else {
                Err(PuzzleError::InvalidContainerNumber { number, len })
            }
        };
        numbers
            .iter()
            .map(|&(from, to)| -> Result<(usize, usize)> { Ok((index(from)?, index(to)?)) })
            .collect()
    }

    /// Units of each color across all containers
    pub fn color_counts(&self) -> BTreeMap<Color, usize> {
        let mut counts = BTreeMap::new();
        for container in &self.containers {
            for &color in container.units() {
                *counts.entry(color).or_insert(0) += 1;
            }
        }
        counts
    }

    pub fn config_key(&self) -> StateKey {
        self.containers
            .iter()
            .map(|c| c.units().iter().copied().collect())
            .collect()
    }

    /// Display every container with color names from `palette`.
    pub fn display<'a>(&'a self, palette: &'a Palette) -> StateDisplay<'a> {
        StateDisplay {
            state: self,
            palette,
        }
    }
}

impl fmt::Display for PuzzleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, container) in self.containers.iter().enumerate() {
            writeln!(f, "{} {}", i + 1, container)?;
        }
        Ok(())
    }
}

pub struct StateDisplay<'a> {
    state: &'a PuzzleState,
    palette: &'a Palette,
}

impl fmt::Display for StateDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, container) in self.state.containers.iter().enumerate() {
            writeln!(f, "{} {}", i + 1, container.display(self.palette))?;
        }
        Ok(())
    }
}
