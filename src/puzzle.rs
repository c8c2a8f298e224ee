//! Puzzle input types and color interning.
//!
//! A puzzle is read from JSON of the form
//!
//! ```json
//! { "capacity": 4, "containers": [["red", "blue"], ["blue"], []] }
//! ```
//!
//! Color names are interned into a [`Palette`] so the search works on small
//! copyable [`Color`] ids instead of strings.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::container::Container;
use crate::error::{PuzzleError, Result};
use crate::state::PuzzleState;

/// Opaque color token. Only identity matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Color(u16);

impl Color {
    pub const fn new(id: u16) -> Self {
        Self(id)
    }

    pub fn id(self) -> u16 {
        self.0
    }
}

/// Excel-style letters: A, B, ..., Z, AA, AB, ...
impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut id = self.0 as usize + 1;
        let mut letters = Vec::new();
        while id > 0 {
            letters.push((b'A' + ((id - 1) % 26) as u8) as char);
            id = (id - 1) / 26;
        }
        letters.iter().rev().try_for_each(|c| write!(f, "{}", c))
    }
}

/// Maps color names from a puzzle file to [`Color`] ids and back.
#[derive(Debug, Clone, Default)]
pub struct Palette {
    names: Vec<String>,
    ids: HashMap<String, Color>,
}

impl Palette {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the id for `name`, allocating a new one on first sight.
    pub fn intern(&mut self, name: &str) -> Result<Color> {
        if let Some(&color) = self.ids.get(name) {
            return Ok(color);
        }
        let id = u16::try_from(self.names.len())
            .map_err(|_| PuzzleError::TooManyColors(u16::MAX as usize))?;
        let color = Color::new(id);
        self.names.push(name.to_string());
        self.ids.insert(name.to_string(), color);
        Ok(color)
    }

    pub fn get(&self, name: &str) -> Option<Color> {
        self.ids.get(name).copied()
    }

    pub fn name(&self, color: Color) -> Option<&str> {
        self.names.get(color.id() as usize).map(String::as_str)
    }

    /// Name for display, falling back to the letter form for unknown ids.
    pub fn label(&self, color: Color) -> String {
        self.name(color)
            .map(str::to_string)
            .unwrap_or_else(|| color.to_string())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Which end of each container list in the input is the top.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StackOrder {
    /// First element is the bottom unit, last element is poured first
    #[default]
    BottomToTop,
    /// First element is the top unit
    TopToBottom,
}

/// The complete puzzle description as read from a file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PuzzleConfig {
    #[serde(default)]
    pub name: Option<String>,
    /// Units every container can hold
    pub capacity: usize,
    #[serde(default)]
    pub order: StackOrder,
    pub containers: Vec<Vec<String>>,
}

impl PuzzleConfig {
    pub fn new(capacity: usize, containers: Vec<Vec<String>>) -> Self {
        Self {
            name: None,
            capacity,
            order: StackOrder::default(),
            containers,
        }
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Check capacity and container sizes
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(PuzzleError::InvalidCapacity(self.capacity));
        }
        for (index, colors) in self.containers.iter().enumerate() {
            if colors.len() > self.capacity {
                return Err(PuzzleError::Overfull {
                    container: index,
                    len: colors.len(),
                    capacity: self.capacity,
                });
            }
        }
        Ok(())
    }

    /// Validate and build the initial state along with the palette used to
    /// intern its color names.
    pub fn build(&self) -> Result<(PuzzleState, Palette)> {
        self.validate()?;

        let mut palette = Palette::new();
        let mut containers = Vec::with_capacity(self.containers.len());
        for names in &self.containers {
            let mut colors = names
                .iter()
                .map(|name| palette.intern(name))
                .collect::<Result<Vec<Color>>>()?;
            if self.order == StackOrder::TopToBottom {
                colors.reverse();
            }
            containers.push(Container::from_colors(self.capacity, colors));
        }

        Ok((PuzzleState::new(containers), palette))
    }
}
