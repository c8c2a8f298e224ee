//! A single vial: a bounded stack of color units.

use std::fmt;

use smallvec::SmallVec;

use crate::puzzle::{Color, Palette};

/// Inline storage for container contents, bottom unit first.
pub type Units = SmallVec<[Color; 8]>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Container {
    units: Units,
    capacity: usize,
}

impl Container {
    pub fn new(capacity: usize) -> Self {
        Self {
            units: Units::new(),
            capacity,
        }
    }

    /// Build a container from colors listed bottom to top.
    ///
    /// Panics if there are more colors than `capacity`.
    pub fn from_colors(capacity: usize, colors: impl IntoIterator<Item = Color>) -> Self {
        let mut container = Self::new(capacity);
        for color in colors {
            container.push(color);
        }
        container
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Contents from bottom to top
    pub fn units(&self) -> &[Color] {
        &self.units
    }

    pub fn top(&self) -> Option<Color> {
        self.units.last().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.units.len() == self.capacity
    }

    pub fn free_space(&self) -> usize {
        self.capacity - self.units.len()
    }

    /// At most one distinct color. Empty containers are homogeneous.
    pub fn is_homogeneous(&self) -> bool {
        match self.units.first() {
            Some(first) => self.units.iter().all(|c| c == first),
            None => true,
        }
    }

    /// Top color and the length of the same-colored run beneath it.
    pub fn surface(&self) -> (Option<Color>, usize) {
        let Some(top) = self.top() else {
            return (None, 0);
        };
        let run = self.units.iter().rev().take_while(|&&c| c == top).count();
        (Some(top), run)
    }

    /// Add one unit on top.
    ///
    /// Panics when the container is already full.
    pub fn push(&mut self, color: Color) {
        assert!(
            !self.is_full(),
            "push onto full container (capacity {})",
            self.capacity
        );
        self.units.push(color);
    }

    /// Remove the top unit. Does nothing on an empty container.
    pub fn pop(&mut self) -> Option<Color> {
        self.units.pop()
    }

    /// Display the contents using color names from `palette`.
    pub fn display<'a>(&'a self, palette: &'a Palette) -> ContainerDisplay<'a> {
        ContainerDisplay {
            container: self,
            palette,
        }
    }
}

impl fmt::Display for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, color) in self.units.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", color)?;
        }
        write!(f, "]")
    }
}

pub struct ContainerDisplay<'a> {
    container: &'a Container,
    palette: &'a Palette,
}

impl fmt::Display for ContainerDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, &color) in self.container.units.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", self.palette.label(color))?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Color = Color::new(0);
    const BLUE: Color = Color::new(1);

    #[test]
    fn test_empty_container_queries() {
        let c = Container::new(4);
        assert!(c.is_empty());
        assert!(!c.is_full());
        assert!(c.is_homogeneous());
        assert_eq!(c.free_space(), 4);
        assert_eq!(c.surface(), (None, 0));
    }

    #[test]
    fn test_surface_counts_top_run() {
        let c = Container::from_colors(4, [RED, BLUE, BLUE]);
        assert_eq!(c.surface(), (Some(BLUE), 2));
        assert!(!c.is_homogeneous());
        assert_eq!(c.free_space(), 1);

        let full = Container::from_colors(3, [BLUE, BLUE, BLUE]);
        assert!(full.is_full());
        assert!(full.is_homogeneous());
        assert_eq!(full.surface(), (Some(BLUE), 3));
    }

    #[test]
    fn test_pop_on_empty_is_noop() {
        let mut c = Container::new(2);
        assert_eq!(c.pop(), None);
        assert_eq!(c, Container::new(2));
    }

    #[test]
    fn test_push_pop() {
        let mut c = Container::new(2);
        c.push(RED);
        c.push(BLUE);
        assert_eq!(c.units(), &[RED, BLUE]);
        assert_eq!(c.pop(), Some(BLUE));
        assert_eq!(c.top(), Some(RED));
    }

    #[test]
    #[should_panic(expected = "push onto full container")]
    fn test_push_onto_full_panics() {
        let mut c = Container::from_colors(1, [RED]);
        c.push(RED);
    }

    #[test]
    fn test_display() {
        let c = Container::from_colors(3, [RED, BLUE]);
        assert_eq!(c.to_string(), "[A, B]");

        let mut palette = Palette::new();
        palette.intern("red").unwrap();
        palette.intern("blue").unwrap();
        assert_eq!(c.display(&palette).to_string(), "[red, blue]");
        assert_eq!(Container::new(3).display(&palette).to_string(), "[]");
    }
}
