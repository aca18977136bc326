//! Expression positions
//!
//! Half-open `[start, end)` byte spans over template text, with the
//! containment and intersection predicates the compilation-pass validator
//! relies on.

use std::fmt;

use thiserror::Error;

/// Invalid span construction
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PositionError {
    #[error("expression span at {0} has zero length")]
    ZeroLength(usize),

    #[error("expression span start {start} is after end {end}")]
    Inverted { start: usize, end: usize },
}

/// Half-open byte span `[start, end)` of an expression within template text
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExpressionPosition {
    start: usize,
    end: usize,
}

impl ExpressionPosition {
    pub fn new(start: usize, end: usize) -> Result<Self, PositionError> {
        if start == end {
            return Err(PositionError::ZeroLength(start));
        }
        if start > end {
            return Err(PositionError::Inverted { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn is_same(&self, other: &ExpressionPosition) -> bool {
        self == other
    }

    /// Strict proper containment; never true for equal spans.
    pub fn is_inside_of(&self, other: &ExpressionPosition) -> bool {
        !self.is_same(other) && self.start >= other.start && self.end <= other.end
    }

    /// True for any overlap: partial, containment, or exact equality.
    pub fn is_intersecting(&self, other: &ExpressionPosition) -> bool {
        self.start < other.end && other.start < self.end
    }
}

impl fmt::Debug for ExpressionPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

impl fmt::Display for ExpressionPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}
