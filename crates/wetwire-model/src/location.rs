//! Source positions and byte spans

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;
use std::path::{Path, PathBuf};

/// Half-open byte range `[start, end)` into a source text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Span {
    /// First byte
    pub start: usize,
    /// One past the last byte
    pub end: usize,
}

impl Span {
    /// Create span, normalizing reversed bounds
    #[inline]
    #[must_use]
    pub fn new(start: usize, end: usize) -> Self {
        if end < start {
            Self { start: end, end: start }
        } else {
            Self { start, end }
        }
    }

    /// Zero-width span used for insertions
    #[inline]
    #[must_use]
    pub fn point(at: usize) -> Self {
        Self { start: at, end: at }
    }

    /// Length in bytes
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Zero-width?
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Check whether two spans claim any common text.
    ///
    /// Adjacent spans do not overlap. Two insertions at the same offset do,
    /// since their relative order would be ambiguous, and so does an insertion
    /// strictly inside a non-empty span.
    #[must_use]
    pub fn overlaps(&self, other: &Span) -> bool {
        match (self.is_empty(), other.is_empty()) {
            (true, true) => self.start == other.start,
            (true, false) => self.start > other.start && self.start < other.end,
            (false, true) => other.start > self.start && other.start < self.end,
            (false, false) => self.start < other.end && other.start < self.end,
        }
    }

    /// Check whether `other` lies fully inside this span
    #[inline]
    #[must_use]
    pub fn contains(&self, other: &Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// As a `Range` for slicing
    #[inline]
    #[must_use]
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }
}

impl From<Range<usize>> for Span {
    fn from(range: Range<usize>) -> Self {
        Self::new(range.start, range.end)
    }
}

/// Line/column position; line is 1-based, column is a 0-based byte offset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Position {
    /// 1-based line
    pub line: u32,
    /// 0-based column
    pub column: u32,
}

impl Position {
    /// Create position
    #[inline]
    #[must_use]
    pub const fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

/// Position qualified by its defining file
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct SourceLocation {
    /// Defining file
    pub file: PathBuf,
    /// 1-based line
    pub line: u32,
    /// 0-based column
    pub column: u32,
}

impl SourceLocation {
    /// Create location from a file and a position
    #[inline]
    #[must_use]
    pub fn new(file: impl Into<PathBuf>, position: Position) -> Self {
        Self {
            file: file.into(),
            line: position.line,
            column: position.column,
        }
    }

    /// Same file, different position
    #[inline]
    #[must_use]
    pub fn at(&self, position: Position) -> Self {
        Self::new(self.file.clone(), position)
    }

    /// Defining file
    #[inline]
    #[must_use]
    pub fn file(&self) -> &Path {
        &self.file
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file.display(), self.line, self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adjacent_spans_do_not_overlap() {
        let a = Span::new(0, 5);
        let b = Span::new(5, 9);
        assert!(!a.overlaps(&b));
        assert!(!b.overlaps(&a));
    }

    #[test]
    fn intersecting_spans_overlap() {
        assert!(Span::new(0, 6).overlaps(&Span::new(5, 9)));
        assert!(Span::new(2, 3).overlaps(&Span::new(0, 9)));
    }

    #[test]
    fn insertion_points() {
        let insert = Span::point(4);
        assert!(insert.overlaps(&Span::point(4)));
        assert!(insert.overlaps(&Span::new(2, 6)));
        // Insertion at the boundary of a replaced span is unambiguous
        assert!(!insert.overlaps(&Span::new(4, 6)));
        assert!(!insert.overlaps(&Span::new(0, 4)));
    }

    #[test]
    fn reversed_bounds_are_normalized() {
        let span = Span::new(9, 3);
        assert_eq!(span.range(), 3..9);
        assert_eq!(span.len(), 6);
    }

    #[test]
    fn location_display() {
        let loc = SourceLocation::new("ci/workflows.py", Position::new(12, 4));
        assert_eq!(loc.to_string(), "ci/workflows.py:12:4");
    }
}
