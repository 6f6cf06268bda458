//! Source location tracking for tokens and AST nodes.

use serde::{Deserialize, Serialize};

/// A half-open byte range in the statement text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Span {
    /// Start byte offset (inclusive).
    pub start: usize,
    /// End byte offset (exclusive).
    pub end: usize,
}

impl Span {
    /// The empty span at offset zero.
    pub const ZERO: Self = Self::new(0, 0);

    /// Creates a new span.
    #[must_use]
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Returns the length of the span in bytes.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.end - self.start
    }

    /// Returns true if the span covers no bytes.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Returns the smallest span covering both `self` and `other`.
    #[must_use]
    pub const fn merge(self, other: Self) -> Self {
        let start = if self.start < other.start {
            self.start
        } else {
            other.start
        };
        let end = if self.end > other.end {
            self.end
        } else {
            other.end
        };
        Self { start, end }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_len_and_empty() {
        assert_eq!(Span::new(5, 10).len(), 5);
        assert!(Span::new(5, 5).is_empty());
        assert!(Span::ZERO.is_empty());
    }

    #[test]
    fn test_span_merge() {
        let merged = Span::new(5, 10).merge(Span::new(8, 15));
        assert_eq!(merged, Span::new(5, 15));
    }
}
