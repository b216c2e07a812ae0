//! Source locations attached to scopes, declarations and diagnostics.

use serde::{Deserialize, Serialize};

/// A byte range in a document together with the 1-based line/column of its
/// start.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    /// Byte offset of the first character
    pub start: usize,
    /// Byte offset one past the last character
    pub end: usize,
    /// Line of `start` (1-based)
    pub line: u32,
    /// Column of `start` (1-based)
    pub column: u32,
}

impl Span {
    /// Create a span.
    pub fn new(start: usize, end: usize, line: u32, column: u32) -> Self {
        Self {
            start,
            end,
            line,
            column,
        }
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Whether the span covers no text.
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Smallest span covering both `self` and `other`.
    pub fn merge(&self, other: &Span) -> Span {
        let (line, column) = if (self.line, self.column) <= (other.line, other.column) {
            (self.line, self.column)
        } else {
            (other.line, other.column)
        };
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
            line,
            column,
        }
    }
}

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_keeps_earliest_position() {
        let a = Span::new(10, 20, 2, 5);
        let b = Span::new(4, 12, 1, 9);
        let merged = a.merge(&b);
        assert_eq!(merged.start, 4);
        assert_eq!(merged.end, 20);
        assert_eq!((merged.line, merged.column), (1, 9));
    }

    #[test]
    fn test_display_is_line_colon_column() {
        assert_eq!(Span::new(0, 1, 3, 7).to_string(), "3:7");
    }
}
