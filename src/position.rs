//! Byte offset to line/column conversion.

use serde::Serialize;

/// A position in source text. Lines and columns are 1-based; columns count
/// characters, not bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Position {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

/// A half-open `[start, end)` source range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    pub fn byte_range(&self) -> std::ops::Range<usize> {
        self.start.offset..self.end.offset
    }

    /// Whether `other` lies within `self` (equal ranges enclose each other).
    pub fn encloses(&self, other: &Range) -> bool {
        self.start.offset <= other.start.offset && other.end.offset <= self.end.offset
    }

    pub fn is_empty(&self) -> bool {
        self.start.offset == self.end.offset
    }
}

/// Precomputed line starts for fast offset lookups.
#[derive(Debug, Clone)]
pub struct LineIndex<'a> {
    text: &'a str,
    line_starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    pub fn new(text: &'a str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(text.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self { text, line_starts }
    }

    /// Position of a byte offset. Offsets past the end clamp to the end.
    pub fn position(&self, offset: usize) -> Position {
        let offset = offset.min(self.text.len());
        let line = match self.line_starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        let line_start = self.line_starts[line];
        let column = self
            .text
            .get(line_start..offset)
            .map(|s| s.chars().count())
            .unwrap_or(offset - line_start);
        Position {
            offset,
            line: line + 1,
            column: column + 1,
        }
    }

    pub fn range(&self, start: usize, end: usize) -> Range {
        Range {
            start: self.position(start),
            end: self.position(end),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions_are_one_based() {
        let index = LineIndex::new("ab\ncd\n");
        assert_eq!(
            index.position(0),
            Position {
                offset: 0,
                line: 1,
                column: 1
            }
        );
        assert_eq!(index.position(3).line, 2);
        assert_eq!(index.position(4).column, 2);
        assert_eq!(index.position(6).line, 3);
    }

    #[test]
    fn columns_count_characters() {
        let index = LineIndex::new("é = 1");
        assert_eq!(index.position(3).column, 3);
    }

    #[test]
    fn range_enclosure() {
        let index = LineIndex::new("0123456789");
        let outer = index.range(1, 8);
        assert!(outer.encloses(&index.range(2, 5)));
        assert!(outer.encloses(&outer));
        assert!(!index.range(2, 5).encloses(&outer));
    }
}
