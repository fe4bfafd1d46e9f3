//! Source location tracking.
//!
//! Every AST node carries a `Span` of byte offsets. `LineIndex` turns
//! offsets into the 0-based line / UTF-16 column pairs that source maps use.

/// A span in the source code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    /// Byte offset of the start.
    pub start: u32,
    /// Byte offset of the end (exclusive).
    pub end: u32,
}

impl Span {
    /// Create a new span.
    #[inline]
    #[must_use]
    pub const fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// Span for nodes created after parsing. Never mapped back to source.
    #[inline]
    #[must_use]
    pub const fn synthetic() -> Self {
        Self {
            start: u32::MAX,
            end: u32::MAX,
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_synthetic(&self) -> bool {
        self.start == u32::MAX
    }

    /// Merge two spans into one that covers both.
    #[inline]
    #[must_use]
    pub const fn merge(self, other: Span) -> Span {
        Span {
            start: if self.start < other.start { self.start } else { other.start },
            end: if self.end > other.end { self.end } else { other.end },
        }
    }
}

/// Convert byte offsets to line/column positions.
#[derive(Debug, Clone)]
pub struct LineIndex {
    /// Byte offsets of the start of each line.
    line_starts: Vec<u32>,
}

impl LineIndex {
    /// Build a line index from source code.
    #[must_use]
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        for (i, b) in source.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push((i + 1) as u32);
            }
        }
        Self { line_starts }
    }

    /// Convert a byte offset to line and byte column (both 0-indexed).
    #[must_use]
    pub fn line_col(&self, offset: u32) -> (u32, u32) {
        let line = self.line_of(offset);
        (line as u32, offset - self.line_starts[line])
    }

    /// Convert a byte offset to line and UTF-16 column (both 0-indexed).
    #[must_use]
    pub fn line_col_utf16(&self, source: &str, offset: u32) -> (u32, u32) {
        let line = self.line_of(offset);
        let start = self.line_starts[line] as usize;
        let end = (offset as usize).min(source.len());
        let col = source
            .get(start..end)
            .map_or(end.saturating_sub(start), |s| s.encode_utf16().count());
        (line as u32, col as u32)
    }

    /// Get the total number of lines.
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    fn line_of(&self, offset: u32) -> usize {
        self.line_starts
            .binary_search(&offset)
            .unwrap_or_else(|i| i.saturating_sub(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_merge() {
        let a = Span::new(5, 10);
        let b = Span::new(8, 15);
        assert_eq!(a.merge(b), Span::new(5, 15));
    }

    #[test]
    fn test_line_index() {
        let source = "line1\nline2\nline3";
        let index = LineIndex::new(source);

        assert_eq!(index.line_col(0), (0, 0));
        assert_eq!(index.line_col(5), (0, 5));
        assert_eq!(index.line_col(6), (1, 0));
        assert_eq!(index.line_col(12), (2, 0));
        assert_eq!(index.line_count(), 3);
    }

    #[test]
    fn test_utf16_columns() {
        // 'é' is two bytes in UTF-8 but one UTF-16 unit.
        let source = "a\nconst é = x;";
        let index = LineIndex::new(source);
        let x = source.find('x').unwrap() as u32;
        assert_eq!(index.line_col(x), (1, 11));
        assert_eq!(index.line_col_utf16(source, x), (1, 10));
    }

    #[test]
    fn test_synthetic_span() {
        assert!(Span::synthetic().is_synthetic());
        assert!(!Span::new(0, 0).is_synthetic());
    }
}
