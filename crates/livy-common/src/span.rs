use serde::Serialize;

/// A half-open `[start, end)` byte interval into the source file.
///
/// Every token, AST node, and diagnostic in the Livy compiler points
/// back at the source through one of these. Offsets count bytes, not
/// characters; lexer-produced spans always fall on UTF-8 boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub fn new(start: u32, end: u32) -> Self {
        debug_assert!(start <= end, "malformed span {start}..{end}");
        Span { start, end }
    }

    /// The empty span at a single offset. Synthesised tokens (the
    /// end-of-statement terminator, the end-of-input marker) sit at a
    /// point rather than over any source text.
    pub fn point(offset: u32) -> Self {
        Span {
            start: offset,
            end: offset,
        }
    }

    /// The placeholder span for nodes with no source position of their
    /// own, such as the built-in operator types.
    pub fn zero() -> Self {
        Span::point(0)
    }

    /// The smallest span covering both operands.
    ///
    /// This is how compound nodes get their positions: an application
    /// spans from its function to its argument, a definition from the
    /// `let` keyword to the end of its value.
    pub fn merge(self, other: Span) -> Span {
        Span::new(self.start.min(other.start), self.end.max(other.end))
    }
}

/// Byte-offset to line/column conversion for error reporting.
///
/// Built once per source file by recording where every newline ends;
/// the line holding an offset is then the number of recorded newlines
/// at or before it, found by binary search.
#[derive(Debug)]
pub struct LineIndex {
    /// Byte offset just past each `\n` in the source, in order. Line 1
    /// implicitly begins at offset 0.
    newline_ends: Vec<u32>,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        LineIndex {
            newline_ends: source
                .match_indices('\n')
                .map(|(at, _)| at as u32 + 1)
                .collect(),
        }
    }

    /// The 1-based (line, column) of a byte offset. Columns count bytes
    /// from the start of the line.
    pub fn line_col(&self, offset: u32) -> (u32, u32) {
        let newlines_before = match self.newline_ends.binary_search(&offset) {
            // The offset is exactly where a line begins.
            Ok(index) => index + 1,
            Err(index) => index,
        };
        let line_start = match newlines_before {
            0 => 0,
            n => self.newline_ends[n - 1],
        };
        (newlines_before as u32 + 1, offset - line_start + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_spans_are_empty() {
        let span = Span::point(7);
        assert_eq!(span.start, 7);
        assert_eq!(span.end, 7);
        assert_eq!(Span::zero(), Span::point(0));
    }

    #[test]
    fn merge_covers_both_operands() {
        let a = Span::new(5, 10);
        let b = Span::new(8, 15);
        assert_eq!(a.merge(b), Span::new(5, 15));
        // merge is symmetric
        assert_eq!(b.merge(a), Span::new(5, 15));
    }

    #[test]
    fn merge_of_disjoint_spans_bridges_the_gap() {
        let a = Span::new(0, 3);
        let b = Span::new(20, 25);
        assert_eq!(a.merge(b), Span::new(0, 25));
    }

    #[test]
    fn merge_with_a_point_extends_to_it() {
        let a = Span::new(4, 9);
        assert_eq!(a.merge(Span::point(12)), Span::new(4, 12));
        assert_eq!(a.merge(Span::point(6)), a);
    }

    #[test]
    fn line_col_walks_lines() {
        let idx = LineIndex::new("hello\nworld\nfoo");
        assert_eq!(idx.line_col(0), (1, 1));
        assert_eq!(idx.line_col(4), (1, 5));
        assert_eq!(idx.line_col(6), (2, 1));
        assert_eq!(idx.line_col(12), (3, 1));
        assert_eq!(idx.line_col(13), (3, 2));
    }

    #[test]
    fn line_col_at_a_newline_stays_on_its_line() {
        // The `\n` at offset 2 still belongs to line 1; line 2 starts
        // one byte later.
        let idx = LineIndex::new("ab\ncd");
        assert_eq!(idx.line_col(2), (1, 3));
        assert_eq!(idx.line_col(3), (2, 1));
    }

    #[test]
    fn line_col_on_a_single_line() {
        let idx = LineIndex::new("no newlines here");
        assert_eq!(idx.line_col(0), (1, 1));
        assert_eq!(idx.line_col(15), (1, 16));
    }
}
