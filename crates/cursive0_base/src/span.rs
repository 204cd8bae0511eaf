//! Source location tracking for diagnostics.
//!
//! A [`Span`] identifies a byte range within a named source file. Unlike a
//! bare offset pair, it carries the file identity so that diagnostics from
//! different modules never collide, and it never needs to be synthesized:
//! every span traces back to bytes that were actually read from disk.
//!
//! Line/column rendering (needed by the CLI, §6) is computed lazily from a
//! [`LineIndex`] built once per file rather than stored on every span.

use std::sync::Arc;

/// A byte-offset range within a single source file.
///
/// `start`/`end` are byte offsets, matching Rust's string slicing semantics:
/// `&source[span.start..span.end]` extracts the spanned text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Span {
    /// Path of the file this span was read from.
    pub file: Arc<str>,
    /// Byte offset of the first scalar (inclusive).
    pub start: usize,
    /// Byte offset past the last scalar (exclusive).
    pub end: usize,
}

impl Span {
    pub fn new(file: Arc<str>, start: usize, end: usize) -> Self {
        Self { file, start, end }
    }

    /// Creates a span covering from the start of `self` to the end of `other`.
    ///
    /// # Panics
    ///
    /// Panics if the spans are not from the same file; merging spans across
    /// files is always a bug in the caller.
    pub fn merge(&self, other: &Span) -> Span {
        assert_eq!(self.file, other.file, "cannot merge spans from different files");
        Span {
            file: self.file.clone(),
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

/// A 1-based (line, column) position, as rendered to users.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineCol {
    pub line: u32,
    pub col: u32,
}

/// Maps byte offsets to 1-based (line, column) pairs for one source file.
///
/// Built once from the normalized (LF-only) source text; offsets past the
/// end of the file clamp to the last known position.
#[derive(Debug, Clone)]
pub struct LineIndex {
    /// Byte offset of the first scalar of each line.
    line_starts: Vec<usize>,
    len: usize,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        for (i, b) in source.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i + 1);
            }
        }
        Self { line_starts, len: source.len() }
    }

    /// Converts a byte offset to a 1-based (line, column) pair.
    ///
    /// Column is counted in UTF-8 bytes from the start of the line, which is
    /// sufficient for diagnostic rendering (§6) since spans never straddle a
    /// malformed scalar boundary once decoding (§4.1) has succeeded.
    pub fn line_col(&self, offset: usize) -> LineCol {
        let offset = offset.min(self.len);
        let line_idx = match self.line_starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i.saturating_sub(1),
        };
        let line_start = self.line_starts[line_idx];
        LineCol {
            line: (line_idx + 1) as u32,
            col: (offset - line_start + 1) as u32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(start: usize, end: usize) -> Span {
        Span::new(Arc::from("main.cursive"), start, end)
    }

    #[test]
    fn span_merge_combines_ranges() {
        let a = span(5, 10);
        let b = span(8, 15);
        let merged = a.merge(&b);
        assert_eq!(merged.start, 5);
        assert_eq!(merged.end, 15);
    }

    #[test]
    fn span_len_and_empty() {
        assert_eq!(span(5, 10).len(), 5);
        assert!(span(5, 5).is_empty());
        assert!(!span(5, 10).is_empty());
    }

    #[test]
    fn line_index_first_line() {
        let idx = LineIndex::new("abc\ndef\nghi");
        assert_eq!(idx.line_col(0), LineCol { line: 1, col: 1 });
        assert_eq!(idx.line_col(2), LineCol { line: 1, col: 3 });
    }

    #[test]
    fn line_index_crosses_lines() {
        let idx = LineIndex::new("abc\ndef\nghi");
        assert_eq!(idx.line_col(4), LineCol { line: 2, col: 1 });
        assert_eq!(idx.line_col(8), LineCol { line: 3, col: 1 });
    }

    #[test]
    fn line_index_clamps_past_end() {
        let idx = LineIndex::new("abc");
        assert_eq!(idx.line_col(1000).line, 1);
    }

    #[test]
    fn line_index_empty_source() {
        let idx = LineIndex::new("");
        assert_eq!(idx.line_col(0), LineCol { line: 1, col: 1 });
    }
}
