//! Source positions for evaluation errors.

use std::fmt;
use std::path::PathBuf;

/// A 1-indexed position inside a template file.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SourceLocation {
    /// The template file.
    pub file: PathBuf,
    /// Line number, starting at 1.
    pub line: u32,
    /// Column number, starting at 1.
    pub column: u32,
}

impl SourceLocation {
    /// Creates a location.
    pub fn new(file: impl Into<PathBuf>, line: u32, column: u32) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }

    /// Converts a byte offset in `content` to a location.
    ///
    /// Scans `content` once; use a [`LineIndex`] to resolve many offsets in
    /// the same text.
    pub fn from_offset(file: impl Into<PathBuf>, content: &str, offset: usize) -> Self {
        LineIndex::new(content).location(file, offset)
    }
}

/// Byte offsets of every line start in a text, for resolving offsets to
/// line and column by binary search.
#[derive(Clone, Debug)]
pub struct LineIndex {
    /// Offsets of each line start; the first entry is always 0.
    line_starts: Vec<usize>,
    len: usize,
}

impl LineIndex {
    /// Indexes the line starts of `content`.
    pub fn new(content: &str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(
            content
                .bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(i, _)| i + 1),
        );
        Self {
            line_starts,
            len: content.len(),
        }
    }

    /// 1-indexed (line, column) of a byte offset, clamped to the text.
    pub fn line_col(&self, offset: usize) -> (u32, u32) {
        let offset = offset.min(self.len);
        let idx = match self.line_starts.binary_search(&offset) {
            Ok(idx) => idx,
            Err(idx) => idx - 1,
        };
        (idx as u32 + 1, (offset - self.line_starts[idx]) as u32 + 1)
    }

    /// The location of a byte offset in `file`.
    pub fn location(&self, file: impl Into<PathBuf>, offset: usize) -> SourceLocation {
        let (line, column) = self.line_col(offset);
        SourceLocation::new(file, line, column)
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
    fn offset_on_first_line() {
        let loc = SourceLocation::from_offset("a.pan", "abc\ndef", 2);
        assert_eq!((loc.line, loc.column), (1, 3));
    }

    #[test]
    fn offset_after_newline() {
        let loc = SourceLocation::from_offset("a.pan", "abc\ndef", 5);
        assert_eq!((loc.line, loc.column), (2, 2));
    }

    #[test]
    fn offset_past_end_is_clamped() {
        let loc = SourceLocation::from_offset("a.pan", "ab", 10);
        assert_eq!((loc.line, loc.column), (1, 3));
    }

    #[test]
    fn index_resolves_line_starts() {
        let index = LineIndex::new("abc\ndef\n\nghi");
        assert_eq!(index.line_col(0), (1, 1));
        assert_eq!(index.line_col(3), (1, 4));
        assert_eq!(index.line_col(4), (2, 1));
        assert_eq!(index.line_col(8), (3, 1));
        assert_eq!(index.line_col(11), (4, 3));
    }

    #[test]
    fn index_of_empty_text() {
        let index = LineIndex::new("");
        assert_eq!(index.line_col(0), (1, 1));
        assert_eq!(index.line_col(5), (1, 1));
    }

    #[test]
    fn index_agrees_with_single_lookup() {
        let text = "object template a;\n\n'/x' = 1;\n'/y' = 2;\n";
        let index = LineIndex::new(text);
        for offset in 0..=text.len() {
            assert_eq!(
                index.location("a.pan", offset),
                SourceLocation::from_offset("a.pan", text, offset)
            );
        }
    }

    #[test]
    fn display() {
        let loc = SourceLocation::new("/t/a.pan", 3, 7);
        assert_eq!(loc.to_string(), "/t/a.pan:3:7");
    }
}
