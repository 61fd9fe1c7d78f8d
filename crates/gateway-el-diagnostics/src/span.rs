//! Byte spans and line/column locations inside template text

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

/// Half-open byte range into the template text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    #[inline]
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Zero-width span at `pos`
    #[inline]
    pub const fn point(pos: usize) -> Self {
        Self { start: pos, end: pos }
    }

    #[inline]
    pub const fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Smallest span covering both
    #[inline]
    pub fn merge(self, other: Self) -> Self {
        Self {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Move the span right by `offset` bytes.
    ///
    /// Expression fragments are parsed on their own; shifting re-bases their
    /// spans onto the enclosing template.
    #[inline]
    pub const fn shift(self, offset: usize) -> Self {
        Self {
            start: self.start + offset,
            end: self.end + offset,
        }
    }

    #[inline]
    pub const fn contains(&self, other: &Self) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    #[inline]
    pub const fn as_range(&self) -> Range<usize> {
        self.start..self.end
    }

    /// Text covered by this span, if it lies on char boundaries of `source`
    pub fn slice<'a>(&self, source: &'a str) -> Option<&'a str> {
        source.get(self.as_range())
    }
}

impl From<Range<usize>> for Span {
    fn from(range: Range<usize>) -> Self {
        Self::new(range.start, range.end)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Human oriented position (1-based line and column)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
    /// Byte offset from the start of the template (0-based)
    pub offset: usize,
    pub length: usize,
}

impl SourceLocation {
    pub const fn new(line: usize, column: usize, offset: usize, length: usize) -> Self {
        Self {
            line,
            column,
            offset,
            length,
        }
    }

    pub fn from_span(span: Span, source: &str) -> Self {
        let (line, column) = offset_to_line_col(source, span.start);
        Self::new(line, column, span.start, span.len())
    }

    pub const fn span(&self) -> Span {
        Span::new(self.offset, self.offset + self.length)
    }
}

impl Default for SourceLocation {
    fn default() -> Self {
        Self::new(1, 1, 0, 0)
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Convert a byte offset into a (line, column) pair, columns counted in chars
pub fn offset_to_line_col(source: &str, offset: usize) -> (usize, usize) {
    let mut line = 1;
    let mut col = 1;

    for (i, ch) in source.char_indices() {
        if i >= offset {
            break;
        }
        if ch == '\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }

    (line, col)
}

/// A node tagged with the span it was parsed from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spanned<T> {
    pub inner: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub const fn new(inner: T, span: Span) -> Self {
        Self { inner, span }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Spanned<U> {
        Spanned {
            inner: f(self.inner),
            span: self.span,
        }
    }

    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T> std::ops::Deref for Spanned<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<T> std::ops::DerefMut for Spanned<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_shift_and_slice() {
        let template = "Hello {#name}!";
        let inner = Span::new(1, 6).shift(6);
        assert_eq!(inner, Span::new(7, 12));
        assert_eq!(inner.slice(template), Some("#name"));
    }

    #[test]
    fn test_slice_outside_source() {
        assert_eq!(Span::new(4, 40).slice("short"), None);
    }

    #[test]
    fn test_offset_to_line_col_multiline_template() {
        let source = "{\n  \"a\": {#x}\n}";
        assert_eq!(offset_to_line_col(source, 0), (1, 1));
        assert_eq!(offset_to_line_col(source, 2), (2, 1));
        assert_eq!(offset_to_line_col(source, 9), (2, 8));
    }

    #[test]
    fn test_location_from_span() {
        let loc = SourceLocation::from_span(Span::new(3, 5), "ab\ncdef");
        assert_eq!(loc, SourceLocation::new(2, 1, 3, 2));
        assert_eq!(loc.to_string(), "2:1");
    }
}
