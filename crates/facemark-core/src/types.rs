//! Identifier and byte span types.

use serde::{Deserialize, Serialize};

/// Instance identifier of a STEP entity (`#123` → `123`).
pub type EntityId = u64;

/// A half-open byte range `[start, end)` into the original document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    /// Create a span from its bounds.
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end, "span start {start} past end {end}");
        Self { start, end }
    }

    /// Number of bytes covered.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Whether two spans share at least one byte.
    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Whether `other` lies entirely inside this span.
    pub fn contains(&self, other: &Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// The text this span covers in `source`.
    ///
    /// Returns `None` when the span is out of bounds or splits a UTF-8 sequence.
    pub fn slice<'a>(&self, source: &'a str) -> Option<&'a str> {
        source.get(self.start..self.end)
    }
}

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlap() {
        let a = Span::new(10, 20);
        assert!(a.overlaps(&Span::new(19, 25)));
        assert!(!a.overlaps(&Span::new(20, 25)));
        assert!(!a.overlaps(&Span::new(0, 10)));
        assert!(a.contains(&Span::new(12, 20)));
    }

    #[test]
    fn test_slice() {
        let text = "#204=ADVANCED_FACE('old_name',(#1),#2,.T.);";
        let span = Span::new(19, 29);
        assert_eq!(span.slice(text), Some("'old_name'"));
        assert_eq!(span.len(), 10);
        assert_eq!(Span::new(40, 90).slice(text), None);
    }
}
