//! Character spans over the source text.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

/// Half-open `[begin, end)` range of character offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Span {
    pub begin: usize,
    pub end: usize,
}

impl Span {
    pub fn new(begin: usize, end: usize) -> Self {
        Self { begin, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.begin)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn covers(&self, position: usize) -> bool {
        self.begin <= position && position < self.end
    }

    pub fn positions(&self) -> Range<usize> {
        self.begin..self.end
    }

    /// Well-formed and inside a text of `char_len` characters.
    pub fn fits(&self, char_len: usize) -> bool {
        self.begin <= self.end && self.end <= char_len
    }

    /// `self` lies strictly inside `other`, or shares one boundary with it while being
    /// strictly shorter.
    pub fn is_subsumed_by(&self, other: &Span) -> bool {
        (self.begin > other.begin && self.end < other.end)
            || (self.begin == other.begin && self.end < other.end)
            || (self.begin > other.begin && self.end == other.end)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.begin, self.end)
    }
}

/// Input text with a character-to-byte offset table.
///
/// Upstream offsets count characters, so slicing goes through this table.
#[derive(Debug, Clone)]
pub struct SourceText {
    text: String,
    offsets: Vec<usize>,
}

impl SourceText {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let mut offsets: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
        offsets.push(text.len());
        Self { text, offsets }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn char_len(&self) -> usize {
        self.offsets.len() - 1
    }

    /// `None` when the span does not fit the text.
    pub fn slice(&self, span: Span) -> Option<&str> {
        if !span.fits(self.char_len()) {
            return None;
        }
        Some(&self.text[self.offsets[span.begin]..self.offsets[span.end]])
    }

    pub fn chars(&self) -> std::str::Chars<'_> {
        self.text.chars()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subsumption_cases() {
        let outer = Span::new(2, 10);
        assert!(Span::new(3, 9).is_subsumed_by(&outer));
        assert!(Span::new(2, 6).is_subsumed_by(&outer));
        assert!(Span::new(5, 10).is_subsumed_by(&outer));
        assert!(!outer.is_subsumed_by(&outer));
        assert!(!Span::new(0, 6).is_subsumed_by(&outer));
        assert!(!outer.is_subsumed_by(&Span::new(2, 6)));
    }

    #[test]
    fn test_slice_counts_characters() {
        let text = SourceText::new("Père diabète");
        assert_eq!(text.char_len(), 12);
        assert_eq!(text.slice(Span::new(5, 12)), Some("diabète"));
        assert_eq!(text.slice(Span::new(5, 13)), None);
        assert_eq!(text.slice(Span::new(6, 5)), None);
    }
}
