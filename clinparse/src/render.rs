//! Per-character view of the annotations of a document.
//!
//! The index answers "which syntax tokens and concepts cover character `n`". Turning that
//! into markup is left to the caller; [`AnnotatedText`] merges runs of characters with the
//! same annotations into segments, which is usually what a renderer wants.

use crate::models::{Concept, Polarity, SourceText, Span, SyntaxToken};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyntaxMark {
    pub kind: String,
    pub span: Span,
    pub token_number: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SemanticMark {
    pub kind: String,
    pub code: String,
    pub fsn: Option<String>,
    pub span: Span,
    pub polarity: Polarity,
}

/// Annotations covering one character.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacterAnnotations<'a> {
    pub position: usize,
    pub character: char,
    pub syntax: Vec<&'a SyntaxMark>,
    /// Ordered by begin, wider spans first
    pub semantic: Vec<&'a SemanticMark>,
}

#[derive(Debug, Clone)]
pub struct CharacterIndex {
    chars: Vec<char>,
    syntax: Vec<SyntaxMark>,
    semantic: Vec<SemanticMark>,
    syntax_at: Vec<Vec<usize>>,
    semantic_at: Vec<Vec<usize>>,
}

impl CharacterIndex {
    pub fn new(text: &SourceText) -> Self {
        let chars: Vec<char> = text.chars().collect();
        let len = chars.len();
        Self {
            chars,
            syntax: Vec::new(),
            semantic: Vec::new(),
            syntax_at: vec![Vec::new(); len],
            semantic_at: vec![Vec::new(); len],
        }
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// Tokens that do not fit the text are ignored.
    pub fn add_syntax(&mut self, token: &SyntaxToken) {
        let span = token.span();
        if !span.fits(self.len()) {
            return;
        }
        let mark = self.syntax.len();
        self.syntax.push(SyntaxMark {
            kind: token.kind.clone(),
            span,
            token_number: token.token_number,
        });
        for position in span.positions() {
            self.syntax_at[position].push(mark);
        }
    }

    /// The same code at the same span is only marked once.
    pub fn add_concept(&mut self, concept: &Concept) {
        let span = concept.span;
        if !span.fits(self.len()) {
            return;
        }
        if self
            .semantic
            .iter()
            .any(|m| m.span == span && m.code == concept.code)
        {
            return;
        }

        let mark = self.semantic.len();
        self.semantic.push(SemanticMark {
            kind: concept.kind.as_str().to_string(),
            code: concept.code.clone(),
            fsn: concept.fsn.clone(),
            span,
            polarity: concept.polarity,
        });

        let marks = &self.semantic;
        for position in span.positions() {
            let slot = &mut self.semantic_at[position];
            slot.push(mark);
            slot.sort_by_key(|&m| (marks[m].span.begin, std::cmp::Reverse(marks[m].span.len()), m));
        }
    }

    pub fn at(&self, position: usize) -> Option<CharacterAnnotations<'_>> {
        let character = *self.chars.get(position)?;
        Some(CharacterAnnotations {
            position,
            character,
            syntax: self.syntax_at[position].iter().map(|&m| &self.syntax[m]).collect(),
            semantic: self.semantic_at[position]
                .iter()
                .map(|&m| &self.semantic[m])
                .collect(),
        })
    }

    /// Merge runs of characters carrying identical annotations.
    pub fn to_annotated_text(&self) -> AnnotatedText {
        let mut segments: Vec<AnnotatedSegment> = Vec::new();
        let mut start = 0;

        for position in 1..=self.len() {
            let boundary = position == self.len()
                || self.syntax_at[position] != self.syntax_at[start]
                || self.semantic_at[position] != self.semantic_at[start];
            if !boundary {
                continue;
            }
            segments.push(AnnotatedSegment {
                span: Span::new(start, position),
                text: self.chars[start..position].iter().collect(),
                syntax: self.syntax_at[start]
                    .iter()
                    .map(|&m| self.syntax[m].clone())
                    .collect(),
                semantic: self.semantic_at[start]
                    .iter()
                    .map(|&m| self.semantic[m].clone())
                    .collect(),
            });
            start = position;
        }

        AnnotatedText {
            text: self.chars.iter().collect(),
            segments,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotatedSegment {
    pub span: Span,
    pub text: String,
    pub syntax: Vec<SyntaxMark>,
    pub semantic: Vec<SemanticMark>,
}

/// Input text cut into segments of uniform annotation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotatedText {
    pub text: String,
    pub segments: Vec<AnnotatedSegment>,
}

impl AnnotatedText {
    /// Segment containing the character at `position`.
    pub fn segment_at(&self, position: usize) -> Option<&AnnotatedSegment> {
        let index = self
            .segments
            .partition_point(|segment| segment.span.end <= position);
        self.segments
            .get(index)
            .filter(|segment| segment.span.covers(position))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DiscoveryScore, MentionKind};

    fn concept(code: &str, begin: usize, end: usize) -> Concept {
        Concept::new(
            MentionKind::DiseaseDisorder,
            "SNOMEDCT",
            code,
            Span::new(begin, end),
            "",
            DiscoveryScore::DirectMatch,
        )
    }

    fn token(begin: usize, end: usize) -> SyntaxToken {
        SyntaxToken {
            kind: "WordToken".to_string(),
            begin,
            end,
            token_number: None,
            dependency: None,
        }
    }

    #[test]
    fn test_character_lookup_orders_wider_spans_first() {
        let text = SourceText::new("a diabetes mellitus b");
        let mut index = CharacterIndex::new(&text);
        index.add_concept(&concept("73211009", 2, 10));
        index.add_concept(&concept("44054006", 2, 19));
        index.add_concept(&concept("44054006", 2, 19));

        let at = index.at(3).unwrap();
        assert_eq!(at.character, 'i');
        assert_eq!(at.semantic.len(), 2);
        assert_eq!(at.semantic[0].code, "44054006");
        assert_eq!(at.semantic[1].code, "73211009");

        assert!(index.at(0).unwrap().semantic.is_empty());
        assert!(index.at(21).is_none());
    }

    #[test]
    fn test_segments_cover_text_once() {
        let text = SourceText::new("no chest pain");
        let mut index = CharacterIndex::new(&text);
        index.add_syntax(&token(0, 2));
        index.add_syntax(&token(3, 8));
        index.add_syntax(&token(9, 13));
        index.add_syntax(&token(9, 40));
        index.add_concept(&concept("29857009", 3, 13));

        let annotated = index.to_annotated_text();
        let rebuilt: String = annotated.segments.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(rebuilt, "no chest pain");
        assert_eq!(annotated.segments.len(), 5);

        let pain = annotated.segment_at(10).unwrap();
        assert_eq!(pain.text, "pain");
        assert_eq!(pain.semantic[0].code, "29857009");
        assert_eq!(annotated.segment_at(2).unwrap().text, " ");
        assert!(annotated.segment_at(13).is_none());
    }
}
