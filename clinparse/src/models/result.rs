//! Caller-facing parse result.

use super::concept::{Concept, DiscoveryScore, Polarity};
use super::focus::FocusResults;
use super::span::Span;
use crate::render::AnnotatedText;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Code, FSN and source text of a concept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConceptLabel {
    pub code: String,
    pub fsn: Option<String>,
    pub text: String,
}

impl From<&Concept> for ConceptLabel {
    fn from(concept: &Concept) -> Self {
        Self {
            code: concept.code.clone(),
            fsn: concept.fsn.clone(),
            text: concept.text.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptEntry {
    pub id: String,
    pub fsn: Option<String>,
    pub text: String,
    pub score: DiscoveryScore,
    pub similarity: f64,
    pub matched_description: Option<String>,
    pub polarity: Polarity,
    pub subject: Option<String>,
    pub history_of: bool,
    pub begin: usize,
    pub end: usize,
}

impl From<&Concept> for ConceptEntry {
    fn from(concept: &Concept) -> Self {
        Self {
            id: concept.code.clone(),
            fsn: concept.fsn.clone(),
            text: concept.text.clone(),
            score: concept.score,
            similarity: concept.similarity,
            matched_description: concept.matched_description.clone(),
            polarity: concept.polarity,
            subject: concept.subject.clone(),
            history_of: concept.history_of,
            begin: concept.span.begin,
            end: concept.span.end,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipEntry {
    pub label: String,
    pub origin: ConceptLabel,
    pub destination: ConceptLabel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeEntry {
    pub origin: ConceptLabel,
    pub attribute: ConceptLabel,
    pub destination: ConceptLabel,
}

/// A concept discarded because a wider or better concept covers its span.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlapLogEntry {
    pub discarded: ConceptLabel,
    pub discarded_span: Span,
    pub kept: ConceptLabel,
    pub kept_span: Span,
}

/// An inactive or foreign-system concept replaced by a primary active one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InactiveLogEntry {
    pub text: String,
    pub old_code: String,
    pub old_fsn: Option<String>,
    pub new_code: String,
    pub new_fsn: Option<String>,
}

/// Recoverable problems met while parsing one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParseWarning {
    /// A record whose offsets do not fit the text was skipped
    MalformedSpan {
        record: String,
        begin: usize,
        end: usize,
    },
    /// A dependency points at a head the document does not contain
    MissingHead { id: String, head_id: String },
    /// Substitution stopped at the configured depth
    SubstitutionDepth { code: String },
    /// The store failed while resolving `code`; the concept was left out
    Unresolved {
        code: String,
        begin: usize,
        end: usize,
        error: String,
    },
    /// Combination search over a dependency phrase failed
    PhraseSearch {
        begin: usize,
        end: usize,
        error: String,
    },
}

/// Per-stage durations in milliseconds.
///
/// `environment` and `parsing` are durations reported by the annotation service;
/// `existed` is its flag for a parser that was already loaded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StageTimings {
    pub environment: Option<f64>,
    pub existed: Option<bool>,
    pub parsing: Option<f64>,
    pub load: f64,
    pub split: f64,
    pub syntax: f64,
    pub semantic: f64,
    pub concepts: f64,
    pub relationships: f64,
    pub relationship_concepts: f64,
    pub focus: f64,
    pub total: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParseResult {
    pub id: Uuid,
    pub parsed_at: DateTime<Utc>,
    pub annotated: AnnotatedText,
    pub focus: FocusResults,
    pub concepts: Vec<ConceptEntry>,
    pub relationships: Vec<RelationshipEntry>,
    pub attributes: Vec<AttributeEntry>,
    pub overlap_log: Vec<OverlapLogEntry>,
    pub inactive_log: Vec<InactiveLogEntry>,
    pub warnings: Vec<ParseWarning>,
    pub timings: StageTimings,
}

impl ParseResult {
    /// Concepts of the result with this code.
    pub fn concepts_with_code<'a>(&'a self, code: &'a str) -> impl Iterator<Item = &'a ConceptEntry> {
        self.concepts.iter().filter(move |c| c.id == code)
    }
}
