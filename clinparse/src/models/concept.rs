//! Resolved ontology concepts and the per-request concept arena.

use super::annotation::MentionKind;
use super::span::Span;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::ops::{Index, IndexMut};

/// How a concept was found, ordered from most to least direct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryScore {
    /// Emitted by the annotation service
    DirectMatch,
    /// Emitted by the annotation service and one of its descriptions equals the text
    FullTextMatch,
    /// Replacement of an inactive concept
    Substitution,
    /// Discovered from dependency-linked word combinations
    PostProcessing,
}

impl DiscoveryScore {
    pub fn as_u8(&self) -> u8 {
        match self {
            DiscoveryScore::DirectMatch => 0,
            DiscoveryScore::FullTextMatch => 1,
            DiscoveryScore::Substitution => 2,
            DiscoveryScore::PostProcessing => 3,
        }
    }
}

/// Negation status of a mention.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(from = "i64", into = "i64")]
pub enum Polarity {
    Negative,
    Neutral,
    #[default]
    Positive,
}

impl From<i64> for Polarity {
    fn from(value: i64) -> Self {
        match value {
            v if v < 0 => Polarity::Negative,
            0 => Polarity::Neutral,
            _ => Polarity::Positive,
        }
    }
}

impl From<Polarity> for i64 {
    fn from(value: Polarity) -> Self {
        match value {
            Polarity::Negative => -1,
            Polarity::Neutral => 0,
            Polarity::Positive => 1,
        }
    }
}

/// Index of a concept inside its [`ConceptArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConceptId(usize);

impl ConceptId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// A mention or search hit resolved against the ontology.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Concept {
    pub kind: MentionKind,
    pub system: String,
    pub code: String,
    pub cui: Option<String>,
    pub span: Span,
    pub text: String,
    pub polarity: Polarity,
    pub subject: Option<String>,
    pub history_of: bool,

    pub active: bool,
    pub ancestors: BTreeSet<String>,
    pub fsn: Option<String>,
    pub active_descriptions: Vec<String>,
    pub inactive_descriptions: Vec<String>,

    pub excluded: bool,
    pub included: bool,
    pub overlap: bool,

    /// Best similarity between `text` and an active description
    pub similarity: f64,
    pub score: DiscoveryScore,
    /// Description that matched `text` exactly, if any
    pub matched_description: Option<String>,

    pub substitutes: Vec<ConceptId>,
    pub substitute_of: Option<ConceptId>,
}

impl Concept {
    /// An unresolved concept: inactive, no ancestors, no descriptions.
    pub fn new(
        kind: MentionKind,
        system: impl Into<String>,
        code: impl Into<String>,
        span: Span,
        text: impl Into<String>,
        score: DiscoveryScore,
    ) -> Self {
        Self {
            kind,
            system: system.into(),
            code: code.into(),
            cui: None,
            span,
            text: text.into(),
            polarity: Polarity::default(),
            subject: None,
            history_of: false,
            active: false,
            ancestors: BTreeSet::new(),
            fsn: None,
            active_descriptions: Vec::new(),
            inactive_descriptions: Vec::new(),
            excluded: false,
            included: false,
            overlap: false,
            similarity: 0.0,
            score,
            matched_description: None,
            substitutes: Vec::new(),
            substitute_of: None,
        }
    }

    /// Whether `code` is one of this concept's closure ancestors.
    pub fn has_ancestor(&self, code: &str) -> bool {
        self.ancestors.contains(code)
    }

    pub fn fsn_or_code(&self) -> &str {
        self.fsn.as_deref().unwrap_or(&self.code)
    }
}

/// Flat storage for the concepts of one request.
#[derive(Debug, Clone, Default)]
pub struct ConceptArena {
    concepts: Vec<Concept>,
}

impl ConceptArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, concept: Concept) -> ConceptId {
        self.concepts.push(concept);
        ConceptId(self.concepts.len() - 1)
    }

    pub fn get(&self, id: ConceptId) -> Option<&Concept> {
        self.concepts.get(id.0)
    }

    pub fn get_mut(&mut self, id: ConceptId) -> Option<&mut Concept> {
        self.concepts.get_mut(id.0)
    }

    pub fn len(&self) -> usize {
        self.concepts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.concepts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ConceptId, &Concept)> {
        self.concepts
            .iter()
            .enumerate()
            .map(|(index, concept)| (ConceptId(index), concept))
    }
}

impl Index<ConceptId> for ConceptArena {
    type Output = Concept;

    fn index(&self, id: ConceptId) -> &Concept {
        &self.concepts[id.0]
    }
}

impl IndexMut<ConceptId> for ConceptArena {
    fn index_mut(&mut self, id: ConceptId) -> &mut Concept {
        &mut self.concepts[id.0]
    }
}
