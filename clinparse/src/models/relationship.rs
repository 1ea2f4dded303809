//! Dependency relationships and discovered attribute edges.

use super::concept::ConceptId;
use super::span::Span;
use serde::{Deserialize, Serialize};

/// Dependency relation label.
///
/// Labels outside the recognized set are kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RelationLabel {
    NominalSubject,
    AdjectivalModifier,
    NominalModifier,
    AdverbialModifier,
    NounCompound,
    Attribute,
    DirectObject,
    PrepositionalObject,
    HyphenModifier,
    Root,
    Other(String),
}

impl RelationLabel {
    pub fn as_str(&self) -> &str {
        match self {
            RelationLabel::NominalSubject => "nsubj",
            RelationLabel::AdjectivalModifier => "amod",
            RelationLabel::NominalModifier => "nmod",
            RelationLabel::AdverbialModifier => "advmod",
            RelationLabel::NounCompound => "nn",
            RelationLabel::Attribute => "attr",
            RelationLabel::DirectObject => "dobj",
            RelationLabel::PrepositionalObject => "pobj",
            RelationLabel::HyphenModifier => "hmod",
            RelationLabel::Root => "root",
            RelationLabel::Other(label) => label,
        }
    }
}

impl From<String> for RelationLabel {
    fn from(label: String) -> Self {
        match label.to_ascii_lowercase().as_str() {
            "nsubj" => RelationLabel::NominalSubject,
            "amod" => RelationLabel::AdjectivalModifier,
            "nmod" => RelationLabel::NominalModifier,
            "advmod" => RelationLabel::AdverbialModifier,
            "nn" => RelationLabel::NounCompound,
            "attr" => RelationLabel::Attribute,
            "dobj" => RelationLabel::DirectObject,
            "pobj" => RelationLabel::PrepositionalObject,
            "hmod" => RelationLabel::HyphenModifier,
            "root" => RelationLabel::Root,
            _ => RelationLabel::Other(label),
        }
    }
}

impl From<RelationLabel> for String {
    fn from(label: RelationLabel) -> Self {
        label.as_str().to_string()
    }
}

impl std::fmt::Display for RelationLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Index of a relationship inside its graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RelationshipId(pub(crate) usize);

impl RelationshipId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// One dependency edge between a token (origin) and its head (destination).
#[derive(Debug, Clone)]
pub struct Relationship {
    pub id: String,
    pub head_id: Option<String>,
    pub label: RelationLabel,
    /// Text of the origin token
    pub text: String,
    pub origin: Span,
    pub destination: Option<Span>,
    pub origin_concepts: Vec<ConceptId>,
    pub destination_concepts: Vec<ConceptId>,
    pub dependencies: Vec<RelationshipId>,
}

impl Relationship {
    /// Has concepts on both ends and is not the root relation.
    pub fn is_qualifying(&self) -> bool {
        !self.origin_concepts.is_empty()
            && !self.destination_concepts.is_empty()
            && self.label != RelationLabel::Root
    }
}

/// A directed attribute edge: `origin --attribute--> destination`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelationshipAttribute {
    pub relationship: RelationshipId,
    pub origin: ConceptId,
    pub destination: ConceptId,
    pub attribute: ConceptId,
}
