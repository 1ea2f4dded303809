//! Data types shared across the resolution pipeline.
//!
//! Concepts and relationships live in per-request arenas; links between them
//! (substitutes, dependencies, attached concepts) are arena indices.

pub mod annotation;
pub mod concept;
pub mod focus;
pub mod relationship;
pub mod result;
pub mod span;

pub use annotation::{
    AnnotatedDocument, ConceptRef, DependencyInfo, MentionKind, SemanticMention, SyntaxToken,
    UpstreamTimings,
};
pub use concept::{Concept, ConceptArena, ConceptId, DiscoveryScore, Polarity};
pub use focus::{
    AttributeFocus, AttributeFocusResult, ConceptFocus, ConceptFocusResult, FocusRequest,
    FocusResults,
};
pub use relationship::{RelationLabel, Relationship, RelationshipAttribute, RelationshipId};
pub use result::{
    AttributeEntry, ConceptEntry, ConceptLabel, InactiveLogEntry, OverlapLogEntry, ParseResult,
    ParseWarning, RelationshipEntry, StageTimings,
};
pub use span::{SourceText, Span};
