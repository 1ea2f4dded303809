//! Ontology records as the stores hold them.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConceptRecord {
    pub code: String,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptionRecord {
    pub id: String,
    pub concept_code: String,
    pub term: String,
    pub active: bool,
    pub type_id: String,
}

/// Direct, active is-a edge: `source` is-a `destination`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IsAEdge {
    pub source: String,
    pub destination: String,
}

/// Historical association from an inactive concept to its replacement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssociationRecord {
    pub source: String,
    pub target: String,
    pub active: bool,
    /// RF2 `YYYYMMDD`, which orders lexically
    pub effective_time: String,
}

/// The attribute may be used on concepts below `domain`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeDomainRule {
    pub attribute: String,
    pub domain: String,
}

/// The attribute may point at concepts below `range`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeRangeRule {
    pub attribute: String,
    pub range: String,
}

/// UMLS CUI to primary-system code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CuiMapping {
    pub cui: String,
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClosurePair {
    pub subtype: String,
    pub supertype: String,
}

/// Attribute applicable to a concept together with its range constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeRule {
    pub attribute: String,
    pub domain: String,
    pub range: String,
}

/// Description matched by a search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptionHit {
    pub concept_code: String,
    pub term: String,
    pub fsn: Option<String>,
}

/// Substring/code search parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptionQuery {
    /// Matched case-insensitively against active descriptions, or exactly against codes
    pub term: String,
    /// Restrict to descendants of this concept
    pub parent: Option<String>,
    pub limit: usize,
}
