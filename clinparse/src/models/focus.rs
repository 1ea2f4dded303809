//! Caller-supplied focus targets and their results.

use super::result::{AttributeEntry, ConceptEntry};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Report on a concept, its descendants, or both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConceptFocus {
    /// Caller key for the result
    pub id: String,
    pub concept_id: String,
    #[serde(default = "default_true")]
    pub match_self: bool,
    #[serde(default)]
    pub match_children: bool,
}

/// Report on attribute edges between a destination and an origin concept.
///
/// With `match_children`, the destination side also matches descendants of
/// `destination_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeFocus {
    pub id: String,
    pub destination_id: String,
    pub origin_id: String,
    #[serde(default)]
    pub match_children: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FocusRequest {
    #[serde(default)]
    pub concepts: Vec<ConceptFocus>,
    #[serde(default)]
    pub attributes: Vec<AttributeFocus>,
}

impl FocusRequest {
    pub fn is_empty(&self) -> bool {
        self.concepts.is_empty() && self.attributes.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConceptFocusResult {
    pub found: bool,
    /// `Some(false)` as soon as a negated hit is seen, `Some(true)` for positive hits
    /// only, `None` when every hit is neutral
    pub polarity: Option<bool>,
    pub results: Vec<ConceptEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttributeFocusResult {
    pub found: bool,
    pub results: Vec<AttributeEntry>,
}

/// Results keyed by the focus ids of the request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FocusResults {
    pub concepts: BTreeMap<String, ConceptFocusResult>,
    pub attributes: BTreeMap<String, AttributeFocusResult>,
}
