//! Records produced by the upstream annotation service.
//!
//! These mirror the service's JSON payload. Offsets are character offsets into
//! `AnnotatedDocument::input`.

use super::concept::Polarity;
use super::relationship::RelationLabel;
use super::span::Span;
use serde::{Deserialize, Serialize};

/// Semantic type of a mention.
///
/// Unrecognized upstream labels are kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MentionKind {
    DiseaseDisorder,
    SignSymptom,
    Procedure,
    AnatomicalSite,
    Medication,
    Lab,
    /// Concept discovered from word combinations
    PostProcessing,
    /// Attribute concept materialized from the attribute rules
    Attribute,
    Other(String),
}

impl MentionKind {
    pub fn as_str(&self) -> &str {
        match self {
            MentionKind::DiseaseDisorder => "DiseaseDisorderMention",
            MentionKind::SignSymptom => "SignSymptomMention",
            MentionKind::Procedure => "ProcedureMention",
            MentionKind::AnatomicalSite => "AnatomicalSiteMention",
            MentionKind::Medication => "MedicationMention",
            MentionKind::Lab => "LabMention",
            MentionKind::PostProcessing => "PostProcessing",
            MentionKind::Attribute => "Attribute",
            MentionKind::Other(label) => label,
        }
    }
}

impl From<String> for MentionKind {
    fn from(label: String) -> Self {
        match label.as_str() {
            "DiseaseDisorderMention" => MentionKind::DiseaseDisorder,
            "SignSymptomMention" => MentionKind::SignSymptom,
            "ProcedureMention" => MentionKind::Procedure,
            "AnatomicalSiteMention" => MentionKind::AnatomicalSite,
            "MedicationMention" => MentionKind::Medication,
            "LabMention" => MentionKind::Lab,
            "PostProcessing" => MentionKind::PostProcessing,
            "Attribute" => MentionKind::Attribute,
            _ => MentionKind::Other(label),
        }
    }
}

impl From<MentionKind> for String {
    fn from(kind: MentionKind) -> Self {
        kind.as_str().to_string()
    }
}

/// Dependency edge carried by a syntax token. The token is the dependent (origin),
/// the head is the destination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyInfo {
    pub id: String,
    pub relation: RelationLabel,
    #[serde(default)]
    pub head_id: Option<String>,
    #[serde(default)]
    pub head_begin: Option<usize>,
    #[serde(default)]
    pub head_end: Option<usize>,
}

impl DependencyInfo {
    pub fn head_span(&self) -> Option<Span> {
        match (self.head_begin, self.head_end) {
            (Some(begin), Some(end)) => Some(Span::new(begin, end)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntaxToken {
    #[serde(rename = "type")]
    pub kind: String,
    pub begin: usize,
    pub end: usize,
    #[serde(default)]
    pub token_number: Option<u32>,
    #[serde(default)]
    pub dependency: Option<DependencyInfo>,
}

impl SyntaxToken {
    pub fn span(&self) -> Span {
        Span::new(self.begin, self.end)
    }
}

/// Ontology code attached to a mention.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConceptRef {
    pub system: String,
    pub code: String,
    #[serde(default)]
    pub cui: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemanticMention {
    #[serde(rename = "type")]
    pub kind: MentionKind,
    pub begin: usize,
    pub end: usize,
    #[serde(default)]
    pub polarity: Polarity,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub history_of: bool,
    #[serde(default)]
    pub concepts: Vec<ConceptRef>,
}

impl SemanticMention {
    pub fn span(&self) -> Span {
        Span::new(self.begin, self.end)
    }
}

/// Timing block reported by the annotation service. Durations are in milliseconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpstreamTimings {
    #[serde(default)]
    pub environment: Option<f64>,
    /// Whether the service's parser was already loaded for this request
    #[serde(default, deserialize_with = "flag")]
    pub existed: Option<bool>,
    #[serde(default)]
    pub parsing: Option<f64>,
}

/// Accepts `true`/`false` as booleans or as strings.
fn flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Text(String),
    }

    Ok(match Option::<Flag>::deserialize(deserializer)? {
        Some(Flag::Bool(value)) => Some(value),
        Some(Flag::Text(text)) => Some(text.eq_ignore_ascii_case("true")),
        None => None,
    })
}

/// One annotated document as returned by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedDocument {
    pub input: String,
    #[serde(default)]
    pub syntax: Vec<SyntaxToken>,
    #[serde(default)]
    pub semantic: Vec<SemanticMention>,
    #[serde(default)]
    pub timings: UpstreamTimings,
}
