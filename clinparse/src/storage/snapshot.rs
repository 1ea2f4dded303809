//! Portable ontology content.
//!
//! A snapshot is what the stores import: the RF2 loader produces one, the in-memory
//! store persists as one, and tests build small ones with [`SnapshotBuilder`].

use crate::config::{FSN_TYPE_ID, SNOMED_ROOT};
use crate::storage::errors::StorageResult;
use crate::storage::models::*;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Synonym description type
pub const SYNONYM_TYPE_ID: &str = "900000000000013009";

const SNAPSHOT_FORMAT: u32 = 1;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OntologySnapshot {
    #[serde(default)]
    pub format: u32,
    #[serde(default)]
    pub concepts: Vec<ConceptRecord>,
    #[serde(default)]
    pub descriptions: Vec<DescriptionRecord>,
    #[serde(default)]
    pub is_a: Vec<IsAEdge>,
    #[serde(default)]
    pub associations: Vec<AssociationRecord>,
    #[serde(default)]
    pub attribute_domains: Vec<AttributeDomainRule>,
    #[serde(default)]
    pub attribute_ranges: Vec<AttributeRangeRule>,
    #[serde(default)]
    pub cui_mappings: Vec<CuiMapping>,
    /// Materialized closure; empty until built
    #[serde(default)]
    pub closure: Vec<ClosurePair>,
}

impl OntologySnapshot {
    pub fn builder() -> SnapshotBuilder {
        SnapshotBuilder::default()
    }

    pub async fn load(path: &Path) -> StorageResult<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        let snapshot: OntologySnapshot = serde_json::from_str(&content)?;

        tracing::info!(
            concepts = snapshot.concepts.len(),
            descriptions = snapshot.descriptions.len(),
            closure_pairs = snapshot.closure.len(),
            "Loaded ontology snapshot from {}",
            path.display()
        );

        Ok(snapshot)
    }

    /// Write to a temp file first, then rename over `path`.
    pub async fn save(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut snapshot = self.clone();
        snapshot.format = SNAPSHOT_FORMAT;
        let content = serde_json::to_vec(&snapshot)?;

        let temp_path = path.with_extension("json.tmp");
        tokio::fs::write(&temp_path, content).await?;
        tokio::fs::rename(&temp_path, path).await?;

        Ok(())
    }

    pub fn summary(&self) -> SnapshotSummary {
        SnapshotSummary {
            concepts: self.concepts.len(),
            descriptions: self.descriptions.len(),
            is_a_edges: self.is_a.len(),
            associations: self.associations.len(),
            attribute_rules: self.attribute_domains.len() + self.attribute_ranges.len(),
            cui_mappings: self.cui_mappings.len(),
            closure_pairs: self.closure.len(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotSummary {
    pub concepts: usize,
    pub descriptions: usize,
    pub is_a_edges: usize,
    pub associations: usize,
    pub attribute_rules: usize,
    pub cui_mappings: usize,
    pub closure_pairs: usize,
}

/// Small hand-written ontologies.
///
/// ```
/// use clinparse::storage::OntologySnapshot;
///
/// let snapshot = OntologySnapshot::builder()
///     .concept("64572001", "Disease (disorder)")
///     .concept("73211009", "Diabetes mellitus (disorder)")
///     .synonym("73211009", "Diabetes mellitus")
///     .is_a("73211009", "64572001")
///     .build();
/// assert_eq!(snapshot.is_a.len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct SnapshotBuilder {
    snapshot: OntologySnapshot,
    next_description: u64,
}

impl SnapshotBuilder {
    /// Active concept with an FSN. Concepts without a parent hang below the root.
    pub fn concept(mut self, code: &str, fsn: &str) -> Self {
        self.snapshot.concepts.push(ConceptRecord {
            code: code.to_string(),
            active: true,
        });
        self.push_description(code, fsn, true, FSN_TYPE_ID);
        self
    }

    pub fn inactive_concept(mut self, code: &str, fsn: &str) -> Self {
        self.snapshot.concepts.push(ConceptRecord {
            code: code.to_string(),
            active: false,
        });
        self.push_description(code, fsn, true, FSN_TYPE_ID);
        self
    }

    pub fn synonym(mut self, code: &str, term: &str) -> Self {
        self.push_description(code, term, true, SYNONYM_TYPE_ID);
        self
    }

    pub fn retired_synonym(mut self, code: &str, term: &str) -> Self {
        self.push_description(code, term, false, SYNONYM_TYPE_ID);
        self
    }

    pub fn is_a(mut self, child: &str, parent: &str) -> Self {
        self.snapshot.is_a.push(IsAEdge {
            source: child.to_string(),
            destination: parent.to_string(),
        });
        self
    }

    pub fn replaced_by(mut self, old: &str, new: &str, effective_time: &str) -> Self {
        self.snapshot.associations.push(AssociationRecord {
            source: old.to_string(),
            target: new.to_string(),
            active: true,
            effective_time: effective_time.to_string(),
        });
        self
    }

    pub fn attribute(mut self, attribute: &str, domain: &str, range: &str) -> Self {
        self.snapshot.attribute_domains.push(AttributeDomainRule {
            attribute: attribute.to_string(),
            domain: domain.to_string(),
        });
        self.snapshot.attribute_ranges.push(AttributeRangeRule {
            attribute: attribute.to_string(),
            range: range.to_string(),
        });
        self
    }

    pub fn cui(mut self, cui: &str, code: &str) -> Self {
        self.snapshot.cui_mappings.push(CuiMapping {
            cui: cui.to_string(),
            code: code.to_string(),
        });
        self
    }

    /// Adds the root concept and hangs every parentless active concept below it.
    pub fn build(mut self) -> OntologySnapshot {
        if !self.snapshot.concepts.iter().any(|c| c.code == SNOMED_ROOT) {
            self.snapshot.concepts.push(ConceptRecord {
                code: SNOMED_ROOT.to_string(),
                active: true,
            });
            self.push_description(SNOMED_ROOT, "SNOMED CT Concept (SNOMED RT+CTV3)", true, FSN_TYPE_ID);
        }

        let orphans: Vec<String> = self
            .snapshot
            .concepts
            .iter()
            .filter(|c| c.active && c.code != SNOMED_ROOT)
            .filter(|c| !self.snapshot.is_a.iter().any(|e| e.source == c.code))
            .map(|c| c.code.clone())
            .collect();
        for code in orphans {
            self.snapshot.is_a.push(IsAEdge {
                source: code,
                destination: SNOMED_ROOT.to_string(),
            });
        }

        self.snapshot.format = SNAPSHOT_FORMAT;
        self.snapshot
    }

    fn push_description(&mut self, code: &str, term: &str, active: bool, type_id: &str) {
        self.next_description += 1;
        self.snapshot.descriptions.push(DescriptionRecord {
            id: format!("d{}", self.next_description),
            concept_code: code.to_string(),
            term: term.to_string(),
            active,
            type_id: type_id.to_string(),
        });
    }
}
