//! Concept resolution.
//!
//! Turns a raw `(system, code)` reference and its span into a [`Concept`]: activity,
//! closure ancestors, exclusion and inclusion flags, descriptions, similarity to the
//! mention text, and the substitutes that stand in for inactive or foreign-system codes.

pub mod similarity;

pub use similarity::{normalize, similarity, similarity_normalized};

use std::collections::{BTreeSet, VecDeque};
use std::sync::Arc;

use crate::config::OntologyConfig;
use crate::models::{
    Concept, ConceptArena, ConceptId, DiscoveryScore, MentionKind, ParseWarning, Polarity, Span,
};
use crate::storage::{OntologyStore, StorageResult};

/// Resolution rules taken from the ontology configuration.
#[derive(Debug, Clone)]
pub struct ResolverSettings {
    pub primary_system: String,
    pub fsn_type_id: String,
    pub excluded_ancestors: BTreeSet<String>,
    pub max_substitution_depth: usize,
}

impl From<&OntologyConfig> for ResolverSettings {
    fn from(config: &OntologyConfig) -> Self {
        Self {
            primary_system: config.primary_system.clone(),
            fsn_type_id: config.fsn_type_id.clone(),
            excluded_ancestors: config.excluded_ancestors.iter().cloned().collect(),
            max_substitution_depth: config.max_substitution_depth,
        }
    }
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self::from(&OntologyConfig::default())
    }
}

/// A concept reference as it arrives from a mention or a search.
#[derive(Debug, Clone)]
pub struct ConceptRequest {
    pub kind: MentionKind,
    pub system: String,
    pub code: String,
    pub cui: Option<String>,
    pub span: Span,
    pub text: String,
    pub polarity: Polarity,
    pub subject: Option<String>,
    pub history_of: bool,
    pub score: DiscoveryScore,
}

impl ConceptRequest {
    pub fn new(
        kind: MentionKind,
        system: impl Into<String>,
        code: impl Into<String>,
        span: Span,
        text: impl Into<String>,
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
            score: DiscoveryScore::DirectMatch,
        }
    }

    pub fn with_score(mut self, score: DiscoveryScore) -> Self {
        self.score = score;
        self
    }

    pub fn with_polarity(mut self, polarity: Polarity) -> Self {
        self.polarity = polarity;
        self
    }

    pub fn with_cui(mut self, cui: Option<String>) -> Self {
        self.cui = cui;
        self
    }

    /// Same mention, another code of the primary system.
    fn substitute(&self, system: &str, code: String, score: DiscoveryScore) -> Self {
        Self {
            system: system.to_string(),
            code,
            score,
            ..self.clone()
        }
    }
}

struct Pending {
    request: ConceptRequest,
    parent: Option<ConceptId>,
    depth: usize,
}

/// Resolves concept references against an [`OntologyStore`].
#[derive(Debug, Clone)]
pub struct ConceptResolver {
    store: Arc<dyn OntologyStore>,
    settings: ResolverSettings,
}

impl ConceptResolver {
    pub fn new(store: Arc<dyn OntologyStore>, settings: ResolverSettings) -> Self {
        Self { store, settings }
    }

    pub fn settings(&self) -> &ResolverSettings {
        &self.settings
    }

    pub fn store(&self) -> &Arc<dyn OntologyStore> {
        &self.store
    }

    /// Resolve `request` into `arena` along with its substitutes.
    ///
    /// Substitutes are resolved breadth-first from a worklist and linked to the concept
    /// they replace. Chains deeper than `max_substitution_depth` are cut off with a
    /// [`ParseWarning::SubstitutionDepth`]. Codes the store does not know resolve to an
    /// inactive concept without descriptions.
    pub async fn resolve(
        &self,
        arena: &mut ConceptArena,
        request: ConceptRequest,
        included: &BTreeSet<String>,
        warnings: &mut Vec<ParseWarning>,
    ) -> StorageResult<ConceptId> {
        let mut queue = VecDeque::from([Pending {
            request,
            parent: None,
            depth: 0,
        }]);
        let mut root = None;

        while let Some(Pending {
            request,
            parent,
            depth,
        }) = queue.pop_front()
        {
            if depth > self.settings.max_substitution_depth {
                tracing::warn!(
                    code = %request.code,
                    depth,
                    "Substitution chain too deep, stopping"
                );
                warnings.push(ParseWarning::SubstitutionDepth { code: request.code });
                continue;
            }

            let (mut concept, next) = self.load(&request, included).await?;
            concept.substitute_of = parent;
            let id = arena.insert(concept);

            match parent {
                Some(parent) => arena[parent].substitutes.push(id),
                None => root = Some(id),
            }

            for substitute in next {
                queue.push_back(Pending {
                    request: substitute,
                    parent: Some(id),
                    depth: depth + 1,
                });
            }
        }

        // The first item is never cut off: depth 0 is within every bound.
        root.ok_or_else(|| {
            crate::storage::StorageError::Other("resolution produced no concept".to_string())
        })
    }

    /// Build one concept and the requests for its substitutes.
    async fn load(
        &self,
        request: &ConceptRequest,
        included: &BTreeSet<String>,
    ) -> StorageResult<(Concept, Vec<ConceptRequest>)> {
        let mut concept = Concept::new(
            request.kind.clone(),
            request.system.clone(),
            request.code.clone(),
            request.span,
            request.text.clone(),
            request.score,
        );
        concept.cui = request.cui.clone();
        concept.polarity = request.polarity;
        concept.subject = request.subject.clone();
        concept.history_of = request.history_of;

        if request.system != self.settings.primary_system {
            return self.load_foreign(concept, request).await;
        }

        let Some(record) = self.store.concept(&request.code).await? else {
            tracing::debug!(code = %request.code, "Concept not in ontology");
            return Ok((concept, Vec::new()));
        };
        concept.active = record.active;

        concept.ancestors = self.store.ancestors(&request.code).await?;
        concept.excluded = concept
            .ancestors
            .iter()
            .any(|a| self.settings.excluded_ancestors.contains(a));
        concept.included = concept.ancestors.iter().any(|a| included.contains(a));

        let mut substitutes = Vec::new();
        if !concept.active {
            if let Some(target) = self.store.replacement(&request.code).await? {
                tracing::debug!(code = %request.code, %target, "Inactive concept replaced");
                substitutes.push(request.substitute(
                    &self.settings.primary_system,
                    target,
                    DiscoveryScore::Substitution,
                ));
            }
        }

        for description in self.store.descriptions(&request.code).await? {
            if !description.active {
                concept.inactive_descriptions.push(description.term);
            } else if description.type_id == self.settings.fsn_type_id {
                concept.fsn = Some(description.term);
            } else {
                if concept.score <= DiscoveryScore::FullTextMatch
                    && description.term.to_lowercase() == concept.text.to_lowercase()
                {
                    concept.score = DiscoveryScore::FullTextMatch;
                    concept.matched_description = Some(description.term.clone());
                }
                concept.active_descriptions.push(description.term);
            }
        }

        concept.similarity = best_similarity(&concept.text, &concept.active_descriptions);

        Ok((concept, substitutes))
    }

    /// Codes outside the primary system are mapped through their UMLS CUI.
    async fn load_foreign(
        &self,
        concept: Concept,
        request: &ConceptRequest,
    ) -> StorageResult<(Concept, Vec<ConceptRequest>)> {
        let Some(cui) = request.cui.as_deref() else {
            tracing::debug!(system = %request.system, code = %request.code, "No CUI to map");
            return Ok((concept, Vec::new()));
        };

        let substitutes = self
            .store
            .codes_for_cui(cui)
            .await?
            .into_iter()
            .map(|code| {
                request.substitute(
                    &self.settings.primary_system,
                    code,
                    DiscoveryScore::DirectMatch,
                )
            })
            .collect::<Vec<_>>();

        tracing::debug!(
            system = %request.system,
            cui,
            substitutes = substitutes.len(),
            "Mapped foreign concept"
        );
        Ok((concept, substitutes))
    }
}

/// Highest similarity between `text` and any of `descriptions`.
pub fn best_similarity(text: &str, descriptions: &[String]) -> f64 {
    let text = normalize(text);
    descriptions
        .iter()
        .map(|d| similarity_normalized(&text, &normalize(d)))
        .fold(0.0, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryOntologyStore, OntologySnapshot};

    async fn resolver() -> ConceptResolver {
        let snapshot = OntologySnapshot::builder()
            .concept("404684003", "Clinical finding (finding)")
            .concept("709044004", "Chronic kidney disease (disorder)")
            .synonym("709044004", "Chronic kidney disease")
            .retired_synonym("709044004", "Chronic renal disease")
            .is_a("709044004", "404684003")
            .inactive_concept("236425005", "Chronic renal failure (disorder)")
            .replaced_by("236425005", "709044004", "20170731")
            .inactive_concept("1001", "Loop A (disorder)")
            .inactive_concept("1002", "Loop B (disorder)")
            .replaced_by("1001", "1002", "20200101")
            .replaced_by("1002", "1001", "20200101")
            .concept("370136006", "Namespace concept (namespace concept)")
            .concept("370136006001", "Some namespace (namespace concept)")
            .is_a("370136006001", "370136006")
            .cui("C1561643", "709044004")
            .build();
        let store = MemoryOntologyStore::from_snapshot(snapshot).await;
        let edges = store.is_a_edges().await.unwrap();
        store
            .replace_closure(crate::closure::compute_closure(&edges).into_pairs())
            .await
            .unwrap();
        ConceptResolver::new(Arc::new(store), ResolverSettings::default())
    }

    fn request(system: &str, code: &str, text: &str) -> ConceptRequest {
        ConceptRequest::new(
            MentionKind::DiseaseDisorder,
            system,
            code,
            Span::new(0, text.chars().count()),
            text,
        )
    }

    fn included(codes: &[&str]) -> BTreeSet<String> {
        codes.iter().map(|c| c.to_string()).collect()
    }

    #[tokio::test]
    async fn test_active_concept_descriptions_and_flags() {
        let resolver = resolver().await;
        let mut arena = ConceptArena::new();
        let mut warnings = Vec::new();

        let id = resolver
            .resolve(
                &mut arena,
                request("SNOMEDCT", "709044004", "chronic KIDNEY disease"),
                &included(&["404684003"]),
                &mut warnings,
            )
            .await
            .unwrap();

        let concept = &arena[id];
        assert!(concept.active);
        assert!(concept.included);
        assert!(!concept.excluded);
        assert_eq!(concept.fsn.as_deref(), Some("Chronic kidney disease (disorder)"));
        assert_eq!(concept.active_descriptions, vec!["Chronic kidney disease"]);
        assert_eq!(concept.inactive_descriptions, vec!["Chronic renal disease"]);
        assert_eq!(concept.score, DiscoveryScore::FullTextMatch);
        assert_eq!(concept.matched_description.as_deref(), Some("Chronic kidney disease"));
        assert_eq!(concept.similarity, 1.0);
        assert!(warnings.is_empty());
    }

    #[tokio::test]
    async fn test_inactive_concept_gets_substitute() {
        let resolver = resolver().await;
        let mut arena = ConceptArena::new();
        let mut warnings = Vec::new();

        let id = resolver
            .resolve(
                &mut arena,
                request("SNOMEDCT", "236425005", "CRF"),
                &BTreeSet::new(),
                &mut warnings,
            )
            .await
            .unwrap();

        let original = &arena[id];
        assert!(!original.active);
        assert_eq!(original.fsn.as_deref(), Some("Chronic renal failure (disorder)"));
        assert_eq!(original.substitutes.len(), 1);

        let substitute = &arena[original.substitutes[0]];
        assert_eq!(substitute.code, "709044004");
        assert!(substitute.active);
        assert_eq!(substitute.score, DiscoveryScore::Substitution);
        assert_eq!(substitute.substitute_of, Some(id));
        assert_eq!(substitute.span, original.span);
    }

    #[tokio::test]
    async fn test_replacement_loop_is_bounded() {
        let resolver = resolver().await;
        let mut arena = ConceptArena::new();
        let mut warnings = Vec::new();

        resolver
            .resolve(
                &mut arena,
                request("SNOMEDCT", "1001", "loop"),
                &BTreeSet::new(),
                &mut warnings,
            )
            .await
            .unwrap();

        // the original plus three levels of substitutes
        assert_eq!(arena.len(), 4);
        assert!(matches!(
            warnings.as_slice(),
            [ParseWarning::SubstitutionDepth { .. }]
        ));
    }

    #[tokio::test]
    async fn test_unknown_code_and_exclusion() {
        let resolver = resolver().await;
        let mut arena = ConceptArena::new();
        let mut warnings = Vec::new();

        let unknown = resolver
            .resolve(
                &mut arena,
                request("SNOMEDCT", "999999", "nothing"),
                &BTreeSet::new(),
                &mut warnings,
            )
            .await
            .unwrap();
        assert!(!arena[unknown].active);
        assert!(arena[unknown].fsn.is_none());
        assert!(arena[unknown].ancestors.is_empty());

        let namespace = resolver
            .resolve(
                &mut arena,
                request("SNOMEDCT", "370136006001", "namespace"),
                &BTreeSet::new(),
                &mut warnings,
            )
            .await
            .unwrap();
        assert!(arena[namespace].excluded);
    }

    #[tokio::test]
    async fn test_foreign_system_maps_through_cui() {
        let resolver = resolver().await;
        let mut arena = ConceptArena::new();
        let mut warnings = Vec::new();

        let id = resolver
            .resolve(
                &mut arena,
                request("cancer", "X1", "CKD").with_cui(Some("C1561643".to_string())),
                &BTreeSet::new(),
                &mut warnings,
            )
            .await
            .unwrap();

        assert!(!arena[id].active);
        let substitutes = &arena[id].substitutes;
        assert_eq!(substitutes.len(), 1);
        assert_eq!(arena[substitutes[0]].system, "SNOMEDCT");
        assert_eq!(arena[substitutes[0]].score, DiscoveryScore::DirectMatch);
        assert!(arena[substitutes[0]].active);
    }

    #[test]
    fn test_best_similarity() {
        let descriptions = vec!["Kidney disease".to_string(), "Renal disease".to_string()];
        assert_eq!(best_similarity("kidney disease", &descriptions), 1.0);
        assert_eq!(best_similarity("kidney disease", &[]), 0.0);
    }
}
