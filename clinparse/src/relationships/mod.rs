//! Dependency relationships between annotated spans.
//!
//! Every syntax token that carries dependency information becomes a [`Relationship`]
//! from the token (origin) to its head (destination). Concepts are attached to the
//! relationships whose spans they cover; relationships with concepts on both ends are
//! then asked for attribute edges between those concepts.

pub mod focus;

pub use focus::parse_focus;

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::models::{
    ConceptArena, ConceptId, ConceptLabel, MentionKind, ParseWarning, Polarity, RelationLabel,
    Relationship, RelationshipAttribute, RelationshipEntry, RelationshipId, SourceText, Span,
    SyntaxToken,
};
use crate::resolver::{ConceptRequest, ConceptResolver};

/// Words reachable from a relationship through its dependencies.
#[derive(Debug, Clone, PartialEq)]
pub struct DependencyPhrase {
    /// Origin text of every visited relationship, by span
    pub words: BTreeMap<Span, String>,
    /// Negative once any visited origin concept is negated
    pub polarity: Polarity,
}

#[derive(Debug, Clone, Default)]
pub struct RelationshipGraph {
    relationships: Vec<Relationship>,
    by_id: HashMap<String, RelationshipId>,
    attributes: Vec<RelationshipAttribute>,
}

impl RelationshipGraph {
    /// One relationship per token with dependency information.
    pub fn build(tokens: &[SyntaxToken], text: &SourceText) -> Self {
        let mut graph = Self::default();

        for token in tokens {
            let Some(dependency) = &token.dependency else {
                continue;
            };

            let origin = token.span();
            let id = RelationshipId(graph.relationships.len());
            graph.by_id.entry(dependency.id.clone()).or_insert(id);
            graph.relationships.push(Relationship {
                id: dependency.id.clone(),
                head_id: dependency.head_id.clone(),
                label: dependency.relation.clone(),
                text: text.slice(origin).unwrap_or_default().to_string(),
                origin,
                destination: dependency
                    .head_span()
                    .filter(|span| span.fits(text.char_len())),
                origin_concepts: Vec::new(),
                destination_concepts: Vec::new(),
                dependencies: Vec::new(),
            });
        }

        tracing::debug!(relationships = graph.relationships.len(), "Built relationship graph");
        graph
    }

    pub fn len(&self) -> usize {
        self.relationships.len()
    }

    pub fn is_empty(&self) -> bool {
        self.relationships.is_empty()
    }

    pub fn get(&self, id: RelationshipId) -> Option<&Relationship> {
        self.relationships.get(id.0)
    }

    pub fn find(&self, id: &str) -> Option<RelationshipId> {
        self.by_id.get(id).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (RelationshipId, &Relationship)> {
        self.relationships
            .iter()
            .enumerate()
            .map(|(index, relationship)| (RelationshipId(index), relationship))
    }

    /// Relationships with concepts on both ends, root excluded.
    pub fn qualifying(&self) -> impl Iterator<Item = (RelationshipId, &Relationship)> {
        self.iter().filter(|(_, r)| r.is_qualifying())
    }

    /// Attach `concept` to every relationship whose origin or destination covers
    /// `position`. Attaching twice has no effect.
    pub fn add_concept(&mut self, position: usize, concept: ConceptId) {
        for relationship in &mut self.relationships {
            if relationship.origin.covers(position) && !relationship.origin_concepts.contains(&concept)
            {
                relationship.origin_concepts.push(concept);
            }
            if relationship.destination.is_some_and(|d| d.covers(position))
                && !relationship.destination_concepts.contains(&concept)
            {
                relationship.destination_concepts.push(concept);
            }
        }
    }

    /// [`add_concept`](Self::add_concept) at every position of `span`.
    pub fn attach(&mut self, concept: ConceptId, span: Span) {
        for position in span.positions() {
            self.add_concept(position, concept);
        }
    }

    /// Detach all concepts and drop discovered attributes.
    pub fn clear_concepts(&mut self) {
        for relationship in &mut self.relationships {
            relationship.origin_concepts.clear();
            relationship.destination_concepts.clear();
        }
        self.attributes.clear();
    }

    /// Register each relationship labelled with one of `labels` as a dependency of
    /// its head. Heads missing from the document are reported and skipped.
    pub fn parse_relationships(&mut self, labels: &[RelationLabel]) -> Vec<ParseWarning> {
        let mut warnings = Vec::new();

        for index in 0..self.relationships.len() {
            let relationship = &self.relationships[index];
            if !labels.contains(&relationship.label) {
                continue;
            }
            let Some(head_id) = relationship.head_id.clone() else {
                continue;
            };

            match self.by_id.get(&head_id).copied() {
                Some(head) if head.0 != index => {
                    let dependent = RelationshipId(index);
                    let dependencies = &mut self.relationships[head.0].dependencies;
                    if !dependencies.contains(&dependent) {
                        dependencies.push(dependent);
                    }
                }
                Some(_) => {}
                None => {
                    let id = relationship.id.clone();
                    tracing::warn!(%id, %head_id, "Dependency head not found, skipping");
                    warnings.push(ParseWarning::MissingHead { id, head_id });
                }
            }
        }

        warnings
    }

    /// Collect the words of `start` and of everything that depends on it.
    pub fn parse_dependencies(&self, start: RelationshipId, arena: &ConceptArena) -> DependencyPhrase {
        let mut phrase = DependencyPhrase {
            words: BTreeMap::new(),
            polarity: Polarity::Positive,
        };
        let mut visited = HashSet::new();
        let mut stack = vec![start];

        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            let Some(relationship) = self.get(id) else {
                continue;
            };

            phrase
                .words
                .insert(relationship.origin, relationship.text.clone());

            // one negated origin concept anywhere in the walk negates the phrase
            if relationship
                .origin_concepts
                .iter()
                .any(|&c| arena[c].polarity == Polarity::Negative)
            {
                phrase.polarity = Polarity::Negative;
            }

            stack.extend(relationship.dependencies.iter().rev().copied());
        }

        phrase
    }

    /// Look up attribute edges on every qualifying relationship.
    ///
    /// For each origin/destination pair with different codes the store names the
    /// attributes whose domain covers the destination and whose range covers the origin.
    /// Attribute concepts are resolved once per code. Store failures become
    /// [`ParseWarning::Unresolved`] and the pair is skipped.
    pub async fn attribute_concepts(
        &mut self,
        resolver: &ConceptResolver,
        arena: &mut ConceptArena,
        warnings: &mut Vec<ParseWarning>,
    ) -> usize {
        let mut cache: HashMap<String, ConceptId> = HashMap::new();
        let mut found = Vec::new();

        for (relationship_id, relationship) in self.qualifying() {
            for &origin in &relationship.origin_concepts {
                for &destination in &relationship.destination_concepts {
                    let (origin_code, destination_code) =
                        (arena[origin].code.clone(), arena[destination].code.clone());
                    if origin_code == destination_code {
                        continue;
                    }

                    let codes = match resolver
                        .store()
                        .attribute_codes(&destination_code, &origin_code)
                        .await
                    {
                        Ok(codes) => codes,
                        Err(e) => {
                            let span = arena[destination].span;
                            tracing::warn!(code = %destination_code, error = %e, "Attribute rule lookup failed");
                            warnings.push(ParseWarning::Unresolved {
                                code: destination_code,
                                begin: span.begin,
                                end: span.end,
                                error: e.to_string(),
                            });
                            continue;
                        }
                    };

                    for code in codes {
                        let attribute = match cache.get(&code) {
                            Some(&id) => id,
                            None => {
                                let request = ConceptRequest::new(
                                    MentionKind::Attribute,
                                    resolver.settings().primary_system.clone(),
                                    code.clone(),
                                    Span::new(0, 0),
                                    "",
                                );
                                match resolver
                                    .resolve(arena, request, &Default::default(), warnings)
                                    .await
                                {
                                    Ok(id) => {
                                        cache.insert(code, id);
                                        id
                                    }
                                    Err(e) => {
                                        tracing::warn!(%code, error = %e, "Attribute lookup failed");
                                        warnings.push(ParseWarning::Unresolved {
                                            code,
                                            begin: 0,
                                            end: 0,
                                            error: e.to_string(),
                                        });
                                        continue;
                                    }
                                }
                            }
                        };

                        let edge = RelationshipAttribute {
                            relationship: relationship_id,
                            origin,
                            destination,
                            attribute,
                        };
                        if !found.contains(&edge) {
                            found.push(edge);
                        }
                    }
                }
            }
        }

        tracing::debug!(attributes = found.len(), "Discovered attribute edges");
        let count = found.len();
        self.attributes = found;
        count
    }

    /// Every discovered attribute edge.
    pub fn attributes(&self) -> &[RelationshipAttribute] {
        &self.attributes
    }

    /// Attribute edges between concepts at different spans, one per
    /// (destination, attribute, origin) combination.
    pub fn unique_attributes(&self, arena: &ConceptArena) -> Vec<RelationshipAttribute> {
        let mut seen = HashSet::new();
        self.attributes
            .iter()
            .filter(|edge| arena[edge.origin].span != arena[edge.destination].span)
            .filter(|edge| {
                seen.insert((
                    edge.destination,
                    arena[edge.attribute].code.clone(),
                    arena[edge.origin].code.clone(),
                ))
            })
            .copied()
            .collect()
    }

    /// Concept pairs of the qualifying relationships, skipping pairs with equal codes.
    pub fn relationship_entries(&self, arena: &ConceptArena) -> Vec<RelationshipEntry> {
        let mut entries = Vec::new();
        for (_, relationship) in self.qualifying() {
            for &origin in &relationship.origin_concepts {
                for &destination in &relationship.destination_concepts {
                    if arena[origin].code == arena[destination].code {
                        continue;
                    }
                    entries.push(RelationshipEntry {
                        label: relationship.label.to_string(),
                        origin: ConceptLabel::from(&arena[origin]),
                        destination: ConceptLabel::from(&arena[destination]),
                    });
                }
            }
        }
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Concept, DependencyInfo, DiscoveryScore};
    use crate::resolver::ResolverSettings;
    use crate::storage::{MemoryOntologyStore, OntologySnapshot, OntologyStore};
    use std::sync::Arc;

    // "no chronic kidney disease"
    //  0  3       11     18
    fn token(begin: usize, end: usize, id: &str, relation: &str, head: Option<(&str, usize, usize)>) -> SyntaxToken {
        SyntaxToken {
            kind: "ConllDependencyNode".to_string(),
            begin,
            end,
            token_number: None,
            dependency: Some(DependencyInfo {
                id: id.to_string(),
                relation: RelationLabel::from(relation.to_string()),
                head_id: head.map(|h| h.0.to_string()),
                head_begin: head.map(|h| h.1),
                head_end: head.map(|h| h.2),
            }),
        }
    }

    fn graph() -> (RelationshipGraph, SourceText) {
        let text = SourceText::new("no chronic kidney disease");
        let tokens = vec![
            token(0, 2, "1", "det", Some(("4", 18, 25))),
            token(3, 10, "2", "amod", Some(("4", 18, 25))),
            token(11, 17, "3", "nn", Some(("4", 18, 25))),
            token(18, 25, "4", "root", None),
        ];
        (RelationshipGraph::build(&tokens, &text), text)
    }

    fn concept(code: &str, begin: usize, end: usize, polarity: Polarity) -> Concept {
        let mut c = Concept::new(
            MentionKind::DiseaseDisorder,
            "SNOMEDCT",
            code,
            Span::new(begin, end),
            code,
            DiscoveryScore::DirectMatch,
        );
        c.active = true;
        c.polarity = polarity;
        c
    }

    fn labels() -> Vec<RelationLabel> {
        crate::config::RelationshipConfig::default().dependency_labels
    }

    #[test]
    fn test_build_and_link() {
        let (mut graph, _) = graph();
        assert_eq!(graph.len(), 4);
        assert_eq!(graph.get(RelationshipId(0)).unwrap().text, "no");

        let warnings = graph.parse_relationships(&labels());
        assert!(warnings.is_empty());

        let root = graph.find("4").unwrap();
        // "det" is not a linking label
        assert_eq!(graph.get(root).unwrap().dependencies.len(), 2);
    }

    #[test]
    fn test_missing_head_is_reported() {
        let text = SourceText::new("pain");
        let tokens = vec![token(0, 4, "1", "nsubj", Some(("9", 0, 4)))];
        let mut graph = RelationshipGraph::build(&tokens, &text);

        let warnings = graph.parse_relationships(&labels());
        assert_eq!(
            warnings,
            vec![ParseWarning::MissingHead {
                id: "1".to_string(),
                head_id: "9".to_string(),
            }]
        );
    }

    #[test]
    fn test_add_concept_is_idempotent_and_half_open() {
        let (mut graph, _) = graph();
        let mut arena = ConceptArena::new();
        let disease = arena.insert(concept("64572001", 18, 25, Polarity::Positive));

        graph.attach(disease, Span::new(18, 25));
        graph.attach(disease, Span::new(18, 25));

        let root = graph.get(graph.find("4").unwrap()).unwrap();
        assert_eq!(root.origin_concepts, vec![disease]);
        let modifier = graph.get(graph.find("2").unwrap()).unwrap();
        assert_eq!(modifier.destination_concepts, vec![disease]);
        assert!(modifier.origin_concepts.is_empty());

        // position 25 is past the end of [18, 25)
        graph.clear_concepts();
        graph.add_concept(25, disease);
        assert!(graph.iter().all(|(_, r)| r.origin_concepts.is_empty()));
    }

    #[test]
    fn test_one_negated_origin_concept_negates_whole_phrase() {
        let (mut graph, _) = graph();
        graph.parse_relationships(&labels());

        let mut arena = ConceptArena::new();
        let negated = arena.insert(concept("90708001", 11, 17, Polarity::Negative));
        graph.attach(negated, Span::new(11, 17));

        let phrase = graph.parse_dependencies(graph.find("4").unwrap(), &arena);
        let words: Vec<&str> = phrase.words.values().map(String::as_str).collect();
        assert_eq!(words, vec!["chronic", "kidney", "disease"]);
        assert_eq!(phrase.polarity, Polarity::Negative);

        let alone = graph.parse_dependencies(graph.find("2").unwrap(), &arena);
        assert_eq!(alone.words.len(), 1);
        assert_eq!(alone.polarity, Polarity::Positive);
    }

    #[test]
    fn test_dependency_cycle_terminates() {
        let text = SourceText::new("a b");
        let tokens = vec![
            token(0, 1, "1", "nsubj", Some(("2", 2, 3))),
            token(2, 3, "2", "dobj", Some(("1", 0, 1))),
        ];
        let mut graph = RelationshipGraph::build(&tokens, &text);
        graph.parse_relationships(&labels());

        let phrase = graph.parse_dependencies(RelationshipId(0), &ConceptArena::new());
        assert_eq!(phrase.words.len(), 2);
    }

    #[tokio::test]
    async fn test_attribute_concepts_skip_same_code() {
        let snapshot = OntologySnapshot::builder()
            .concept("404684003", "Clinical finding (finding)")
            .concept("709044004", "Chronic kidney disease (disorder)")
            .is_a("709044004", "404684003")
            .concept("123037004", "Body structure (body structure)")
            .concept("64033007", "Kidney structure (body structure)")
            .is_a("64033007", "123037004")
            .concept("363698007", "Finding site (attribute)")
            .attribute("363698007", "404684003", "123037004")
            .build();
        let store = MemoryOntologyStore::from_snapshot(snapshot).await;
        let edges = store.is_a_edges().await.unwrap();
        store
            .replace_closure(crate::closure::compute_closure(&edges).into_pairs())
            .await
            .unwrap();
        let resolver = ConceptResolver::new(Arc::new(store), ResolverSettings::default());

        // "kidney" (origin) modifies "disease" (destination)
        let text = SourceText::new("kidney disease");
        let tokens = vec![
            token(0, 6, "1", "nn", Some(("2", 7, 14))),
            token(7, 14, "2", "root", None),
        ];
        let mut graph = RelationshipGraph::build(&tokens, &text);

        let mut arena = ConceptArena::new();
        let mut site = concept("64033007", 0, 6, Polarity::Positive);
        site.ancestors.insert("123037004".to_string());
        let site = arena.insert(site);
        let disorder = arena.insert(concept("709044004", 7, 14, Polarity::Positive));
        let same = arena.insert(concept("709044004", 0, 6, Polarity::Positive));
        graph.attach(site, Span::new(0, 6));
        graph.attach(same, Span::new(0, 6));
        graph.attach(disorder, Span::new(7, 14));

        let mut warnings = Vec::new();
        let count = graph
            .attribute_concepts(&resolver, &mut arena, &mut warnings)
            .await;

        assert_eq!(count, 1);
        let edge = graph.attributes()[0];
        assert_eq!(arena[edge.origin].code, "64033007");
        assert_eq!(arena[edge.destination].code, "709044004");
        assert_eq!(arena[edge.attribute].code, "363698007");
        assert_eq!(
            arena[edge.attribute].fsn.as_deref(),
            Some("Finding site (attribute)")
        );
        assert!(
            graph
                .attributes()
                .iter()
                .all(|e| arena[e.origin].code != arena[e.destination].code)
        );
        assert_eq!(graph.unique_attributes(&arena).len(), 1);
        assert_eq!(graph.relationship_entries(&arena).len(), 1);
    }
}
