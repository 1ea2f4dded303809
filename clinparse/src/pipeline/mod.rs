//! Per-document processing.
//!
//! One document goes through these stages, each timed:
//!
//! 1. **load**: annotation service call
//! 2. **split**: character index over the input
//! 3. **syntax**: tokens into the index and the relationship graph
//! 4. **semantic**: mention codes resolved into concepts
//! 5. **concepts**: substitution, first overlap pass, per-position selection
//! 6. **relationships**: dependency phrases, combination search, second overlap pass,
//!    attribute discovery
//! 7. **focus**: caller targets matched against the result

pub mod batch;

pub use batch::{BatchDocument, BatchEntry, BatchOutcome, DocumentOutcome};

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::annotation::AnnotationService;
use crate::config::{OntologyConfig, RelationshipConfig, SearchConfig};
use crate::models::{
    AnnotatedDocument, AttributeEntry, ConceptArena, ConceptEntry, ConceptId, ConceptLabel,
    DiscoveryScore, FocusRequest, InactiveLogEntry, MentionKind, OverlapLogEntry, ParseResult,
    ParseWarning, SemanticMention, SourceText, Span, StageTimings, SyntaxToken,
};
use crate::overlap::{OverlapEngine, OverlapPolicy, expand_substitutes, select_unique};
use crate::relationships::{RelationshipGraph, parse_focus};
use crate::render::CharacterIndex;
use crate::resolver::{ConceptRequest, ConceptResolver};
use crate::search::ConceptSearch;
use crate::Result;

/// Caller context for one parse.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseRequest {
    #[serde(default)]
    pub focus: FocusRequest,
    /// Concepts count as included when they descend from one of these. Falls back to
    /// `ontology.default_included_ancestors`.
    #[serde(default)]
    pub included_ancestors: Option<Vec<String>>,
}

impl ParseRequest {
    pub fn with_focus(mut self, focus: FocusRequest) -> Self {
        self.focus = focus;
        self
    }

    pub fn with_included_ancestors(mut self, ancestors: Vec<String>) -> Self {
        self.included_ancestors = Some(ancestors);
        self
    }
}

/// Runs the stages over annotated documents.
#[derive(Debug, Clone)]
pub struct DocumentParser {
    annotation: Arc<dyn AnnotationService>,
    resolver: ConceptResolver,
    search: ConceptSearch,
    ontology: OntologyConfig,
    search_config: SearchConfig,
    relationships: RelationshipConfig,
}

fn millis(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

/// Per-document working state.
struct Document {
    text: SourceText,
    index: CharacterIndex,
    arena: ConceptArena,
    graph: RelationshipGraph,
    included: BTreeSet<String>,
    warnings: Vec<ParseWarning>,
    timings: StageTimings,
}

impl DocumentParser {
    pub fn new(
        annotation: Arc<dyn AnnotationService>,
        resolver: ConceptResolver,
        search: ConceptSearch,
        ontology: OntologyConfig,
        search_config: SearchConfig,
        relationships: RelationshipConfig,
    ) -> Self {
        Self {
            annotation,
            resolver,
            search,
            ontology,
            search_config,
            relationships,
        }
    }

    /// Annotate `text` and parse the result.
    pub async fn parse(&self, text: &str, request: &ParseRequest) -> Result<ParseResult> {
        let start = Instant::now();
        let document = self.annotation.annotate(text).await?;
        let load = millis(start);

        self.parse_document(document, request, load).await
    }

    /// Parse an already annotated document. `load` is the time spent obtaining it.
    pub async fn parse_document(
        &self,
        document: AnnotatedDocument,
        request: &ParseRequest,
        load: f64,
    ) -> Result<ParseResult> {
        let started_at = Utc::now();
        let mut timings = StageTimings {
            environment: document.timings.environment,
            existed: document.timings.existed,
            parsing: document.timings.parsing,
            load,
            ..Default::default()
        };

        let start = Instant::now();
        let text = SourceText::new(document.input);
        let index = CharacterIndex::new(&text);
        timings.split = millis(start);

        let included = request
            .included_ancestors
            .clone()
            .unwrap_or_else(|| self.ontology.default_included_ancestors.clone())
            .into_iter()
            .collect();

        let mut doc = Document {
            text,
            index,
            arena: ConceptArena::new(),
            graph: RelationshipGraph::default(),
            included,
            warnings: Vec::new(),
            timings,
        };

        let start = Instant::now();
        self.syntax_stage(&mut doc, &document.syntax);
        doc.timings.syntax = millis(start);

        let start = Instant::now();
        let roots = self.semantic_stage(&mut doc, &document.semantic).await;
        doc.timings.semantic = millis(start);

        let start = Instant::now();
        let (selected, mut overlap_log, inactive_log) = self.concept_stage(&mut doc, &roots);
        doc.timings.concepts = millis(start);

        let start = Instant::now();
        let (concepts, late_overlaps) = self.relationship_stage(&mut doc, selected).await;
        overlap_log.extend(late_overlaps);
        doc.timings.relationships = millis(start);

        let start = Instant::now();
        let unique_attributes = doc.graph.unique_attributes(&doc.arena);
        let focus = parse_focus(
            &request.focus,
            &doc.arena,
            &concepts,
            &unique_attributes,
            &self.ontology.primary_system,
        );
        doc.timings.focus = millis(start);

        let t = &mut doc.timings;
        t.total = t.load + t.split + t.syntax + t.semantic + t.concepts + t.relationships + t.focus;

        let arena = &doc.arena;
        let result = ParseResult {
            id: Uuid::new_v4(),
            parsed_at: started_at,
            annotated: doc.index.to_annotated_text(),
            focus,
            concepts: concepts
                .iter()
                .map(|&id| &arena[id])
                .filter(|c| c.included && !c.excluded)
                .map(ConceptEntry::from)
                .collect(),
            relationships: doc.graph.relationship_entries(arena),
            attributes: unique_attributes
                .iter()
                .map(|edge| AttributeEntry {
                    origin: ConceptLabel::from(&arena[edge.origin]),
                    attribute: ConceptLabel::from(&arena[edge.attribute]),
                    destination: ConceptLabel::from(&arena[edge.destination]),
                })
                .collect(),
            overlap_log,
            inactive_log,
            warnings: doc.warnings,
            timings: doc.timings,
        };

        info!(
            concepts = result.concepts.len(),
            relationships = result.relationships.len(),
            attributes = result.attributes.len(),
            warnings = result.warnings.len(),
            total_ms = result.timings.total,
            "Parsed document"
        );

        Ok(result)
    }

    fn syntax_stage(&self, doc: &mut Document, tokens: &[SyntaxToken]) {
        let char_len = doc.text.char_len();
        let mut valid = Vec::with_capacity(tokens.len());

        for token in tokens {
            if !token.span().fits(char_len) {
                warn!(kind = %token.kind, begin = token.begin, end = token.end, "Skipping malformed syntax token");
                doc.warnings.push(ParseWarning::MalformedSpan {
                    record: token.kind.clone(),
                    begin: token.begin,
                    end: token.end,
                });
                continue;
            }
            doc.index.add_syntax(token);
            valid.push(token.clone());
        }

        doc.graph = RelationshipGraph::build(&valid, &doc.text);
    }

    async fn semantic_stage(
        &self,
        doc: &mut Document,
        mentions: &[SemanticMention],
    ) -> Vec<ConceptId> {
        let mut roots = Vec::new();

        for mention in mentions {
            let span = mention.span();
            let Some(text) = doc.text.slice(span) else {
                warn!(kind = %mention.kind.as_str(), begin = mention.begin, end = mention.end, "Skipping malformed mention");
                doc.warnings.push(ParseWarning::MalformedSpan {
                    record: mention.kind.as_str().to_string(),
                    begin: mention.begin,
                    end: mention.end,
                });
                continue;
            };
            let text = text.to_string();

            for reference in &mention.concepts {
                let request = ConceptRequest {
                    subject: mention.subject.clone(),
                    history_of: mention.history_of,
                    ..ConceptRequest::new(
                        mention.kind.clone(),
                        reference.system.clone(),
                        reference.code.clone(),
                        span,
                        text.clone(),
                    )
                    .with_polarity(mention.polarity)
                    .with_cui(reference.cui.clone())
                };

                match self
                    .resolver
                    .resolve(&mut doc.arena, request, &doc.included, &mut doc.warnings)
                    .await
                {
                    Ok(id) => roots.push(id),
                    Err(e) => unresolved(doc, &reference.code, span, e),
                }
            }
        }

        debug!(mentions = mentions.len(), concepts = roots.len(), "Resolved mentions");
        roots
    }

    fn concept_stage(
        &self,
        doc: &mut Document,
        roots: &[ConceptId],
    ) -> (Vec<ConceptId>, Vec<OverlapLogEntry>, Vec<InactiveLogEntry>) {
        let (candidates, inactive_log) = expand_substitutes(&doc.arena, roots);
        let overlap_log =
            OverlapEngine::new(OverlapPolicy::Extent).resolve_overlaps(&mut doc.arena, &candidates);
        let selected = select_unique(&doc.arena, &candidates);

        for &id in &selected {
            doc.graph.attach(id, doc.arena[id].span);
        }

        debug!(
            candidates = candidates.len(),
            overlapped = overlap_log.len(),
            selected = selected.len(),
            "Selected concepts"
        );
        (selected, overlap_log, inactive_log)
    }

    /// Discover multi-word concepts and attribute edges. Returns the final concepts.
    async fn relationship_stage(
        &self,
        doc: &mut Document,
        selected: Vec<ConceptId>,
    ) -> (Vec<ConceptId>, Vec<OverlapLogEntry>) {
        let missing = doc
            .graph
            .parse_relationships(&self.relationships.dependency_labels);
        doc.warnings.extend(missing);

        let mut known: HashSet<(Span, String)> = selected
            .iter()
            .map(|&id| (doc.arena[id].span, doc.arena[id].code.clone()))
            .collect();
        let mut candidates = selected;

        let starts: Vec<_> = doc
            .graph
            .iter()
            .filter(|(_, r)| self.relationships.phrase_labels.contains(&r.label))
            .map(|(id, _)| id)
            .collect();

        for start in starts {
            let phrase = doc.graph.parse_dependencies(start, &doc.arena);
            if phrase.words.len() < 2 {
                continue;
            }

            let search_start = Instant::now();
            let found = self.search.search_combinations(&phrase.words).await;
            doc.timings.relationship_concepts += millis(search_start);
            let found = match found {
                Ok(found) => found,
                Err(e) => {
                    let first = phrase.words.keys().next().copied();
                    let last = phrase.words.keys().next_back().copied();
                    let (begin, end) = match (first, last) {
                        (Some(first), Some(last)) => (first.begin, last.end),
                        _ => (0, 0),
                    };
                    warn!(begin, end, error = %e, "Combination search failed, phrase skipped");
                    doc.warnings.push(ParseWarning::PhraseSearch {
                        begin,
                        end,
                        error: e.to_string(),
                    });
                    continue;
                }
            };

            for (span, codes) in found {
                let Some(text) = doc.text.slice(span).map(str::to_string) else {
                    continue;
                };
                for code in codes {
                    if known.contains(&(span, code.clone())) {
                        continue;
                    }

                    let request = ConceptRequest::new(
                        MentionKind::PostProcessing,
                        self.ontology.primary_system.clone(),
                        code.clone(),
                        span,
                        text.clone(),
                    )
                    .with_score(DiscoveryScore::PostProcessing)
                    .with_polarity(phrase.polarity);
                    let id = match self
                        .resolver
                        .resolve(&mut doc.arena, request, &doc.included, &mut doc.warnings)
                        .await
                    {
                        Ok(id) => id,
                        Err(e) => {
                            unresolved(doc, &code, span, e);
                            continue;
                        }
                    };

                    let concept = &doc.arena[id];
                    if concept.active
                        && concept.similarity > self.search_config.promotion_threshold
                    {
                        debug!(%code, %span, similarity = concept.similarity, "Promoted discovered concept");
                        known.insert((span, code));
                        candidates.push(id);
                    }
                }
            }
        }

        let overlap_log = OverlapEngine::new(OverlapPolicy::SimilarityGuarded)
            .resolve_overlaps(&mut doc.arena, &candidates);
        let concepts = select_unique(&doc.arena, &candidates);

        doc.graph.clear_concepts();
        for &id in &concepts {
            doc.graph.attach(id, doc.arena[id].span);
            doc.index.add_concept(&doc.arena[id]);
        }

        doc.graph
            .attribute_concepts(&self.resolver, &mut doc.arena, &mut doc.warnings)
            .await;

        (concepts, overlap_log)
    }
}

/// Record a lookup failure for one concept and carry on with the document.
fn unresolved(doc: &mut Document, code: &str, span: Span, error: impl std::fmt::Display) {
    warn!(code, %span, %error, "Concept lookup failed, skipped");
    doc.warnings.push(ParseWarning::Unresolved {
        code: code.to_string(),
        begin: span.begin,
        end: span.end,
        error: error.to_string(),
    });
}
