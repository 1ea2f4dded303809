//! The primary interface to clinparse.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::annotation::AnnotationService;
use crate::closure::{ClosureBuilder, ClosureReport};
use crate::config::ClinparseConfig;
use crate::models::{ParseResult, Span};
use crate::pipeline::{BatchDocument, BatchEntry, BatchOutcome, DocumentParser, ParseRequest};
use crate::resolver::{ConceptResolver, ResolverSettings};
use crate::search::{ConceptDetails, ConceptSearch, ConceptSummary};
use crate::storage::{OntologySnapshot, OntologyStore, SnapshotSummary};
use crate::Result;

/// Document parsing, concept search and closure maintenance over one ontology store.
///
/// Cheap to share behind an `Arc`; every method takes `&self`.
#[derive(Debug)]
pub struct ConceptEngine {
    /// Per-document pipeline
    parser: DocumentParser,

    /// Search and navigation
    search: ConceptSearch,

    /// Closure rebuilds, serialized internally
    closure: ClosureBuilder,

    store: Arc<dyn OntologyStore>,

    annotation: Arc<dyn AnnotationService>,

    config: ClinparseConfig,
}

impl ConceptEngine {
    pub fn new(
        config: ClinparseConfig,
        store: Arc<dyn OntologyStore>,
        annotation: Arc<dyn AnnotationService>,
    ) -> Self {
        let resolver = ConceptResolver::new(
            Arc::clone(&store),
            ResolverSettings::from(&config.ontology),
        );
        let search = ConceptSearch::new(Arc::clone(&store), config.search.clone(), &config.ontology);
        let parser = DocumentParser::new(
            Arc::clone(&annotation),
            resolver,
            search.clone(),
            config.ontology.clone(),
            config.search.clone(),
            config.relationships.clone(),
        );
        let closure = ClosureBuilder::new(Arc::clone(&store));

        Self {
            parser,
            search,
            closure,
            store,
            annotation,
            config,
        }
    }

    // =============================================================================
    // Document parsing
    // =============================================================================

    /// Annotate and parse one document
    pub async fn parse(&self, text: &str, request: &ParseRequest) -> Result<ParseResult> {
        self.parser.parse(text, request).await
    }

    /// Parse documents one after the other
    pub async fn parse_batch(
        &self,
        documents: Vec<BatchDocument>,
        request: &ParseRequest,
    ) -> BatchOutcome {
        self.parser.parse_batch(documents, request, |_| {}).await
    }

    /// [`parse_batch`](Self::parse_batch) with a callback after each document
    pub async fn parse_batch_with_progress<F>(
        &self,
        documents: Vec<BatchDocument>,
        request: &ParseRequest,
        progress: F,
    ) -> BatchOutcome
    where
        F: FnMut(&BatchEntry) + Send,
    {
        self.parser.parse_batch(documents, request, progress).await
    }

    // =============================================================================
    // Search and navigation
    // =============================================================================

    /// Substring or id search, optionally below `parent`
    pub async fn search(&self, term: &str, parent: Option<&str>) -> Result<Vec<ConceptSummary>> {
        self.search.search(term, parent).await
    }

    /// Concepts matching runs of `words`, by run span
    pub async fn search_combinations(
        &self,
        words: &BTreeMap<Span, String>,
    ) -> Result<BTreeMap<Span, BTreeSet<String>>> {
        self.search.search_combinations(words).await
    }

    pub async fn find_concept(&self, id: &str) -> Result<ConceptDetails> {
        self.search.find_concept(id).await
    }

    pub async fn top_level(&self) -> Result<Vec<ConceptSummary>> {
        self.search.top_level().await
    }

    // =============================================================================
    // Ontology maintenance
    // =============================================================================

    /// Recompute the is-a closure and swap it in
    pub async fn rebuild_closure(&self) -> Result<ClosureReport> {
        Ok(self.closure.rebuild().await?)
    }

    /// Replace the store content with `snapshot`
    pub async fn import(&self, snapshot: OntologySnapshot) -> Result<SnapshotSummary> {
        let summary = snapshot.summary();
        self.store.import(snapshot).await?;
        tracing::info!(
            concepts = summary.concepts,
            descriptions = summary.descriptions,
            "Imported ontology snapshot"
        );
        Ok(summary)
    }

    pub async fn closure_version(&self) -> Result<u64> {
        Ok(self.store.closure_version().await?)
    }

    // =============================================================================
    // Health and accessors
    // =============================================================================

    pub async fn check_annotation_service(&self) -> bool {
        self.annotation.health_check().await
    }

    pub async fn check_store(&self) -> Result<bool> {
        Ok(self.store.health_check().await?)
    }

    pub fn store(&self) -> &Arc<dyn OntologyStore> {
        &self.store
    }

    pub fn config(&self) -> &ClinparseConfig {
        &self.config
    }
}
