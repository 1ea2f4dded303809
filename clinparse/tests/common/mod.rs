//! Shared fixtures: a small SNOMED CT extract and a scripted annotation service.

#![allow(dead_code)]

use async_trait::async_trait;
use clinparse::annotation::{AnnotationError, AnnotationService};
use clinparse::config::ClinparseConfig;
use clinparse::core::ConceptEngine;
use clinparse::models::{
    AnnotatedDocument, ConceptRef, DependencyInfo, MentionKind, Polarity, RelationLabel,
    SemanticMention, SyntaxToken,
};
use clinparse::storage::{
    AttributeRule, ClosurePair, ConceptRecord, DescriptionHit, DescriptionQuery,
    DescriptionRecord, IsAEdge, MemoryOntologyStore, OntologySnapshot, OntologyStore,
    StorageError, StorageResult,
};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

pub const CLINICAL_FINDING: &str = "404684003";
pub const DISEASE: &str = "64572001";
pub const KIDNEY_DISEASE: &str = "90708001";
pub const CKD: &str = "709044004";
pub const RETIRED_CKD: &str = "236425005";
pub const BODY_STRUCTURE: &str = "123037004";
pub const KIDNEY: &str = "64033007";
pub const PAIN: &str = "22253000";
pub const CHEST_PAIN: &str = "29857009";
pub const FINDING_SITE: &str = "363698007";

pub fn snapshot() -> OntologySnapshot {
    OntologySnapshot::builder()
        .concept(CLINICAL_FINDING, "Clinical finding (finding)")
        .concept(DISEASE, "Disease (disorder)")
        .synonym(DISEASE, "Disease")
        .is_a(DISEASE, CLINICAL_FINDING)
        .concept(KIDNEY_DISEASE, "Kidney disease (disorder)")
        .synonym(KIDNEY_DISEASE, "Kidney disease")
        .is_a(KIDNEY_DISEASE, DISEASE)
        .concept(CKD, "Chronic kidney disease (disorder)")
        .synonym(CKD, "Chronic kidney disease")
        .synonym(CKD, "CKD")
        .is_a(CKD, KIDNEY_DISEASE)
        .inactive_concept(RETIRED_CKD, "Chronic renal impairment (disorder)")
        .replaced_by(RETIRED_CKD, CKD, "20170731")
        .concept(BODY_STRUCTURE, "Body structure (body structure)")
        .concept(KIDNEY, "Kidney structure (body structure)")
        .synonym(KIDNEY, "Kidney")
        .is_a(KIDNEY, BODY_STRUCTURE)
        .concept(PAIN, "Pain (finding)")
        .synonym(PAIN, "Pain")
        .is_a(PAIN, CLINICAL_FINDING)
        .concept(CHEST_PAIN, "Chest pain (finding)")
        .synonym(CHEST_PAIN, "Chest pain")
        .is_a(CHEST_PAIN, PAIN)
        .concept(FINDING_SITE, "Finding site (attribute)")
        .attribute(FINDING_SITE, CLINICAL_FINDING, BODY_STRUCTURE)
        .cui("C0008031", CHEST_PAIN)
        .build()
}

/// Memory store loaded with [`snapshot`], closure built.
pub async fn store() -> Arc<MemoryOntologyStore> {
    let store = Arc::new(MemoryOntologyStore::from_snapshot(snapshot()).await);
    let builder = clinparse::closure::ClosureBuilder::new(store.clone() as Arc<dyn OntologyStore>);
    builder.rebuild().await.expect("closure builds");
    store
}

enum Scripted {
    Document(AnnotatedDocument),
    Unavailable,
    Undecodable,
}

/// Answers with canned documents keyed by input text.
#[derive(Default)]
pub struct ScriptedAnnotationService {
    responses: HashMap<String, Scripted>,
}

impl std::fmt::Debug for ScriptedAnnotationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedAnnotationService")
            .field("responses", &self.responses.len())
            .finish()
    }
}

impl ScriptedAnnotationService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(mut self, document: AnnotatedDocument) -> Self {
        self.responses
            .insert(document.input.clone(), Scripted::Document(document));
        self
    }

    pub fn unavailable_for(mut self, text: &str) -> Self {
        self.responses.insert(text.to_string(), Scripted::Unavailable);
        self
    }

    pub fn undecodable_for(mut self, text: &str) -> Self {
        self.responses.insert(text.to_string(), Scripted::Undecodable);
        self
    }
}

#[async_trait]
impl AnnotationService for ScriptedAnnotationService {
    async fn annotate(&self, text: &str) -> Result<AnnotatedDocument, AnnotationError> {
        match self.responses.get(text) {
            Some(Scripted::Document(document)) => Ok(document.clone()),
            Some(Scripted::Unavailable) => Err(AnnotationError::Timeout {
                url: "http://annotator.test/".to_string(),
                timeout: Duration::from_secs(60),
            }),
            Some(Scripted::Undecodable) => {
                Err(AnnotationError::Decode("expected value at line 1".to_string()))
            }
            None => Ok(document(text)),
        }
    }

    async fn health_check(&self) -> bool {
        true
    }
}

pub async fn engine(service: ScriptedAnnotationService) -> ConceptEngine {
    let store: Arc<dyn OntologyStore> = store().await;
    ConceptEngine::new(ClinparseConfig::default(), store, Arc::new(service))
}

pub async fn engine_over(
    store: Arc<dyn OntologyStore>,
    service: ScriptedAnnotationService,
) -> ConceptEngine {
    ConceptEngine::new(ClinparseConfig::default(), store, Arc::new(service))
}

/// Fixture store whose concept lookup fails for one code.
#[derive(Debug)]
pub struct FailingStore {
    inner: Arc<MemoryOntologyStore>,
    failing: String,
}

impl FailingStore {
    pub async fn failing_on(code: &str) -> Arc<Self> {
        Arc::new(Self {
            inner: store().await,
            failing: code.to_string(),
        })
    }
}

#[async_trait]
impl OntologyStore for FailingStore {
    async fn health_check(&self) -> StorageResult<bool> {
        self.inner.health_check().await
    }

    async fn import(&self, snapshot: OntologySnapshot) -> StorageResult<()> {
        self.inner.import(snapshot).await
    }

    async fn is_a_edges(&self) -> StorageResult<Vec<IsAEdge>> {
        self.inner.is_a_edges().await
    }

    async fn concept(&self, code: &str) -> StorageResult<Option<ConceptRecord>> {
        if code == self.failing {
            return Err(StorageError::Connection(format!("lost connection reading {}", code)));
        }
        self.inner.concept(code).await
    }

    async fn ancestors(&self, code: &str) -> StorageResult<BTreeSet<String>> {
        self.inner.ancestors(code).await
    }

    async fn descendants(&self, code: &str) -> StorageResult<BTreeSet<String>> {
        self.inner.descendants(code).await
    }

    async fn children(&self, code: &str) -> StorageResult<Vec<String>> {
        self.inner.children(code).await
    }

    async fn replacement(&self, code: &str) -> StorageResult<Option<String>> {
        self.inner.replacement(code).await
    }

    async fn descriptions(&self, code: &str) -> StorageResult<Vec<DescriptionRecord>> {
        self.inner.descriptions(code).await
    }

    async fn codes_for_cui(&self, cui: &str) -> StorageResult<Vec<String>> {
        self.inner.codes_for_cui(cui).await
    }

    async fn search_descriptions(
        &self,
        query: &DescriptionQuery,
    ) -> StorageResult<Vec<DescriptionHit>> {
        self.inner.search_descriptions(query).await
    }

    async fn full_text_search(&self, words: &[String]) -> StorageResult<Vec<DescriptionHit>> {
        self.inner.full_text_search(words).await
    }

    async fn attribute_codes(
        &self,
        destination: &str,
        origin: &str,
    ) -> StorageResult<Vec<String>> {
        self.inner.attribute_codes(destination, origin).await
    }

    async fn attribute_rules(&self, code: &str) -> StorageResult<Vec<AttributeRule>> {
        self.inner.attribute_rules(code).await
    }

    async fn replace_closure(&self, pairs: Vec<ClosurePair>) -> StorageResult<u64> {
        self.inner.replace_closure(pairs).await
    }

    async fn closure_version(&self) -> StorageResult<u64> {
        self.inner.closure_version().await
    }
}

/// Annotated document without annotations.
pub fn document(text: &str) -> AnnotatedDocument {
    AnnotatedDocument {
        input: text.to_string(),
        syntax: Vec::new(),
        semantic: Vec::new(),
        timings: Default::default(),
    }
}

pub fn mention(
    kind: MentionKind,
    begin: usize,
    end: usize,
    polarity: Polarity,
    code: &str,
) -> SemanticMention {
    SemanticMention {
        kind,
        begin,
        end,
        polarity,
        subject: Some("patient".to_string()),
        history_of: false,
        concepts: vec![ConceptRef {
            system: "SNOMEDCT".to_string(),
            code: code.to_string(),
            cui: None,
        }],
    }
}

pub fn token(
    begin: usize,
    end: usize,
    id: &str,
    relation: &str,
    head: Option<(&str, usize, usize)>,
) -> SyntaxToken {
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

/// "no chronic kidney disease" with a negated kidney and disease mention.
pub fn negated_ckd_document() -> AnnotatedDocument {
    let disease = Some(("4", 18, 25));
    AnnotatedDocument {
        input: "no chronic kidney disease".to_string(),
        syntax: vec![
            token(0, 2, "1", "det", disease),
            token(3, 10, "2", "amod", disease),
            token(11, 17, "3", "nn", disease),
            token(18, 25, "4", "root", None),
        ],
        semantic: vec![
            mention(MentionKind::AnatomicalSite, 11, 17, Polarity::Negative, KIDNEY),
            mention(MentionKind::DiseaseDisorder, 18, 25, Polarity::Negative, DISEASE),
        ],
        timings: Default::default(),
    }
}

/// "kidney pain": the kidney is the finding site of the pain.
pub fn kidney_pain_document() -> AnnotatedDocument {
    AnnotatedDocument {
        input: "kidney pain".to_string(),
        syntax: vec![
            token(0, 6, "1", "nn", Some(("2", 7, 11))),
            token(7, 11, "2", "root", None),
        ],
        semantic: vec![
            mention(MentionKind::AnatomicalSite, 0, 6, Polarity::Positive, KIDNEY),
            mention(MentionKind::SignSymptom, 7, 11, Polarity::Positive, PAIN),
        ],
        timings: Default::default(),
    }
}
