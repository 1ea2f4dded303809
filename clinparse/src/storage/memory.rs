//! In-memory ontology store.
//!
//! Holds the ontology in hash indexes behind a `tokio` `RwLock`. The closure sits in
//! its own lock as an `Arc<ClosureIndex>`: readers clone the `Arc` and keep using that
//! version while a rebuild installs the next one. With a persistence path the store
//! writes itself back as a JSON snapshot after imports and closure swaps.

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use crate::closure::ClosureIndex;
use crate::config::FSN_TYPE_ID;
use crate::storage::errors::StorageResult;
use crate::storage::models::*;
use crate::storage::snapshot::OntologySnapshot;
use crate::storage::traits::OntologyStore;

lazy_static! {
    static ref WORD: Regex = Regex::new(r"[a-z0-9]+").expect("valid word pattern");
}

/// Lowercased alphanumeric words of `text`.
pub(crate) fn words(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    WORD.find_iter(&lowered)
        .map(|m| m.as_str().to_string())
        .collect()
}

#[derive(Debug, Default)]
struct OntologyData {
    concepts: HashMap<String, ConceptRecord>,
    descriptions: Vec<DescriptionRecord>,
    by_concept: HashMap<String, Vec<usize>>,
    word_index: HashMap<String, BTreeSet<usize>>,
    fsn: HashMap<String, String>,
    is_a: Vec<IsAEdge>,
    children: HashMap<String, BTreeSet<String>>,
    associations: HashMap<String, Vec<AssociationRecord>>,
    domains: Vec<AttributeDomainRule>,
    ranges: HashMap<String, Vec<String>>,
    cui: HashMap<String, Vec<String>>,
}

impl OntologyData {
    fn from_snapshot(snapshot: OntologySnapshot, fsn_type_id: &str) -> Self {
        let mut data = OntologyData::default();

        for concept in snapshot.concepts {
            data.concepts.insert(concept.code.clone(), concept);
        }

        for (index, description) in snapshot.descriptions.into_iter().enumerate() {
            data.by_concept
                .entry(description.concept_code.clone())
                .or_default()
                .push(index);
            if description.active {
                if description.type_id == fsn_type_id {
                    data.fsn
                        .insert(description.concept_code.clone(), description.term.clone());
                }
                for word in words(&description.term) {
                    data.word_index.entry(word).or_default().insert(index);
                }
            }
            data.descriptions.push(description);
        }

        for edge in &snapshot.is_a {
            data.children
                .entry(edge.destination.clone())
                .or_default()
                .insert(edge.source.clone());
        }
        data.is_a = snapshot.is_a;

        for association in snapshot.associations {
            data.associations
                .entry(association.source.clone())
                .or_default()
                .push(association);
        }

        data.domains = snapshot.attribute_domains;
        for range in snapshot.attribute_ranges {
            data.ranges.entry(range.attribute).or_default().push(range.range);
        }

        for mapping in snapshot.cui_mappings {
            let codes = data.cui.entry(mapping.cui).or_default();
            if !codes.contains(&mapping.code) {
                codes.push(mapping.code);
            }
        }

        data
    }

    fn to_snapshot(&self, closure: &ClosureIndex) -> OntologySnapshot {
        let mut concepts: Vec<ConceptRecord> = self.concepts.values().cloned().collect();
        concepts.sort_by(|a, b| a.code.cmp(&b.code));

        let mut associations: Vec<AssociationRecord> =
            self.associations.values().flatten().cloned().collect();
        associations.sort_by(|a, b| (&a.source, &a.effective_time).cmp(&(&b.source, &b.effective_time)));

        let mut attribute_ranges: Vec<AttributeRangeRule> = self
            .ranges
            .iter()
            .flat_map(|(attribute, ranges)| {
                ranges.iter().map(move |range| AttributeRangeRule {
                    attribute: attribute.clone(),
                    range: range.clone(),
                })
            })
            .collect();
        attribute_ranges.sort_by(|a, b| (&a.attribute, &a.range).cmp(&(&b.attribute, &b.range)));

        let mut cui_mappings: Vec<CuiMapping> = self
            .cui
            .iter()
            .flat_map(|(cui, codes)| {
                codes.iter().map(move |code| CuiMapping {
                    cui: cui.clone(),
                    code: code.clone(),
                })
            })
            .collect();
        cui_mappings.sort_by(|a, b| (&a.cui, &a.code).cmp(&(&b.cui, &b.code)));

        OntologySnapshot {
            format: 0,
            concepts,
            descriptions: self.descriptions.clone(),
            is_a: self.is_a.clone(),
            associations,
            attribute_domains: self.domains.clone(),
            attribute_ranges,
            cui_mappings,
            closure: closure.to_pairs(),
        }
    }

    fn is_active(&self, code: &str) -> bool {
        self.concepts.get(code).is_some_and(|c| c.active)
    }

    fn hit(&self, description: &DescriptionRecord) -> DescriptionHit {
        DescriptionHit {
            concept_code: description.concept_code.clone(),
            term: description.term.clone(),
            fsn: self.fsn.get(&description.concept_code).cloned(),
        }
    }
}

fn by_length(a: &DescriptionHit, b: &DescriptionHit) -> std::cmp::Ordering {
    (a.term.chars().count(), &a.term, &a.concept_code).cmp(&(
        b.term.chars().count(),
        &b.term,
        &b.concept_code,
    ))
}

#[derive(Debug)]
pub struct MemoryOntologyStore {
    data: RwLock<OntologyData>,
    closure: RwLock<Arc<ClosureIndex>>,
    fsn_type_id: String,
    persistence_path: Option<PathBuf>,
    persist_lock: Mutex<()>,
}

impl MemoryOntologyStore {
    /// Empty store without persistence.
    pub fn new() -> Self {
        Self::with_fsn_type_id(FSN_TYPE_ID)
    }

    pub fn with_fsn_type_id(fsn_type_id: impl Into<String>) -> Self {
        Self {
            data: RwLock::new(OntologyData::default()),
            closure: RwLock::new(Arc::new(ClosureIndex::empty())),
            fsn_type_id: fsn_type_id.into(),
            persistence_path: None,
            persist_lock: Mutex::new(()),
        }
    }

    /// Store populated from `snapshot`, without persistence.
    pub async fn from_snapshot(snapshot: OntologySnapshot) -> Self {
        let store = Self::new();
        store.install(snapshot).await;
        store
    }

    /// Store backed by a JSON snapshot file, loaded when it exists.
    pub async fn open(path: &Path, fsn_type_id: &str) -> StorageResult<Self> {
        let mut store = Self::with_fsn_type_id(fsn_type_id);
        store.persistence_path = Some(path.to_path_buf());

        if path.exists() {
            let snapshot = OntologySnapshot::load(path).await?;
            store.install(snapshot).await;
        } else {
            tracing::info!("No ontology snapshot at {}, starting empty", path.display());
        }

        Ok(store)
    }

    /// Current content as a snapshot, closure included.
    pub async fn snapshot(&self) -> OntologySnapshot {
        let closure = self.current_closure().await;
        self.data.read().await.to_snapshot(&closure)
    }

    /// The closure version readers currently see.
    pub async fn current_closure(&self) -> Arc<ClosureIndex> {
        self.closure.read().await.clone()
    }

    async fn install(&self, mut snapshot: OntologySnapshot) {
        let pairs = std::mem::take(&mut snapshot.closure);
        let data = OntologyData::from_snapshot(snapshot, &self.fsn_type_id);
        *self.data.write().await = data;
        if !pairs.is_empty() {
            self.swap_closure(&pairs).await;
        }
    }

    async fn swap_closure(&self, pairs: &[ClosurePair]) -> u64 {
        let mut current = self.closure.write().await;
        let version = current.version() + 1;
        *current = Arc::new(ClosureIndex::from_pairs(version, pairs));
        version
    }

    async fn persist(&self) -> StorageResult<()> {
        let Some(ref path) = self.persistence_path else {
            return Ok(());
        };

        let _lock = self.persist_lock.lock().await;
        self.snapshot().await.save(path).await
    }
}

impl Default for MemoryOntologyStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OntologyStore for MemoryOntologyStore {
    async fn health_check(&self) -> StorageResult<bool> {
        Ok(true)
    }

    async fn import(&self, snapshot: OntologySnapshot) -> StorageResult<()> {
        self.install(snapshot).await;
        self.persist().await
    }

    async fn is_a_edges(&self) -> StorageResult<Vec<IsAEdge>> {
        Ok(self.data.read().await.is_a.clone())
    }

    async fn concept(&self, code: &str) -> StorageResult<Option<ConceptRecord>> {
        Ok(self.data.read().await.concepts.get(code).cloned())
    }

    async fn ancestors(&self, code: &str) -> StorageResult<BTreeSet<String>> {
        let closure = self.current_closure().await;
        Ok(closure.ancestors(code).cloned().unwrap_or_default())
    }

    async fn descendants(&self, code: &str) -> StorageResult<BTreeSet<String>> {
        let closure = self.current_closure().await;
        Ok(closure.descendants(code).cloned().unwrap_or_default())
    }

    async fn children(&self, code: &str) -> StorageResult<Vec<String>> {
        let data = self.data.read().await;
        Ok(data
            .children
            .get(code)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn replacement(&self, code: &str) -> StorageResult<Option<String>> {
        let data = self.data.read().await;
        Ok(data.associations.get(code).and_then(|associations| {
            associations
                .iter()
                .filter(|a| a.active)
                .max_by(|a, b| a.effective_time.cmp(&b.effective_time))
                .map(|a| a.target.clone())
        }))
    }

    async fn descriptions(&self, code: &str) -> StorageResult<Vec<DescriptionRecord>> {
        let data = self.data.read().await;
        Ok(data
            .by_concept
            .get(code)
            .map(|indices| {
                indices
                    .iter()
                    .map(|&i| data.descriptions[i].clone())
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn codes_for_cui(&self, cui: &str) -> StorageResult<Vec<String>> {
        Ok(self
            .data
            .read()
            .await
            .cui
            .get(cui)
            .cloned()
            .unwrap_or_default())
    }

    async fn search_descriptions(
        &self,
        query: &DescriptionQuery,
    ) -> StorageResult<Vec<DescriptionHit>> {
        let closure = self.current_closure().await;
        let data = self.data.read().await;

        let scope = match &query.parent {
            Some(parent) => match closure.descendants(parent) {
                Some(descendants) => Some(descendants),
                None => return Ok(Vec::new()),
            },
            None => None,
        };

        let needle = query.term.to_lowercase();
        let mut hits: Vec<DescriptionHit> = data
            .descriptions
            .iter()
            .filter(|d| d.active)
            .filter(|d| d.concept_code == query.term || d.term.to_lowercase().contains(&needle))
            .filter(|d| match scope {
                Some(scope) => scope.contains(&d.concept_code),
                None => data.is_active(&d.concept_code),
            })
            .filter(|d| data.fsn.contains_key(&d.concept_code))
            .map(|d| data.hit(d))
            .collect();

        hits.sort_by(by_length);
        hits.truncate(query.limit);
        Ok(hits)
    }

    async fn full_text_search(&self, words_in: &[String]) -> StorageResult<Vec<DescriptionHit>> {
        let data = self.data.read().await;

        let mut indices = BTreeSet::new();
        for word in words_in.iter().flat_map(|w| words(w)) {
            if let Some(found) = data.word_index.get(&word) {
                indices.extend(found.iter().copied());
            }
        }

        let mut hits: Vec<DescriptionHit> = indices
            .into_iter()
            .map(|i| &data.descriptions[i])
            .filter(|d| data.is_active(&d.concept_code))
            .map(|d| data.hit(d))
            .collect();

        hits.sort_by(by_length);
        Ok(hits)
    }

    async fn attribute_codes(
        &self,
        destination: &str,
        origin: &str,
    ) -> StorageResult<Vec<String>> {
        let closure = self.current_closure().await;
        let (Some(domain_side), Some(range_side)) =
            (closure.ancestors(destination), closure.ancestors(origin))
        else {
            return Ok(Vec::new());
        };

        let data = self.data.read().await;
        let mut attributes: Vec<String> = data
            .domains
            .iter()
            .filter(|rule| domain_side.contains(&rule.domain))
            .filter(|rule| {
                data.ranges
                    .get(&rule.attribute)
                    .is_some_and(|ranges| ranges.iter().any(|r| range_side.contains(r)))
            })
            .map(|rule| rule.attribute.clone())
            .collect();

        attributes.sort();
        attributes.dedup();
        Ok(attributes)
    }

    async fn attribute_rules(&self, code: &str) -> StorageResult<Vec<AttributeRule>> {
        let closure = self.current_closure().await;
        let Some(ancestors) = closure.ancestors(code) else {
            return Ok(Vec::new());
        };

        let data = self.data.read().await;
        let mut rules = Vec::new();
        for domain in data.domains.iter().filter(|d| ancestors.contains(&d.domain)) {
            for range in data.ranges.get(&domain.attribute).into_iter().flatten() {
                rules.push(AttributeRule {
                    attribute: domain.attribute.clone(),
                    domain: domain.domain.clone(),
                    range: range.clone(),
                });
            }
        }
        Ok(rules)
    }

    async fn replace_closure(&self, pairs: Vec<ClosurePair>) -> StorageResult<u64> {
        let version = self.swap_closure(&pairs).await;
        self.persist().await?;
        Ok(version)
    }

    async fn closure_version(&self) -> StorageResult<u64> {
        Ok(self.current_closure().await.version())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::closure::compute_closure;

    async fn store() -> MemoryOntologyStore {
        let snapshot = OntologySnapshot::builder()
            .concept("404684003", "Clinical finding (finding)")
            .concept("64572001", "Disease (disorder)")
            .is_a("64572001", "404684003")
            .concept("90708001", "Kidney disease (disorder)")
            .synonym("90708001", "Kidney disease")
            .is_a("90708001", "64572001")
            .concept("709044004", "Chronic kidney disease (disorder)")
            .synonym("709044004", "Chronic kidney disease")
            .synonym("709044004", "CKD")
            .is_a("709044004", "90708001")
            .inactive_concept("236425005", "Chronic renal failure (disorder)")
            .replaced_by("236425005", "90708001", "20150131")
            .replaced_by("236425005", "709044004", "20170731")
            .concept("123037004", "Body structure (body structure)")
            .concept("64033007", "Kidney structure (body structure)")
            .is_a("64033007", "123037004")
            .concept("363698007", "Finding site (attribute)")
            .attribute("363698007", "404684003", "123037004")
            .cui("C1561643", "709044004")
            .build();
        let store = MemoryOntologyStore::from_snapshot(snapshot).await;
        let pairs = compute_closure(&store.is_a_edges().await.unwrap()).into_pairs();
        store.replace_closure(pairs).await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_replacement_picks_most_recent() {
        let store = store().await;
        assert_eq!(
            store.replacement("236425005").await.unwrap().as_deref(),
            Some("709044004")
        );
        assert_eq!(store.replacement("709044004").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_search_orders_by_length_and_scopes_by_parent() {
        let store = store().await;
        let hits = store
            .search_descriptions(&DescriptionQuery {
                term: "kidney".to_string(),
                parent: None,
                limit: 10,
            })
            .await
            .unwrap();
        assert_eq!(hits[0].term, "Kidney disease");
        assert!(hits.windows(2).all(|w| w[0].term.len() <= w[1].term.len()));
        // the retired concept is not searchable
        assert!(hits.iter().all(|h| h.concept_code != "236425005"));

        let scoped = store
            .search_descriptions(&DescriptionQuery {
                term: "kidney".to_string(),
                parent: Some("90708001".to_string()),
                limit: 10,
            })
            .await
            .unwrap();
        assert!(scoped.iter().all(|h| h.concept_code == "709044004"));
        assert!(!scoped.is_empty());

        let by_code = store
            .search_descriptions(&DescriptionQuery {
                term: "709044004".to_string(),
                parent: None,
                limit: 1,
            })
            .await
            .unwrap();
        assert_eq!(by_code.len(), 1);
        assert_eq!(by_code[0].term, "CKD");
        assert_eq!(
            by_code[0].fsn.as_deref(),
            Some("Chronic kidney disease (disorder)")
        );
    }

    #[tokio::test]
    async fn test_full_text_search_matches_any_word() {
        let store = store().await;
        let hits = store
            .full_text_search(&["chronic".to_string(), "KIDNEY".to_string()])
            .await
            .unwrap();
        let codes: BTreeSet<&str> = hits.iter().map(|h| h.concept_code.as_str()).collect();
        assert!(codes.contains("709044004"));
        assert!(codes.contains("90708001"));
        assert!(codes.contains("64033007"));
        assert!(!codes.contains("236425005"));
    }

    #[tokio::test]
    async fn test_attribute_codes_follow_closure() {
        let store = store().await;
        assert_eq!(
            store.attribute_codes("709044004", "64033007").await.unwrap(),
            vec!["363698007".to_string()]
        );
        assert!(store.attribute_codes("64033007", "709044004").await.unwrap().is_empty());

        let rules = store.attribute_rules("90708001").await.unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].range, "123037004");
    }

    #[tokio::test]
    async fn test_closure_swap_bumps_version_and_keeps_old_readers() {
        let store = store().await;
        let before = store.current_closure().await;
        assert_eq!(before.version(), 1);

        store.replace_closure(Vec::new()).await.unwrap();

        assert_eq!(store.closure_version().await.unwrap(), 2);
        assert!(store.ancestors("709044004").await.unwrap().is_empty());
        // a reader holding the previous version still sees all of it
        assert!(before.is_ancestor("709044004", "404684003"));
    }

    #[tokio::test]
    async fn test_persistence_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ontology.json");

        let source = store().await;
        let opened = MemoryOntologyStore::open(&path, FSN_TYPE_ID).await.unwrap();
        opened.import(source.snapshot().await).await.unwrap();
        assert!(path.exists());

        let reopened = MemoryOntologyStore::open(&path, FSN_TYPE_ID).await.unwrap();
        assert_eq!(reopened.codes_for_cui("C1561643").await.unwrap(), vec!["709044004"]);
        assert!(
            reopened
                .ancestors("709044004")
                .await
                .unwrap()
                .contains("64572001")
        );
        assert_eq!(reopened.children("64572001").await.unwrap(), vec!["90708001"]);
    }
}
