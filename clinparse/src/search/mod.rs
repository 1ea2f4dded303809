//! Concept search and ontology navigation.

pub mod combinations;

pub use combinations::{WordCombination, combinations, search_combinations};

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::{OntologyConfig, SearchConfig};
use crate::models::Span;
use crate::storage::{DescriptionQuery, OntologyStore};
use crate::{ClinparseError, Result};

/// One search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConceptSummary {
    pub id: String,
    /// The matching description, or the FSN for navigation results
    pub description: String,
    pub fsn: Option<String>,
    /// `id|fsn|`
    pub display_name: String,
}

impl ConceptSummary {
    fn new(id: String, description: String, fsn: Option<String>) -> Self {
        let display_name = format!("{}|{}|", id, fsn.as_deref().unwrap_or(&description));
        Self {
            id,
            description,
            fsn,
            display_name,
        }
    }
}

/// An attribute that may be used on a concept, with the concepts it may point at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeSummary {
    pub id: String,
    pub fsn: Option<String>,
    pub ranges: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConceptDetails {
    pub id: String,
    pub fsn: Option<String>,
    pub display_name: String,
    pub active: bool,
    /// Number of closure descendants
    pub children: usize,
    pub has_children: bool,
    /// Sorted by FSN
    pub attributes: Vec<AttributeSummary>,
}

/// Search entry points over an [`OntologyStore`].
#[derive(Debug, Clone)]
pub struct ConceptSearch {
    store: Arc<dyn OntologyStore>,
    config: SearchConfig,
    root_concept: String,
    fsn_type_id: String,
}

impl ConceptSearch {
    pub fn new(store: Arc<dyn OntologyStore>, config: SearchConfig, ontology: &OntologyConfig) -> Self {
        Self {
            store,
            config,
            root_concept: ontology.root_concept.clone(),
            fsn_type_id: ontology.fsn_type_id.clone(),
        }
    }

    /// Concepts with a description containing `term`, or whose id is `term`.
    ///
    /// With `parent`, only descendants of that concept are considered. Shortest
    /// descriptions come first and at most `search.result_limit` hits are returned.
    pub async fn search(&self, term: &str, parent: Option<&str>) -> Result<Vec<ConceptSummary>> {
        let term = term.trim();
        if term.is_empty() {
            return Err(ClinparseError::EmptySearchTerm);
        }

        let query = DescriptionQuery {
            term: term.to_string(),
            parent: parent.map(str::to_string),
            limit: self.config.result_limit,
        };
        let hits = self.store.search_descriptions(&query).await?;

        tracing::debug!(term, ?parent, hits = hits.len(), "Concept search");

        Ok(hits
            .into_iter()
            .map(|hit| ConceptSummary::new(hit.concept_code, hit.term, hit.fsn))
            .collect())
    }

    /// See [`combinations::search_combinations`].
    pub async fn search_combinations(
        &self,
        words: &BTreeMap<Span, String>,
    ) -> Result<BTreeMap<Span, BTreeSet<String>>> {
        Ok(search_combinations(self.store.as_ref(), words, self.config.combination_threshold).await?)
    }

    pub async fn find_concept(&self, id: &str) -> Result<ConceptDetails> {
        let Some(record) = self.store.concept(id).await? else {
            return Err(ClinparseError::ConceptNotFound {
                code: id.to_string(),
            });
        };

        let fsn = self.fsn(id).await?;
        let children = self.store.descendants(id).await?.len();

        let mut ranges: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for rule in self.store.attribute_rules(id).await? {
            ranges.entry(rule.attribute).or_default().insert(rule.range);
        }

        let mut attributes = Vec::with_capacity(ranges.len());
        for (attribute, ranges) in ranges {
            attributes.push(AttributeSummary {
                fsn: self.fsn(&attribute).await?,
                id: attribute,
                ranges: ranges.into_iter().collect(),
            });
        }
        attributes.sort_by(|a, b| (&a.fsn, &a.id).cmp(&(&b.fsn, &b.id)));

        Ok(ConceptDetails {
            display_name: format!("{}|{}|", id, fsn.as_deref().unwrap_or_default()),
            id: record.code,
            fsn,
            active: record.active,
            children,
            has_children: children > 0,
            attributes,
        })
    }

    /// Direct children of the root concept, sorted by FSN.
    pub async fn top_level(&self) -> Result<Vec<ConceptSummary>> {
        let mut summaries = Vec::new();
        for code in self.store.children(&self.root_concept).await? {
            let fsn = self.fsn(&code).await?;
            let description = fsn.clone().unwrap_or_default();
            summaries.push(ConceptSummary::new(code, description, fsn));
        }
        summaries.sort_by(|a, b| (&a.fsn, &a.id).cmp(&(&b.fsn, &b.id)));
        Ok(summaries)
    }

    async fn fsn(&self, code: &str) -> Result<Option<String>> {
        Ok(self
            .store
            .descriptions(code)
            .await?
            .into_iter()
            .find(|d| d.active && d.type_id == self.fsn_type_id)
            .map(|d| d.term))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::closure::compute_closure;
    use crate::storage::{MemoryOntologyStore, OntologySnapshot};

    async fn search() -> ConceptSearch {
        let snapshot = OntologySnapshot::builder()
            .concept("404684003", "Clinical finding (finding)")
            .concept("123037004", "Body structure (body structure)")
            .concept("64572001", "Disease (disorder)")
            .is_a("64572001", "404684003")
            .concept("73211009", "Diabetes mellitus (disorder)")
            .synonym("73211009", "Diabetes mellitus")
            .synonym("73211009", "DM")
            .is_a("73211009", "64572001")
            .concept("44054006", "Diabetes mellitus type 2 (disorder)")
            .synonym("44054006", "Type 2 diabetes mellitus")
            .is_a("44054006", "73211009")
            .concept("363698007", "Finding site (attribute)")
            .attribute("363698007", "404684003", "123037004")
            .concept("116676008", "Associated morphology (attribute)")
            .attribute("116676008", "404684003", "49755003")
            .build();
        let store = MemoryOntologyStore::from_snapshot(snapshot).await;
        let edges = store.is_a_edges().await.unwrap();
        store
            .replace_closure(compute_closure(&edges).into_pairs())
            .await
            .unwrap();

        ConceptSearch::new(
            Arc::new(store),
            SearchConfig::default(),
            &OntologyConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_search_by_term_and_parent() {
        let search = search().await;

        let hits = search.search("diabetes", None).await.unwrap();
        assert_eq!(hits[0].description, "Diabetes mellitus");
        assert_eq!(hits[0].display_name, "73211009|Diabetes mellitus (disorder)|");

        let scoped = search.search("diabetes", Some("73211009")).await.unwrap();
        assert!(!scoped.is_empty());
        assert!(scoped.iter().all(|h| h.id == "44054006"));

        let by_id = search.search("44054006", None).await.unwrap();
        assert!(by_id.iter().all(|h| h.id == "44054006"));
    }

    #[tokio::test]
    async fn test_empty_term_is_rejected() {
        let search = search().await;
        assert!(matches!(
            search.search("   ", None).await,
            Err(ClinparseError::EmptySearchTerm)
        ));
    }

    #[tokio::test]
    async fn test_find_concept() {
        let search = search().await;

        let details = search.find_concept("73211009").await.unwrap();
        assert_eq!(details.fsn.as_deref(), Some("Diabetes mellitus (disorder)"));
        assert_eq!(details.children, 1);
        assert!(details.has_children);
        let names: Vec<&str> = details
            .attributes
            .iter()
            .filter_map(|a| a.fsn.as_deref())
            .collect();
        assert_eq!(
            names,
            vec!["Associated morphology (attribute)", "Finding site (attribute)"]
        );
        assert_eq!(details.attributes[1].ranges, vec!["123037004"]);

        assert!(matches!(
            search.find_concept("999999").await,
            Err(ClinparseError::ConceptNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_top_level_sorted_by_fsn() {
        let search = search().await;
        let top = search.top_level().await.unwrap();
        let ids: Vec<&str> = top.iter().map(|s| s.id.as_str()).collect();

        // parentless concepts hang below the root
        assert_eq!(ids[0], "116676008");
        assert!(ids.contains(&"123037004"));
        assert!(ids.contains(&"404684003"));
        assert!(!ids.contains(&"73211009"));
        let fsns: Vec<&Option<String>> = top.iter().map(|s| &s.fsn).collect();
        let mut sorted = fsns.clone();
        sorted.sort();
        assert_eq!(fsns, sorted);
    }
}
