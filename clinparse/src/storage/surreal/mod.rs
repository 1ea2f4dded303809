//! Embedded SurrealDB ontology store.
//!
//! Lookups run as SurrealQL queries with bound parameters. Closure reads resolve the
//! current version inside the same statement, so one read never mixes two versions.

mod schema;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use surrealdb::engine::local::{Db, Mem, RocksDb};
use surrealdb::{Connection, Surreal};
use tokio::sync::Mutex;

use crate::config::{SurrealDBConfig, SurrealDBEngine};
use crate::storage::errors::{StorageError, StorageResult};
use crate::storage::memory::words;
use crate::storage::models::*;
use crate::storage::snapshot::OntologySnapshot;
use crate::storage::traits::OntologyStore;

pub use schema::initialize_schema;

/// Type alias for the embedded store
pub type EmbeddedOntologyStore = SurrealOntologyStore<Db>;

/// Create an embedded store from configuration
pub async fn create_embedded_store(
    config: &SurrealDBConfig,
    fsn_type_id: &str,
) -> StorageResult<Arc<dyn OntologyStore>> {
    let client = match config.engine {
        SurrealDBEngine::Memory => {
            tracing::info!("Creating SurrealDB in-memory ontology store");
            Surreal::new::<Mem>(()).await.map_err(|e| {
                StorageError::Connection(format!("Failed to create memory client: {}", e))
            })?
        }
        SurrealDBEngine::RocksDB => {
            tracing::info!(
                "Creating SurrealDB RocksDB ontology store at {}",
                config.connection
            );
            Surreal::new::<RocksDb>(config.connection.as_str())
                .await
                .map_err(|e| {
                    StorageError::Connection(format!("Failed to create RocksDB client: {}", e))
                })?
        }
    };

    let store = SurrealOntologyStore::new(client, config, fsn_type_id).await?;
    Ok(Arc::new(store))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DescriptionRow {
    description_id: String,
    concept_code: String,
    term: String,
    term_lower: String,
    words: Vec<String>,
    active: bool,
    type_id: String,
}

impl From<DescriptionRecord> for DescriptionRow {
    fn from(record: DescriptionRecord) -> Self {
        Self {
            term_lower: record.term.to_lowercase(),
            words: words(&record.term),
            description_id: record.id,
            concept_code: record.concept_code,
            term: record.term,
            active: record.active,
            type_id: record.type_id,
        }
    }
}

impl From<DescriptionRow> for DescriptionRecord {
    fn from(row: DescriptionRow) -> Self {
        Self {
            id: row.description_id,
            concept_code: row.concept_code,
            term: row.term,
            active: row.active,
            type_id: row.type_id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ClosureRow {
    version: u64,
    subtype: String,
    supertype: String,
}

#[derive(Debug, Clone, Deserialize)]
struct TermRow {
    concept_code: String,
    term: String,
}

/// Ontology store on an embedded SurrealDB connection
#[derive(Debug)]
pub struct SurrealOntologyStore<C>
where
    C: Connection + Clone + Send + Sync + std::fmt::Debug + 'static,
{
    client: Surreal<C>,
    fsn_type_id: String,
    batch_size: usize,
    write_lock: Mutex<()>,
}

impl<C> SurrealOntologyStore<C>
where
    C: Connection + Clone + Send + Sync + std::fmt::Debug + 'static,
{
    pub async fn new(
        client: Surreal<C>,
        config: &SurrealDBConfig,
        fsn_type_id: &str,
    ) -> StorageResult<Self> {
        client
            .use_ns(&config.namespace)
            .use_db(&config.database)
            .await
            .map_err(|e| {
                StorageError::Connection(format!("Failed to set namespace/database: {}", e))
            })?;

        schema::initialize_schema(&client).await?;

        Ok(Self {
            client,
            fsn_type_id: fsn_type_id.to_string(),
            batch_size: config.batch_size.max(1),
            write_lock: Mutex::new(()),
        })
    }

    pub fn client(&self) -> &Surreal<C> {
        &self.client
    }

    async fn insert_rows<T>(&self, table: &str, rows: Vec<T>) -> StorageResult<()>
    where
        T: Serialize + Clone + Send + Sync + 'static,
    {
        let total = rows.len();
        for chunk in rows.chunks(self.batch_size) {
            self.client
                .query(format!("INSERT INTO {} $rows", table))
                .bind(("rows", chunk.to_vec()))
                .await
                .and_then(|response| response.check())
                .map_err(|e| {
                    StorageError::Query(format!("Failed to insert into {}: {}", table, e))
                })?;
        }
        tracing::debug!(table, rows = total, "Inserted ontology rows");
        Ok(())
    }

    async fn current_version(&self) -> StorageResult<u64> {
        let mut response = self
            .client
            .query("RETURN closure_meta:current.version")
            .await
            .map_err(|e| StorageError::Query(format!("Failed to read closure version: {}", e)))?;

        let version: Option<u64> = response.take(0).map_err(|e| {
            StorageError::Query(format!("Failed to extract closure version: {}", e))
        })?;
        Ok(version.unwrap_or(0))
    }

    /// Next unused closure version. Rows left by an interrupted rebuild may carry a
    /// version above the published one, so those are counted too.
    async fn next_version(&self) -> StorageResult<u64> {
        let current = self.current_version().await?;

        let mut response = self
            .client
            .query("SELECT VALUE version FROM closure ORDER BY version DESC LIMIT 1")
            .await
            .map_err(|e| StorageError::Query(format!("Failed to read closure rows: {}", e)))?;
        let written: Vec<u64> = response.take(0).map_err(|e| {
            StorageError::Query(format!("Failed to extract closure row version: {}", e))
        })?;

        Ok(written.into_iter().fold(current, u64::max) + 1)
    }

    async fn write_closure(&self, pairs: Vec<ClosurePair>) -> StorageResult<u64> {
        let version = self.next_version().await?;

        let rows: Vec<ClosureRow> = pairs
            .into_iter()
            .filter(|p| p.subtype != p.supertype)
            .map(|p| ClosureRow {
                version,
                subtype: p.subtype,
                supertype: p.supertype,
            })
            .collect();
        self.insert_rows("closure", rows).await?;

        self.client
            .query("UPSERT closure_meta:current SET version = $version")
            .query("DELETE closure WHERE version != $version")
            .bind(("version", version))
            .await
            .and_then(|response| response.check())
            .map_err(|e| StorageError::Transaction(format!("Failed to publish closure: {}", e)))?;

        Ok(version)
    }

    /// Active codes among `codes` and the FSN of each of them
    async fn active_with_fsn(
        &self,
        codes: Vec<String>,
    ) -> StorageResult<(HashSet<String>, HashMap<String, String>)> {
        let mut response = self
            .client
            .query("SELECT VALUE code FROM concept WHERE code IN $codes AND active = true")
            .query(
                "SELECT concept_code, term FROM description \
                 WHERE concept_code IN $codes AND active = true AND type_id = $fsn_type",
            )
            .bind(("codes", codes))
            .bind(("fsn_type", self.fsn_type_id.clone()))
            .await
            .map_err(|e| StorageError::Query(format!("Failed to look up concepts: {}", e)))?;

        let active: Vec<String> = response
            .take(0)
            .map_err(|e| StorageError::Query(format!("Failed to extract concepts: {}", e)))?;
        let fsn: Vec<TermRow> = response
            .take(1)
            .map_err(|e| StorageError::Query(format!("Failed to extract FSNs: {}", e)))?;

        Ok((
            active.into_iter().collect(),
            fsn.into_iter().map(|r| (r.concept_code, r.term)).collect(),
        ))
    }

    async fn select_values(&self, query: &str, code: &str) -> StorageResult<Vec<String>> {
        let mut response = self
            .client
            .query(query)
            .bind(("code", code.to_string()))
            .await
            .map_err(|e| StorageError::Query(format!("Query failed: {}", e)))?;

        response
            .take(0)
            .map_err(|e| StorageError::Query(format!("Failed to extract values: {}", e)))
    }
}

fn by_length(a: &DescriptionHit, b: &DescriptionHit) -> std::cmp::Ordering {
    (a.term.chars().count(), &a.term, &a.concept_code).cmp(&(
        b.term.chars().count(),
        &b.term,
        &b.concept_code,
    ))
}

#[async_trait]
impl<C> OntologyStore for SurrealOntologyStore<C>
where
    C: Connection + Clone + Send + Sync + std::fmt::Debug + 'static,
{
    async fn health_check(&self) -> StorageResult<bool> {
        match self.client.health().await {
            Ok(()) => Ok(true),
            Err(e) => {
                tracing::warn!("SurrealDB health check failed: {}", e);
                Ok(false)
            }
        }
    }

    async fn import(&self, snapshot: OntologySnapshot) -> StorageResult<()> {
        let _lock = self.write_lock.lock().await;
        let summary = snapshot.summary();

        self.client
            .query(
                "DELETE concept; DELETE description; DELETE is_a; DELETE association; \
                 DELETE attr_domain; DELETE attr_range; DELETE cui_map;",
            )
            .await
            .and_then(|response| response.check())
            .map_err(|e| StorageError::Transaction(format!("Failed to clear ontology: {}", e)))?;

        self.insert_rows("concept", snapshot.concepts).await?;
        self.insert_rows(
            "description",
            snapshot
                .descriptions
                .into_iter()
                .map(DescriptionRow::from)
                .collect(),
        )
        .await?;
        self.insert_rows("is_a", snapshot.is_a).await?;
        self.insert_rows("association", snapshot.associations).await?;
        self.insert_rows("attr_domain", snapshot.attribute_domains).await?;
        self.insert_rows("attr_range", snapshot.attribute_ranges).await?;
        self.insert_rows("cui_map", snapshot.cui_mappings).await?;

        if !snapshot.closure.is_empty() {
            self.write_closure(snapshot.closure).await?;
        }

        tracing::info!(
            concepts = summary.concepts,
            descriptions = summary.descriptions,
            is_a_edges = summary.is_a_edges,
            "Imported ontology into SurrealDB"
        );
        Ok(())
    }

    async fn is_a_edges(&self) -> StorageResult<Vec<IsAEdge>> {
        let mut response = self
            .client
            .query("SELECT source, destination FROM is_a")
            .await
            .map_err(|e| StorageError::Query(format!("Failed to read is-a edges: {}", e)))?;

        response
            .take(0)
            .map_err(|e| StorageError::Query(format!("Failed to extract is-a edges: {}", e)))
    }

    async fn concept(&self, code: &str) -> StorageResult<Option<ConceptRecord>> {
        let mut response = self
            .client
            .query("SELECT code, active FROM concept WHERE code = $code LIMIT 1")
            .bind(("code", code.to_string()))
            .await
            .map_err(|e| StorageError::Query(format!("Failed to get concept: {}", e)))?;

        let rows: Vec<ConceptRecord> = response
            .take(0)
            .map_err(|e| StorageError::Query(format!("Failed to extract concept: {}", e)))?;
        Ok(rows.into_iter().next())
    }

    async fn ancestors(&self, code: &str) -> StorageResult<BTreeSet<String>> {
        let values = self
            .select_values(
                "SELECT VALUE supertype FROM closure \
                 WHERE version = closure_meta:current.version AND subtype = $code",
                code,
            )
            .await?;
        Ok(values.into_iter().collect())
    }

    async fn descendants(&self, code: &str) -> StorageResult<BTreeSet<String>> {
        let values = self
            .select_values(
                "SELECT VALUE subtype FROM closure \
                 WHERE version = closure_meta:current.version AND supertype = $code",
                code,
            )
            .await?;
        Ok(values.into_iter().collect())
    }

    async fn children(&self, code: &str) -> StorageResult<Vec<String>> {
        let mut children = self
            .select_values("SELECT VALUE source FROM is_a WHERE destination = $code", code)
            .await?;
        children.sort();
        children.dedup();
        Ok(children)
    }

    async fn replacement(&self, code: &str) -> StorageResult<Option<String>> {
        let mut response = self
            .client
            .query(
                "SELECT source, target, active, effective_time FROM association \
                 WHERE source = $code AND active = true \
                 ORDER BY effective_time DESC LIMIT 1",
            )
            .bind(("code", code.to_string()))
            .await
            .map_err(|e| StorageError::Query(format!("Failed to get replacement: {}", e)))?;

        let rows: Vec<AssociationRecord> = response
            .take(0)
            .map_err(|e| StorageError::Query(format!("Failed to extract replacement: {}", e)))?;
        Ok(rows.into_iter().next().map(|a| a.target))
    }

    async fn descriptions(&self, code: &str) -> StorageResult<Vec<DescriptionRecord>> {
        let mut response = self
            .client
            .query("SELECT * FROM description WHERE concept_code = $code")
            .bind(("code", code.to_string()))
            .await
            .map_err(|e| StorageError::Query(format!("Failed to get descriptions: {}", e)))?;

        let rows: Vec<DescriptionRow> = response
            .take(0)
            .map_err(|e| StorageError::Query(format!("Failed to extract descriptions: {}", e)))?;
        Ok(rows.into_iter().map(DescriptionRecord::from).collect())
    }

    async fn codes_for_cui(&self, cui: &str) -> StorageResult<Vec<String>> {
        let mut codes = self
            .select_values("SELECT VALUE code FROM cui_map WHERE cui = $code", cui)
            .await?;
        codes.dedup();
        Ok(codes)
    }

    async fn search_descriptions(
        &self,
        query: &DescriptionQuery,
    ) -> StorageResult<Vec<DescriptionHit>> {
        let scope = match &query.parent {
            Some(parent) => {
                let descendants = self.descendants(parent).await?;
                if descendants.is_empty() {
                    return Ok(Vec::new());
                }
                Some(descendants)
            }
            None => None,
        };

        let mut response = self
            .client
            .query(
                "SELECT concept_code, term FROM description WHERE active = true \
                 AND (concept_code = $term OR string::contains(term_lower, $needle))",
            )
            .bind(("term", query.term.clone()))
            .bind(("needle", query.term.to_lowercase()))
            .await
            .map_err(|e| StorageError::Query(format!("Failed to search descriptions: {}", e)))?;

        let rows: Vec<TermRow> = response
            .take(0)
            .map_err(|e| StorageError::Query(format!("Failed to extract descriptions: {}", e)))?;

        let codes: Vec<String> = rows
            .iter()
            .map(|r| r.concept_code.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let (active, fsn) = self.active_with_fsn(codes).await?;

        let mut hits: Vec<DescriptionHit> = rows
            .into_iter()
            .filter(|r| match &scope {
                Some(scope) => scope.contains(&r.concept_code),
                None => active.contains(&r.concept_code),
            })
            .filter_map(|r| {
                fsn.get(&r.concept_code).map(|f| DescriptionHit {
                    fsn: Some(f.clone()),
                    concept_code: r.concept_code,
                    term: r.term,
                })
            })
            .collect();

        hits.sort_by(by_length);
        hits.truncate(query.limit);
        Ok(hits)
    }

    async fn full_text_search(&self, words_in: &[String]) -> StorageResult<Vec<DescriptionHit>> {
        let bag: Vec<String> = words_in
            .iter()
            .flat_map(|w| words(w))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if bag.is_empty() {
            return Ok(Vec::new());
        }

        let mut response = self
            .client
            .query(
                "SELECT concept_code, term FROM description \
                 WHERE active = true AND words CONTAINSANY $words",
            )
            .bind(("words", bag))
            .await
            .map_err(|e| StorageError::Query(format!("Full-text search failed: {}", e)))?;

        let rows: Vec<TermRow> = response
            .take(0)
            .map_err(|e| StorageError::Query(format!("Failed to extract hits: {}", e)))?;

        let codes: Vec<String> = rows
            .iter()
            .map(|r| r.concept_code.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let (active, fsn) = self.active_with_fsn(codes).await?;

        let mut hits: Vec<DescriptionHit> = rows
            .into_iter()
            .filter(|r| active.contains(&r.concept_code))
            .map(|r| DescriptionHit {
                fsn: fsn.get(&r.concept_code).cloned(),
                concept_code: r.concept_code,
                term: r.term,
            })
            .collect();

        hits.sort_by(by_length);
        Ok(hits)
    }

    async fn attribute_codes(
        &self,
        destination: &str,
        origin: &str,
    ) -> StorageResult<Vec<String>> {
        let rules = self.attribute_rules(destination).await?;
        if rules.is_empty() {
            return Ok(Vec::new());
        }

        let origin_ancestors = self.ancestors(origin).await?;
        let mut attributes: Vec<String> = rules
            .into_iter()
            .filter(|rule| origin_ancestors.contains(&rule.range))
            .map(|rule| rule.attribute)
            .collect();

        attributes.sort();
        attributes.dedup();
        Ok(attributes)
    }

    async fn attribute_rules(&self, code: &str) -> StorageResult<Vec<AttributeRule>> {
        let ancestors: Vec<String> = self.ancestors(code).await?.into_iter().collect();
        if ancestors.is_empty() {
            return Ok(Vec::new());
        }

        let mut response = self
            .client
            .query("SELECT attribute, domain FROM attr_domain WHERE domain IN $ancestors")
            .bind(("ancestors", ancestors))
            .await
            .map_err(|e| StorageError::Query(format!("Failed to read domains: {}", e)))?;
        let domains: Vec<AttributeDomainRule> = response
            .take(0)
            .map_err(|e| StorageError::Query(format!("Failed to extract domains: {}", e)))?;
        if domains.is_empty() {
            return Ok(Vec::new());
        }

        let attributes: Vec<String> = domains
            .iter()
            .map(|d| d.attribute.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let mut response = self
            .client
            .query("SELECT attribute, range FROM attr_range WHERE attribute IN $attributes")
            .bind(("attributes", attributes))
            .await
            .map_err(|e| StorageError::Query(format!("Failed to read ranges: {}", e)))?;
        let ranges: Vec<AttributeRangeRule> = response
            .take(0)
            .map_err(|e| StorageError::Query(format!("Failed to extract ranges: {}", e)))?;

        let mut rules = Vec::new();
        for domain in &domains {
            for range in ranges.iter().filter(|r| r.attribute == domain.attribute) {
                rules.push(AttributeRule {
                    attribute: domain.attribute.clone(),
                    domain: domain.domain.clone(),
                    range: range.range.clone(),
                });
            }
        }
        Ok(rules)
    }

    async fn replace_closure(&self, pairs: Vec<ClosurePair>) -> StorageResult<u64> {
        let _lock = self.write_lock.lock().await;
        self.write_closure(pairs).await
    }

    async fn closure_version(&self) -> StorageResult<u64> {
        self.current_version().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::closure::compute_closure;

    async fn store() -> EmbeddedOntologyStore {
        let client = Surreal::new::<Mem>(()).await.unwrap();
        SurrealOntologyStore::new(client, &SurrealDBConfig::default(), crate::config::FSN_TYPE_ID)
            .await
            .unwrap()
    }

    fn snapshot() -> OntologySnapshot {
        OntologySnapshot::builder()
            .concept("404684003", "Clinical finding (finding)")
            .concept("90708001", "Kidney disease (disorder)")
            .synonym("90708001", "Kidney disease")
            .is_a("90708001", "404684003")
            .concept("709044004", "Chronic kidney disease (disorder)")
            .synonym("709044004", "Chronic kidney disease")
            .is_a("709044004", "90708001")
            .inactive_concept("236425005", "Chronic renal failure (disorder)")
            .replaced_by("236425005", "709044004", "20170731")
            .concept("123037004", "Body structure (body structure)")
            .concept("64033007", "Kidney structure (body structure)")
            .is_a("64033007", "123037004")
            .concept("363698007", "Finding site (attribute)")
            .attribute("363698007", "404684003", "123037004")
            .build()
    }

    #[tokio::test]
    async fn test_import_and_lookups() {
        let store = store().await;
        store.import(snapshot()).await.unwrap();

        assert!(store.health_check().await.unwrap());
        assert_eq!(store.closure_version().await.unwrap(), 0);
        assert!(!store.concept("236425005").await.unwrap().unwrap().active);
        assert_eq!(
            store.replacement("236425005").await.unwrap().as_deref(),
            Some("709044004")
        );
        assert_eq!(store.children("90708001").await.unwrap(), vec!["709044004"]);
        assert_eq!(store.descriptions("709044004").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_closure_versions_and_attributes() {
        let store = store().await;
        store.import(snapshot()).await.unwrap();

        let pairs = compute_closure(&store.is_a_edges().await.unwrap()).into_pairs();
        assert_eq!(store.replace_closure(pairs.clone()).await.unwrap(), 1);
        assert_eq!(store.replace_closure(pairs).await.unwrap(), 2);

        let ancestors = store.ancestors("709044004").await.unwrap();
        assert!(ancestors.contains("404684003"));
        assert!(!ancestors.contains("709044004"));
        assert_eq!(
            store.attribute_codes("709044004", "64033007").await.unwrap(),
            vec!["363698007".to_string()]
        );

        let hits = store
            .search_descriptions(&DescriptionQuery {
                term: "kidney".to_string(),
                parent: Some("90708001".to_string()),
                limit: 5,
            })
            .await
            .unwrap();
        assert!(!hits.is_empty());
        assert!(hits.iter().all(|h| h.concept_code == "709044004"));
    }

    #[tokio::test]
    async fn test_rebuild_after_interrupted_write_uses_fresh_version() {
        let store = store().await;
        store.import(snapshot()).await.unwrap();

        // rows of a rebuild that failed before publishing
        store
            .insert_rows(
                "closure",
                vec![ClosureRow {
                    version: 1,
                    subtype: "709044004".to_string(),
                    supertype: "123037004".to_string(),
                }],
            )
            .await
            .unwrap();
        assert_eq!(store.closure_version().await.unwrap(), 0);

        let pairs = compute_closure(&store.is_a_edges().await.unwrap()).into_pairs();
        assert_eq!(store.replace_closure(pairs).await.unwrap(), 2);
        assert_eq!(store.closure_version().await.unwrap(), 2);

        let ancestors = store.ancestors("709044004").await.unwrap();
        assert!(ancestors.contains("90708001"));
        assert!(!ancestors.contains("123037004"));

        let mut response = store
            .client()
            .query("SELECT VALUE version FROM closure WHERE version != 2")
            .await
            .unwrap();
        let stale: Vec<u64> = response.take(0).unwrap();
        assert!(stale.is_empty());
    }
}
