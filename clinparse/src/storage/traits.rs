//! Query surface of the ontology store.

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::fmt::Debug;

use crate::storage::errors::StorageResult;
use crate::storage::models::{
    AttributeRule, ClosurePair, ConceptRecord, DescriptionHit, DescriptionQuery,
    DescriptionRecord, IsAEdge,
};
use crate::storage::snapshot::OntologySnapshot;

/// Read access to an ontology plus the two bulk writes the engine performs: loading
/// a snapshot and swapping in a rebuilt closure.
///
/// Closure reads always see one complete closure version; `replace_closure` must not
/// expose a partially written one.
#[async_trait]
pub trait OntologyStore: Send + Sync + 'static + Debug {
    /// Check if the store is healthy and available
    async fn health_check(&self) -> StorageResult<bool>;

    /// Replace the ontology content (the closure included, when the snapshot has one)
    async fn import(&self, snapshot: OntologySnapshot) -> StorageResult<()>;

    /// All active, direct is-a edges
    async fn is_a_edges(&self) -> StorageResult<Vec<IsAEdge>>;

    async fn concept(&self, code: &str) -> StorageResult<Option<ConceptRecord>>;

    /// Closure supertypes of `code`, never `code` itself
    async fn ancestors(&self, code: &str) -> StorageResult<BTreeSet<String>>;

    /// Closure subtypes of `code`, never `code` itself
    async fn descendants(&self, code: &str) -> StorageResult<BTreeSet<String>>;

    /// Direct is-a children of `code`
    async fn children(&self, code: &str) -> StorageResult<Vec<String>>;

    /// Target of the most recent active association of an inactive concept
    async fn replacement(&self, code: &str) -> StorageResult<Option<String>>;

    /// Active and inactive descriptions of `code`
    async fn descriptions(&self, code: &str) -> StorageResult<Vec<DescriptionRecord>>;

    /// Primary-system codes mapped to a UMLS CUI
    async fn codes_for_cui(&self, cui: &str) -> StorageResult<Vec<String>>;

    /// Active descriptions of active (or in-scope) concepts containing the term, or
    /// belonging to a concept whose code equals it, shortest first. Only concepts with
    /// an active FSN are returned.
    async fn search_descriptions(&self, query: &DescriptionQuery)
    -> StorageResult<Vec<DescriptionHit>>;

    /// Active descriptions of active concepts sharing at least one word with `words`
    async fn full_text_search(&self, words: &[String]) -> StorageResult<Vec<DescriptionHit>>;

    /// Attributes whose domain is an ancestor of `destination` and whose range is an
    /// ancestor of `origin`
    async fn attribute_codes(&self, destination: &str, origin: &str)
    -> StorageResult<Vec<String>>;

    /// Attribute rules whose domain is an ancestor of `code`
    async fn attribute_rules(&self, code: &str) -> StorageResult<Vec<AttributeRule>>;

    /// Atomically replace the closure, returning the new version
    async fn replace_closure(&self, pairs: Vec<ClosurePair>) -> StorageResult<u64>;

    /// Version of the closure readers currently see; 0 when none was built
    async fn closure_version(&self) -> StorageResult<u64>;
}
