//! Hierarchy closure tests
//!
//! Covers the closure properties over the fixture ontology and the rebuild lifecycle:
//! versioning, concurrent rebuilds and the empty-edge-set guard.

mod common;

use clinparse::closure::{ClosureBuilder, ClosureError, compute_closure};
use clinparse::storage::{IsAEdge, MemoryOntologyStore, OntologyStore};
use common::*;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

fn reachable(edges: &[IsAEdge], from: &str) -> BTreeSet<String> {
    let mut parents: HashMap<&str, Vec<&str>> = HashMap::new();
    for edge in edges {
        parents
            .entry(edge.source.as_str())
            .or_default()
            .push(edge.destination.as_str());
    }

    let mut seen = BTreeSet::new();
    let mut stack = parents.get(from).cloned().unwrap_or_default();
    while let Some(node) = stack.pop() {
        if seen.insert(node.to_string()) {
            stack.extend(parents.get(node).cloned().unwrap_or_default());
        }
    }
    seen.remove(from);
    seen
}

#[test]
fn test_closure_matches_reachability() {
    let snapshot = snapshot();
    let computation = compute_closure(&snapshot.is_a);

    assert!(computation.warnings.is_empty());
    for concept in &snapshot.concepts {
        let expected = reachable(&snapshot.is_a, &concept.code);
        let actual = computation
            .ancestors
            .get(&concept.code)
            .cloned()
            .unwrap_or_default();
        assert_eq!(actual, expected, "ancestors of {}", concept.code);
    }
}

#[test]
fn test_closure_is_transitive_without_self_pairs() {
    let computation = compute_closure(&snapshot().is_a);
    let pairs: HashSet<(String, String)> = computation
        .clone()
        .into_pairs()
        .into_iter()
        .map(|p| (p.subtype, p.supertype))
        .collect();

    for (a, b) in &pairs {
        assert_ne!(a, b);
        for (c, d) in &pairs {
            if b == c {
                assert!(pairs.contains(&(a.clone(), d.clone())), "{} -> {} -> {}", a, b, d);
            }
        }
    }
    assert!(pairs.contains(&(CKD.to_string(), CLINICAL_FINDING.to_string())));
}

#[tokio::test]
async fn test_rebuild_versions_and_reads() {
    let store = Arc::new(MemoryOntologyStore::from_snapshot(snapshot()).await);
    let builder = ClosureBuilder::new(store.clone());

    assert_eq!(store.closure_version().await.unwrap(), 0);
    assert!(store.ancestors(CKD).await.unwrap().is_empty());

    let first = builder.rebuild().await.unwrap();
    assert_eq!(first.version, 1);
    assert!(store.ancestors(CKD).await.unwrap().contains(DISEASE));
    assert!(store.descendants(DISEASE).await.unwrap().contains(CKD));

    let second = builder.rebuild().await.unwrap();
    assert_eq!(second.version, 2);
    assert_eq!(first.pairs, second.pairs);
}

#[tokio::test]
async fn test_concurrent_rebuilds_are_serialized() {
    let store = Arc::new(MemoryOntologyStore::from_snapshot(snapshot()).await);
    let builder = Arc::new(ClosureBuilder::new(store.clone()));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let builder = builder.clone();
            tokio::spawn(async move { builder.rebuild().await.unwrap().version })
        })
        .collect();

    let mut versions = Vec::new();
    for handle in handles {
        versions.push(handle.await.unwrap());
    }
    versions.sort();

    assert_eq!(versions, vec![1, 2, 3, 4]);
    assert_eq!(store.closure_version().await.unwrap(), 4);
}

#[tokio::test]
async fn test_empty_edge_set_keeps_previous_closure() {
    let store = Arc::new(MemoryOntologyStore::new());
    let builder = ClosureBuilder::new(store.clone());

    assert!(matches!(builder.rebuild().await, Err(ClosureError::EmptyEdgeSet)));
    assert_eq!(store.closure_version().await.unwrap(), 0);
}
