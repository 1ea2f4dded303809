//! Hierarchy closure.
//!
//! The closure is the reflexive-free transitive closure of the direct, active is-a
//! edges: `(a, b)` is in it iff a chain of one or more edges leads from `a` to `b`.
//! It is rebuilt in full by [`ClosureBuilder::rebuild`] and swapped into the store in
//! one step, so resolution running concurrently sees either the previous version or the
//! new one.

mod index;

pub use index::ClosureIndex;

use crate::storage::{ClosurePair, IsAEdge, OntologyStore, StorageError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;

#[derive(Debug, thiserror::Error)]
pub enum ClosureError {
    /// Nothing to build from; the stored closure is left as it is
    #[error("No active is-a edges in the ontology store")]
    EmptyEdgeSet,

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Problems met while walking the hierarchy. None of them stops the build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClosureWarning {
    /// `node` reached `parent` while `parent` was still being expanded
    Cycle { node: String, parent: String },
}

/// Outcome of one rebuild.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClosureReport {
    pub version: u64,
    /// Concepts with at least one supertype
    pub nodes: usize,
    pub pairs: usize,
    pub edges: usize,
    pub warnings: Vec<ClosureWarning>,
    pub elapsed_ms: u128,
}

/// Ancestor sets computed from a set of edges.
#[derive(Debug, Clone, Default)]
pub struct ClosureComputation {
    pub ancestors: BTreeMap<String, BTreeSet<String>>,
    pub warnings: Vec<ClosureWarning>,
}

impl ClosureComputation {
    pub fn pair_count(&self) -> usize {
        self.ancestors.values().map(BTreeSet::len).sum()
    }

    pub fn into_pairs(self) -> Vec<ClosurePair> {
        self.ancestors
            .into_iter()
            .flat_map(|(subtype, supertypes)| {
                supertypes.into_iter().map(move |supertype| ClosurePair {
                    subtype: subtype.clone(),
                    supertype,
                })
            })
            .collect()
    }
}

/// Compute the closure of `edges`.
///
/// Nodes are grouped into strongly connected components, visited ancestors-first. A
/// component's ancestors are its members' direct parents plus the ancestors of every
/// parent outside it, so all members of a cycle share one set (minus themselves). Each
/// edge that closes a cycle is recorded as a [`ClosureWarning::Cycle`]. Self-pairs are
/// never produced.
pub fn compute_closure(edges: &[IsAEdge]) -> ClosureComputation {
    let mut parents: HashMap<&str, BTreeSet<&str>> = HashMap::new();
    for edge in edges {
        if edge.source == edge.destination {
            continue;
        }
        parents
            .entry(edge.source.as_str())
            .or_default()
            .insert(edge.destination.as_str());
    }

    let mut walker = Walker {
        parents: &parents,
        order: HashMap::with_capacity(parents.len()),
        stack: Vec::new(),
        on_stack: HashSet::new(),
        next: 0,
        memo: HashMap::with_capacity(parents.len()),
        warnings: Vec::new(),
    };

    let mut nodes: Vec<&str> = parents.keys().copied().collect();
    nodes.sort_unstable();

    for &node in &nodes {
        if !walker.order.contains_key(node) {
            walker.visit(node);
        }
    }

    let mut ancestors = BTreeMap::new();
    for node in nodes {
        if let Some(set) = walker.memo.get(node).filter(|set| !set.is_empty()) {
            ancestors.insert(
                node.to_string(),
                set.iter().map(|s| s.to_string()).collect(),
            );
        }
    }

    ClosureComputation {
        ancestors,
        warnings: walker.warnings,
    }
}

/// Tarjan walk over the parent edges.
struct Walker<'a> {
    parents: &'a HashMap<&'a str, BTreeSet<&'a str>>,
    /// (discovery index, lowest index reachable)
    order: HashMap<&'a str, (usize, usize)>,
    stack: Vec<&'a str>,
    on_stack: HashSet<&'a str>,
    next: usize,
    memo: HashMap<&'a str, BTreeSet<&'a str>>,
    warnings: Vec<ClosureWarning>,
}

impl<'a> Walker<'a> {
    fn visit(&mut self, node: &'a str) {
        let index = self.next;
        self.next += 1;
        self.order.insert(node, (index, index));
        self.stack.push(node);
        self.on_stack.insert(node);

        let parents = self.parents;
        if let Some(direct) = parents.get(node) {
            for &parent in direct {
                let reach = match self.order.get(parent).copied() {
                    None => {
                        self.visit(parent);
                        self.order.get(parent).map(|&(_, low)| low)
                    }
                    Some((parent_index, _)) if self.on_stack.contains(parent) => {
                        tracing::warn!(node, parent, "Cycle in is-a hierarchy");
                        self.warnings.push(ClosureWarning::Cycle {
                            node: node.to_string(),
                            parent: parent.to_string(),
                        });
                        Some(parent_index)
                    }
                    Some(_) => None,
                };
                if let (Some(reach), Some(entry)) = (reach, self.order.get_mut(node)) {
                    entry.1 = entry.1.min(reach);
                }
            }
        }

        if self.order.get(node).is_some_and(|&(index, low)| index == low) {
            let mut component = BTreeSet::new();
            while let Some(member) = self.stack.pop() {
                self.on_stack.remove(member);
                component.insert(member);
                if member == node {
                    break;
                }
            }
            self.close(component);
        }
    }

    /// Every parent outside `component` is already closed.
    fn close(&mut self, component: BTreeSet<&'a str>) {
        let mut acc = BTreeSet::new();
        for &member in &component {
            for &parent in self.parents.get(member).into_iter().flatten() {
                acc.insert(parent);
                if !component.contains(parent) {
                    if let Some(done) = self.memo.get(parent) {
                        acc.extend(done.iter().copied());
                    }
                }
            }
        }

        for &member in &component {
            let mut own = acc.clone();
            own.remove(member);
            self.memo.insert(member, own);
        }
    }
}

/// Rebuilds the stored closure. Rebuilds are serialized; readers are not blocked.
#[derive(Debug)]
pub struct ClosureBuilder {
    store: Arc<dyn OntologyStore>,
    rebuild_lock: Mutex<()>,
}

impl ClosureBuilder {
    pub fn new(store: Arc<dyn OntologyStore>) -> Self {
        Self {
            store,
            rebuild_lock: Mutex::new(()),
        }
    }

    /// Read the edges, compute the closure and swap it into the store.
    pub async fn rebuild(&self) -> Result<ClosureReport, ClosureError> {
        let _guard = self.rebuild_lock.lock().await;
        let started = Instant::now();

        let edges = self.store.is_a_edges().await?;
        if edges.is_empty() {
            return Err(ClosureError::EmptyEdgeSet);
        }

        let computation = compute_closure(&edges);
        let nodes = computation.ancestors.len();
        let pairs = computation.pair_count();
        let warnings = computation.warnings.clone();

        let version = self.store.replace_closure(computation.into_pairs()).await?;

        let report = ClosureReport {
            version,
            nodes,
            pairs,
            edges: edges.len(),
            warnings,
            elapsed_ms: started.elapsed().as_millis(),
        };

        tracing::info!(
            version = report.version,
            nodes = report.nodes,
            pairs = report.pairs,
            edges = report.edges,
            warnings = report.warnings.len(),
            elapsed_ms = report.elapsed_ms as u64,
            "Rebuilt hierarchy closure"
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(source: &str, destination: &str) -> IsAEdge {
        IsAEdge {
            source: source.to_string(),
            destination: destination.to_string(),
        }
    }

    fn ancestors<'a>(c: &'a ClosureComputation, node: &str) -> Vec<&'a str> {
        c.ancestors
            .get(node)
            .map(|s| s.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    #[test]
    fn test_chain_is_transitive() {
        let c = compute_closure(&[edge("a", "b"), edge("b", "c"), edge("c", "root")]);
        assert_eq!(ancestors(&c, "a"), vec!["b", "c", "root"]);
        assert_eq!(ancestors(&c, "b"), vec!["c", "root"]);
        assert_eq!(ancestors(&c, "root"), Vec::<&str>::new());
        assert_eq!(c.pair_count(), 6);
        assert!(c.warnings.is_empty());
    }

    #[test]
    fn test_diamond_counts_shared_ancestor_once() {
        let c = compute_closure(&[
            edge("d", "b"),
            edge("d", "c"),
            edge("b", "a"),
            edge("c", "a"),
        ]);
        assert_eq!(ancestors(&c, "d"), vec!["a", "b", "c"]);
        let pairs = c.into_pairs();
        assert_eq!(pairs.iter().filter(|p| p.subtype == "d").count(), 3);
    }

    #[test]
    fn test_every_pair_has_a_witness_and_no_self_loops() {
        let edges = vec![
            edge("x", "y"),
            edge("y", "z"),
            edge("w", "y"),
            edge("v", "w"),
            edge("v", "x"),
        ];
        let c = compute_closure(&edges);

        for (sub, sups) in &c.ancestors {
            assert!(!sups.contains(sub));
            for sup in sups {
                // reachable by breadth-first search over the direct edges
                let mut frontier = vec![sub.as_str()];
                let mut seen = HashSet::new();
                let mut reached = false;
                while let Some(n) = frontier.pop() {
                    for e in edges.iter().filter(|e| e.source == n) {
                        if e.destination == *sup {
                            reached = true;
                        }
                        if seen.insert(e.destination.as_str()) {
                            frontier.push(e.destination.as_str());
                        }
                    }
                }
                assert!(reached, "{} -> {} has no chain", sub, sup);
            }
        }

        for e1 in &edges {
            for e2 in edges.iter().filter(|e| e.source == e1.destination) {
                assert!(c.ancestors[&e1.source].contains(&e2.destination));
            }
        }
    }

    #[test]
    fn test_cycle_terminates_with_warning() {
        let c = compute_closure(&[edge("a", "b"), edge("b", "a"), edge("b", "root")]);
        assert!(!c.warnings.is_empty());
        assert_eq!(ancestors(&c, "a"), vec!["b", "root"]);
        assert!(!c.ancestors["b"].contains("b"));
        assert!(c.ancestors["b"].contains("a"));
    }

    #[test]
    fn test_cycle_members_share_ancestors() {
        let c = compute_closure(&[
            edge("a", "b"),
            edge("b", "c"),
            edge("c", "a"),
            edge("c", "x"),
        ]);
        assert!(!c.warnings.is_empty());
        assert_eq!(ancestors(&c, "a"), vec!["b", "c", "x"]);
        assert_eq!(ancestors(&c, "b"), vec!["a", "c", "x"]);
        assert_eq!(ancestors(&c, "c"), vec!["a", "b", "x"]);

        // transitive through the cycle, whichever node the walk starts from
        for (node, sups) in &c.ancestors {
            for sup in sups {
                for further in c.ancestors.get(sup).into_iter().flatten() {
                    assert!(further == node || sups.contains(further));
                }
            }
        }
    }

    #[test]
    fn test_subtype_of_cycle_sees_whole_cycle() {
        let c = compute_closure(&[
            edge("leaf", "b"),
            edge("a", "b"),
            edge("b", "a"),
            edge("a", "root"),
        ]);
        assert_eq!(ancestors(&c, "leaf"), vec!["a", "b", "root"]);
        assert_eq!(ancestors(&c, "b"), vec!["a", "root"]);
    }

    #[test]
    fn test_self_edge_ignored() {
        let c = compute_closure(&[edge("a", "a"), edge("a", "b")]);
        assert_eq!(ancestors(&c, "a"), vec!["b"]);
        assert!(c.warnings.is_empty());
    }
}
