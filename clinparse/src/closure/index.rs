use crate::storage::ClosurePair;
use std::collections::{BTreeSet, HashMap};

/// Read-only, versioned closure held in memory.
///
/// Instances are never mutated after construction; a rebuild produces a new index
/// that replaces the old one behind an `Arc`.
#[derive(Debug, Clone, Default)]
pub struct ClosureIndex {
    version: u64,
    ancestors: HashMap<String, BTreeSet<String>>,
    descendants: HashMap<String, BTreeSet<String>>,
    pairs: usize,
}

impl ClosureIndex {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_pairs(version: u64, pairs: &[ClosurePair]) -> Self {
        let mut ancestors: HashMap<String, BTreeSet<String>> = HashMap::new();
        let mut descendants: HashMap<String, BTreeSet<String>> = HashMap::new();
        let mut count = 0;

        for pair in pairs {
            if pair.subtype == pair.supertype {
                continue;
            }
            if ancestors
                .entry(pair.subtype.clone())
                .or_default()
                .insert(pair.supertype.clone())
            {
                count += 1;
                descendants
                    .entry(pair.supertype.clone())
                    .or_default()
                    .insert(pair.subtype.clone());
            }
        }

        Self {
            version,
            ancestors,
            descendants,
            pairs: count,
        }
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.pairs
    }

    pub fn is_empty(&self) -> bool {
        self.pairs == 0
    }

    pub fn ancestors(&self, code: &str) -> Option<&BTreeSet<String>> {
        self.ancestors.get(code)
    }

    pub fn descendants(&self, code: &str) -> Option<&BTreeSet<String>> {
        self.descendants.get(code)
    }

    pub fn is_ancestor(&self, code: &str, ancestor: &str) -> bool {
        self.ancestors
            .get(code)
            .is_some_and(|set| set.contains(ancestor))
    }

    pub fn to_pairs(&self) -> Vec<ClosurePair> {
        let mut pairs: Vec<ClosurePair> = self
            .ancestors
            .iter()
            .flat_map(|(subtype, supertypes)| {
                supertypes.iter().map(move |supertype| ClosurePair {
                    subtype: subtype.clone(),
                    supertype: supertype.clone(),
                })
            })
            .collect();
        pairs.sort();
        pairs
    }
}
