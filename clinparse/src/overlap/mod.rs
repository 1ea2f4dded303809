//! Span overlap detection and concept selection.
//!
//! A concept is discarded (flagged `overlap`) when another unflagged concept covers a
//! strictly wider span around it: nested inside, or sharing one boundary while shorter.
//! Two concepts with the same span and the same code count as one. Flags only ever go
//! from unset to set, so running a pass again changes nothing.

use std::collections::{BTreeMap, BTreeSet};

use crate::models::{ConceptArena, ConceptId, ConceptLabel, InactiveLogEntry, OverlapLogEntry, Span};

/// When a wider concept may discard a narrower one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlapPolicy {
    /// The wider span always wins
    Extent,
    /// The wider span wins only if it matches its text at least as well
    SimilarityGuarded,
}

#[derive(Debug, Clone, Copy)]
pub struct OverlapEngine {
    policy: OverlapPolicy,
}

impl OverlapEngine {
    pub fn new(policy: OverlapPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> OverlapPolicy {
        self.policy
    }

    /// Flag every candidate that another unflagged candidate overlaps.
    ///
    /// Each flag is recorded once in the returned log, naming the concept that caused it.
    pub fn resolve_overlaps(
        &self,
        arena: &mut ConceptArena,
        candidates: &[ConceptId],
    ) -> Vec<OverlapLogEntry> {
        let mut log = Vec::new();

        for &c1 in candidates {
            if arena[c1].overlap {
                continue;
            }

            let winner = candidates.iter().copied().find(|&c2| {
                if c2 == c1 || arena[c2].overlap {
                    return false;
                }
                let (first, second) = (&arena[c1], &arena[c2]);

                if first.span.is_subsumed_by(&second.span) {
                    match self.policy {
                        OverlapPolicy::Extent => true,
                        OverlapPolicy::SimilarityGuarded => second.similarity >= first.similarity,
                    }
                } else {
                    first.span == second.span && first.code == second.code
                }
            });

            if let Some(c2) = winner {
                arena[c1].overlap = true;

                let (discarded, kept) = (&arena[c1], &arena[c2]);
                tracing::debug!(
                    discarded = %discarded.code,
                    discarded_span = %discarded.span,
                    kept = %kept.code,
                    kept_span = %kept.span,
                    "Concept overlapped"
                );
                log.push(OverlapLogEntry {
                    discarded: ConceptLabel::from(discarded),
                    discarded_span: discarded.span,
                    kept: ConceptLabel::from(kept),
                    kept_span: kept.span,
                });
            }
        }

        log
    }
}

/// Flatten resolved mentions into the concepts that take part in overlap detection.
///
/// Active concepts stand for themselves. Inactive ones are replaced by their
/// substitutes (recursively), and each replacement is logged.
pub fn expand_substitutes(
    arena: &ConceptArena,
    roots: &[ConceptId],
) -> (Vec<ConceptId>, Vec<InactiveLogEntry>) {
    let mut candidates = Vec::new();
    let mut log = Vec::new();
    let mut stack: Vec<ConceptId> = roots.iter().rev().copied().collect();

    while let Some(id) = stack.pop() {
        let concept = &arena[id];
        if concept.active {
            candidates.push(id);
            continue;
        }

        for &substitute in &concept.substitutes {
            let new = &arena[substitute];
            log.push(InactiveLogEntry {
                text: concept.text.clone(),
                old_code: concept.code.clone(),
                old_fsn: concept.fsn.clone(),
                new_code: new.code.clone(),
                new_fsn: new.fsn.clone(),
            });
        }
        stack.extend(concept.substitutes.iter().rev().copied());
    }

    (candidates, log)
}

/// Pick the concepts to report, per span.
///
/// Only active, non-excluded, unflagged candidates count. At each span one concept per
/// FSN is kept, then a concept is dropped when another survivor at the span is one of
/// its descendants. Candidates are ordered by code first, so the outcome does not depend
/// on input order. The result is ordered by span, then code.
pub fn select_unique(arena: &ConceptArena, candidates: &[ConceptId]) -> Vec<ConceptId> {
    let mut by_span: BTreeMap<Span, Vec<ConceptId>> = BTreeMap::new();
    for &id in candidates {
        let concept = &arena[id];
        if concept.active && !concept.excluded && !concept.overlap {
            by_span.entry(concept.span).or_default().push(id);
        }
    }

    let mut selected = Vec::new();
    for (_, mut group) in by_span {
        group.sort_by(|a, b| (&arena[*a].code, a).cmp(&(&arena[*b].code, b)));

        let mut seen = BTreeSet::new();
        group.retain(|&id| seen.insert(arena[id].fsn_or_code().to_string()));

        let specific: Vec<ConceptId> = group
            .iter()
            .copied()
            .filter(|&id| {
                let code = &arena[id].code;
                !group
                    .iter()
                    .any(|&other| other != id && arena[other].has_ancestor(code))
            })
            .collect();

        selected.extend(specific);
    }

    selected
}
