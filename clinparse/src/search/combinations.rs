//! Multi-word concept discovery.
//!
//! The annotation service labels single words or short phrases. Concepts spanning a
//! dependency phrase ("chronic kidney disease") are found by trying every contiguous
//! run of the phrase's words against the descriptions that share a word with it.

use std::collections::{BTreeMap, BTreeSet};

use crate::models::Span;
use crate::resolver::{normalize, similarity_normalized};
use crate::storage::{OntologyStore, StorageResult};

/// A contiguous run of phrase words.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordCombination {
    /// From the start of the first word to the end of the last one
    pub span: Span,
    pub text: String,
}

/// Every left-aligned run: for each starting word, the run up to each later word.
///
/// `words` is keyed by span, so runs follow document order.
pub fn combinations(words: &BTreeMap<Span, String>) -> Vec<WordCombination> {
    let entries: Vec<(&Span, &String)> = words.iter().collect();
    let mut result = Vec::new();

    for (start, (first, _)) in entries.iter().enumerate() {
        let mut run: Vec<&str> = Vec::new();
        for (last, word) in &entries[start..] {
            run.push(word.as_str());
            result.push(WordCombination {
                span: Span::new(first.begin, last.end),
                text: run.join(" "),
            });
        }
    }

    result
}

/// Concepts whose active descriptions closely match a run of `words`, by run span.
///
/// One full-text query covers the whole word bag. A hit is recorded when the
/// normalized similarity between description and run exceeds `threshold`.
pub async fn search_combinations(
    store: &dyn OntologyStore,
    words: &BTreeMap<Span, String>,
    threshold: f64,
) -> StorageResult<BTreeMap<Span, BTreeSet<String>>> {
    let mut found: BTreeMap<Span, BTreeSet<String>> = BTreeMap::new();
    if words.is_empty() {
        return Ok(found);
    }

    let runs: Vec<(Span, String)> = combinations(words)
        .into_iter()
        .map(|c| (c.span, normalize(&c.text)))
        .filter(|(_, text)| !text.is_empty())
        .collect();

    let bag: Vec<String> = words.values().cloned().collect();
    let hits = store.full_text_search(&bag).await?;

    for hit in &hits {
        let term = normalize(&hit.term);
        for (span, run) in &runs {
            if similarity_normalized(&term, run) > threshold {
                found
                    .entry(*span)
                    .or_default()
                    .insert(hit.concept_code.clone());
            }
        }
    }

    tracing::debug!(
        words = words.len(),
        runs = runs.len(),
        hits = hits.len(),
        matched_spans = found.len(),
        "Searched word combinations"
    );

    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryOntologyStore, OntologySnapshot};

    // "no chronic kidney disease"
    fn words() -> BTreeMap<Span, String> {
        BTreeMap::from([
            (Span::new(3, 10), "chronic".to_string()),
            (Span::new(11, 17), "kidney".to_string()),
            (Span::new(18, 25), "disease".to_string()),
        ])
    }

    #[test]
    fn test_combinations_are_left_aligned_runs() {
        let runs = combinations(&words());
        let rendered: Vec<(Span, &str)> = runs.iter().map(|c| (c.span, c.text.as_str())).collect();

        assert_eq!(
            rendered,
            vec![
                (Span::new(3, 10), "chronic"),
                (Span::new(3, 17), "chronic kidney"),
                (Span::new(3, 25), "chronic kidney disease"),
                (Span::new(11, 17), "kidney"),
                (Span::new(11, 25), "kidney disease"),
                (Span::new(18, 25), "disease"),
            ]
        );
    }

    #[tokio::test]
    async fn test_full_phrase_found_once() {
        let snapshot = OntologySnapshot::builder()
            .concept("709044004", "Chronic kidney disease (disorder)")
            .synonym("709044004", "Chronic kidney disease")
            .synonym("709044004", "CKD")
            .concept("90708001", "Kidney disease (disorder)")
            .synonym("90708001", "Kidney disease")
            .concept("64033007", "Kidney structure (body structure)")
            .synonym("64033007", "Kidney")
            .build();
        let store = MemoryOntologyStore::from_snapshot(snapshot).await;

        let found = search_combinations(&store, &words(), 0.90).await.unwrap();

        let spans_with_ckd: Vec<Span> = found
            .iter()
            .filter(|(_, codes)| codes.contains("709044004"))
            .map(|(span, _)| *span)
            .collect();
        assert_eq!(spans_with_ckd, vec![Span::new(3, 25)]);
        assert!(found[&Span::new(11, 25)].contains("90708001"));
        assert!(found[&Span::new(11, 17)].contains("64033007"));
    }

    #[tokio::test]
    async fn test_empty_words() {
        let store = MemoryOntologyStore::new();
        let found = search_combinations(&store, &BTreeMap::new(), 0.90).await.unwrap();
        assert!(found.is_empty());
    }
}
