//! Sequential batch parsing.
//!
//! Documents are parsed one after the other. A failing document is recorded and the
//! batch moves on, unless the annotation service is unavailable: then every remaining
//! document is marked skipped.

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use super::{DocumentParser, ParseRequest};
use crate::models::ParseResult;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchDocument {
    /// Caller key, e.g. a file name
    pub id: String,
    pub text: String,
}

impl BatchDocument {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DocumentOutcome {
    Parsed { result: Box<ParseResult> },
    Failed { error: String },
    /// Not attempted because the annotation service went away
    Skipped,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchEntry {
    pub id: String,
    #[serde(flatten)]
    pub outcome: DocumentOutcome,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub entries: Vec<BatchEntry>,
    /// Set when the annotation service became unavailable mid-batch
    pub aborted: bool,
}

impl BatchOutcome {
    pub fn parsed(&self) -> impl Iterator<Item = (&str, &ParseResult)> {
        self.entries.iter().filter_map(|e| match &e.outcome {
            DocumentOutcome::Parsed { result } => Some((e.id.as_str(), result.as_ref())),
            _ => None,
        })
    }

    pub fn failed_count(&self) -> usize {
        self.count(|o| matches!(o, DocumentOutcome::Failed { .. }))
    }

    pub fn skipped_count(&self) -> usize {
        self.count(|o| matches!(o, DocumentOutcome::Skipped))
    }

    fn count(&self, predicate: impl Fn(&DocumentOutcome) -> bool) -> usize {
        self.entries.iter().filter(|e| predicate(&e.outcome)).count()
    }
}

impl DocumentParser {
    /// Parse `documents` in order, calling `progress` after each one.
    pub async fn parse_batch<F>(
        &self,
        documents: Vec<BatchDocument>,
        request: &ParseRequest,
        mut progress: F,
    ) -> BatchOutcome
    where
        F: FnMut(&BatchEntry) + Send,
    {
        let total = documents.len();
        let mut outcome = BatchOutcome::default();

        for document in documents {
            let result = if outcome.aborted {
                DocumentOutcome::Skipped
            } else {
                match self.parse(&document.text, request).await {
                    Ok(result) => DocumentOutcome::Parsed {
                        result: Box::new(result),
                    },
                    Err(e) if e.is_upstream_unavailable() => {
                        error!(document = %document.id, "Annotation service unavailable, aborting batch: {}", e);
                        outcome.aborted = true;
                        DocumentOutcome::Failed {
                            error: e.to_string(),
                        }
                    }
                    Err(e) => {
                        warn!(document = %document.id, "Document failed: {}", e);
                        DocumentOutcome::Failed {
                            error: e.to_string(),
                        }
                    }
                }
            };

            let entry = BatchEntry {
                id: document.id,
                outcome: result,
            };
            progress(&entry);
            outcome.entries.push(entry);
        }

        info!(
            total,
            failed = outcome.failed_count(),
            skipped = outcome.skipped_count(),
            aborted = outcome.aborted,
            "Batch finished"
        );

        outcome
    }
}
