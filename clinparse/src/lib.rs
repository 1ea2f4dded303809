//! # Clinparse
//!
//! Clinical concept resolution over SNOMED CT. Text pre-annotated by an external
//! clinical NLP service is resolved into canonical ontology concepts, overlapping and
//! inactive annotations are reconciled, multi-word concepts missed by the annotator are
//! discovered through the dependency tree, and directed attribute relationships between
//! concepts are looked up in the ontology's attribute rules.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use clinparse::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let engine = init_with_defaults().await?;
//!
//!     // Ontology navigation does not need the annotation service
//!     let hits = engine.search("diabetes", None).await?;
//!     for hit in hits {
//!         println!("{}", hit.display_name);
//!     }
//!
//!     // Full document parsing does
//!     let result = engine.parse("No signs of chronic kidney disease.", &ParseRequest::default()).await?;
//!     println!("{} concepts", result.concepts.len());
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - **closure**: transitive is-a closure, rebuilt out of band and swapped atomically
//! - **resolver**: (system, code) + span into a fully populated [`models::Concept`]
//! - **overlap**: nested-span flagging and per-position selection
//! - **search**: substring search, combinatorial n-gram discovery, concept navigation
//! - **relationships**: dependency graph, attribute discovery and focus matching
//! - **pipeline**: the per-document sequence tying the above together
//!
//! Ontology data lives behind the [`storage::OntologyStore`] trait, with an in-memory
//! implementation and an embedded SurrealDB one (`surrealdb-embedded` feature).

pub mod annotation;
pub mod closure;
pub mod config;
pub mod core;
pub mod logging;
pub mod models;
pub mod overlap;
pub mod pipeline;
pub mod relationships;
pub mod render;
pub mod resolver;
pub mod search;
pub mod storage;

/// The prelude re-exports commonly used types for convenience
pub mod prelude {
    pub use crate::{init, init_with_defaults};

    pub use crate::config::{
        ClinparseConfig, ConfigBuilder, LogLevel, OntologyBackend, OntologyConfig, SearchConfig,
    };

    pub use crate::core::ConceptEngine;

    pub use crate::models::{
        AttributeFocus, Concept, ConceptArena, ConceptFocus, ConceptId, DiscoveryScore,
        FocusRequest, ParseResult, Polarity, Span,
    };

    pub use crate::pipeline::{BatchDocument, BatchOutcome, ParseRequest};

    pub use crate::search::{ConceptDetails, ConceptSummary};

    pub use crate::storage::{MemoryOntologyStore, OntologySnapshot, OntologyStore, StorageError};

    pub use crate::{ClinparseError, Result};
}

/// Current library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Error type for clinparse operations
#[derive(Debug, thiserror::Error)]
pub enum ClinparseError {
    /// Error during storage operations
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Logging error
    #[error("Logging error: {0}")]
    Logging(#[from] crate::logging::LogError),

    /// The annotation service could not be reached or answered with a non-2xx status
    #[error(
        "Annotation service unavailable: {0}. Check that the service is running and reachable at the configured url"
    )]
    UpstreamUnavailable(String),

    /// The annotation service answered, but the payload could not be used
    #[error("Annotation error: {0}")]
    Annotation(String),

    /// Errors raised while building the hierarchy closure
    #[error("Closure error: {0}")]
    Closure(String),

    /// Empty search term
    #[error("Search term cannot be empty. Provide a description fragment or a concept id")]
    EmptySearchTerm,

    /// A concept id that the ontology does not know
    #[error("Concept '{code}' was not found in the ontology")]
    ConceptNotFound { code: String },

    /// Storage directory or snapshot not accessible
    #[error(
        "Ontology snapshot not accessible: {path}. Import one with `clinparse import` or point storage.snapshot at an existing file"
    )]
    SnapshotNotAccessible { path: String },

    /// Feature not enabled
    #[error(
        "Feature '{feature}' is not enabled. Enable it in Cargo.toml with: features = [\"{feature}\"]"
    )]
    FeatureNotEnabled { feature: String },

    /// Other unclassified errors
    #[error("{0}")]
    Other(String),
}

impl From<crate::config::ConfigError> for ClinparseError {
    fn from(err: crate::config::ConfigError) -> Self {
        ClinparseError::Configuration(err.to_string())
    }
}

impl From<crate::storage::StorageError> for ClinparseError {
    fn from(err: crate::storage::StorageError) -> Self {
        ClinparseError::Storage(err.to_string())
    }
}

impl From<crate::closure::ClosureError> for ClinparseError {
    fn from(err: crate::closure::ClosureError) -> Self {
        match err {
            crate::closure::ClosureError::Storage(e) => ClinparseError::Storage(e.to_string()),
            other => ClinparseError::Closure(other.to_string()),
        }
    }
}

impl From<crate::annotation::AnnotationError> for ClinparseError {
    fn from(err: crate::annotation::AnnotationError) -> Self {
        if err.is_unavailable() {
            ClinparseError::UpstreamUnavailable(err.to_string())
        } else {
            ClinparseError::Annotation(err.to_string())
        }
    }
}

impl ClinparseError {
    /// Whether this error means the annotation service is gone for the rest of a batch
    pub fn is_upstream_unavailable(&self) -> bool {
        matches!(self, ClinparseError::UpstreamUnavailable(_))
    }
}

/// Result type for clinparse operations
pub type Result<T> = std::result::Result<T, ClinparseError>;

/// Initialize clinparse with default configuration
///
/// Defaults use the in-memory ontology store, loading the snapshot from the data
/// directory when one exists, and the annotation service at `http://localhost:8080/`.
pub async fn init_with_defaults() -> Result<core::ConceptEngine> {
    let config = config::ConfigBuilder::defaults().build()?;
    init(config).await
}

/// Initialize clinparse with the provided configuration
///
/// Sets up logging, opens the configured ontology store and wires the annotation
/// client, resolver, search and closure builder into a [`core::ConceptEngine`].
///
/// # Examples
///
/// ```rust,no_run
/// use clinparse::prelude::*;
///
/// async fn example() -> Result<()> {
///     let config = ConfigBuilder::new()
///         .with_memory_backend()
///         .with_annotation_url("http://localhost:8080/")
///         .build()?;
///     let engine = init(config).await?;
///     let report = engine.rebuild_closure().await?;
///     println!("closure v{} with {} pairs", report.version, report.pairs);
///     Ok(())
/// }
/// ```
pub async fn init(config: config::ClinparseConfig) -> Result<core::ConceptEngine> {
    if let Err(e) = logging::init(&config.logging) {
        eprintln!("Warning: Failed to initialize logging: {}", e);
    }

    tracing::info!(version = VERSION, "Initializing clinparse");

    let store = storage::create_ontology_store(&config.storage, &config.ontology).await?;
    let annotation = annotation::HttpAnnotationClient::new(&config.annotation)?;

    Ok(core::ConceptEngine::new(
        config,
        store,
        std::sync::Arc::new(annotation),
    ))
}
