//! Ontology storage.
//!
//! [`OntologyStore`] is the query surface the rest of the crate works against. Two
//! backends implement it:
//!
//! - **Memory**: hash indexes in process, optionally persisted as a JSON snapshot.
//!   Default, and what the tests use.
//! - **SurrealDB**: embedded SurrealDB (in-memory or RocksDB), behind the
//!   `surrealdb-embedded` feature.
//!
//! Content enters a store as an [`OntologySnapshot`], either hand-built or produced by
//! the [`rf2`] loader from a SNOMED CT release.

pub mod errors;
pub mod memory;
pub mod models;
pub mod rf2;
pub mod snapshot;
#[cfg(feature = "surrealdb-embedded")]
pub mod surreal;
pub mod traits;

pub use errors::{StorageError, StorageResult};
pub use memory::MemoryOntologyStore;
pub use models::*;
pub use snapshot::{OntologySnapshot, SnapshotBuilder, SnapshotSummary, SYNONYM_TYPE_ID};
pub use traits::OntologyStore;

use std::sync::Arc;

use crate::config::{OntologyBackend, OntologyConfig, StorageConfig};

/// Open the store the configuration asks for.
pub async fn create_ontology_store(
    storage: &StorageConfig,
    ontology: &OntologyConfig,
) -> crate::Result<Arc<dyn OntologyStore>> {
    match storage.backend {
        OntologyBackend::Memory => {
            let path = storage.snapshot_path();
            tracing::info!("Creating in-memory ontology store ({})", path.display());
            let store = MemoryOntologyStore::open(&path, &ontology.fsn_type_id)
                .await
                .map_err(|e| match e {
                    StorageError::Io(message) => {
                        tracing::error!("Cannot read {}: {}", path.display(), message);
                        crate::ClinparseError::SnapshotNotAccessible {
                            path: path.display().to_string(),
                        }
                    }
                    other => other.into(),
                })?;
            Ok(Arc::new(store))
        }
        #[cfg(feature = "surrealdb-embedded")]
        OntologyBackend::SurrealDB => {
            let store = surreal::create_embedded_store(&storage.surrealdb, &ontology.fsn_type_id)
                .await?;
            Ok(store)
        }
        #[cfg(not(feature = "surrealdb-embedded"))]
        OntologyBackend::SurrealDB => Err(crate::ClinparseError::FeatureNotEnabled {
            feature: "surrealdb-embedded".to_string(),
        }),
    }
}
