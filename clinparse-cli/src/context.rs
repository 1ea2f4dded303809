use clinparse::annotation::HttpAnnotationClient;
use clinparse::config::{ClinparseConfig, ConfigLoader};
use clinparse::core::ConceptEngine;
use clinparse::storage::create_ontology_store;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub struct ClinparseCliContext {
    pub engine: ConceptEngine,
}

impl ClinparseCliContext {
    /// Load configuration and open the ontology store.
    ///
    /// Logging is owned by the CLI, so the library's subscriber setup is skipped.
    pub async fn new(config_path: Option<&Path>, snapshot: Option<PathBuf>) -> clinparse::Result<Self> {
        let config = load_config(config_path, snapshot)?;

        let store = create_ontology_store(&config.storage, &config.ontology).await?;
        let annotation = HttpAnnotationClient::new(&config.annotation)?;

        Ok(Self {
            engine: ConceptEngine::new(config, store, Arc::new(annotation)),
        })
    }
}

/// Default files, `--config`, environment, then `--snapshot`.
pub fn load_config(
    config_path: Option<&Path>,
    snapshot: Option<PathBuf>,
) -> clinparse::Result<ClinparseConfig> {
    let mut config = ConfigLoader::load(config_path)?;
    if let Some(path) = snapshot {
        config.storage.snapshot = Some(path);
    }
    Ok(config)
}
