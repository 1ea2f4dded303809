//! Configuration builder.
//!
//! This module provides a builder pattern API for creating configurations.

use super::{Result, models::*, validation};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Builder for creating ClinparseConfig instances.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: ClinparseConfig,
}

impl ConfigBuilder {
    /// Create a new configuration builder with default values.
    pub fn new() -> Self {
        Self {
            config: ClinparseConfig::default(),
        }
    }

    /// Set the base data directory.
    pub fn with_data_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config.storage.data_dir = path.as_ref().to_path_buf();
        self
    }

    /// Use the in-memory ontology store.
    pub fn with_memory_backend(mut self) -> Self {
        self.config.storage.backend = OntologyBackend::Memory;
        self
    }

    /// Use embedded SurrealDB with the given engine.
    ///
    /// For RocksDB the database lives under `<data_dir>/ontology`.
    pub fn with_surrealdb_backend(mut self, engine: SurrealDBEngine) -> Self {
        self.config.storage.backend = OntologyBackend::SurrealDB;
        self.config.storage.surrealdb.engine = engine;
        if engine == SurrealDBEngine::RocksDB {
            self.config.storage.surrealdb.connection = self
                .config
                .storage
                .data_dir
                .join("ontology")
                .to_string_lossy()
                .to_string();
        }
        self
    }

    /// Load this JSON snapshot into the in-memory store.
    pub fn with_snapshot<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config.storage.snapshot = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set the annotation service url.
    pub fn with_annotation_url(mut self, url: impl Into<String>) -> Self {
        self.config.annotation.url = url.into();
        self
    }

    /// Set the wall-clock budget for annotation calls.
    pub fn with_annotation_timeout(mut self, timeout: Duration) -> Self {
        self.config.annotation.timeout = timeout;
        self
    }

    /// Replace the exclusion set.
    pub fn with_excluded_ancestors<I, S>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.ontology.excluded_ancestors = codes.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the inclusion set used when a request brings none.
    pub fn with_default_included_ancestors<I, S>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.ontology.default_included_ancestors =
            codes.into_iter().map(Into::into).collect();
        self
    }

    /// Set the search hit limit.
    pub fn with_search_limit(mut self, limit: usize) -> Self {
        self.config.search.result_limit = limit;
        self
    }

    /// Set the combination and promotion similarity thresholds.
    pub fn with_similarity_thresholds(mut self, combination: f64, promotion: f64) -> Self {
        self.config.search.combination_threshold = combination;
        self.config.search.promotion_threshold = promotion;
        self
    }

    /// Set the log level.
    pub fn with_log_level(mut self, level: LogLevel) -> Self {
        self.config.logging.level = level;
        self
    }

    /// Set the log format.
    pub fn with_log_format(mut self, format: LogFormat) -> Self {
        self.config.logging.format = format;
        self
    }

    /// Configure logging to a file.
    pub fn with_log_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config.logging.file = Some(path.as_ref().to_path_buf());
        self.config.logging.stdout = false;
        self
    }

    /// Put the data directory under the user's home (`~/.clinparse/data`).
    pub fn with_default_storage(mut self) -> Self {
        if self.config.storage.data_dir == PathBuf::from("./data") {
            let home_dir = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
            self.config.storage.data_dir = home_dir.join(".clinparse").join("data");
        }
        self
    }

    /// Create a configuration for development with debug logging.
    pub fn development() -> Self {
        Self::new()
            .with_memory_backend()
            .with_log_level(LogLevel::Debug)
            .with_log_format(LogFormat::Pretty)
    }

    /// Create a configuration for tests: in-memory store, warn-level logging.
    pub fn testing() -> Self {
        Self::new()
            .with_memory_backend()
            .with_data_dir(PathBuf::from("./test_data"))
            .with_log_level(LogLevel::Warn)
    }

    /// Create a fully default configuration suitable for most uses
    pub fn defaults() -> Self {
        Self::new().with_default_storage()
    }

    /// Start from an existing configuration.
    pub fn from_config(config: ClinparseConfig) -> Self {
        Self { config }
    }

    /// Build the configuration, validating it in the process.
    pub fn build(self) -> Result<ClinparseConfig> {
        validation::validate_config(&self.config)?;

        Ok(self.config)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
