//! Configuration validation utilities.

use super::ConfigError;
use super::models::*;

/// Validate the entire configuration.
pub fn validate_config(config: &ClinparseConfig) -> Result<(), ConfigError> {
    validate_storage_config(&config.storage)?;
    validate_annotation_config(&config.annotation)?;
    validate_ontology_config(&config.ontology)?;
    validate_search_config(&config.search)?;
    validate_relationship_config(&config.relationships)?;

    Ok(())
}

fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.data_dir.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "Data directory cannot be empty".to_string(),
        ));
    }

    if config.backend == OntologyBackend::SurrealDB {
        if config.surrealdb.namespace.is_empty() {
            return Err(ConfigError::ValidationError(
                "SurrealDB namespace cannot be empty".to_string(),
            ));
        }
        if config.surrealdb.database.is_empty() {
            return Err(ConfigError::ValidationError(
                "SurrealDB database cannot be empty".to_string(),
            ));
        }
        if config.surrealdb.batch_size == 0 {
            return Err(ConfigError::ValidationError(
                "SurrealDB batch size must be positive".to_string(),
            ));
        }
        if config.surrealdb.engine == SurrealDBEngine::RocksDB
            && config.surrealdb.connection.is_empty()
        {
            return Err(ConfigError::ValidationError(
                "SurrealDB RocksDB engine needs a connection path".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_annotation_config(config: &AnnotationConfig) -> Result<(), ConfigError> {
    if config.url.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "Annotation service url cannot be empty".to_string(),
        ));
    }
    if !(config.url.starts_with("http://") || config.url.starts_with("https://")) {
        return Err(ConfigError::ValidationError(format!(
            "Annotation service url must be http(s): {}",
            config.url
        )));
    }
    if config.timeout.is_zero() || config.health_timeout.is_zero() {
        return Err(ConfigError::ValidationError(
            "Annotation timeouts must be positive".to_string(),
        ));
    }

    Ok(())
}

fn validate_ontology_config(config: &OntologyConfig) -> Result<(), ConfigError> {
    for (name, value) in [
        ("primary system", &config.primary_system),
        ("root concept", &config.root_concept),
        ("is-a type id", &config.is_a_type_id),
        ("FSN type id", &config.fsn_type_id),
    ] {
        if value.trim().is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "Ontology {} cannot be empty",
                name
            )));
        }
    }

    Ok(())
}

fn validate_search_config(config: &SearchConfig) -> Result<(), ConfigError> {
    if config.result_limit == 0 {
        return Err(ConfigError::ValidationError(
            "Search result limit must be positive".to_string(),
        ));
    }

    for (name, value) in [
        ("combination threshold", config.combination_threshold),
        ("promotion threshold", config.promotion_threshold),
    ] {
        if !(value > 0.0 && value <= 1.0) {
            return Err(ConfigError::ValidationError(format!(
                "Search {} must be in (0, 1], got {}",
                name, value
            )));
        }
    }

    Ok(())
}

fn validate_relationship_config(config: &RelationshipConfig) -> Result<(), ConfigError> {
    if config.phrase_labels.is_empty() {
        return Err(ConfigError::ValidationError(
            "At least one phrase label is required".to_string(),
        ));
    }

    Ok(())
}
