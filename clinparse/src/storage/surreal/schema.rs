//! Schema initialization for the SurrealDB ontology store

use crate::storage::errors::StorageError;
use surrealdb::{Connection, Surreal};

/// Define the ontology tables and their lookup indexes
pub async fn initialize_schema<C>(client: &Surreal<C>) -> Result<(), StorageError>
where
    C: Connection,
{
    let concept_query = r#"
        DEFINE TABLE IF NOT EXISTS concept SCHEMALESS
        COMMENT "SNOMED CT concepts with their active flag";

        DEFINE INDEX IF NOT EXISTS concept_code_idx ON concept FIELDS code UNIQUE;
        DEFINE INDEX IF NOT EXISTS concept_active_idx ON concept FIELDS active;
    "#;

    let description_query = r#"
        DEFINE TABLE IF NOT EXISTS description SCHEMALESS
        COMMENT "Terms of concepts, with lowercased words for full-text lookups";

        DEFINE INDEX IF NOT EXISTS description_concept_idx ON description FIELDS concept_code;
        DEFINE INDEX IF NOT EXISTS description_words_idx ON description FIELDS words;
        DEFINE INDEX IF NOT EXISTS description_type_idx ON description FIELDS type_id;
    "#;

    let hierarchy_query = r#"
        DEFINE TABLE IF NOT EXISTS is_a SCHEMALESS
        COMMENT "Direct, active is-a edges";

        DEFINE INDEX IF NOT EXISTS is_a_source_idx ON is_a FIELDS source;
        DEFINE INDEX IF NOT EXISTS is_a_destination_idx ON is_a FIELDS destination;

        DEFINE TABLE IF NOT EXISTS association SCHEMALESS
        COMMENT "Historical associations of inactive concepts";

        DEFINE INDEX IF NOT EXISTS association_source_idx ON association FIELDS source;
    "#;

    let attribute_query = r#"
        DEFINE TABLE IF NOT EXISTS attr_domain SCHEMALESS;
        DEFINE INDEX IF NOT EXISTS attr_domain_domain_idx ON attr_domain FIELDS domain;

        DEFINE TABLE IF NOT EXISTS attr_range SCHEMALESS;
        DEFINE INDEX IF NOT EXISTS attr_range_attribute_idx ON attr_range FIELDS attribute;

        DEFINE TABLE IF NOT EXISTS cui_map SCHEMALESS;
        DEFINE INDEX IF NOT EXISTS cui_map_cui_idx ON cui_map FIELDS cui;
    "#;

    // Closure rows carry the version they belong to. Readers follow
    // closure_meta:current, which a rebuild flips once all rows are written.
    let closure_query = r#"
        DEFINE TABLE IF NOT EXISTS closure SCHEMALESS
        COMMENT "Versioned transitive closure of the is-a hierarchy";

        DEFINE INDEX IF NOT EXISTS closure_subtype_idx ON closure FIELDS version, subtype;
        DEFINE INDEX IF NOT EXISTS closure_supertype_idx ON closure FIELDS version, supertype;

        DEFINE TABLE IF NOT EXISTS closure_meta SCHEMALESS;
    "#;

    for (name, query) in [
        ("concept", concept_query),
        ("description", description_query),
        ("hierarchy", hierarchy_query),
        ("attribute", attribute_query),
        ("closure", closure_query),
    ] {
        client
            .query(query)
            .await
            .and_then(|response| response.check())
            .map_err(|e| {
                StorageError::Query(format!("Failed to define {} tables: {}", name, e))
            })?;
    }

    tracing::debug!("Ontology schema initialized");
    Ok(())
}
