//! Configuration models.

use crate::models::RelationLabel;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// SNOMED CT root concept
pub const SNOMED_ROOT: &str = "138875005";

/// "Is a" relationship type
pub const IS_A_TYPE_ID: &str = "116680003";

/// Fully specified name description type
pub const FSN_TYPE_ID: &str = "900000000000003001";

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ClinparseConfig {
    /// Ontology storage configuration
    pub storage: StorageConfig,

    /// Annotation service configuration
    pub annotation: AnnotationConfig,

    /// Ontology constants and resolution policy
    pub ontology: OntologyConfig,

    /// Search thresholds
    pub search: SearchConfig,

    /// Dependency relation labels
    pub relationships: RelationshipConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Base directory for data storage
    pub data_dir: PathBuf,

    /// Which ontology store backs the engine
    pub backend: OntologyBackend,

    /// JSON snapshot loaded into the in-memory store at startup
    pub snapshot: Option<PathBuf>,

    /// SurrealDB settings, used when `backend = "surrealdb"`
    pub surrealdb: SurrealDBConfig,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            backend: OntologyBackend::Memory,
            snapshot: None,
            surrealdb: SurrealDBConfig::default(),
        }
    }
}

impl StorageConfig {
    /// Snapshot path, falling back to `<data_dir>/ontology.json`.
    pub fn snapshot_path(&self) -> PathBuf {
        self.snapshot
            .clone()
            .unwrap_or_else(|| self.data_dir.join("ontology.json"))
    }
}

/// Ontology store backends.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OntologyBackend {
    /// In-process indexes, optionally persisted as a JSON snapshot
    Memory,
    /// Embedded SurrealDB
    SurrealDB,
}

/// SurrealDB configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SurrealDBConfig {
    /// SurrealDB engine type
    pub engine: SurrealDBEngine,

    /// Path for the RocksDB engine, ignored for the memory engine
    pub connection: String,

    /// Namespace
    pub namespace: String,

    /// Database name
    pub database: String,

    /// Rows per INSERT statement when loading snapshots and closures
    pub batch_size: usize,
}

impl Default for SurrealDBConfig {
    fn default() -> Self {
        Self {
            engine: SurrealDBEngine::Memory,
            connection: "./data/ontology".to_string(),
            namespace: "clinparse".to_string(),
            database: "snomed".to_string(),
            batch_size: 5_000,
        }
    }
}

/// SurrealDB engine types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SurrealDBEngine {
    /// In-memory storage
    Memory,
    /// RocksDB on-disk storage (embedded)
    RocksDB,
}

/// Annotation service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotationConfig {
    /// Base url of the annotation service
    pub url: String,

    /// Wall-clock budget for one annotation call
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,

    /// Budget for the health check
    #[serde(with = "humantime_serde")]
    pub health_timeout: Duration,
}

impl Default for AnnotationConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8080/".to_string(),
            timeout: Duration::from_secs(60),
            health_timeout: Duration::from_secs(5),
        }
    }
}

/// Ontology constants and resolution policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OntologyConfig {
    /// System name of the primary ontology as emitted by the annotation service
    pub primary_system: String,

    /// Root concept of the hierarchy
    pub root_concept: String,

    /// Relationship type used for the hierarchy
    pub is_a_type_id: String,

    /// Description type of the fully specified name
    pub fsn_type_id: String,

    /// Concepts below any of these are flagged excluded
    pub excluded_ancestors: Vec<String>,

    /// Inclusion set used when a request does not supply one
    pub default_included_ancestors: Vec<String>,

    /// Upper bound on chained replacement lookups for inactive concepts
    pub max_substitution_depth: usize,
}

impl Default for OntologyConfig {
    fn default() -> Self {
        Self {
            primary_system: "SNOMEDCT".to_string(),
            root_concept: SNOMED_ROOT.to_string(),
            is_a_type_id: IS_A_TYPE_ID.to_string(),
            fsn_type_id: FSN_TYPE_ID.to_string(),
            // SNOMED CT Model Component namespace concept
            excluded_ancestors: vec!["370136006".to_string()],
            default_included_ancestors: vec![SNOMED_ROOT.to_string()],
            max_substitution_depth: 3,
        }
    }
}

/// Search configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Maximum number of hits returned by a term search
    pub result_limit: usize,

    /// Minimum similarity between a description and a word combination
    pub combination_threshold: f64,

    /// Minimum concept similarity for a discovered combination to join the result
    pub promotion_threshold: f64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            result_limit: 10,
            combination_threshold: 0.90,
            promotion_threshold: 0.95,
        }
    }
}

/// Dependency relation labels driving the relationship graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelationshipConfig {
    /// Labels whose relationships are linked under their head
    pub dependency_labels: Vec<RelationLabel>,

    /// Labels whose relationships start a phrase walk
    pub phrase_labels: Vec<RelationLabel>,
}

impl Default for RelationshipConfig {
    fn default() -> Self {
        Self {
            dependency_labels: vec![
                RelationLabel::NominalSubject,
                RelationLabel::AdjectivalModifier,
                RelationLabel::NominalModifier,
                RelationLabel::AdverbialModifier,
                RelationLabel::NounCompound,
                RelationLabel::Attribute,
                RelationLabel::DirectObject,
                RelationLabel::PrepositionalObject,
                RelationLabel::HyphenModifier,
            ],
            phrase_labels: vec![
                RelationLabel::NominalSubject,
                RelationLabel::Attribute,
                RelationLabel::DirectObject,
                RelationLabel::PrepositionalObject,
                RelationLabel::Root,
            ],
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    pub level: LogLevel,

    /// Log format
    pub format: LogFormat,

    /// File to log to (if any)
    pub file: Option<PathBuf>,

    /// Whether to log to stdout
    pub stdout: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Default,
            file: None,
            stdout: true,
        }
    }
}

/// Log level.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level
    Trace,

    /// Debug level
    Debug,

    /// Info level
    Info,

    /// Warn level
    Warn,

    /// Error level
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(format!("Invalid log level: {}", s)),
        }
    }
}

/// Log format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Default format
    Default,

    /// JSON format
    Json,

    /// Compact format
    Compact,

    /// Pretty format
    Pretty,
}
