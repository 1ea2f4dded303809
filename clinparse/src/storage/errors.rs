//! Error types for storage operations

use std::error::Error;
use std::fmt;

/// Error type for storage operations
#[derive(Debug)]
pub enum StorageError {
    /// Configuration error
    Configuration(String),

    /// Connection error
    Connection(String),

    /// Query error
    Query(String),

    /// Transaction error
    Transaction(String),

    /// Data not found
    NotFound(String),

    /// Malformed import data
    Import { file: String, line: usize, message: String },

    /// Serialization/deserialization error
    Serialization(String),

    /// IO error
    Io(String),

    /// Other error
    Other(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Configuration(msg) => write!(f, "Configuration error: {}", msg),
            StorageError::Connection(msg) => write!(f, "Connection error: {}", msg),
            StorageError::Query(msg) => write!(f, "Query error: {}", msg),
            StorageError::Transaction(msg) => write!(f, "Transaction error: {}", msg),
            StorageError::NotFound(msg) => write!(f, "Not found: {}", msg),
            StorageError::Import {
                file,
                line,
                message,
            } => write!(f, "Import error in {} line {}: {}", file, line, message),
            StorageError::Serialization(msg) => write!(f, "Serialization error: {}", msg),
            StorageError::Io(msg) => write!(f, "IO error: {}", msg),
            StorageError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl Error for StorageError {}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::Io(err.to_string())
    }
}

#[cfg(feature = "surrealdb-embedded")]
impl From<surrealdb::Error> for StorageError {
    fn from(err: surrealdb::Error) -> Self {
        StorageError::Query(err.to_string())
    }
}
