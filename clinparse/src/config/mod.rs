//! Configuration system for clinparse.
//!
//! Configuration is layered with figment: serialized defaults, then the first config
//! file found in the default locations, then an explicit file, then `CLINPARSE_`
//! environment variables (`__` separates nested keys, e.g.
//! `CLINPARSE_ANNOTATION__URL`).

mod builder;
mod loader;
mod models;
mod validation;

pub use builder::ConfigBuilder;
pub use loader::ConfigLoader;
pub use models::*;
pub use validation::validate_config;

/// Default configuration file names that the system will look for
pub const DEFAULT_CONFIG_FILES: &[&str] = &[
    "clinparse.toml",
    "clinparse.yaml",
    "clinparse.yml",
    "clinparse.json",
    ".clinparse/config.toml",
    ".clinparse/config.yaml",
    ".clinparse/config.yml",
    ".clinparse/config.json",
];

/// Environment variable prefix for clinparse configuration
pub const ENV_PREFIX: &str = "CLINPARSE_";

/// Configuration error type
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Error occurred during file loading
    #[error("Failed to load configuration file: {0}")]
    FileLoadError(String),

    /// Error occurred during validation
    #[error("Configuration validation error: {0}")]
    ValidationError(String),

    /// Error occurred during parsing
    #[error("Configuration parsing error: {0}")]
    ParseError(String),
}

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;
