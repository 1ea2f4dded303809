//! Configuration loader.
//!
//! This module provides functionality to load configuration from multiple sources.

use super::{ConfigError, DEFAULT_CONFIG_FILES, ENV_PREFIX, Result, models::*, validation};
use figment::{
    Figment,
    providers::{Env, Format, Json, Serialized, Toml, Yaml},
};
use std::path::{Path, PathBuf};

/// Configuration loader that handles loading from multiple sources.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    figment: Figment,
}

impl ConfigLoader {
    /// Create a new configuration loader with default values.
    pub fn new() -> Self {
        let figment = Figment::new().merge(Serialized::defaults(ClinparseConfig::default()));
        Self { figment }
    }

    /// Load configuration from a file.
    pub fn load_file<P: AsRef<Path>>(&mut self, path: P) -> Result<&mut Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileLoadError(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }

        let figment = std::mem::take(&mut self.figment);
        self.figment = match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => figment.merge(Toml::file(path)),
            Some("yaml") | Some("yml") => figment.merge(Yaml::file(path)),
            Some("json") => figment.merge(Json::file(path)),
            _ => {
                self.figment = figment;
                return Err(ConfigError::FileLoadError(format!(
                    "Unsupported file format: {}",
                    path.display()
                )));
            }
        };

        Ok(self)
    }

    /// Attempt to load from default configuration file locations.
    pub fn load_default_files(&mut self) -> &mut Self {
        for file in DEFAULT_CONFIG_FILES {
            let path = PathBuf::from(file);
            if path.exists() && self.load_file(&path).is_ok() {
                break;
            }
        }

        if let Some(proj_dirs) = directories::ProjectDirs::from("org", "clinparse", "clinparse") {
            let config_dir = proj_dirs.config_dir();

            for ext in &["toml", "yaml", "yml", "json"] {
                let path = config_dir.join(format!("config.{}", ext));
                if path.exists() && self.load_file(&path).is_ok() {
                    break;
                }
            }
        }

        self
    }

    /// Load configuration from environment variables.
    pub fn load_env(&mut self) -> &mut Self {
        let figment =
            std::mem::take(&mut self.figment).merge(Env::prefixed(ENV_PREFIX).split("__"));
        self.figment = figment;
        self
    }

    /// Load configuration from a custom source.
    pub fn merge<T: figment::Provider>(&mut self, provider: T) -> &mut Self {
        let figment = std::mem::take(&mut self.figment).merge(provider);
        self.figment = figment;
        self
    }

    /// Extract and validate the configuration.
    pub fn extract(&self) -> Result<ClinparseConfig> {
        let config: ClinparseConfig = self
            .figment
            .extract()
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        validation::validate_config(&config)?;

        Ok(config)
    }

    /// Defaults, default files, the explicit file if any, then the environment.
    pub fn load(explicit: Option<&Path>) -> Result<ClinparseConfig> {
        let mut loader = Self::new();
        loader.load_default_files();
        if let Some(path) = explicit {
            loader.load_file(path)?;
        }
        loader.load_env();
        loader.extract()
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
