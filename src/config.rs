//! Configuration file parsing
//!
//! Reads changelog-dsl.toml configuration files.

use crate::input::{CHANGELOG_EXTENSION, FilterRegistry, ParserOptions, PatternFilter, RuntimeScope};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Validation(String),
}

/// Output formats the CLI can render.
pub const OUTPUT_FORMATS: &[&str] = &["text", "json"];

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub parser: ParserConfig,

    /// Named `includeAll` resource filters.
    #[serde(default)]
    pub filters: BTreeMap<String, FilterConfig>,

    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ParserConfig {
    /// Directory changelog paths are resolved against
    #[serde(default = "default_search_path")]
    pub search_path: PathBuf,

    /// Runtime contexts used to select scoped properties
    #[serde(default)]
    pub contexts: Vec<String>,

    /// Runtime labels used to select scoped properties
    #[serde(default)]
    pub labels: Vec<String>,

    /// Target database short name (e.g. "postgresql")
    pub database: Option<String>,

    /// Extension `includeAll` picks up, without the dot
    #[serde(default = "default_extension")]
    pub extension: String,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            search_path: default_search_path(),
            contexts: vec![],
            labels: vec![],
            database: None,
            extension: default_extension(),
        }
    }
}

/// A regex filter: files must match `include` (if set) and must not match
/// `exclude` (if set).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FilterConfig {
    pub include: Option<String>,
    pub exclude: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    /// Output format: "text" or "json"
    #[serde(default = "default_format")]
    pub format: String,

    /// Output directory for report files; stdout when unset
    pub dir: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
            dir: None,
        }
    }
}

fn default_search_path() -> PathBuf {
    PathBuf::from(".")
}

fn default_extension() -> String {
    CHANGELOG_EXTENSION.to_string()
}

fn default_format() -> String {
    "text".to_string()
}

impl Config {
    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !OUTPUT_FORMATS.contains(&self.output.format.as_str()) {
            return Err(ConfigError::Validation(format!(
                "invalid output format '{}'. Valid values: {}",
                self.output.format,
                OUTPUT_FORMATS.join(", ")
            )));
        }
        if self.parser.extension.is_empty() || self.parser.extension.starts_with('.') {
            return Err(ConfigError::Validation(format!(
                "invalid extension '{}'. Give the extension without a leading dot",
                self.parser.extension
            )));
        }
        for (name, filter) in &self.filters {
            PatternFilter::new(filter.include.as_deref(), filter.exclude.as_deref()).map_err(
                |e| ConfigError::Validation(format!("filter '{}': {}", name, e)),
            )?;
        }
        Ok(())
    }

    pub fn parser_options(&self) -> ParserOptions {
        ParserOptions {
            scope: RuntimeScope {
                contexts: self.parser.contexts.clone(),
                labels: self.parser.labels.clone(),
                database: self.parser.database.clone(),
            },
            extension: self.parser.extension.clone(),
        }
    }

    /// Registry holding every configured filter under its table name.
    pub fn filter_registry(&self) -> Result<FilterRegistry, ConfigError> {
        let mut registry = FilterRegistry::new();
        for (name, filter) in &self.filters {
            let pattern = PatternFilter::new(filter.include.as_deref(), filter.exclude.as_deref())
                .map_err(|e| ConfigError::Validation(format!("filter '{}': {}", name, e)))?;
            registry.register(name.clone(), move || pattern.clone());
        }
        Ok(registry)
    }
}
