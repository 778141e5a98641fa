//! Configuration for the record schema engine
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (record-schemas.toml)
//! - Environment variables (RECORD_SCHEMAS__*)
//!
//! ## Example config file (record-schemas.toml):
//! ```toml
//! [definitions]
//! paths = ["./schemas"]
//! extensions = ["toml", "json"]
//!
//! [validation]
//! strip_unknown = false
//!
//! [output]
//! format = "pretty"
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration for the engine and its CLI
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Where declarative schema definitions live
    #[serde(default)]
    pub definitions: DefinitionsConfig,

    /// Validation defaults
    #[serde(default)]
    pub validation: ValidationConfig,

    /// Output settings
    #[serde(default)]
    pub output: OutputConfig,
}

/// Definition file discovery
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefinitionsConfig {
    /// Files or directories to load definitions from
    #[serde(default)]
    pub paths: Vec<PathBuf>,

    /// File extensions picked up when walking a directory
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

/// Validation configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Strip unknown keys for loaded schemas that do not say otherwise
    #[serde(default)]
    pub strip_unknown: bool,
}

/// Output configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
}

/// Output format for JSON
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Pretty,
    Compact,
}

fn default_extensions() -> Vec<String> {
    vec!["toml".to_string(), "json".to_string()]
}

impl Default for DefinitionsConfig {
    fn default() -> Self {
        Self {
            paths: Vec::new(),
            extensions: default_extensions(),
        }
    }
}

impl OutputFormat {
    /// Render a JSON document in this format
    pub fn render(self, value: &serde_json::Value) -> serde_json::Result<String> {
        match self {
            OutputFormat::Pretty => serde_json::to_string_pretty(value),
            OutputFormat::Compact => serde_json::to_string(value),
        }
    }
}

impl EngineConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration, layering a specific file over the defaults
    pub fn load_from(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        let config_locations = ["record-schemas.toml", ".record-schemas.toml", "config/record-schemas.toml"];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        if let Some(config_dir) = directories::ProjectDirs::from("dev", "record-schemas", "record-schemas") {
            let xdg_config = config_dir.config_dir().join("record-schemas.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix("RECORD_SCHEMAS")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    /// Definition paths, resolved against the current directory
    pub fn definition_paths(&self) -> Vec<PathBuf> {
        let cwd = std::env::current_dir().unwrap_or_default();
        self.definitions
            .paths
            .iter()
            .map(|p| if p.is_absolute() { p.clone() } else { cwd.join(p) })
            .collect()
    }
}
