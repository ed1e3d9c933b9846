use std::collections::BTreeMap;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::error::ConfigError;
use crate::config::status::ConfigPluginStatus;
use crate::plugin_system::id::PluginId;

/// Supported document formats, for tier documents and plugin manifests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// JSON format (.json)
    Json,
    /// YAML format (.yaml, .yml) - requires "yaml-config" feature
    #[cfg(feature = "yaml-config")]
    Yaml,
    /// TOML format (.toml) - requires "toml-config" feature
    #[cfg(feature = "toml-config")]
    Toml,
}

impl ConfigFormat {
    /// Get the file extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            ConfigFormat::Json => "json",
            #[cfg(feature = "yaml-config")]
            ConfigFormat::Yaml => "yaml",
            #[cfg(feature = "toml-config")]
            ConfigFormat::Toml => "toml",
        }
    }

    /// Determine format from file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| match ext.to_lowercase().as_str() {
                "json" => Some(ConfigFormat::Json),
                #[cfg(feature = "yaml-config")]
                "yaml" | "yml" => Some(ConfigFormat::Yaml),
                #[cfg(feature = "toml-config")]
                "toml" => Some(ConfigFormat::Toml),
                _ => None,
            })
    }

    /// Deserialize a document in this format
    pub fn parse<T: DeserializeOwned>(&self, data: &str) -> Result<T, ConfigError> {
        let format = self.extension().to_string();
        match self {
            ConfigFormat::Json => serde_json::from_str(data)
                .map_err(|e| ConfigError::DeserializationError { format, source: Box::new(e) }),
            #[cfg(feature = "yaml-config")]
            ConfigFormat::Yaml => serde_yaml::from_str(data)
                .map_err(|e| ConfigError::DeserializationError { format, source: Box::new(e) }),
            #[cfg(feature = "toml-config")]
            ConfigFormat::Toml => toml::from_str(data)
                .map_err(|e| ConfigError::DeserializationError { format, source: Box::new(e) }),
        }
    }

    /// Serialize a document in this format
    pub fn render<T: Serialize>(&self, value: &T) -> Result<String, ConfigError> {
        let format = self.extension().to_string();
        match self {
            ConfigFormat::Json => serde_json::to_string_pretty(value)
                .map_err(|e| ConfigError::SerializationError { format, source: Box::new(e) }),
            #[cfg(feature = "yaml-config")]
            ConfigFormat::Yaml => serde_yaml::to_string(value)
                .map_err(|e| ConfigError::SerializationError { format, source: Box::new(e) }),
            #[cfg(feature = "toml-config")]
            ConfigFormat::Toml => toml::to_string_pretty(value)
                .map_err(|e| ConfigError::SerializationError { format, source: Box::new(e) }),
        }
    }
}

/// Persisted form of one configuration tier
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierDocument {
    #[serde(default)]
    pub plugins: BTreeMap<PluginId, ConfigPluginStatus>,
}

impl TierDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a tier document, picking the format from the file extension
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let format = ConfigFormat::from_path(path)
            .ok_or_else(|| ConfigError::UnsupportedConfigFormat(path.to_path_buf()))?;
        let data = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::io(e, "read_tier", path.to_path_buf()))?;
        format.parse(&data)
    }

    /// Write a tier document, picking the format from the file extension
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let format = ConfigFormat::from_path(path)
            .ok_or_else(|| ConfigError::UnsupportedConfigFormat(path.to_path_buf()))?;
        let data = format.render(self)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| ConfigError::io(e, "create_dir_all", parent.to_path_buf()))?;
        }
        std::fs::write(path, data).map_err(|e| ConfigError::io(e, "write_tier", path.to_path_buf()))
    }
}
