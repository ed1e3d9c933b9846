//! # Ignition Core Configuration Errors
//!
//! [`ConfigError`] covers loading and saving configuration tier documents.
//! Reading tier values never fails: a missing entry simply means the tier has
//! no stance on that plugin.
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error during operation '{operation}' on path '{path}': {source}")]
    Io {
        path: PathBuf,
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization to '{format}' failed: {source}")]
    SerializationError {
        format: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },

    #[error("Deserialization from '{format}' failed: {source}")]
    DeserializationError {
        format: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },

    #[error("Unsupported configuration format for path: {0}")]
    UnsupportedConfigFormat(PathBuf),
}

impl ConfigError {
    pub fn io(source: std::io::Error, operation: impl Into<String>, path: PathBuf) -> Self {
        ConfigError::Io {
            source,
            operation: operation.into(),
            path,
        }
    }
}
