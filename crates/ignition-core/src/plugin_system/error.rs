//! # Ignition Core Plugin System Errors
//!
//! [`PluginSystemError`] covers everything that can go wrong while building
//! the plugin catalog: reading manifest files, parsing them, and registering
//! descriptors. Failures of a plugin's own lifecycle hooks are not errors of
//! this kind; see [`HookError`](crate::plugin_system::host::HookError).
use std::path::PathBuf;

use crate::plugin_system::id::PluginId;

#[derive(Debug, thiserror::Error)]
pub enum PluginSystemError {
    #[error("I/O error during operation '{operation}' on path '{path}': {source}")]
    Io {
        path: PathBuf,
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Plugin manifest error for '{path}': {message}")]
    ManifestError {
        path: PathBuf,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Unsupported manifest format for '{0}'")]
    UnsupportedManifestFormat(PathBuf),

    #[error("Plugin registration error for '{plugin_id}': {message}")]
    RegistrationError {
        plugin_id: PluginId,
        message: String,
    },

    #[error("Discovery path '{0}' is not a directory")]
    NotADirectory(PathBuf),
}

impl PluginSystemError {
    pub fn io(source: std::io::Error, operation: impl Into<String>, path: PathBuf) -> Self {
        PluginSystemError::Io {
            source,
            operation: operation.into(),
            path,
        }
    }
}
