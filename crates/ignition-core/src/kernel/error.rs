//! # Ignition Core Kernel Errors
//!
//! Defines [`Error`], the crate-wide error enum. Subsystems keep their own
//! typed errors ([`PluginSystemError`], [`ConfigError`]) and convert into
//! this one through `#[from]`, so callers can use a single `?`-friendly
//! [`Result`] alias.
//!
//! Activation problems (hook failures, unresolved services) are reported by
//! the engine as data, never raised.
use std::result::Result as StdResult;

use thiserror::Error as ThisError;

use crate::config::error::ConfigError;
use crate::plugin_system::error::PluginSystemError;

#[derive(Debug, ThisError)]
pub enum Error {
    /// Discovery, manifest or catalog error
    #[error("Plugin system error: {0}")]
    PluginSystem(#[from] PluginSystemError),

    /// Configuration tier loading or saving error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Shorthand for Result with our Error type
pub type Result<T> = StdResult<T, Error>;
