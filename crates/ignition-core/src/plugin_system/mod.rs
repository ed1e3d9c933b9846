//! # Ignition Core Plugin System
//!
//! Everything the activation engine knows about plugins comes through this
//! module. It never loads plugin code itself.
//!
//! ## Key Submodules and Responsibilities:
//!
//! - **[`id`]**: [`PluginId`] and [`ServiceKey`], the value types used as map
//!   keys throughout the engine.
//! - **[`descriptor`]**: [`PluginDescriptor`], the metadata of one plugin:
//!   implemented services plus the services and plugins it requires.
//! - **[`discovery`]**: the [`Discoverer`] trait and [`PluginCatalog`], which
//!   registers descriptors statically or scans manifest files on disk.
//! - **[`host`]**: the [`PluginHost`] trait whose Setup/Start/Stop hooks the
//!   engine drives.
//! - **[`error`]**: [`PluginSystemError`](error::PluginSystemError).
pub mod descriptor;
pub mod discovery;
pub mod error;
pub mod host;
pub mod id;

pub use descriptor::{PluginDescriptor, PluginReference, ServiceReference};
pub use discovery::{Discoverer, PluginCatalog};
pub use host::{HookError, HookPhase, PluginHost};
pub use id::{PluginId, ServiceKey};
