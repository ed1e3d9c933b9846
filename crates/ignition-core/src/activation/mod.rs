//! # Ignition Core Activation
//!
//! Drives plugins towards their resolved targets.
//!
//! ## Key Submodules and Responsibilities:
//!
//! - **[`engine`]**: [`PluginRunner`], which owns the discoverer, host and
//!   requirement layers, and implements `apply` and `is_dirty`.
//! - **[`state`]**: the per-plugin lifecycle ([`PluginState`]) and why a
//!   plugin failed ([`FailureReason`]).
//! - **[`order`]**: providers-first start groups and consumers-first stop
//!   order, with reference cycles started as one group.
//! - **[`events`]**: [`ActivationEvent`]s delivered to
//!   [`ActivationObserver`]s.
pub mod engine;
pub mod events;
pub mod order;
pub mod state;

pub use engine::{ApplyReport, PluginRunner};
pub use events::{ActivationEvent, ActivationObserver};
pub use state::{FailureReason, PluginRuntime, PluginState, StartOrigin};
