//! # Ignition Core Kernel
//!
//! Crate-wide plumbing shared by every subsystem: the top-level [`error`]
//! type, application [`constants`], and the revision counter that lets the
//! activation engine notice when any of its inputs changed.
pub mod constants;
pub mod error;

use std::sync::atomic::{AtomicU64, Ordering};

pub use error::{Error, Result};

static REVISION: AtomicU64 = AtomicU64::new(1);

/// Draws a fresh, process-wide revision number.
///
/// Every mutable input of the engine (configuration store, requirement
/// layers, the layer set, the plugin catalog) stamps itself with a value from
/// this counter on mutation, so the largest stamp observed always grows when
/// anything changes.
pub fn next_revision() -> u64 {
    REVISION.fetch_add(1, Ordering::Relaxed)
}
