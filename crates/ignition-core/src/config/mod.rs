//! # Ignition Core Configuration
//!
//! Three tiers of configuration authority decide a plugin's administrative
//! status before any requirement layer is considered:
//!
//! 1. **System** and **User** tiers hold a [`ConfigPluginStatus`] per plugin
//!    and can be persisted as [`TierDocument`]s (JSON, YAML or TOML).
//! 2. The **Live** tier holds a transient [`ConfigUserAction`] per plugin.
//!
//! [`combine_status`] merges the first two, [`combine_live`] folds in the
//! third; `Disabled` absorbs at both steps. The [`ConfigurationStore`] is a
//! shared handle the engine only ever reads through a [`ConfigSnapshot`].
pub mod error;
pub mod format;
pub mod status;
pub mod store;

pub use format::{ConfigFormat, TierDocument};
pub use status::{combine_live, combine_status, resolve_tiers, ConfigPluginStatus, ConfigUserAction, SolvedConfigStatus};
pub use store::{ConfigSnapshot, ConfigTier, ConfigurationStore};
