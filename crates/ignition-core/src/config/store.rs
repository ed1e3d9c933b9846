use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use log::debug;
use parking_lot::RwLock;

use crate::config::error::ConfigError;
use crate::config::format::TierDocument;
use crate::config::status::{resolve_tiers, ConfigPluginStatus, ConfigUserAction, SolvedConfigStatus};
use crate::kernel::next_revision;
use crate::plugin_system::id::PluginId;

/// The persisted administrative tiers. Live user actions live beside them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigTier {
    /// Set by the system administrator
    System,
    /// Set by the user
    User,
}

impl fmt::Display for ConfigTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigTier::System => f.write_str("system"),
            ConfigTier::User => f.write_str("user"),
        }
    }
}

#[derive(Debug, Default)]
struct StoreInner {
    system: HashMap<PluginId, ConfigPluginStatus>,
    user: HashMap<PluginId, ConfigPluginStatus>,
    live: HashMap<PluginId, ConfigUserAction>,
    revision: u64,
}

impl StoreInner {
    fn tier(&self, tier: ConfigTier) -> &HashMap<PluginId, ConfigPluginStatus> {
        match tier {
            ConfigTier::System => &self.system,
            ConfigTier::User => &self.user,
        }
    }

    fn tier_mut(&mut self, tier: ConfigTier) -> &mut HashMap<PluginId, ConfigPluginStatus> {
        self.revision = next_revision();
        match tier {
            ConfigTier::System => &mut self.system,
            ConfigTier::User => &mut self.user,
        }
    }
}

/// Shared handle on the three configuration tiers.
///
/// Cloning the handle shares the underlying store: the caller keeps one
/// clone to edit, the activation engine keeps another to read. Every
/// mutation stamps a new revision.
#[derive(Debug, Clone, Default)]
pub struct ConfigurationStore {
    inner: Arc<RwLock<StoreInner>>,
}

impl ConfigurationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A tier's stance on a plugin, if it has one
    pub fn status(&self, tier: ConfigTier, id: &PluginId) -> Option<ConfigPluginStatus> {
        self.inner.read().tier(tier).get(id).copied()
    }

    /// Set a tier's stance, returning the previous one
    pub fn set_status(&self, tier: ConfigTier, id: PluginId, status: ConfigPluginStatus) -> Option<ConfigPluginStatus> {
        debug!("Config {} tier: {} -> {}", tier, id, status);
        self.inner.write().tier_mut(tier).insert(id, status)
    }

    /// Remove a tier's stance on a plugin
    pub fn clear(&self, tier: ConfigTier, id: &PluginId) -> Option<ConfigPluginStatus> {
        self.inner.write().tier_mut(tier).remove(id)
    }

    /// Remove every entry of a tier
    pub fn clear_tier(&self, tier: ConfigTier) {
        self.inner.write().tier_mut(tier).clear();
    }

    /// The live user action for a plugin (`None` when unset)
    pub fn action(&self, id: &PluginId) -> ConfigUserAction {
        self.inner.read().live.get(id).copied().unwrap_or_default()
    }

    /// Set the live user action. Setting `None` removes the entry.
    pub fn set_action(&self, id: PluginId, action: ConfigUserAction) -> ConfigUserAction {
        debug!("Config live tier: {} -> {}", id, action);
        let mut inner = self.inner.write();
        inner.revision = next_revision();
        let previous = match action {
            ConfigUserAction::None => inner.live.remove(&id),
            action => inner.live.insert(id, action),
        };
        previous.unwrap_or_default()
    }

    /// Remove the live user action for a plugin
    pub fn clear_action(&self, id: &PluginId) -> ConfigUserAction {
        let mut inner = self.inner.write();
        inner.revision = next_revision();
        inner.live.remove(id).unwrap_or_default()
    }

    /// Remove every live user action
    pub fn clear_live(&self) {
        let mut inner = self.inner.write();
        inner.revision = next_revision();
        inner.live.clear();
    }

    /// Remove every entry of every tier
    pub fn clear_all(&self) {
        let mut inner = self.inner.write();
        inner.revision = next_revision();
        inner.system.clear();
        inner.user.clear();
        inner.live.clear();
    }

    /// Revision stamp of the last mutation (0 if never mutated)
    pub fn revision(&self) -> u64 {
        self.inner.read().revision
    }

    /// Consistent copy of all tiers
    pub fn snapshot(&self) -> ConfigSnapshot {
        let inner = self.inner.read();
        ConfigSnapshot {
            system: inner.system.clone(),
            user: inner.user.clone(),
            live: inner.live.clone(),
        }
    }

    /// Replace a tier with a document read from `path`.
    /// Returns the number of entries loaded.
    pub fn load_tier(&self, tier: ConfigTier, path: &Path) -> Result<usize, ConfigError> {
        let document = TierDocument::load(path)?;
        let count = document.plugins.len();
        let mut inner = self.inner.write();
        let entries = inner.tier_mut(tier);
        entries.clear();
        entries.extend(document.plugins);
        debug!("Loaded {} {} tier entries from {}", count, tier, path.display());
        Ok(count)
    }

    /// Write a tier to `path`
    pub fn save_tier(&self, tier: ConfigTier, path: &Path) -> Result<(), ConfigError> {
        let document = self.tier_document(tier);
        document.save(path)
    }

    /// A tier's entries as a persistable document
    pub fn tier_document(&self, tier: ConfigTier) -> TierDocument {
        let inner = self.inner.read();
        TierDocument {
            plugins: inner.tier(tier).iter().map(|(id, status)| (*id, *status)).collect(),
        }
    }
}

/// Point-in-time copy of the configuration tiers, taken at the start of a
/// resolution pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigSnapshot {
    system: HashMap<PluginId, ConfigPluginStatus>,
    user: HashMap<PluginId, ConfigPluginStatus>,
    live: HashMap<PluginId, ConfigUserAction>,
}

impl ConfigSnapshot {
    /// Resolved configuration for a plugin, `None` if no tier mentions it
    pub fn resolve(&self, id: &PluginId) -> Option<SolvedConfigStatus> {
        resolve_tiers(
            self.system.get(id).copied(),
            self.user.get(id).copied(),
            self.live.get(id).copied(),
        )
    }

    /// Every plugin mentioned by at least one tier
    pub fn configured_plugins(&self) -> BTreeSet<PluginId> {
        self.system
            .keys()
            .chain(self.user.keys())
            .chain(self.live.keys())
            .copied()
            .collect()
    }
}
