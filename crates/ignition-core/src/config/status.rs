use std::fmt;

use serde::{Deserialize, Serialize};

/// An administrative tier's stance on a plugin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigPluginStatus {
    /// The plugin must not run. Absorbs every other stance.
    Disabled,
    /// The plugin may run if something requires it
    #[default]
    Manual,
    /// The plugin should be started
    AutomaticStart,
}

/// A transient runtime override from the live user. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigUserAction {
    #[default]
    None,
    Started,
    Stopped,
}

/// The fully resolved per-plugin outcome.
///
/// Ordered by permissiveness: `Disabled < Optional < MustExistAndRun`.
/// Merges do not simply take the maximum, since `Disabled` is absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolvedConfigStatus {
    Disabled,
    Optional,
    MustExistAndRun,
}

impl fmt::Display for ConfigPluginStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigPluginStatus::Disabled => f.write_str("disabled"),
            ConfigPluginStatus::Manual => f.write_str("manual"),
            ConfigPluginStatus::AutomaticStart => f.write_str("automatic_start"),
        }
    }
}

impl fmt::Display for ConfigUserAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigUserAction::None => f.write_str("none"),
            ConfigUserAction::Started => f.write_str("started"),
            ConfigUserAction::Stopped => f.write_str("stopped"),
        }
    }
}

impl fmt::Display for SolvedConfigStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolvedConfigStatus::Disabled => f.write_str("disabled"),
            SolvedConfigStatus::Optional => f.write_str("optional"),
            SolvedConfigStatus::MustExistAndRun => f.write_str("must_exist_and_run"),
        }
    }
}

/// Merge the system and user tiers
pub fn combine_status(system: ConfigPluginStatus, user: ConfigPluginStatus) -> SolvedConfigStatus {
    use ConfigPluginStatus::*;
    match (system, user) {
        (Disabled, _) | (_, Disabled) => SolvedConfigStatus::Disabled,
        (AutomaticStart, _) | (_, AutomaticStart) => SolvedConfigStatus::MustExistAndRun,
        (Manual, Manual) => SolvedConfigStatus::Optional,
    }
}

/// Apply the live user action on top of the merged tiers
pub fn combine_live(status: SolvedConfigStatus, action: ConfigUserAction) -> SolvedConfigStatus {
    match (status, action) {
        (SolvedConfigStatus::Disabled, _) => SolvedConfigStatus::Disabled,
        (_, ConfigUserAction::Started) => SolvedConfigStatus::MustExistAndRun,
        (_, ConfigUserAction::Stopped) => SolvedConfigStatus::Disabled,
        (status, ConfigUserAction::None) => status,
    }
}

/// Resolve one plugin's configuration across all three tiers.
///
/// Missing tier entries read as `Manual` / `None`. Returns `None` when no tier
/// has an entry at all, meaning the plugin has no configuration.
pub fn resolve_tiers(
    system: Option<ConfigPluginStatus>,
    user: Option<ConfigPluginStatus>,
    live: Option<ConfigUserAction>,
) -> Option<SolvedConfigStatus> {
    if system.is_none() && user.is_none() && live.is_none() {
        return None;
    }
    let merged = combine_status(system.unwrap_or_default(), user.unwrap_or_default());
    Some(combine_live(merged, live.unwrap_or_default()))
}
