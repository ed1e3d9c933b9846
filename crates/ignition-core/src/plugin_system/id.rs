use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identity of a discovered plugin.
///
/// An opaque 128-bit value; the textual form is a hyphenated UUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PluginId(Uuid);

impl PluginId {
    /// Generate a new random identity
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }

    /// Build an identity from its raw 128-bit value
    pub const fn from_u128(value: u128) -> Self {
        Self(Uuid::from_u128(value))
    }
}

impl fmt::Display for PluginId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for PluginId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

impl From<Uuid> for PluginId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Name of a capability a plugin may implement.
///
/// Layers and other plugins can require a service without naming the
/// concrete plugin that provides it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceKey(String);

impl ServiceKey {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ServiceKey {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for ServiceKey {
    fn from(name: String) -> Self {
        Self(name)
    }
}
