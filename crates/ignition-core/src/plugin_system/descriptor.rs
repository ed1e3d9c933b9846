use std::collections::BTreeSet;
use std::fmt;

use semver::Version;
use serde::{Deserialize, Serialize};

use crate::plugin_system::id::{PluginId, ServiceKey};
use crate::requirements::RunningRequirement;

/// A plugin's demand on a capability, by service name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceReference {
    /// The required capability
    pub service: ServiceKey,

    /// How strongly the plugin needs it
    pub requirement: RunningRequirement,
}

/// A plugin's demand on another concrete plugin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginReference {
    /// The required plugin
    pub plugin: PluginId,

    /// How strongly the plugin needs it
    pub requirement: RunningRequirement,
}

/// Describes a discovered plugin.
///
/// The activation engine never looks inside a plugin; everything it needs is
/// here: identity, the services the plugin implements, and what the plugin
/// itself requires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginDescriptor {
    /// Unique identifier for the plugin
    pub id: PluginId,

    /// Human-readable name
    pub name: String,

    /// Plugin version
    pub version: Version,

    /// Plugin description
    #[serde(default)]
    pub description: String,

    /// Services this plugin implements
    #[serde(default)]
    pub services: BTreeSet<ServiceKey>,

    /// Services this plugin requires
    #[serde(default)]
    pub requires_services: Vec<ServiceReference>,

    /// Concrete plugins this plugin requires
    #[serde(default)]
    pub requires_plugins: Vec<PluginReference>,
}

impl PluginDescriptor {
    /// Create a descriptor with version 0.1.0 and no services or references
    pub fn new(id: PluginId, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            version: Version::new(0, 1, 0),
            description: String::new(),
            services: BTreeSet::new(),
            requires_services: Vec::new(),
            requires_plugins: Vec::new(),
        }
    }

    /// Set the plugin version
    pub fn set_version(&mut self, version: Version) -> &mut Self {
        self.version = version;
        self
    }

    /// Set the plugin description
    pub fn set_description(&mut self, description: &str) -> &mut Self {
        self.description = description.to_string();
        self
    }

    /// Declare an implemented service
    pub fn implements(&mut self, service: impl Into<ServiceKey>) -> &mut Self {
        self.services.insert(service.into());
        self
    }

    /// Declare a required service
    pub fn requires_service(
        &mut self,
        service: impl Into<ServiceKey>,
        requirement: RunningRequirement,
    ) -> &mut Self {
        self.requires_services.push(ServiceReference {
            service: service.into(),
            requirement,
        });
        self
    }

    /// Declare a required plugin
    pub fn requires_plugin(&mut self, plugin: PluginId, requirement: RunningRequirement) -> &mut Self {
        self.requires_plugins.push(PluginReference { plugin, requirement });
        self
    }

    /// Whether this plugin implements `service`
    pub fn implements_service(&self, service: &ServiceKey) -> bool {
        self.services.contains(service)
    }
}

impl fmt::Display for PluginDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} v{} ({})", self.name, self.version, self.id)
    }
}
