use std::collections::{BTreeMap, HashMap};

use log::debug;

use crate::kernel::next_revision;
use crate::plugin_system::id::{PluginId, ServiceKey};
use crate::requirements::layer::RequirementLayer;
use crate::requirements::running::RunningRequirement;

/// Demands of every registered layer, merged per target (max-wins)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergedRequirements {
    pub plugins: HashMap<PluginId, RunningRequirement>,
    pub services: BTreeMap<ServiceKey, RunningRequirement>,
}

impl MergedRequirements {
    pub fn plugin(&self, id: &PluginId) -> Option<RunningRequirement> {
        self.plugins.get(id).copied()
    }

    pub fn service(&self, service: &ServiceKey) -> Option<RunningRequirement> {
        self.services.get(service).copied()
    }

    fn add_plugin(&mut self, id: PluginId, requirement: RunningRequirement) {
        self.plugins
            .entry(id)
            .and_modify(|current| *current = current.merge(requirement))
            .or_insert(requirement);
    }

    fn add_service(&mut self, service: &ServiceKey, requirement: RunningRequirement) {
        self.services
            .entry(service.clone())
            .and_modify(|current| *current = current.merge(requirement))
            .or_insert(requirement);
    }
}

/// The layers currently contributing demand to the engine, in the order
/// they were added
#[derive(Debug, Clone, Default)]
pub struct RequirementLayerSet {
    layers: Vec<RequirementLayer>,
    revision: u64,
}

impl RequirementLayerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a layer. A layer whose name is already present is not added again
    /// and `false` is returned.
    pub fn add(&mut self, layer: RequirementLayer) -> bool {
        if self.contains(layer.name()) {
            debug!("Requirement layer '{}' already registered", layer.name());
            return false;
        }
        debug!("Adding requirement layer '{}'", layer.name());
        self.layers.push(layer);
        self.revision = next_revision();
        true
    }

    /// Remove a layer by name, taking all its demand with it
    pub fn remove(&mut self, name: &str) -> Option<RequirementLayer> {
        let position = self.layers.iter().position(|layer| layer.name() == name)?;
        debug!("Removing requirement layer '{}'", name);
        self.revision = next_revision();
        Some(self.layers.remove(position))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.layers.iter().any(|layer| layer.name() == name)
    }

    pub fn get(&self, name: &str) -> Option<&RequirementLayer> {
        self.layers.iter().find(|layer| layer.name() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RequirementLayer> {
        self.layers.iter()
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Largest revision stamp of the set itself and of every member layer
    pub fn revision(&self) -> u64 {
        self.layers
            .iter()
            .map(RequirementLayer::revision)
            .fold(self.revision, u64::max)
    }

    /// Merge the current contents of every layer
    pub fn merged(&self) -> MergedRequirements {
        let mut merged = MergedRequirements::default();
        for layer in &self.layers {
            layer.for_each_plugin(|id, requirement| merged.add_plugin(id, requirement));
            layer.for_each_service(|service, requirement| merged.add_service(service, requirement));
        }
        merged
    }
}
