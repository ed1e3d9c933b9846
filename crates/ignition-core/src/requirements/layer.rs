use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::kernel::next_revision;
use crate::plugin_system::id::{PluginId, ServiceKey};
use crate::requirements::running::RunningRequirement;

#[derive(Debug, Default)]
struct LayerInner {
    plugins: HashMap<PluginId, RunningRequirement>,
    services: HashMap<ServiceKey, RunningRequirement>,
    revision: u64,
}

impl LayerInner {
    fn touch(&mut self) -> &mut Self {
        self.revision = next_revision();
        self
    }
}

/// A named bundle of demands contributed by one feature.
///
/// The handle is cheap to clone and every clone edits the same layer, so the
/// owner can keep mutating it after handing a clone to the engine. The name
/// is the layer's identity inside a [`RequirementLayerSet`](super::RequirementLayerSet).
#[derive(Debug, Clone)]
pub struct RequirementLayer {
    name: Arc<str>,
    inner: Arc<RwLock<LayerInner>>,
}

impl RequirementLayer {
    pub fn new(name: impl Into<String>) -> Self {
        let name: String = name.into();
        Self {
            name: Arc::from(name),
            inner: Arc::new(RwLock::new(LayerInner {
                revision: next_revision(),
                ..LayerInner::default()
            })),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Demand a plugin, returning the previous demand of this layer on it
    pub fn require_plugin(&self, id: PluginId, requirement: RunningRequirement) -> Option<RunningRequirement> {
        self.inner.write().touch().plugins.insert(id, requirement)
    }

    /// Drop this layer's demand on a plugin
    pub fn release_plugin(&self, id: &PluginId) -> Option<RunningRequirement> {
        self.inner.write().touch().plugins.remove(id)
    }

    pub fn plugin_requirement(&self, id: &PluginId) -> Option<RunningRequirement> {
        self.inner.read().plugins.get(id).copied()
    }

    /// Demand a service, returning the previous demand of this layer on it
    pub fn require_service(
        &self,
        service: impl Into<ServiceKey>,
        requirement: RunningRequirement,
    ) -> Option<RunningRequirement> {
        self.inner.write().touch().services.insert(service.into(), requirement)
    }

    /// Drop this layer's demand on a service
    pub fn release_service(&self, service: &ServiceKey) -> Option<RunningRequirement> {
        self.inner.write().touch().services.remove(service)
    }

    pub fn service_requirement(&self, service: &ServiceKey) -> Option<RunningRequirement> {
        self.inner.read().services.get(service).copied()
    }

    /// Drop every demand of this layer
    pub fn clear(&self) {
        let mut inner = self.inner.write();
        inner.touch();
        inner.plugins.clear();
        inner.services.clear();
    }

    pub fn is_empty(&self) -> bool {
        let inner = self.inner.read();
        inner.plugins.is_empty() && inner.services.is_empty()
    }

    /// Revision stamp of the last mutation
    pub fn revision(&self) -> u64 {
        self.inner.read().revision
    }

    /// Whether both handles point at the same layer
    pub fn same_layer(&self, other: &RequirementLayer) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn for_each_plugin(&self, mut f: impl FnMut(PluginId, RunningRequirement)) {
        for (id, requirement) in self.inner.read().plugins.iter() {
            f(*id, *requirement);
        }
    }

    pub(crate) fn for_each_service(&self, mut f: impl FnMut(&ServiceKey, RunningRequirement)) {
        for (service, requirement) in self.inner.read().services.iter() {
            f(service, *requirement);
        }
    }
}
