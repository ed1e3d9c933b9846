use std::collections::HashMap;

use crate::plugin_system::descriptor::PluginDescriptor;
use crate::plugin_system::id::{PluginId, ServiceKey};
use crate::requirements::RunningRequirement;

/// What a reference resolved to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Provider {
    /// Exactly one known plugin satisfies the reference
    Resolved(PluginId),
    /// No known plugin implements the service
    Missing,
    /// More than one known plugin implements the service. No candidate is
    /// selected.
    Ambiguous(Vec<PluginId>),
    /// The referenced plugin id is not known
    Unknown,
}

impl Provider {
    pub fn resolved(&self) -> Option<PluginId> {
        match self {
            Provider::Resolved(id) => Some(*id),
            _ => None,
        }
    }
}

/// Either side of a descriptor reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceTarget {
    Service(ServiceKey),
    Plugin(PluginId),
}

/// One outgoing edge of the dependency graph: consumer -> provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    pub target: ReferenceTarget,
    pub provider: Provider,
    pub requirement: RunningRequirement,
}

/// Adjacency-map view of the known plugins and what they require.
///
/// Built once per resolution pass from the discoverer's descriptors. Every
/// reference is resolved to a [`Provider`] up front so propagation and start
/// ordering walk plain ids.
#[derive(Debug, Clone, Default)]
pub struct ServiceGraph {
    order: Vec<PluginId>,
    position: HashMap<PluginId, usize>,
    implementers: HashMap<ServiceKey, Vec<PluginId>>,
    dependencies: HashMap<PluginId, Vec<Dependency>>,
}

impl ServiceGraph {
    /// Build the graph. Descriptors are taken in discovery order; a repeated
    /// id keeps its first occurrence.
    pub fn build<'a, I>(descriptors: I) -> Self
    where
        I: IntoIterator<Item = &'a PluginDescriptor>,
    {
        let mut graph = ServiceGraph::default();
        let mut known: Vec<&PluginDescriptor> = Vec::new();

        for descriptor in descriptors {
            if graph.position.contains_key(&descriptor.id) {
                continue;
            }
            graph.position.insert(descriptor.id, graph.order.len());
            graph.order.push(descriptor.id);
            for service in &descriptor.services {
                graph.implementers.entry(service.clone()).or_default().push(descriptor.id);
            }
            known.push(descriptor);
        }

        for descriptor in known {
            let mut edges = Vec::with_capacity(descriptor.requires_services.len() + descriptor.requires_plugins.len());
            for reference in &descriptor.requires_services {
                edges.push(Dependency {
                    target: ReferenceTarget::Service(reference.service.clone()),
                    provider: graph.resolve_service(&reference.service),
                    requirement: reference.requirement,
                });
            }
            for reference in &descriptor.requires_plugins {
                let provider = if graph.contains(&reference.plugin) {
                    Provider::Resolved(reference.plugin)
                } else {
                    Provider::Unknown
                };
                edges.push(Dependency {
                    target: ReferenceTarget::Plugin(reference.plugin),
                    provider,
                    requirement: reference.requirement,
                });
            }
            graph.dependencies.insert(descriptor.id, edges);
        }

        graph
    }

    pub fn contains(&self, id: &PluginId) -> bool {
        self.position.contains_key(id)
    }

    /// Known plugins in discovery order
    pub fn plugins(&self) -> &[PluginId] {
        &self.order
    }

    /// Discovery position of a plugin
    pub fn position(&self, id: &PluginId) -> Option<usize> {
        self.position.get(id).copied()
    }

    /// Every known implementer of a service, in discovery order
    pub fn implementers(&self, service: &ServiceKey) -> &[PluginId] {
        self.implementers.get(service).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Select the implementer of a service
    pub fn resolve_service(&self, service: &ServiceKey) -> Provider {
        match self.implementers(service) {
            [] => Provider::Missing,
            [single] => Provider::Resolved(*single),
            many => Provider::Ambiguous(many.to_vec()),
        }
    }

    /// Outgoing references of a plugin
    pub fn dependencies(&self, id: &PluginId) -> &[Dependency] {
        self.dependencies.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Resolved providers of a plugin with the strength of each reference
    pub fn providers_of(&self, id: PluginId) -> impl Iterator<Item = (PluginId, RunningRequirement)> + '_ {
        self.dependencies(&id)
            .iter()
            .filter_map(|dep| dep.provider.resolved().map(|provider| (provider, dep.requirement)))
    }
}
