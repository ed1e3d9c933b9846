//! # Ignition Core Resolver
//!
//! Turns configuration tiers, requirement layers and the known plugins into
//! one [`TargetSnapshot`]: the solved status every plugin should be in.
//!
//! 1. Each plugin's tiers resolve to an optional [`SolvedConfigStatus`].
//! 2. Layer demands on plugins, and on services with a single implementer,
//!    are merged per plugin (strongest wins).
//! 3. Demand is [propagated](propagation::propagate) along the service and
//!    plugin references of the [`ServiceGraph`].
//! 4. Per plugin: configuration `Disabled` wins outright, otherwise the
//!    stronger of configuration and demand.
//!
//! References that cannot be honoured are reported as [`ResolutionIssue`]s.
//! Nothing here fails; the activation engine decides what an issue costs.
pub mod graph;
pub mod propagation;

use std::collections::{BTreeMap, HashMap, HashSet};

use log::{debug, trace};

use crate::config::status::SolvedConfigStatus;
use crate::config::store::ConfigSnapshot;
use crate::plugin_system::descriptor::PluginDescriptor;
use crate::plugin_system::id::{PluginId, ServiceKey};
use crate::requirements::{MergedRequirements, RunningRequirement};

pub use graph::{Dependency, Provider, ReferenceTarget, ServiceGraph};
pub use propagation::propagate;

fn owner_label(owner: &Option<PluginId>) -> String {
    match owner {
        Some(id) => format!("plugin {}", id),
        None => "a requirement layer".to_string(),
    }
}

/// A reference that could not be honoured during resolution
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolutionIssue {
    #[error("{} requires service '{service}' ({requirement}) but no plugin implements it", owner_label(.owner))]
    UnresolvedService {
        owner: Option<PluginId>,
        service: ServiceKey,
        requirement: RunningRequirement,
    },

    #[error("{} requires service '{service}' ({requirement}) but {} plugins implement it", owner_label(.owner), .candidates.len())]
    AmbiguousService {
        owner: Option<PluginId>,
        service: ServiceKey,
        candidates: Vec<PluginId>,
        requirement: RunningRequirement,
    },

    #[error("{} requires unknown plugin {plugin} ({requirement})", owner_label(.owner))]
    UnknownPlugin {
        owner: Option<PluginId>,
        plugin: PluginId,
        requirement: RunningRequirement,
    },

    #[error("plugin {owner} requires plugin {provider} ({requirement}) which is disabled")]
    DisabledProvider {
        owner: PluginId,
        provider: PluginId,
        requirement: RunningRequirement,
    },
}

impl ResolutionIssue {
    /// The plugin whose reference failed, `None` for a layer demand
    pub fn owner(&self) -> Option<PluginId> {
        match self {
            ResolutionIssue::UnresolvedService { owner, .. }
            | ResolutionIssue::AmbiguousService { owner, .. }
            | ResolutionIssue::UnknownPlugin { owner, .. } => *owner,
            ResolutionIssue::DisabledProvider { owner, .. } => Some(*owner),
        }
    }

    pub fn requirement(&self) -> RunningRequirement {
        match self {
            ResolutionIssue::UnresolvedService { requirement, .. }
            | ResolutionIssue::AmbiguousService { requirement, .. }
            | ResolutionIssue::UnknownPlugin { requirement, .. }
            | ResolutionIssue::DisabledProvider { requirement, .. } => *requirement,
        }
    }

    /// A `MustExist*` demand that cannot be met fails the activation pass
    pub fn is_blocking(&self) -> bool {
        self.requirement().is_must_exist()
    }
}

/// Solved status per plugin. Plugins nobody configured or demanded are absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetSnapshot {
    targets: BTreeMap<PluginId, SolvedConfigStatus>,
}

impl TargetSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &PluginId) -> Option<SolvedConfigStatus> {
        self.targets.get(id).copied()
    }

    /// Status as far as activation is concerned: absent reads as `Optional`
    pub fn effective(&self, id: &PluginId) -> SolvedConfigStatus {
        self.get(id).unwrap_or(SolvedConfigStatus::Optional)
    }

    pub fn must_run(&self, id: &PluginId) -> bool {
        self.get(id) == Some(SolvedConfigStatus::MustExistAndRun)
    }

    pub fn iter(&self) -> impl Iterator<Item = (PluginId, SolvedConfigStatus)> + '_ {
        self.targets.iter().map(|(id, status)| (*id, *status))
    }

    /// Plugins whose target is `MustExistAndRun`
    pub fn running_set(&self) -> impl Iterator<Item = PluginId> + '_ {
        self.iter()
            .filter(|(_, status)| *status == SolvedConfigStatus::MustExistAndRun)
            .map(|(id, _)| id)
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn insert(&mut self, id: PluginId, status: SolvedConfigStatus) -> Option<SolvedConfigStatus> {
        self.targets.insert(id, status)
    }

    /// Plugins whose effective status differs between the two snapshots
    pub fn differences(&self, other: &TargetSnapshot) -> Vec<PluginId> {
        let mut ids: Vec<PluginId> = self.targets.keys().chain(other.targets.keys()).copied().collect();
        ids.sort();
        ids.dedup();
        ids.retain(|id| self.effective(id) != other.effective(id));
        ids
    }

    pub fn differs_from(&self, other: &TargetSnapshot) -> bool {
        !self.differences(other).is_empty()
    }
}

impl FromIterator<(PluginId, SolvedConfigStatus)> for TargetSnapshot {
    fn from_iter<I: IntoIterator<Item = (PluginId, SolvedConfigStatus)>>(iter: I) -> Self {
        Self {
            targets: iter.into_iter().collect(),
        }
    }
}

/// Outcome of one resolution pass
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    /// Final targets, propagation included
    pub targets: TargetSnapshot,
    /// Targets from configuration and direct layer demand only. A running
    /// plugin is stopped when this stops asking for it.
    pub own_targets: TargetSnapshot,
    /// Every problem found, in discovery order of the owner
    pub issues: Vec<ResolutionIssue>,
    /// Plugins that must not be started, with the first blocking issue
    pub blocked: BTreeMap<PluginId, ResolutionIssue>,
    /// The graph the pass was computed on
    pub graph: ServiceGraph,
}

impl Resolution {
    pub fn has_blocking_issues(&self) -> bool {
        self.issues.iter().any(ResolutionIssue::is_blocking)
    }

    pub fn is_blocked(&self, id: &PluginId) -> bool {
        self.blocked.contains_key(id)
    }
}

fn merge_into(map: &mut HashMap<PluginId, RunningRequirement>, id: PluginId, requirement: RunningRequirement) {
    map.entry(id)
        .and_modify(|current| *current = current.merge(requirement))
        .or_insert(requirement);
}

fn solve(configured: Option<SolvedConfigStatus>, demand: Option<RunningRequirement>) -> Option<SolvedConfigStatus> {
    match configured {
        Some(SolvedConfigStatus::Disabled) => Some(SolvedConfigStatus::Disabled),
        configured => configured.into_iter().chain(demand.map(RunningRequirement::to_solved)).max(),
    }
}

fn build_targets(
    graph: &ServiceGraph,
    configured: &HashMap<PluginId, SolvedConfigStatus>,
    demand: &HashMap<PluginId, RunningRequirement>,
) -> TargetSnapshot {
    graph
        .plugins()
        .iter()
        .filter_map(|id| solve(configured.get(id).copied(), demand.get(id).copied()).map(|status| (*id, status)))
        .collect()
}

fn reference_issue(owner: PluginId, dependency: &Dependency, targets: &TargetSnapshot) -> Option<ResolutionIssue> {
    let requirement = dependency.requirement;
    match (&dependency.target, &dependency.provider) {
        (_, Provider::Resolved(provider)) => {
            if *provider != owner && targets.get(provider) == Some(SolvedConfigStatus::Disabled) {
                Some(ResolutionIssue::DisabledProvider {
                    owner,
                    provider: *provider,
                    requirement,
                })
            } else {
                None
            }
        }
        (ReferenceTarget::Service(service), Provider::Ambiguous(candidates)) => Some(ResolutionIssue::AmbiguousService {
            owner: Some(owner),
            service: service.clone(),
            candidates: candidates.clone(),
            requirement,
        }),
        (ReferenceTarget::Service(service), _) => Some(ResolutionIssue::UnresolvedService {
            owner: Some(owner),
            service: service.clone(),
            requirement,
        }),
        (ReferenceTarget::Plugin(plugin), _) => Some(ResolutionIssue::UnknownPlugin {
            owner: Some(owner),
            plugin: *plugin,
            requirement,
        }),
    }
}

/// Reference issues of every plugin that must run, and the plugins they block
fn blocking_pass(
    graph: &ServiceGraph,
    targets: &TargetSnapshot,
) -> (BTreeMap<PluginId, ResolutionIssue>, Vec<ResolutionIssue>) {
    let mut blocked = BTreeMap::new();
    let mut issues = Vec::new();
    for id in graph.plugins() {
        if !targets.must_run(id) {
            continue;
        }
        for dependency in graph.dependencies(id) {
            if let Some(issue) = reference_issue(*id, dependency, targets) {
                if issue.is_blocking() {
                    blocked.entry(*id).or_insert_with(|| issue.clone());
                }
                issues.push(issue);
            }
        }
    }
    (blocked, issues)
}

/// Run one full resolution pass.
///
/// `descriptors` must be in discovery order; it fixes the order of issues and
/// the tie-break of start ordering.
pub fn resolve(
    descriptors: &[&PluginDescriptor],
    config: &ConfigSnapshot,
    requirements: &MergedRequirements,
) -> Resolution {
    let graph = ServiceGraph::build(descriptors.iter().copied());
    let mut issues = Vec::new();

    let configured: HashMap<PluginId, SolvedConfigStatus> = graph
        .plugins()
        .iter()
        .filter_map(|id| config.resolve(id).map(|status| (*id, status)))
        .collect();

    let mut own: HashMap<PluginId, RunningRequirement> = HashMap::new();
    let mut plugin_demands: Vec<(PluginId, RunningRequirement)> =
        requirements.plugins.iter().map(|(id, requirement)| (*id, *requirement)).collect();
    plugin_demands.sort();
    for (id, requirement) in plugin_demands {
        if graph.contains(&id) {
            merge_into(&mut own, id, requirement);
        } else {
            issues.push(ResolutionIssue::UnknownPlugin {
                owner: None,
                plugin: id,
                requirement,
            });
        }
    }
    for (service, requirement) in &requirements.services {
        match graph.resolve_service(service) {
            Provider::Resolved(id) => merge_into(&mut own, id, *requirement),
            Provider::Ambiguous(candidates) => issues.push(ResolutionIssue::AmbiguousService {
                owner: None,
                service: service.clone(),
                candidates,
                requirement: *requirement,
            }),
            Provider::Missing | Provider::Unknown => issues.push(ResolutionIssue::UnresolvedService {
                owner: None,
                service: service.clone(),
                requirement: *requirement,
            }),
        }
    }

    let mut seeds = own;
    for (id, status) in &configured {
        if let Some(requirement) = RunningRequirement::from_solved(*status) {
            merge_into(&mut seeds, *id, requirement);
        }
    }
    let disabled: HashSet<PluginId> = configured
        .iter()
        .filter(|(_, status)| **status == SolvedConfigStatus::Disabled)
        .map(|(id, _)| *id)
        .collect();

    // A blocked plugin keeps its own target but demands nothing from its
    // providers. Blocking depends only on references and configured status,
    // so the held set only grows and the loop ends.
    let mut held = disabled;
    let (targets, blocked, reference_issues) = loop {
        let demand = propagate(&graph, &seeds, &held);
        let targets = build_targets(&graph, &configured, &demand);
        let (blocked, found) = blocking_pass(&graph, &targets);
        let newly_blocked: Vec<PluginId> = blocked.keys().filter(|id| !held.contains(id)).copied().collect();
        if newly_blocked.is_empty() {
            break (targets, blocked, found);
        }
        trace!("Holding back demand of {} blocked plugin(s)", newly_blocked.len());
        held.extend(newly_blocked);
    };
    issues.extend(reference_issues);
    let own_targets = build_targets(&graph, &configured, &seeds);

    debug!(
        "Resolved {} target(s) for {} plugin(s), {} issue(s), {} blocked",
        targets.len(),
        graph.plugins().len(),
        issues.len(),
        blocked.len()
    );

    Resolution {
        targets,
        own_targets,
        issues,
        blocked,
        graph,
    }
}
