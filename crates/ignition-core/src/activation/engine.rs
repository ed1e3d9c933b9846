use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::panic::{self, AssertUnwindSafe};

use log::{debug, info, warn};
use parking_lot::Mutex;

use crate::activation::events::{ActivationEvent, ActivationObserver};
use crate::activation::order;
use crate::activation::state::{FailureReason, PluginRuntime, PluginState, StartOrigin};
use crate::config::status::SolvedConfigStatus;
use crate::config::store::ConfigurationStore;
use crate::plugin_system::descriptor::PluginDescriptor;
use crate::plugin_system::discovery::Discoverer;
use crate::plugin_system::host::{HookPhase, PluginHost};
use crate::plugin_system::id::PluginId;
use crate::requirements::{RequirementLayer, RequirementLayerSet, RunningRequirement};
use crate::resolver::{self, Resolution, ResolutionIssue, TargetSnapshot};

/// What one [`PluginRunner::apply_report`] pass did
#[derive(Debug, Clone, Default)]
pub struct ApplyReport {
    /// Every plugin that should run is running and no blocking issue was found
    pub success: bool,
    /// Started during this pass, in start order
    pub started: Vec<PluginId>,
    /// Stopped during this pass, in stop order
    pub stopped: Vec<PluginId>,
    /// Start attempts that failed or were refused during this pass
    pub failed: Vec<(PluginId, FailureReason)>,
    /// Plugins whose target is `MustExistAndRun` but are not running
    pub unmet: Vec<PluginId>,
    /// Every issue found while resolving
    pub issues: Vec<ResolutionIssue>,
}

impl ApplyReport {
    /// Whether no hook ran
    pub fn is_noop(&self) -> bool {
        self.started.is_empty() && self.stopped.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct InputRevision {
    inputs: u64,
    discovery: u64,
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Call one hook, turning an error or a panic into a [`FailureReason`]
fn invoke<H: PluginHost>(host: &mut H, phase: HookPhase, descriptor: &PluginDescriptor) -> Result<(), FailureReason> {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| match phase {
        HookPhase::Setup => host.setup(descriptor),
        HookPhase::Start => host.start(descriptor),
        HookPhase::Stop => host.stop(descriptor),
    }));
    match outcome {
        Ok(Ok(())) => Ok(()),
        Ok(Err(error)) => Err(FailureReason::Hook { phase, error }),
        Err(payload) => Err(FailureReason::Panicked {
            phase,
            message: panic_message(payload.as_ref()),
        }),
    }
}

/// The activation engine.
///
/// Owns the discoverer, the host and the registered requirement layers, and
/// reads a shared [`ConfigurationStore`]. Each [`apply`](Self::apply) resolves
/// the inputs into a [`TargetSnapshot`], stops what must stop (consumers
/// first), then starts what must run (providers first).
pub struct PluginRunner<D: Discoverer, H: PluginHost> {
    discoverer: D,
    host: H,
    config: ConfigurationStore,
    layers: RequirementLayerSet,
    runtimes: HashMap<PluginId, PluginRuntime>,
    baseline: TargetSnapshot,
    dirty_cache: Mutex<Option<(InputRevision, bool)>>,
    observers: Vec<Box<dyn ActivationObserver>>,
}

impl<D: Discoverer, H: PluginHost> PluginRunner<D, H> {
    pub fn new(discoverer: D, host: H, config: ConfigurationStore) -> Self {
        Self {
            discoverer,
            host,
            config,
            layers: RequirementLayerSet::new(),
            runtimes: HashMap::new(),
            baseline: TargetSnapshot::new(),
            dirty_cache: Mutex::new(None),
            observers: Vec::new(),
        }
    }

    pub fn discoverer(&self) -> &D {
        &self.discoverer
    }

    pub fn discoverer_mut(&mut self) -> &mut D {
        &mut self.discoverer
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn config(&self) -> &ConfigurationStore {
        &self.config
    }

    pub fn layers(&self) -> &RequirementLayerSet {
        &self.layers
    }

    pub fn layers_mut(&mut self) -> &mut RequirementLayerSet {
        &mut self.layers
    }

    /// Register a requirement layer. Returns `false` if one with the same
    /// name is already registered.
    pub fn add_layer(&mut self, layer: RequirementLayer) -> bool {
        self.layers.add(layer)
    }

    /// Unregister a requirement layer by name
    pub fn remove_layer(&mut self, name: &str) -> Option<RequirementLayer> {
        self.layers.remove(name)
    }

    /// Receive every activation event from now on
    pub fn subscribe(&mut self, observer: impl ActivationObserver + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// Resolve the current inputs without side effects
    pub fn resolve(&self) -> Resolution {
        let descriptors = self.discoverer.plugins();
        let config = self.config.snapshot();
        let merged = self.layers.merged();
        resolver::resolve(&descriptors, &config, &merged)
    }

    /// The targets of the last `apply`
    pub fn baseline(&self) -> &TargetSnapshot {
        &self.baseline
    }

    pub fn plugin_state(&self, id: &PluginId) -> PluginState {
        self.runtimes.get(id).map(|runtime| runtime.state).unwrap_or_default()
    }

    pub fn is_plugin_running(&self, id: &PluginId) -> bool {
        self.plugin_state(id).is_running()
    }

    /// Why the plugin is `Failed`, if it is
    pub fn failure(&self, id: &PluginId) -> Option<&FailureReason> {
        self.runtimes
            .get(id)
            .filter(|runtime| runtime.state == PluginState::Failed)
            .and_then(|runtime| runtime.failure.as_ref())
    }

    /// Running plugins, sorted by id
    pub fn running_plugins(&self) -> Vec<PluginId> {
        let mut running: Vec<PluginId> = self
            .runtimes
            .iter()
            .filter(|(_, runtime)| runtime.state.is_running())
            .map(|(id, _)| *id)
            .collect();
        running.sort();
        running
    }

    /// Forget a failure so the next `apply` tries the plugin again.
    /// Returns `false` if the plugin was not `Failed`.
    pub fn clear_failure(&mut self, id: &PluginId) -> bool {
        match self.runtimes.get_mut(id) {
            Some(runtime) if runtime.state == PluginState::Failed => {
                debug!("Clearing failure of plugin {}", id);
                runtime.state = PluginState::Stopped;
                runtime.failure = None;
                true
            }
            _ => false,
        }
    }

    pub fn clear_failures(&mut self) {
        let failed: Vec<PluginId> = self
            .runtimes
            .iter()
            .filter(|(_, runtime)| runtime.state == PluginState::Failed)
            .map(|(id, _)| *id)
            .collect();
        for id in failed {
            self.clear_failure(&id);
        }
    }

    fn input_revision(&self) -> InputRevision {
        InputRevision {
            inputs: self.config.revision().max(self.layers.revision()),
            discovery: self.discoverer.generation(),
        }
    }

    /// Whether the freshly resolved targets differ from those of the last
    /// `apply`. The answer is cached until an input changes.
    pub fn is_dirty(&self) -> bool {
        let revision = self.input_revision();
        if let Some((cached, dirty)) = *self.dirty_cache.lock() {
            if cached == revision {
                return dirty;
            }
        }

        let changed = self.resolve().targets.differences(&self.baseline);
        if !changed.is_empty() {
            debug!("{} plugin target(s) changed since last apply", changed.len());
        }
        let dirty = !changed.is_empty();
        *self.dirty_cache.lock() = Some((revision, dirty));
        dirty
    }

    /// Bring the running plugins in line with the current inputs.
    ///
    /// Returns `true` iff every plugin whose target is `MustExistAndRun` is
    /// running afterwards and no `MustExist*` demand was left unresolved.
    pub fn apply(&mut self) -> bool {
        self.apply_report().success
    }

    /// [`apply`](Self::apply), with the details of what happened
    pub fn apply_report(&mut self) -> ApplyReport {
        let revision = self.input_revision();
        let resolution = self.resolve();
        let mut report = ApplyReport {
            issues: resolution.issues.clone(),
            ..ApplyReport::default()
        };
        for issue in &resolution.issues {
            if issue.is_blocking() {
                warn!("{}", issue);
            } else {
                debug!("{}", issue);
            }
        }

        self.settle_failures(&resolution);
        self.stop_pass(&resolution, &mut report);
        self.start_pass(&resolution, &mut report);
        self.refresh_origins(&resolution);

        report.unmet = resolution
            .targets
            .running_set()
            .filter(|id| !self.is_plugin_running(id))
            .collect();
        report.success = report.unmet.is_empty() && !resolution.has_blocking_issues();

        info!(
            "Apply finished: {} started, {} stopped, {} failed, {} unmet",
            report.started.len(),
            report.stopped.len(),
            report.failed.len(),
            report.unmet.len()
        );

        self.baseline = resolution.targets;
        *self.dirty_cache.get_mut() = Some((revision, false));
        report
    }

    /// Stop every running plugin, consumers first. The baseline is cleared
    /// so the runner reads dirty again if anything should run.
    pub fn stop_all(&mut self) -> Vec<PluginId> {
        let graph = self.resolve().graph;
        let running: HashSet<PluginId> = self.running_plugins().into_iter().collect();
        let mut report = ApplyReport::default();
        for id in Self::stop_sequence(&graph, &running) {
            self.stop_plugin(id, &mut report);
        }
        self.baseline = TargetSnapshot::new();
        *self.dirty_cache.get_mut() = None;
        report.stopped
    }

    fn emit(&self, event: ActivationEvent) {
        for observer in &self.observers {
            observer.on_event(&event);
        }
    }

    fn set_state(&mut self, id: PluginId, next: PluginState) {
        if let Some(runtime) = self.runtimes.get_mut(&id) {
            debug_assert!(
                runtime.state.can_transition_to(next),
                "invalid transition {} -> {} for {}",
                runtime.state,
                next,
                id
            );
            runtime.state = next;
        }
    }

    /// Drop failures that no longer apply. A sticky failure is kept only
    /// while the plugin's target stays `MustExistAndRun`, unchanged since
    /// the last pass.
    fn settle_failures(&mut self, resolution: &Resolution) {
        for (id, runtime) in self.runtimes.iter_mut() {
            if runtime.state != PluginState::Failed {
                continue;
            }
            let must_run = resolution.targets.must_run(id);
            let unchanged = self.baseline.effective(id) == resolution.targets.effective(id);
            if !must_run || (runtime.has_sticky_failure() && !unchanged) {
                debug!("Plugin {} leaves failed state", id);
                runtime.state = PluginState::Stopped;
                runtime.failure = None;
            }
        }
    }

    fn should_stop(&self, id: &PluginId, runtime: &PluginRuntime, resolution: &Resolution) -> bool {
        match resolution.targets.get(id) {
            Some(SolvedConfigStatus::Disabled) => true,
            Some(SolvedConfigStatus::MustExistAndRun) => resolution.is_blocked(id),
            _ => runtime.origin == Some(StartOrigin::Own) || !resolution.graph.contains(id),
        }
    }

    fn stop_pass(&mut self, resolution: &Resolution, report: &mut ApplyReport) {
        let mut stopping: HashSet<PluginId> = self
            .runtimes
            .iter()
            .filter(|(id, runtime)| runtime.state.is_running() && self.should_stop(id, runtime, resolution))
            .map(|(id, _)| *id)
            .collect();

        // A running consumer cannot outlive a provider it must have running.
        loop {
            let dependents: Vec<PluginId> = self
                .runtimes
                .iter()
                .filter(|(id, runtime)| runtime.state.is_running() && !stopping.contains(*id))
                .filter(|(id, _)| {
                    resolution.graph.providers_of(**id).any(|(provider, strength)| {
                        strength == RunningRequirement::MustExistAndRun && provider != **id && stopping.contains(&provider)
                    })
                })
                .map(|(id, _)| *id)
                .collect();
            if dependents.is_empty() {
                break;
            }
            stopping.extend(dependents);
        }

        for id in Self::stop_sequence(&resolution.graph, &stopping) {
            self.stop_plugin(id, report);
        }
    }

    /// Consumers before providers. Plugins no longer discovered go first.
    fn stop_sequence(graph: &resolver::ServiceGraph, members: &HashSet<PluginId>) -> Vec<PluginId> {
        let mut sequence: Vec<PluginId> = members.iter().filter(|id| !graph.contains(id)).copied().collect();
        sequence.sort();
        sequence.extend(order::stop_order(graph, members));
        sequence
    }

    fn stop_plugin(&mut self, id: PluginId, report: &mut ApplyReport) {
        let Some(descriptor) = self.runtimes.get(&id).map(|runtime| runtime.descriptor.clone()) else {
            return;
        };
        info!("Stopping plugin {}", descriptor);
        self.set_state(id, PluginState::Stopping);
        self.emit(ActivationEvent::Stopping { plugin: id });

        if let Err(reason) = invoke(&mut self.host, HookPhase::Stop, &descriptor) {
            warn!("Plugin {} did not stop cleanly: {}", descriptor, reason);
        }

        self.set_state(id, PluginState::Stopped);
        if let Some(runtime) = self.runtimes.get_mut(&id) {
            runtime.origin = None;
        }
        self.emit(ActivationEvent::Stopped { plugin: id });
        report.stopped.push(id);
    }

    fn start_pass(&mut self, resolution: &Resolution, report: &mut ApplyReport) {
        let candidates: HashSet<PluginId> = resolution
            .targets
            .running_set()
            .filter(|id| {
                self.runtimes
                    .get(id)
                    .is_none_or(|runtime| !runtime.state.is_running() && !runtime.has_sticky_failure())
            })
            .collect();
        if candidates.is_empty() {
            return;
        }

        for group in order::start_groups(&resolution.graph, &candidates) {
            for id in &group {
                if let Some(issue) = resolution.blocked.get(id) {
                    self.refuse(*id, FailureReason::Unresolved(issue.clone()), report);
                } else if let Some(provider) = self.failed_provider(*id, &group, resolution) {
                    self.refuse(*id, FailureReason::DependencyFailed { provider }, report);
                } else {
                    self.start_plugin(*id, resolution, report);
                }
            }
        }
    }

    /// A `MustExistAndRun` provider of `id` that is not running and will not
    /// be started later in the same group
    fn failed_provider(&self, id: PluginId, group: &[PluginId], resolution: &Resolution) -> Option<PluginId> {
        resolution
            .graph
            .providers_of(id)
            .filter(|(provider, strength)| *strength == RunningRequirement::MustExistAndRun && *provider != id)
            .map(|(provider, _)| provider)
            .find(|provider| {
                let state = self.plugin_state(provider);
                let pending = group.contains(provider) && state != PluginState::Failed;
                !state.is_running() && !pending
            })
    }

    fn runtime_entry(&mut self, id: PluginId) -> Option<&mut PluginRuntime> {
        let descriptor = self.discoverer.find_plugin(&id).cloned()?;
        let runtime = self
            .runtimes
            .entry(id)
            .or_insert_with(|| PluginRuntime::new(descriptor.clone()));
        runtime.descriptor = descriptor;
        Some(runtime)
    }

    /// Mark a plugin `Failed` without calling any hook
    fn refuse(&mut self, id: PluginId, reason: FailureReason, report: &mut ApplyReport) {
        let Some(runtime) = self.runtime_entry(id) else {
            return;
        };
        let repeated = runtime.state == PluginState::Failed && runtime.failure.as_ref() == Some(&reason);
        debug_assert!(runtime.state.can_transition_to(PluginState::Failed));
        runtime.state = PluginState::Failed;
        runtime.failure = Some(reason.clone());
        runtime.origin = None;

        if !repeated {
            warn!("Plugin {} not started: {}", id, reason);
            self.emit(ActivationEvent::Blocked {
                plugin: id,
                reason: reason.clone(),
            });
        }
        report.failed.push((id, reason));
    }

    fn start_plugin(&mut self, id: PluginId, resolution: &Resolution, report: &mut ApplyReport) {
        let Some(runtime) = self.runtime_entry(id) else {
            warn!("Plugin {} vanished before it could be started", id);
            return;
        };
        let descriptor = runtime.descriptor.clone();
        info!("Starting plugin {}", descriptor);
        self.set_state(id, PluginState::Starting);
        self.emit(ActivationEvent::Starting { plugin: id });

        let outcome = invoke(&mut self.host, HookPhase::Setup, &descriptor)
            .and_then(|()| invoke(&mut self.host, HookPhase::Start, &descriptor));

        match outcome {
            Ok(()) => {
                self.set_state(id, PluginState::Running);
                if let Some(runtime) = self.runtimes.get_mut(&id) {
                    runtime.failure = None;
                    runtime.origin = Some(if resolution.own_targets.must_run(&id) {
                        StartOrigin::Own
                    } else {
                        StartOrigin::Provider
                    });
                }
                self.emit(ActivationEvent::Started { plugin: id });
                report.started.push(id);
            }
            Err(reason) => {
                warn!("Plugin {} failed to start: {}", descriptor, reason);
                self.set_state(id, PluginState::Failed);
                if let Some(runtime) = self.runtimes.get_mut(&id) {
                    runtime.failure = Some(reason.clone());
                }
                self.emit(ActivationEvent::StartFailed {
                    plugin: id,
                    reason: reason.clone(),
                });
                report.failed.push((id, reason));
            }
        }
    }

    /// A plugin still demanded by its own target runs for itself; one kept
    /// only by propagation runs as a provider and survives its consumers.
    fn refresh_origins(&mut self, resolution: &Resolution) {
        for (id, runtime) in self.runtimes.iter_mut() {
            if !runtime.state.is_running() || !resolution.targets.must_run(id) {
                continue;
            }
            runtime.origin = Some(if resolution.own_targets.must_run(id) {
                StartOrigin::Own
            } else {
                StartOrigin::Provider
            });
        }
    }
}
