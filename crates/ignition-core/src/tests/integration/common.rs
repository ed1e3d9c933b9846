use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::activation::{ActivationEvent, PluginRunner};
use crate::config::store::ConfigurationStore;
use crate::plugin_system::descriptor::PluginDescriptor;
use crate::plugin_system::discovery::PluginCatalog;
use crate::plugin_system::host::{HookError, HookPhase, PluginHost};
use crate::plugin_system::id::PluginId;
use crate::requirements::RequirementLayer;

pub fn id(n: u128) -> PluginId {
    PluginId::from_u128(n)
}

pub fn plugin(n: u128) -> PluginDescriptor {
    PluginDescriptor::new(id(n), &format!("plugin-{n}"))
}

#[derive(Debug, Default)]
struct HostLog {
    calls: Vec<(HookPhase, PluginId)>,
    failing: HashMap<PluginId, HookPhase>,
    panicking: HashMap<PluginId, HookPhase>,
}

/// Host that records every hook call and fails or panics on demand.
/// Clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct RecordingHost {
    log: Arc<Mutex<HostLog>>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<(HookPhase, PluginId)> {
        self.log.lock().calls.clone()
    }

    pub fn calls_for(&self, phase: HookPhase) -> Vec<PluginId> {
        self.log
            .lock()
            .calls
            .iter()
            .filter(|(p, _)| *p == phase)
            .map(|(_, id)| *id)
            .collect()
    }

    pub fn started(&self) -> Vec<PluginId> {
        self.calls_for(HookPhase::Start)
    }

    pub fn stopped(&self) -> Vec<PluginId> {
        self.calls_for(HookPhase::Stop)
    }

    pub fn clear_calls(&self) {
        self.log.lock().calls.clear();
    }

    pub fn fail_on(&self, id: PluginId, phase: HookPhase) {
        self.log.lock().failing.insert(id, phase);
    }

    pub fn panic_on(&self, id: PluginId, phase: HookPhase) {
        self.log.lock().panicking.insert(id, phase);
    }

    pub fn heal(&self, id: &PluginId) {
        let mut log = self.log.lock();
        log.failing.remove(id);
        log.panicking.remove(id);
    }

    fn hook(&self, phase: HookPhase, plugin: &PluginDescriptor) -> Result<(), HookError> {
        let (fail, panic) = {
            let mut log = self.log.lock();
            log.calls.push((phase, plugin.id));
            (
                log.failing.get(&plugin.id) == Some(&phase),
                log.panicking.get(&plugin.id) == Some(&phase),
            )
        };
        if panic {
            panic!("{} panicked during {}", plugin.name, phase);
        }
        if fail {
            return Err(HookError::new(format!("{} refused to {}", plugin.name, phase)));
        }
        Ok(())
    }
}

impl PluginHost for RecordingHost {
    fn setup(&mut self, plugin: &PluginDescriptor) -> Result<(), HookError> {
        self.hook(HookPhase::Setup, plugin)
    }

    fn start(&mut self, plugin: &PluginDescriptor) -> Result<(), HookError> {
        self.hook(HookPhase::Start, plugin)
    }

    fn stop(&mut self, plugin: &PluginDescriptor) -> Result<(), HookError> {
        self.hook(HookPhase::Stop, plugin)
    }
}

pub type TestRunner = PluginRunner<PluginCatalog, RecordingHost>;

/// A runner over a static catalog, with one registered layer and handles on
/// everything a test wants to poke at
pub struct Fixture {
    pub runner: TestRunner,
    pub host: RecordingHost,
    pub config: ConfigurationStore,
    pub layer: RequirementLayer,
}

pub fn fixture(descriptors: Vec<PluginDescriptor>) -> Fixture {
    let mut catalog = PluginCatalog::new();
    for descriptor in descriptors {
        catalog.register(descriptor).expect("Failed to register test plugin");
    }
    let host = RecordingHost::new();
    let config = ConfigurationStore::new();
    let layer = RequirementLayer::new("test");
    let mut runner = PluginRunner::new(catalog, host.clone(), config.clone());
    runner.add_layer(layer.clone());
    Fixture {
        runner,
        host,
        config,
        layer,
    }
}

/// Collect every event the runner emits from now on
pub fn record_events(runner: &mut TestRunner) -> Arc<Mutex<Vec<ActivationEvent>>> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    runner.subscribe(move |event: &ActivationEvent| sink.lock().push(event.clone()));
    events
}

/// Plugins currently running according to the runner, as a set
pub fn running(runner: &TestRunner) -> HashSet<PluginId> {
    runner.running_plugins().into_iter().collect()
}
