use std::collections::HashSet;

use ignition_core::plugin_system::{HookError, PluginDescriptor, PluginHost, PluginId};

/// Host for the command line: it has no plugin code to run, so each hook
/// just reports itself on stdout.
///
/// Plugins listed in `failing` refuse to start, which lets the failure path
/// be exercised from a shell.
#[derive(Debug, Default)]
pub struct ConsoleHost {
    failing: HashSet<PluginId>,
}

impl ConsoleHost {
    pub fn new(failing: impl IntoIterator<Item = PluginId>) -> Self {
        Self {
            failing: failing.into_iter().collect(),
        }
    }
}

impl PluginHost for ConsoleHost {
    fn setup(&mut self, plugin: &PluginDescriptor) -> Result<(), HookError> {
        println!("[host] setup {}", plugin.name);
        Ok(())
    }

    fn start(&mut self, plugin: &PluginDescriptor) -> Result<(), HookError> {
        if self.failing.contains(&plugin.id) {
            println!("[host] start {} (refused)", plugin.name);
            return Err(HookError::new(format!("{} was told to fail", plugin.name)));
        }
        println!("[host] start {}", plugin.name);
        Ok(())
    }

    fn stop(&mut self, plugin: &PluginDescriptor) -> Result<(), HookError> {
        println!("[host] stop {}", plugin.name);
        Ok(())
    }
}
