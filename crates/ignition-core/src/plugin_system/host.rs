use std::fmt;

use crate::plugin_system::descriptor::PluginDescriptor;

/// Which lifecycle hook was being called
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookPhase {
    Setup,
    Start,
    Stop,
}

impl fmt::Display for HookPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookPhase::Setup => f.write_str("setup"),
            HookPhase::Start => f.write_str("start"),
            HookPhase::Stop => f.write_str("stop"),
        }
    }
}

/// Error returned by a plugin host hook
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct HookError {
    message: String,
}

impl HookError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

/// Runs plugins on behalf of the activation engine.
///
/// The engine calls these synchronously and only looks at success or
/// failure. A hook that panics is treated like one that returned an error.
pub trait PluginHost {
    /// Prepare the plugin for starting. Called before every `start`.
    fn setup(&mut self, plugin: &PluginDescriptor) -> Result<(), HookError>;

    /// Start the plugin
    fn start(&mut self, plugin: &PluginDescriptor) -> Result<(), HookError>;

    /// Stop the plugin. Errors are logged; the plugin is considered stopped.
    fn stop(&mut self, plugin: &PluginDescriptor) -> Result<(), HookError>;
}

impl<H: PluginHost + ?Sized> PluginHost for Box<H> {
    fn setup(&mut self, plugin: &PluginDescriptor) -> Result<(), HookError> {
        (**self).setup(plugin)
    }

    fn start(&mut self, plugin: &PluginDescriptor) -> Result<(), HookError> {
        (**self).start(plugin)
    }

    fn stop(&mut self, plugin: &PluginDescriptor) -> Result<(), HookError> {
        (**self).stop(plugin)
    }
}
