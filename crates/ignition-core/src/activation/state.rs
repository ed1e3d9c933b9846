use std::fmt;

use crate::plugin_system::descriptor::PluginDescriptor;
use crate::plugin_system::host::{HookError, HookPhase};
use crate::plugin_system::id::PluginId;
use crate::resolver::ResolutionIssue;

/// Runtime lifecycle state of a plugin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PluginState {
    #[default]
    Stopped,
    Starting,
    Running,
    Stopping,
    /// Setup or Start failed, or the plugin could not be started at all.
    /// Equivalent to not running.
    Failed,
}

impl PluginState {
    pub fn is_running(self) -> bool {
        self == PluginState::Running
    }

    /// Allowed lifecycle transitions
    pub fn can_transition_to(self, next: PluginState) -> bool {
        use PluginState::*;
        matches!(
            (self, next),
            (Stopped, Starting)
                | (Stopped, Failed)
                | (Starting, Running)
                | (Starting, Failed)
                | (Running, Stopping)
                | (Stopping, Stopped)
                | (Failed, Starting)
                | (Failed, Failed)
                | (Failed, Stopped)
        )
    }
}

impl fmt::Display for PluginState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PluginState::Stopped => f.write_str("stopped"),
            PluginState::Starting => f.write_str("starting"),
            PluginState::Running => f.write_str("running"),
            PluginState::Stopping => f.write_str("stopping"),
            PluginState::Failed => f.write_str("failed"),
        }
    }
}

/// Why a running plugin was started
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOrigin {
    /// Its own configuration or a layer demanded it
    Own,
    /// Only to satisfy another plugin's reference
    Provider,
}

/// Why a plugin that should run is not running
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FailureReason {
    #[error("{phase} hook failed: {error}")]
    Hook { phase: HookPhase, error: HookError },

    #[error("{phase} hook panicked: {message}")]
    Panicked { phase: HookPhase, message: String },

    #[error("{0}")]
    Unresolved(ResolutionIssue),

    #[error("required plugin {provider} is not running")]
    DependencyFailed { provider: PluginId },
}

impl FailureReason {
    /// Hook failures are not retried until the target changes or the
    /// failure is cleared. The others are re-checked on every pass.
    pub fn is_sticky(&self) -> bool {
        matches!(self, FailureReason::Hook { .. } | FailureReason::Panicked { .. })
    }
}

/// What the engine tracks for a plugin it has tried to start
#[derive(Debug, Clone)]
pub struct PluginRuntime {
    pub state: PluginState,
    pub origin: Option<StartOrigin>,
    pub failure: Option<FailureReason>,
    /// Descriptor as of the last start attempt, used to stop the plugin even
    /// if it is no longer discovered
    pub descriptor: PluginDescriptor,
}

impl PluginRuntime {
    pub fn new(descriptor: PluginDescriptor) -> Self {
        Self {
            state: PluginState::Stopped,
            origin: None,
            failure: None,
            descriptor,
        }
    }

    pub fn has_sticky_failure(&self) -> bool {
        self.state == PluginState::Failed && self.failure.as_ref().is_some_and(FailureReason::is_sticky)
    }
}
