use crate::activation::state::FailureReason;
use crate::plugin_system::id::PluginId;

/// Notification emitted by the activation engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivationEvent {
    Starting { plugin: PluginId },
    Started { plugin: PluginId },
    /// Setup or Start failed
    StartFailed { plugin: PluginId, reason: FailureReason },
    /// The plugin was not started because a requirement cannot be met
    Blocked { plugin: PluginId, reason: FailureReason },
    Stopping { plugin: PluginId },
    Stopped { plugin: PluginId },
}

impl ActivationEvent {
    pub fn plugin(&self) -> PluginId {
        match self {
            ActivationEvent::Starting { plugin }
            | ActivationEvent::Started { plugin }
            | ActivationEvent::StartFailed { plugin, .. }
            | ActivationEvent::Blocked { plugin, .. }
            | ActivationEvent::Stopping { plugin }
            | ActivationEvent::Stopped { plugin } => *plugin,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ActivationEvent::Starting { .. } => "starting",
            ActivationEvent::Started { .. } => "started",
            ActivationEvent::StartFailed { .. } => "start_failed",
            ActivationEvent::Blocked { .. } => "blocked",
            ActivationEvent::Stopping { .. } => "stopping",
            ActivationEvent::Stopped { .. } => "stopped",
        }
    }
}

/// Receives activation notifications synchronously, in order
pub trait ActivationObserver: Send + Sync {
    fn on_event(&self, event: &ActivationEvent);
}

impl<F> ActivationObserver for F
where
    F: Fn(&ActivationEvent) + Send + Sync,
{
    fn on_event(&self, event: &ActivationEvent) {
        self(event)
    }
}
