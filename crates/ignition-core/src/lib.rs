pub mod activation;
pub mod config;
pub mod kernel;
pub mod plugin_system;
pub mod requirements;
pub mod resolver;

// Re-export the types a host application needs to drive the engine
pub use activation::{ActivationEvent, ActivationObserver, ApplyReport, FailureReason, PluginRunner, PluginState};
pub use config::{ConfigPluginStatus, ConfigTier, ConfigUserAction, ConfigurationStore, SolvedConfigStatus};
pub use kernel::error::{Error, Result};
pub use plugin_system::{Discoverer, HookError, PluginCatalog, PluginDescriptor, PluginHost, PluginId, ServiceKey};
pub use requirements::{RequirementLayer, RunningRequirement};
pub use resolver::{Resolution, ResolutionIssue, TargetSnapshot};
