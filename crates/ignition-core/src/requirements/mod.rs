//! # Ignition Core Requirement Layers
//!
//! A [`RequirementLayer`] is a named set of demands owned by some feature:
//! "plugin X must run", "whoever implements service Y should exist". Layers
//! are registered with and removed from a [`RequirementLayerSet`] as whole
//! units; the set merges all their demands per target with
//! [`RunningRequirement::merge`] (strongest wins).
pub mod layer;
pub mod running;
pub mod set;

pub use layer::RequirementLayer;
pub use running::RunningRequirement;
pub use set::{MergedRequirements, RequirementLayerSet};
