use std::collections::HashSet;

use crate::activation::state::{FailureReason, PluginState};
use crate::config::status::{ConfigPluginStatus, ConfigUserAction};
use crate::config::store::ConfigTier;
use crate::requirements::RunningRequirement;
use crate::resolver::ResolutionIssue;
use crate::tests::integration::common::{fixture, id, plugin, running};

#[test]
fn test_stopping_consumer_leaves_provider_running() {
    let mut consumer = plugin(1);
    consumer.requires_service("storage", RunningRequirement::MustExistAndRun);
    let mut provider = plugin(2);
    provider.implements("storage");
    let mut f = fixture(vec![consumer, provider]);

    f.config.set_action(id(1), ConfigUserAction::Started);
    assert!(f.runner.apply());
    assert_eq!(running(&f.runner), HashSet::from([id(1), id(2)]));

    f.config.set_action(id(1), ConfigUserAction::Stopped);
    assert!(f.runner.apply());
    assert_eq!(f.host.stopped(), vec![id(1)]);
    assert!(f.runner.is_plugin_running(&id(2)));
    assert!(!f.runner.is_dirty());
}

#[test]
fn test_apply_twice_is_idempotent() {
    let mut consumer = plugin(1);
    consumer.requires_plugin(id(2), RunningRequirement::MustExistAndRun);
    let mut f = fixture(vec![consumer, plugin(2), plugin(3)]);
    f.config.set_status(ConfigTier::System, id(1), ConfigPluginStatus::AutomaticStart);
    f.config.set_status(ConfigTier::System, id(3), ConfigPluginStatus::AutomaticStart);
    f.host.fail_on(id(3), crate::plugin_system::host::HookPhase::Start);

    let first = f.runner.apply();
    let calls = f.host.calls().len();
    let second = f.runner.apply();

    assert!(!first);
    assert_eq!(first, second);
    assert_eq!(f.host.calls().len(), calls);
}

#[test]
fn test_providers_start_before_consumers() {
    // ui -> render -> gpu, declared consumer first
    let mut ui = plugin(1);
    ui.requires_service("render", RunningRequirement::MustExistAndRun);
    let mut render = plugin(2);
    render.implements("render").requires_service("gpu", RunningRequirement::MustExistAndRun);
    let mut gpu = plugin(3);
    gpu.implements("gpu");
    let mut f = fixture(vec![ui, render, gpu]);
    f.layer.require_plugin(id(1), RunningRequirement::MustExistAndRun);

    assert!(f.runner.apply());
    assert_eq!(f.host.started(), vec![id(3), id(2), id(1)]);

    f.runner.stop_all();
    assert_eq!(f.host.stopped(), vec![id(1), id(2), id(3)]);
}

#[test]
fn test_optional_reference_does_not_start_provider() {
    let mut consumer = plugin(1);
    consumer.requires_service("spell", RunningRequirement::OptionalTryStart);
    let mut provider = plugin(2);
    provider.implements("spell");
    let mut f = fixture(vec![consumer, provider]);
    f.layer.require_plugin(id(1), RunningRequirement::MustExistAndRun);

    assert!(f.runner.apply());
    assert_eq!(running(&f.runner), HashSet::from([id(1)]));
}

#[test]
fn test_try_start_demand_starts_plugin() {
    let mut f = fixture(vec![plugin(1), plugin(2)]);
    f.layer.require_plugin(id(1), RunningRequirement::MustExistTryStart);
    f.layer.require_plugin(id(2), RunningRequirement::MustExist);

    assert!(f.runner.apply());
    assert_eq!(running(&f.runner), HashSet::from([id(1)]));
}

#[test]
fn test_disabling_provider_stops_dependent_consumer() {
    let mut consumer = plugin(1);
    consumer.requires_plugin(id(2), RunningRequirement::MustExistAndRun);
    let mut f = fixture(vec![consumer, plugin(2), plugin(3)]);
    f.config.set_status(ConfigTier::System, id(1), ConfigPluginStatus::AutomaticStart);
    f.config.set_status(ConfigTier::System, id(3), ConfigPluginStatus::AutomaticStart);
    assert!(f.runner.apply());

    f.config.set_status(ConfigTier::User, id(2), ConfigPluginStatus::Disabled);
    let report = f.runner.apply_report();
    assert!(!report.success);
    assert_eq!(report.stopped, vec![id(1), id(2)]);
    assert_eq!(f.runner.plugin_state(&id(1)), PluginState::Failed);
    assert!(matches!(
        f.runner.failure(&id(1)),
        Some(FailureReason::Unresolved(ResolutionIssue::DisabledProvider { .. }))
    ));
    assert!(f.runner.is_plugin_running(&id(3)));
}

#[test]
fn test_disabled_absorbs_every_demand() {
    let mut f = fixture(vec![plugin(1)]);
    f.config.set_status(ConfigTier::System, id(1), ConfigPluginStatus::Disabled);
    f.layer.require_plugin(id(1), RunningRequirement::MustExistTryStart);
    f.config.set_action(id(1), ConfigUserAction::Started);

    assert!(f.runner.apply());
    assert!(!f.runner.is_plugin_running(&id(1)));
    assert!(f.host.calls().is_empty());
}
