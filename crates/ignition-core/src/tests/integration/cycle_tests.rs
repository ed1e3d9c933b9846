use std::collections::HashSet;

use crate::config::status::ConfigUserAction;
use crate::plugin_system::descriptor::PluginDescriptor;
use crate::requirements::RunningRequirement;
use crate::tests::integration::common::{fixture, id, plugin, running};

/// A -> b -> B -> c -> C -> a -> A, every reference MustExistAndRun
fn service_cycle() -> Vec<PluginDescriptor> {
    let mut a = plugin(1);
    a.implements("a").requires_service("b", RunningRequirement::MustExistAndRun);
    let mut b = plugin(2);
    b.implements("b").requires_service("c", RunningRequirement::MustExistAndRun);
    let mut c = plugin(3);
    c.implements("c").requires_service("a", RunningRequirement::MustExistAndRun);
    vec![a, b, c]
}

#[test]
fn test_cycle_all_running_after_one_apply() {
    let mut f = fixture(service_cycle());
    f.layer.require_plugin(id(1), RunningRequirement::MustExistAndRun);

    assert!(f.runner.apply());
    assert_eq!(running(&f.runner), HashSet::from([id(1), id(2), id(3)]));

    // Each member started exactly once, as one group in discovery order
    assert_eq!(f.host.started(), vec![id(1), id(2), id(3)]);
}

#[test]
fn test_cycle_entered_through_service_demand() {
    let mut f = fixture(service_cycle());
    f.layer.require_service("c", RunningRequirement::MustExistAndRun);

    assert!(f.runner.apply());
    assert_eq!(running(&f.runner).len(), 3);
    let targets = f.runner.resolve().targets;
    assert_eq!(targets.running_set().count(), 3);
}

#[test]
fn test_cycle_apply_is_idempotent() {
    let mut f = fixture(service_cycle());
    f.config.set_action(id(2), ConfigUserAction::Started);
    assert!(f.runner.apply());

    f.host.clear_calls();
    assert!(f.runner.apply());
    assert!(f.host.calls().is_empty());
}

#[test]
fn test_releasing_cycle_entry_stops_whole_cycle() {
    let mut f = fixture(service_cycle());
    f.layer.require_plugin(id(1), RunningRequirement::MustExistAndRun);
    assert!(f.runner.apply());

    // B and C were started as providers, but each also needs its successor
    // in the cycle running, so none of them can outlive A.
    f.layer.release_plugin(&id(1));
    assert!(f.runner.apply());
    assert_eq!(f.host.stopped(), vec![id(3), id(2), id(1)]);
    assert!(running(&f.runner).is_empty());
}

#[test]
fn test_weak_cycle_propagates_weak_demand() {
    let mut a = plugin(1);
    a.implements("a").requires_service("b", RunningRequirement::OptionalTryStart);
    let mut b = plugin(2);
    b.implements("b").requires_service("a", RunningRequirement::MustExistAndRun);
    let mut f = fixture(vec![a, b]);
    f.layer.require_plugin(id(1), RunningRequirement::MustExistAndRun);

    assert!(f.runner.apply());
    assert_eq!(running(&f.runner), HashSet::from([id(1)]));
}
