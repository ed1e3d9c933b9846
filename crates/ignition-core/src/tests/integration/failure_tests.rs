use std::collections::HashSet;

use crate::activation::events::ActivationEvent;
use crate::activation::state::{FailureReason, PluginState};
use crate::plugin_system::host::HookPhase;
use crate::requirements::RunningRequirement;
use crate::resolver::ResolutionIssue;
use crate::tests::integration::common::{fixture, id, plugin, record_events, running};

#[test]
fn test_hook_failure_fails_apply_but_not_independent_branches() {
    let mut f = fixture(vec![plugin(1), plugin(2), plugin(3)]);
    f.host.fail_on(id(2), HookPhase::Start);
    for n in 1..=3 {
        f.layer.require_plugin(id(n), RunningRequirement::MustExistAndRun);
    }

    let report = f.runner.apply_report();
    assert!(!report.success);
    assert!(!f.runner.is_plugin_running(&id(2)));
    assert_eq!(running(&f.runner), HashSet::from([id(1), id(3)]));
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, id(2));
}

#[test]
fn test_consumer_of_failed_provider_is_not_started() {
    let mut consumer = plugin(1);
    consumer.requires_service("storage", RunningRequirement::MustExistAndRun);
    let mut provider = plugin(2);
    provider.implements("storage");
    let mut f = fixture(vec![consumer, provider]);
    let events = record_events(&mut f.runner);
    f.host.fail_on(id(2), HookPhase::Setup);
    f.layer.require_plugin(id(1), RunningRequirement::MustExistAndRun);

    assert!(!f.runner.apply());
    assert_eq!(f.host.calls(), vec![(HookPhase::Setup, id(2))]);
    assert_eq!(
        f.runner.failure(&id(1)),
        Some(&FailureReason::DependencyFailed { provider: id(2) })
    );
    assert!(events.lock().iter().any(|event| matches!(
        event,
        ActivationEvent::StartFailed { plugin, .. } if *plugin == id(2)
    )));
    assert!(events.lock().iter().any(|event| matches!(
        event,
        ActivationEvent::Blocked { plugin, .. } if *plugin == id(1)
    )));
}

#[test]
fn test_recovered_provider_unblocks_consumer() {
    let mut consumer = plugin(1);
    consumer.requires_service("storage", RunningRequirement::MustExistAndRun);
    let mut provider = plugin(2);
    provider.implements("storage");
    let mut f = fixture(vec![consumer, provider]);
    f.host.fail_on(id(2), HookPhase::Start);
    f.layer.require_plugin(id(1), RunningRequirement::MustExistAndRun);
    assert!(!f.runner.apply());

    f.host.heal(&id(2));
    f.runner.clear_failures();
    assert!(f.runner.apply());
    assert_eq!(running(&f.runner), HashSet::from([id(1), id(2)]));
}

#[test]
fn test_unresolved_service_leaves_unrelated_plugins_alone() {
    let mut consumer = plugin(1);
    consumer.requires_service("missing", RunningRequirement::MustExist);
    let mut f = fixture(vec![consumer, plugin(2)]);
    f.layer.require_plugin(id(1), RunningRequirement::MustExistAndRun);
    f.layer.require_plugin(id(2), RunningRequirement::MustExistAndRun);

    let report = f.runner.apply_report();
    assert!(!report.success);
    assert_eq!(running(&f.runner), HashSet::from([id(2)]));
    assert_eq!(f.runner.plugin_state(&id(1)), PluginState::Failed);
    assert!(report.issues.iter().any(|issue| matches!(
        issue,
        ResolutionIssue::UnresolvedService { owner: Some(owner), .. } if *owner == id(1)
    )));
    assert!(!f.host.started().contains(&id(1)));
}

#[test]
fn test_registering_missing_provider_resolves_consumer() {
    let mut consumer = plugin(1);
    consumer.requires_service("missing", RunningRequirement::MustExistAndRun);
    let mut f = fixture(vec![consumer]);
    f.layer.require_plugin(id(1), RunningRequirement::MustExistAndRun);
    assert!(!f.runner.apply());

    let mut provider = plugin(2);
    provider.implements("missing");
    f.runner.discoverer_mut().register(provider).unwrap();

    assert!(f.runner.apply());
    assert_eq!(f.host.started(), vec![id(2), id(1)]);
    assert_eq!(f.runner.failure(&id(1)), None);
}

#[test]
fn test_layer_demand_on_missing_service_fails_apply() {
    let mut f = fixture(vec![plugin(1)]);
    f.layer.require_service("missing", RunningRequirement::MustExist);
    assert!(!f.runner.apply());

    f.layer.require_service("missing", RunningRequirement::OptionalTryStart);
    assert!(f.runner.apply());
}

#[test]
fn test_blocked_consumer_does_not_start_its_other_providers() {
    let mut consumer = plugin(1);
    consumer.requires_service("storage", RunningRequirement::MustExistAndRun);
    consumer.requires_service("missing", RunningRequirement::MustExistAndRun);
    let mut provider = plugin(2);
    provider.implements("storage");
    let mut f = fixture(vec![consumer, provider]);
    f.layer.require_plugin(id(1), RunningRequirement::MustExistAndRun);

    assert!(!f.runner.apply());
    assert!(f.host.calls().is_empty());
    assert!(running(&f.runner).is_empty());
    assert!(matches!(
        f.runner.failure(&id(1)),
        Some(FailureReason::Unresolved(ResolutionIssue::UnresolvedService { .. }))
    ));

    let mut late = plugin(3);
    late.implements("missing");
    f.runner.discoverer_mut().register(late).unwrap();
    assert!(f.runner.apply());
    assert_eq!(running(&f.runner), HashSet::from([id(1), id(2), id(3)]));
}
