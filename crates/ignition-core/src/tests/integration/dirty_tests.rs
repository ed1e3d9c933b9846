use crate::config::status::{ConfigPluginStatus, ConfigUserAction};
use crate::config::store::ConfigTier;
use crate::requirements::{RequirementLayer, RunningRequirement};
use crate::tests::integration::common::{fixture, id, plugin};

#[test]
fn test_clean_after_successful_apply() {
    let mut f = fixture(vec![plugin(1)]);
    assert!(!f.runner.is_dirty());

    f.layer.require_plugin(id(1), RunningRequirement::MustExistAndRun);
    assert!(f.runner.is_dirty());
    assert!(f.runner.apply());
    assert!(!f.runner.is_dirty());
}

#[test]
fn test_clean_after_failed_apply() {
    let mut f = fixture(vec![plugin(1)]);
    f.host.fail_on(id(1), crate::plugin_system::host::HookPhase::Setup);
    f.layer.require_plugin(id(1), RunningRequirement::MustExistAndRun);
    assert!(!f.runner.apply());
    assert!(!f.runner.is_dirty());
}

#[test]
fn test_config_change_altering_target_is_dirty() {
    let mut f = fixture(vec![plugin(1)]);
    f.config.set_status(ConfigTier::System, id(1), ConfigPluginStatus::AutomaticStart);
    assert!(f.runner.apply());

    f.config.set_action(id(1), ConfigUserAction::Stopped);
    assert!(f.runner.is_dirty());

    // Undoing the change before the next apply leaves nothing to do
    f.config.clear_action(&id(1));
    assert!(!f.runner.is_dirty());
}

#[test]
fn test_change_that_keeps_targets_is_clean() {
    let mut f = fixture(vec![plugin(1), plugin(2)]);
    f.config.set_status(ConfigTier::System, id(1), ConfigPluginStatus::AutomaticStart);
    assert!(f.runner.apply());

    // Same target, different reason
    f.config.set_status(ConfigTier::User, id(1), ConfigPluginStatus::AutomaticStart);
    assert!(!f.runner.is_dirty());

    // Optional demand on an unconfigured plugin changes nothing to activate
    f.layer.require_plugin(id(2), RunningRequirement::Optional);
    assert!(!f.runner.is_dirty());
}

#[test]
fn test_layer_membership_and_handle_edits_are_seen() {
    let mut f = fixture(vec![plugin(1)]);
    let extra = RequirementLayer::new("extra");
    f.runner.add_layer(extra.clone());
    assert!(!f.runner.is_dirty());

    extra.require_plugin(id(1), RunningRequirement::MustExistAndRun);
    assert!(f.runner.is_dirty());
    assert!(f.runner.apply());
    assert!(!f.runner.is_dirty());

    f.runner.remove_layer("extra");
    assert!(f.runner.is_dirty());
}

#[test]
fn test_discovery_change_is_seen() {
    let mut f = fixture(vec![plugin(1)]);
    f.config.set_status(ConfigTier::System, id(2), ConfigPluginStatus::AutomaticStart);
    assert!(f.runner.apply());
    assert!(!f.runner.is_dirty());

    f.runner.discoverer_mut().register(plugin(2)).unwrap();
    assert!(f.runner.is_dirty());
    assert!(f.runner.apply());
    assert!(f.runner.is_plugin_running(&id(2)));
}

#[test]
fn test_repeated_queries_agree() {
    let f = fixture(vec![plugin(1)]);
    f.layer.require_plugin(id(1), RunningRequirement::MustExistAndRun);
    assert!(f.runner.is_dirty());
    assert!(f.runner.is_dirty());
    f.layer.release_plugin(&id(1));
    assert!(!f.runner.is_dirty());
}
