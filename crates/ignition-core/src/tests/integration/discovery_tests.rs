use std::collections::HashSet;
use std::fs;

use tempfile::tempdir;

use crate::activation::PluginRunner;
use crate::config::format::TierDocument;
use crate::config::status::{ConfigPluginStatus, ConfigUserAction};
use crate::config::store::{ConfigTier, ConfigurationStore};
use crate::kernel::error::Result;
use crate::plugin_system::discovery::{Discoverer, PluginCatalog};
use crate::plugin_system::id::PluginId;
use crate::tests::integration::common::{running, RecordingHost};

const KEYBOARD: &str = "00000000-0000-0000-0000-000000000101";
const LAYOUT: &str = "00000000-0000-0000-0000-000000000102";
const SOUND: &str = "00000000-0000-0000-0000-000000000103";

fn pid(text: &str) -> PluginId {
    text.parse().expect("valid test id")
}

#[test]
fn test_manifests_and_tiers_drive_activation() -> Result<()> {
    let dir = tempdir().expect("Failed to create temp directory");
    let plugins = dir.path().join("plugins");
    fs::create_dir_all(plugins.join("extras")).expect("Failed to create plugin directories");

    fs::write(
        plugins.join("keyboard.plugin.json"),
        format!(
            r#"{{
                "id": "{KEYBOARD}",
                "name": "keyboard",
                "version": "1.0.0",
                "requires_services": [{{ "service": "layout" }}]
            }}"#
        ),
    )
    .expect("Failed to write manifest");
    fs::write(
        plugins.join("layout.plugin.toml"),
        format!("id = \"{LAYOUT}\"\nname = \"layout\"\nversion = \"1.0.0\"\nservices = [\"layout\"]\n"),
    )
    .expect("Failed to write manifest");
    fs::write(
        plugins.join("extras").join("sound.plugin.yaml"),
        format!("id: \"{SOUND}\"\nname: sound\nversion: \"0.2.0\"\n"),
    )
    .expect("Failed to write manifest");

    let mut system = TierDocument::new();
    system.plugins.insert(pid(KEYBOARD), ConfigPluginStatus::AutomaticStart);
    system.plugins.insert(pid(SOUND), ConfigPluginStatus::AutomaticStart);
    system.save(&dir.path().join("system.toml"))?;
    let mut user = TierDocument::new();
    user.plugins.insert(pid(SOUND), ConfigPluginStatus::Disabled);
    user.save(&dir.path().join("user.json"))?;

    let config = ConfigurationStore::new();
    config.load_tier(ConfigTier::System, &dir.path().join("system.toml"))?;
    config.load_tier(ConfigTier::User, &dir.path().join("user.json"))?;

    let host = RecordingHost::new();
    let mut runner = PluginRunner::new(PluginCatalog::new(), host.clone(), config.clone());
    assert_eq!(runner.discoverer_mut().discover(&plugins, true)?, 3);
    assert_eq!(runner.discoverer().plugins().len(), 3);

    assert!(runner.apply());
    assert_eq!(running(&runner), HashSet::from([pid(KEYBOARD), pid(LAYOUT)]));
    assert_eq!(host.started(), vec![pid(LAYOUT), pid(KEYBOARD)]);

    // The live user cannot override the administrator's Disabled
    config.set_action(pid(SOUND), ConfigUserAction::Started);
    assert!(!runner.is_dirty());

    config.clear_tier(ConfigTier::User);
    assert!(runner.is_dirty());
    assert!(runner.apply());
    assert!(runner.is_plugin_running(&pid(SOUND)));
    Ok(())
}

#[test]
fn test_flat_discovery_misses_nested_provider() -> Result<()> {
    let dir = tempdir().expect("Failed to create temp directory");
    fs::create_dir_all(dir.path().join("nested")).expect("Failed to create plugin directories");
    fs::write(
        dir.path().join("keyboard.plugin.json"),
        format!(r#"{{ "id": "{KEYBOARD}", "name": "keyboard", "version": "1.0.0", "requires_services": [{{ "service": "layout" }}] }}"#),
    )
    .expect("Failed to write manifest");
    fs::write(
        dir.path().join("nested").join("layout.plugin.json"),
        format!(r#"{{ "id": "{LAYOUT}", "name": "layout", "version": "1.0.0", "services": ["layout"] }}"#),
    )
    .expect("Failed to write manifest");

    let config = ConfigurationStore::new();
    config.set_action(pid(KEYBOARD), ConfigUserAction::Started);
    let mut runner = PluginRunner::new(PluginCatalog::new(), RecordingHost::new(), config);

    assert_eq!(runner.discoverer_mut().discover(dir.path(), false)?, 1);
    assert!(!runner.apply());
    assert!(!runner.is_plugin_running(&pid(KEYBOARD)));

    assert_eq!(runner.discoverer_mut().discover(dir.path(), true)?, 1);
    assert!(runner.apply());
    assert!(runner.is_plugin_running(&pid(KEYBOARD)));
    Ok(())
}
