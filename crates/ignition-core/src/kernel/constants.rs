/// Application name
pub const APP_NAME: &str = "Ignition";

/// Application version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Suffix shared by every plugin manifest file, before the format extension
/// (`audio.plugin.toml`, `net.plugin.json`, ...)
pub const MANIFEST_SUFFIX: &str = ".plugin";
