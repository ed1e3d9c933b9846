use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use log::{debug, info, warn};
use semver::Version;
use serde::Deserialize;

use crate::config::format::ConfigFormat;
use crate::kernel::constants::MANIFEST_SUFFIX;
use crate::kernel::error::Result;
use crate::kernel::next_revision;
use crate::plugin_system::descriptor::PluginDescriptor;
use crate::plugin_system::error::PluginSystemError;
use crate::plugin_system::id::PluginId;
use crate::requirements::RunningRequirement;

/// Source of plugin descriptors consumed by the activation engine
pub trait Discoverer: Send + Sync {
    /// Scan `path` for plugins and add them to the known set.
    /// Returns how many new plugins were found.
    fn discover(&mut self, path: &Path, recursive: bool) -> Result<usize>;

    /// Look up a known plugin
    fn find_plugin(&self, id: &PluginId) -> Option<&PluginDescriptor>;

    /// All known plugins, in discovery order
    fn plugins(&self) -> Vec<&PluginDescriptor>;

    /// Changes whenever the known set changes
    fn generation(&self) -> u64;
}

// --- Intermediate structs for deserialization ---

fn default_reference_requirement() -> RunningRequirement {
    RunningRequirement::MustExistAndRun
}

#[derive(Deserialize, Debug)]
struct RawServiceReference {
    service: String,
    #[serde(default = "default_reference_requirement")]
    requirement: RunningRequirement,
}

#[derive(Deserialize, Debug)]
struct RawPluginReference {
    plugin: String,
    #[serde(default = "default_reference_requirement")]
    requirement: RunningRequirement,
}

#[derive(Deserialize, Debug)]
struct RawPluginManifest {
    id: String,
    name: String,
    version: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    services: Vec<String>,
    #[serde(default)]
    requires_services: Vec<RawServiceReference>,
    #[serde(default)]
    requires_plugins: Vec<RawPluginReference>,
}

// --- End Intermediate structs ---

/// In-memory plugin catalog.
///
/// Plugins get in either by static registration ([`register`](Self::register))
/// or by scanning a directory for manifest files
/// ([`discover`](Discoverer::discover)). A manifest is any file named
/// `<anything>.plugin.<json|yaml|yml|toml>`.
#[derive(Debug, Default)]
pub struct PluginCatalog {
    plugins: Vec<PluginDescriptor>,
    index: HashMap<PluginId, usize>,
    generation: u64,
}

impl PluginCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a descriptor. Ids are unique; the first registration wins.
    pub fn register(&mut self, descriptor: PluginDescriptor) -> std::result::Result<(), PluginSystemError> {
        if self.index.contains_key(&descriptor.id) {
            return Err(PluginSystemError::RegistrationError {
                plugin_id: descriptor.id,
                message: format!("Plugin already registered: {}", descriptor.name),
            });
        }
        debug!("Registered plugin {}", descriptor);
        self.index.insert(descriptor.id, self.plugins.len());
        self.plugins.push(descriptor);
        self.generation = next_revision();
        Ok(())
    }

    /// Remove a descriptor, returning it if it was known
    pub fn unregister(&mut self, id: &PluginId) -> Option<PluginDescriptor> {
        let position = self.index.remove(id)?;
        let removed = self.plugins.remove(position);
        for slot in self.index.values_mut() {
            if *slot > position {
                *slot -= 1;
            }
        }
        self.generation = next_revision();
        Some(removed)
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Whether `path` names a manifest file
    pub fn is_manifest_path(path: &Path) -> bool {
        if ConfigFormat::from_path(path).is_none() {
            return false;
        }
        path.file_stem()
            .and_then(|stem| stem.to_str())
            .is_some_and(|stem| stem.ends_with(MANIFEST_SUFFIX) && stem.len() > MANIFEST_SUFFIX.len())
    }

    /// Read and validate a single manifest file
    pub fn load_manifest(path: &Path) -> std::result::Result<PluginDescriptor, PluginSystemError> {
        let format = ConfigFormat::from_path(path)
            .ok_or_else(|| PluginSystemError::UnsupportedManifestFormat(path.to_path_buf()))?;

        let content = fs::read_to_string(path)
            .map_err(|e| PluginSystemError::io(e, "read_manifest", path.to_path_buf()))?;

        let raw: RawPluginManifest = format.parse(&content).map_err(|e| PluginSystemError::ManifestError {
            path: path.to_path_buf(),
            message: format!("Failed to parse {} manifest", format.extension()),
            source: Some(Box::new(e)),
        })?;

        let id = PluginId::from_str(&raw.id).map_err(|e| PluginSystemError::ManifestError {
            path: path.to_path_buf(),
            message: format!("Invalid plugin id '{}'", raw.id),
            source: Some(Box::new(e)),
        })?;

        let version = Version::parse(&raw.version).map_err(|e| PluginSystemError::ManifestError {
            path: path.to_path_buf(),
            message: format!("Invalid version '{}'", raw.version),
            source: Some(Box::new(e)),
        })?;

        let mut descriptor = PluginDescriptor::new(id, &raw.name);
        descriptor.set_version(version);
        if let Some(description) = raw.description {
            descriptor.set_description(&description);
        }
        for service in raw.services {
            descriptor.implements(service);
        }
        for reference in raw.requires_services {
            descriptor.requires_service(reference.service, reference.requirement);
        }
        for reference in raw.requires_plugins {
            let plugin = PluginId::from_str(&reference.plugin).map_err(|e| PluginSystemError::ManifestError {
                path: path.to_path_buf(),
                message: format!("Invalid required plugin id '{}'", reference.plugin),
                source: Some(Box::new(e)),
            })?;
            descriptor.requires_plugin(plugin, reference.requirement);
        }

        Ok(descriptor)
    }

    fn scan_directory(
        &mut self,
        dir: &Path,
        recursive: bool,
        found: &mut usize,
    ) -> std::result::Result<(), PluginSystemError> {
        let read_dir = fs::read_dir(dir).map_err(|e| PluginSystemError::io(e, "read_dir", dir.to_path_buf()))?;

        let mut entries: Vec<PathBuf> = Vec::new();
        for entry in read_dir {
            let entry = entry.map_err(|e| PluginSystemError::io(e, "read_dir_entry", dir.to_path_buf()))?;
            entries.push(entry.path());
        }
        // Directory iteration order is platform dependent; discovery order is not.
        entries.sort();

        for entry_path in entries {
            if entry_path.is_dir() {
                if recursive {
                    if let Err(e) = self.scan_directory(&entry_path, recursive, found) {
                        warn!("Error scanning subdirectory {}: {}", entry_path.display(), e);
                    }
                }
                continue;
            }

            if !Self::is_manifest_path(&entry_path) {
                continue;
            }

            match Self::load_manifest(&entry_path) {
                Ok(descriptor) => match self.register(descriptor) {
                    Ok(()) => *found += 1,
                    Err(e) => warn!("Skipping manifest {}: {}", entry_path.display(), e),
                },
                Err(e) => warn!("Error loading manifest from {}: {}", entry_path.display(), e),
            }
        }

        Ok(())
    }
}

impl Discoverer for PluginCatalog {
    fn discover(&mut self, path: &Path, recursive: bool) -> Result<usize> {
        if !path.is_dir() {
            return Err(PluginSystemError::NotADirectory(path.to_path_buf()).into());
        }
        let mut found = 0;
        self.scan_directory(path, recursive, &mut found)?;
        info!("Discovered {} plugin(s) in {}", found, path.display());
        Ok(found)
    }

    fn find_plugin(&self, id: &PluginId) -> Option<&PluginDescriptor> {
        self.index.get(id).map(|&position| &self.plugins[position])
    }

    fn plugins(&self) -> Vec<&PluginDescriptor> {
        self.plugins.iter().collect()
    }

    fn generation(&self) -> u64 {
        self.generation
    }
}
