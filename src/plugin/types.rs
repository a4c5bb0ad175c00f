//! Type definitions for the plugin system
//!
//! Descriptors come from the manifest and are never mutated after load.
//! The remaining types describe the shape of a bound module and the
//! lifecycle state the manager holds for one plugin path.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

fn default_enabled() -> bool {
    true
}

/// One manifest entry, exposed read-only to the UI layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginDescriptor {
    #[serde(default)]
    pub id: String,
    /// Display name
    #[serde(default, rename = "name")]
    pub display_name: String,
    /// Plugin directory; also the key the manager uses for `load`
    pub path: PathBuf,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, rename = "icon")]
    pub icon_ref: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl PluginDescriptor {
    /// Descriptor with only a path; everything else defaulted
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            id: String::new(),
            display_name: String::new(),
            path: path.into(),
            version: String::new(),
            description: String::new(),
            icon_ref: String::new(),
            enabled: true,
        }
    }

    /// Name to show in listings: display name, then id, then the directory name
    pub fn label(&self) -> String {
        if !self.display_name.is_empty() {
            self.display_name.clone()
        } else if !self.id.is_empty() {
            self.id.clone()
        } else {
            module_base_name(&self.path)
        }
    }
}

/// Capability flags a bound module reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ModuleCapabilities {
    /// Module exports a type/registration installer
    pub installer: bool,
    /// Module exports a zero-argument instance factory
    pub factory: bool,
}

/// Lifecycle state held for one plugin path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PluginStatus {
    pub bound: bool,
    /// The module's installer ran; false when it exports none
    pub registration_completed: bool,
    pub instantiated: bool,
    pub worker_running: bool,
}

/// Base name of a plugin directory, used as the module namespace
pub fn module_base_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

/// Key under which all per-plugin state is stored.
///
/// Lexically absolute so that `plugins/calc` and `./plugins/calc` share one
/// entry; the directory does not have to exist yet.
pub fn plugin_key(path: &Path) -> PathBuf {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    absolute.components().collect()
}
