//! Manifest Registry
//!
//! Reads the plugin manifest and publishes the enabled descriptors, in file
//! order, to anyone subscribed (normally the UI engine). A manifest that
//! cannot be read leaves the host running with zero plugins.

use crate::plugin::error::{PluginError, PluginResult};
use crate::plugin::error_handling::log_plugin_error_with_context;
use crate::plugin::types::PluginDescriptor;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::watch;

/// Snapshot of the descriptor list handed to subscribers
pub type DescriptorList = Arc<Vec<PluginDescriptor>>;

/// Serialization format of a manifest
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestFormat {
    Json,
    Toml,
}

impl ManifestFormat {
    /// `.toml` files are TOML; everything else is read as JSON
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => ManifestFormat::Toml,
            _ => ManifestFormat::Json,
        }
    }
}

/// Where a manifest comes from
#[derive(Debug, Clone)]
pub enum ManifestSource {
    File(PathBuf),
    Inline { text: String, format: ManifestFormat },
}

impl ManifestSource {
    fn name(&self) -> String {
        match self {
            ManifestSource::File(path) => path.display().to_string(),
            ManifestSource::Inline { .. } => "<inline>".to_string(),
        }
    }
}

/// Top-level manifest shape: `{"modules": [...]}` or `[[plugins]]`
#[derive(Debug, Deserialize)]
struct ManifestDocument {
    #[serde(alias = "modules")]
    plugins: Vec<PluginDescriptor>,
}

/// Parse a manifest and keep only the enabled entries, preserving order
pub fn try_load_config(source: &ManifestSource) -> PluginResult<Vec<PluginDescriptor>> {
    let source_name = source.name();
    let unreadable = |cause: String| PluginError::ConfigUnreadable {
        source_name: source_name.clone(),
        cause,
    };

    let (text, format) = match source {
        ManifestSource::File(path) => {
            let text = std::fs::read_to_string(path).map_err(|e| unreadable(e.to_string()))?;
            (text, ManifestFormat::from_path(path))
        }
        ManifestSource::Inline { text, format } => (text.clone(), *format),
    };

    let document: ManifestDocument = match format {
        ManifestFormat::Json => serde_json::from_str(&text).map_err(|e| unreadable(e.to_string()))?,
        ManifestFormat::Toml => toml::from_str(&text).map_err(|e| unreadable(e.to_string()))?,
    };

    let total = document.plugins.len();
    let enabled: Vec<PluginDescriptor> = document
        .plugins
        .into_iter()
        .filter(|descriptor| descriptor.enabled)
        .collect();

    log::debug!(
        "Manifest {}: {} entries, {} enabled",
        source_name,
        total,
        enabled.len()
    );
    Ok(enabled)
}

/// Soft-failing variant of [`try_load_config`]: a read or parse failure is
/// logged and yields an empty list.
pub fn load_config(source: &ManifestSource) -> Vec<PluginDescriptor> {
    match try_load_config(source) {
        Ok(descriptors) => descriptors,
        Err(e) => {
            log_plugin_error_with_context(&e, "Loading plugin manifest");
            Vec::new()
        }
    }
}

/// Holds the current descriptor list and notifies subscribers on change
pub struct ManifestRegistry {
    descriptors: watch::Sender<DescriptorList>,
}

impl ManifestRegistry {
    pub fn new() -> Self {
        let (descriptors, _) = watch::channel(Arc::new(Vec::new()));
        Self { descriptors }
    }

    /// Replace the list with the manifest's enabled entries. Never merges
    /// with the previous list.
    pub fn load(&self, source: &ManifestSource) -> DescriptorList {
        let fresh: DescriptorList = Arc::new(load_config(source));
        log::info!("Loaded {} plugin descriptor(s)", fresh.len());
        self.descriptors.send_replace(fresh.clone());
        fresh
    }

    /// Current snapshot
    pub fn descriptors(&self) -> DescriptorList {
        self.descriptors.borrow().clone()
    }

    /// Change-notifying view of the list
    pub fn subscribe(&self) -> watch::Receiver<DescriptorList> {
        self.descriptors.subscribe()
    }

    /// Drop all descriptors (shutdown)
    pub fn clear(&self) {
        self.descriptors.send_replace(Arc::new(Vec::new()));
    }
}

impl Default for ManifestRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ManifestRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManifestRegistry")
            .field("descriptors", &self.descriptors.borrow().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::error::PluginErrorKind;
    use std::io::Write;

    const JSON_MANIFEST: &str = r#"{
        "modules": [
            {"id": "calculator", "name": "Calculator", "path": "modules/calculator",
             "version": "1.0.0", "description": "Basic arithmetic", "icon": "calc.png"},
            {"id": "serial", "name": "Serial", "path": "modules/serial", "enabled": false},
            {"id": "plotter", "name": "Plotter", "path": "modules/plotter", "enabled": true}
        ]
    }"#;

    fn inline_json(text: &str) -> ManifestSource {
        ManifestSource::Inline {
            text: text.to_string(),
            format: ManifestFormat::Json,
        }
    }

    #[test]
    fn test_disabled_entries_are_filtered_in_order() {
        let descriptors = try_load_config(&inline_json(JSON_MANIFEST)).unwrap();
        let ids: Vec<&str> = descriptors.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["calculator", "plotter"]);
        assert_eq!(descriptors[0].icon_ref, "calc.png");
    }

    #[test]
    fn test_toml_manifest_with_plugins_table() {
        let source = ManifestSource::Inline {
            text: r#"
                [[plugins]]
                id = "calculator"
                path = "modules/calculator"

                [[plugins]]
                id = "serial"
                path = "modules/serial"
                enabled = false
            "#
            .to_string(),
            format: ManifestFormat::Toml,
        };
        let descriptors = try_load_config(&source).unwrap();
        assert_eq!(descriptors.len(), 1);
        assert_eq!(descriptors[0].path, PathBuf::from("modules/calculator"));
    }

    #[test]
    fn test_wrong_shape_is_config_unreadable() {
        let error = try_load_config(&inline_json(r#"{"modules": {"id": "x"}}"#)).unwrap_err();
        assert_eq!(error.kind(), PluginErrorKind::ConfigUnreadable);

        let error = try_load_config(&inline_json(r#"[{"path": "x"}]"#)).unwrap_err();
        assert_eq!(error.kind(), PluginErrorKind::ConfigUnreadable);
    }

    #[test]
    fn test_missing_file_fails_softly() {
        let dir = tempfile::tempdir().unwrap();
        let source = ManifestSource::File(dir.path().join("modules.json"));

        assert!(try_load_config(&source).is_err());
        assert!(load_config(&source).is_empty());
    }

    #[test]
    fn test_format_detected_from_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plugins.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "[[modules]]\npath = \"modules/a\"").unwrap();

        let descriptors = load_config(&ManifestSource::File(path));
        assert_eq!(descriptors.len(), 1);
        assert_eq!(
            ManifestFormat::from_path(Path::new("modules.json")),
            ManifestFormat::Json
        );
    }

    #[test]
    fn test_registry_load_replaces_and_notifies() {
        let registry = ManifestRegistry::new();
        let mut rx = registry.subscribe();

        registry.load(&inline_json(JSON_MANIFEST));
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().len(), 2);

        registry.load(&inline_json(r#"{"modules": [{"path": "modules/only"}]}"#));
        let descriptors = registry.descriptors();
        assert_eq!(descriptors.len(), 1);
        assert_eq!(descriptors[0].path, PathBuf::from("modules/only"));
    }

    #[test]
    fn test_registry_unreadable_manifest_yields_empty_list() {
        let registry = ManifestRegistry::new();
        registry.load(&inline_json(JSON_MANIFEST));
        registry.load(&inline_json("not json"));
        assert!(registry.descriptors().is_empty());
    }

    #[test]
    fn test_registry_clear() {
        let registry = ManifestRegistry::new();
        registry.load(&inline_json(JSON_MANIFEST));
        registry.clear();
        assert!(registry.descriptors().is_empty());
    }
}
