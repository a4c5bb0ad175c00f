//! Console stand-in for a UI engine
//!
//! The binary has no graphical front end; this engine reports what a UI
//! would render through the log.

use crate::plugin::api::{PluginDescriptor, UiEngine};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Default)]
pub struct ConsoleEngine {
    loaded: AtomicUsize,
    failed: AtomicUsize,
}

impl ConsoleEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// (loaded, failed) notifications received so far
    pub fn totals(&self) -> (usize, usize) {
        (
            self.loaded.load(Ordering::Relaxed),
            self.failed.load(Ordering::Relaxed),
        )
    }
}

impl UiEngine for ConsoleEngine {
    fn name(&self) -> &str {
        "console"
    }

    fn plugins_changed(&self, descriptors: &[PluginDescriptor]) {
        log::info!("{} plugin(s) available", descriptors.len());
        for descriptor in descriptors {
            log::debug!(
                "  {} {} ({})",
                descriptor.label(),
                descriptor.version,
                descriptor.path.display()
            );
        }
    }

    fn plugin_loaded(&self, plugin_path: &Path, ok: bool) {
        if ok {
            self.loaded.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed.fetch_add(1, Ordering::Relaxed);
            log::warn!("Plugin {} is unavailable", plugin_path.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_totals_count_results() {
        let engine = ConsoleEngine::new();
        engine.plugin_loaded(Path::new("modules/a"), true);
        engine.plugin_loaded(Path::new("modules/b"), false);
        engine.plugin_loaded(Path::new("modules/c"), true);
        assert_eq!(engine.totals(), (2, 1));
        assert_eq!(engine.name(), "console");
    }
}
