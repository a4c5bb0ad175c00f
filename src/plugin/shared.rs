//! Thread-safe handle to a [`PluginManager`]
//!
//! The manager assumes one caller at a time. Hosts that call `load` from
//! more than one thread go through this wrapper instead.

use crate::core::sync::handle_mutex_poison;
use crate::plugin::error::{PluginError, PluginResult};
use crate::plugin::manager::PluginManager;
use crate::plugin::registry::{DescriptorList, ManifestSource};
use crate::plugin::traits::UiEngine;
use crate::plugin::types::PluginStatus;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Clone)]
pub struct SharedPluginManager {
    inner: Arc<Mutex<PluginManager>>,
}

impl SharedPluginManager {
    pub fn new(manager: PluginManager) -> Self {
        Self {
            inner: Arc::new(Mutex::new(manager)),
        }
    }

    /// Exclusive access to the wrapped manager
    pub fn lock(&self) -> PluginResult<MutexGuard<'_, PluginManager>> {
        handle_mutex_poison(self.inner.lock(), |message| PluginError::LockPoisoned {
            message,
        })
    }

    pub fn load_manifest(&self, source: &ManifestSource) -> PluginResult<DescriptorList> {
        Ok(self.lock()?.load_manifest(source))
    }

    pub fn set_engine(&self, engine: Arc<dyn UiEngine>) -> PluginResult<()> {
        self.lock()?.set_engine(engine);
        Ok(())
    }

    /// Same contract as [`PluginManager::load`]; a poisoned lock counts as
    /// a failed load.
    pub fn load(&self, plugin_path: &Path) -> bool {
        match self.lock() {
            Ok(mut manager) => manager.load(plugin_path),
            Err(e) => {
                log::error!("Cannot load {}: {}", plugin_path.display(), e);
                false
            }
        }
    }

    pub fn status(&self, plugin_path: &Path) -> PluginResult<PluginStatus> {
        Ok(self.lock()?.status(plugin_path))
    }

    pub fn loaded_paths(&self) -> PluginResult<Vec<PathBuf>> {
        Ok(self.lock()?.loaded_paths())
    }

    /// Shut the manager down, recovering it from a poisoned lock so that
    /// teardown always runs.
    pub fn shutdown(&self) {
        let mut manager = match self.inner.lock() {
            Ok(manager) => manager,
            Err(poisoned) => {
                log::warn!("Plugin manager lock poisoned; shutting down anyway");
                poisoned.into_inner()
            }
        };
        manager.shutdown();
    }
}

impl std::fmt::Debug for SharedPluginManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedPluginManager").finish_non_exhaustive()
    }
}
