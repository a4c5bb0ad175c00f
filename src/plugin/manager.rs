//! Plugin Manager
//!
//! Owns every piece of per-process plugin state (descriptors, bindings,
//! instances, workers) and is the only entry point the host talks to.
//! `load` never fails loudly: each stage's error is logged and the call
//! returns `false`. `shutdown` tears state down in reverse: workers, then
//! instances, then bindings.

use crate::plugin::binder::PluginBinder;
use crate::plugin::error::{panic_message, PluginError, PluginResult};
use crate::plugin::error_handling::log_plugin_error_with_context;
use crate::plugin::instances::InstanceManager;
use crate::plugin::native::NativeLoader;
use crate::plugin::registry::{DescriptorList, ManifestRegistry, ManifestSource};
use crate::plugin::resolver::{default_artifact_patterns, ArtifactResolver};
use crate::plugin::traits::{ModuleLoader, PluginInstance, UiEngine};
use crate::plugin::types::{plugin_key, PluginStatus};
use crate::plugin::worker::WorkerSupervisor;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Default bound on how long shutdown waits for each worker
pub const DEFAULT_WORKER_STOP_TIMEOUT: Duration = Duration::from_secs(10);

/// Manager-relevant part of the host configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagerSettings {
    /// File-name globs identifying a plugin artifact
    pub artifact_patterns: Vec<String>,
    /// `None` waits for workers indefinitely
    pub worker_stop_timeout: Option<Duration>,
}

impl Default for ManagerSettings {
    fn default() -> Self {
        Self {
            artifact_patterns: default_artifact_patterns(),
            worker_stop_timeout: Some(DEFAULT_WORKER_STOP_TIMEOUT),
        }
    }
}

// Field order matters on drop: instances and workers go before the
// bindings whose code they run.
pub struct PluginManager {
    workers: WorkerSupervisor,
    instances: InstanceManager,
    binder: PluginBinder,
    registry: ManifestRegistry,
    engine: Option<Arc<dyn UiEngine>>,
}

impl PluginManager {
    /// Manager that loads artifacts as native shared libraries
    pub fn new(settings: ManagerSettings) -> Self {
        Self::with_loader(settings, Box::new(NativeLoader::new()))
    }

    /// Manager with a custom artifact loader
    pub fn with_loader(settings: ManagerSettings, loader: Box<dyn ModuleLoader>) -> Self {
        let resolver = ArtifactResolver::new(&settings.artifact_patterns);
        Self {
            workers: WorkerSupervisor::new(settings.worker_stop_timeout),
            instances: InstanceManager::new(),
            binder: PluginBinder::new(loader, resolver),
            registry: ManifestRegistry::new(),
            engine: None,
        }
    }

    /// Replace the descriptor list from a manifest and notify the engine
    pub fn load_manifest(&self, source: &ManifestSource) -> DescriptorList {
        let descriptors = self.registry.load(source);
        if let Some(engine) = &self.engine {
            engine.plugins_changed(&descriptors);
        }
        descriptors
    }

    pub fn descriptors(&self) -> DescriptorList {
        self.registry.descriptors()
    }

    /// Change-notifying view of the descriptor list for the UI layer
    pub fn subscribe_descriptors(&self) -> watch::Receiver<DescriptorList> {
        self.registry.subscribe()
    }

    /// Attach the UI engine; it immediately receives the current list
    pub fn set_engine(&mut self, engine: Arc<dyn UiEngine>) {
        log::debug!("Attaching UI engine '{}'", engine.name());
        engine.plugins_changed(&self.registry.descriptors());
        self.engine = Some(engine);
    }

    pub fn engine(&self) -> Option<Arc<dyn UiEngine>> {
        self.engine.clone()
    }

    /// Bind, instantiate and (if requested) start a worker for the plugin
    /// at `plugin_path`. Returns `false` on any failure; a later call
    /// resumes from the first stage that did not complete.
    pub fn load(&mut self, plugin_path: &Path) -> bool {
        let key = plugin_key(plugin_path);
        log::debug!("Loading plugin {}", key.display());

        let outcome = catch_unwind(AssertUnwindSafe(|| self.run_load_stages(&key)));
        let ok = match outcome {
            Ok(Ok(())) => {
                log::info!("Plugin {} loaded", key.display());
                true
            }
            Ok(Err(e)) => {
                log_plugin_error_with_context(&e, &format!("Loading plugin {}", key.display()));
                false
            }
            Err(payload) => {
                log::error!(
                    "Loading plugin {} {}",
                    key.display(),
                    panic_message(payload.as_ref())
                );
                false
            }
        };

        if let Some(engine) = &self.engine {
            engine.plugin_loaded(&key, ok);
        }
        ok
    }

    fn run_load_stages(&mut self, key: &Path) -> PluginResult<()> {
        self.binder.bind(key)?;
        self.instances
            .ensure_instance(&mut self.binder, &mut self.workers, key)
    }

    /// Load every enabled descriptor in manifest order
    pub fn load_all(&mut self) -> Vec<(PathBuf, bool)> {
        let descriptors = self.registry.descriptors();
        descriptors
            .iter()
            .map(|descriptor| (descriptor.path.clone(), self.load(&descriptor.path)))
            .collect()
    }

    pub fn status(&self, plugin_path: &Path) -> PluginStatus {
        let key = plugin_key(plugin_path);
        PluginStatus {
            bound: self.binder.is_bound(&key),
            registration_completed: self.binder.registration_completed(&key),
            instantiated: self.instances.contains(&key),
            worker_running: self.workers.has_worker(&key),
        }
    }

    /// Instantiated plugin paths in creation order
    pub fn loaded_paths(&self) -> Vec<PathBuf> {
        self.instances.paths().to_vec()
    }

    /// Run `job` against the plugin's instance on whichever thread owns it.
    ///
    /// Host-owned instances run the job before this returns; worker-owned
    /// ones queue it on the worker.
    pub fn dispatch<F>(&mut self, plugin_path: &Path, job: F) -> PluginResult<()>
    where
        F: FnOnce(&mut dyn PluginInstance) + Send + 'static,
    {
        let key = plugin_key(plugin_path);
        if self.instances.is_on_worker(&key) {
            return self.workers.dispatch(&key, Box::new(job));
        }
        let instance = self
            .instances
            .local_mut(&key)
            .ok_or_else(|| PluginError::NotLoaded {
                plugin_path: key.clone(),
            })?;
        catch_unwind(AssertUnwindSafe(|| job(instance))).map_err(|payload| {
            PluginError::DispatchFailed {
                plugin_path: key.clone(),
                cause: panic_message(payload.as_ref()),
            }
        })
    }

    /// True if nothing is bound, instantiated or running
    pub fn is_idle(&self) -> bool {
        self.workers.is_empty() && self.instances.is_empty() && self.binder.is_empty()
    }

    /// Tear down all plugin state. Safe to call repeatedly and with any
    /// subset of plugins loaded.
    pub fn shutdown(&mut self) {
        log::info!(
            "Shutting down plugins: {} worker(s), {} instance(s), {} binding(s)",
            self.workers.len(),
            self.instances.len(),
            self.binder.len()
        );

        let mut pinned = Vec::new();
        for stopped in self.workers.stop_all() {
            match stopped.outcome {
                Ok(instance) => self.instances.reclaim(&stopped.plugin_path, instance),
                Err(e) => log_plugin_error_with_context(&e, "Stopping plugin worker"),
            }
            if stopped.detached {
                pinned.push(stopped.plugin_path);
            }
        }

        for path in self.instances.cleanup_all() {
            log::debug!("{} left without cleanup", path.display());
        }
        self.binder.release_all(&pinned);
        self.registry.clear();

        if let Some(engine) = self.engine.take() {
            log::debug!("Detached UI engine '{}'", engine.name());
        }
    }
}

impl Drop for PluginManager {
    fn drop(&mut self) {
        if !self.is_idle() {
            log::warn!("Plugin manager dropped without shutdown; tearing down now");
            self.shutdown();
        }
    }
}

impl std::fmt::Debug for PluginManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginManager")
            .field("registry", &self.registry)
            .field("binder", &self.binder)
            .field("instances", &self.instances)
            .field("workers", &self.workers)
            .field("engine", &self.engine.as_ref().map(|e| e.name().to_string()))
            .finish()
    }
}
