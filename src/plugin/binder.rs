//! Plugin Binder
//!
//! Loads a plugin's artifact and runs its registration entry point once.
//! A binding is cached only after registration succeeded (or the module
//! has nothing to register), so a failed bind is retried from scratch.

use crate::plugin::error::{panic_message, PluginError, PluginResult};
use crate::plugin::resolver::{ArtifactResolver, Resolution};
use crate::plugin::traits::{ModuleLoader, PluginModule};
use crate::plugin::types::module_base_name;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};

struct Binding {
    module: Box<dyn PluginModule>,
    module_name: String,
    artifact: PathBuf,
    registration_completed: bool,
}

pub struct PluginBinder {
    loader: Box<dyn ModuleLoader>,
    resolver: ArtifactResolver,
    search_paths: Vec<PathBuf>,
    bindings: HashMap<PathBuf, Binding>,
    order: Vec<PathBuf>,
}

impl PluginBinder {
    pub fn new(loader: Box<dyn ModuleLoader>, resolver: ArtifactResolver) -> Self {
        Self {
            loader,
            resolver,
            search_paths: Vec::new(),
            bindings: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Bind the plugin at `plugin_path` (a canonical key).
    ///
    /// Already-bound paths return immediately without touching the loader.
    pub fn bind(&mut self, plugin_path: &Path) -> PluginResult<()> {
        if self.bindings.contains_key(plugin_path) {
            log::trace!("{} already bound", plugin_path.display());
            return Ok(());
        }

        let artifact = match self.resolver.resolve(plugin_path) {
            Resolution::Found(artifact) => artifact,
            Resolution::NotFound => {
                return Err(PluginError::ArtifactMissing {
                    plugin_path: plugin_path.to_path_buf(),
                })
            }
        };

        self.add_search_path(plugin_path);

        let module_name = module_base_name(plugin_path);
        let module = self.loader.load(&module_name, &artifact)?;
        let capabilities = module.capabilities();

        let registration_completed = if capabilities.installer {
            match catch_unwind(AssertUnwindSafe(|| module.register_types())) {
                Ok(Ok(())) => true,
                Ok(Err(e)) => {
                    return Err(PluginError::InstallationFailed {
                        plugin_path: plugin_path.to_path_buf(),
                        cause: e.to_string(),
                    })
                }
                Err(payload) => {
                    return Err(PluginError::InstallationFailed {
                        plugin_path: plugin_path.to_path_buf(),
                        cause: panic_message(payload.as_ref()),
                    })
                }
            }
        } else {
            log::warn!(
                "Module '{}' ({}) exports no type installer; binding without registration",
                module_name,
                artifact.display()
            );
            false
        };

        log::info!(
            "Bound plugin {} from {}",
            plugin_path.display(),
            artifact.display()
        );
        self.bindings.insert(
            plugin_path.to_path_buf(),
            Binding {
                module,
                module_name,
                artifact,
                registration_completed,
            },
        );
        self.order.push(plugin_path.to_path_buf());
        Ok(())
    }

    fn add_search_path(&mut self, dir: &Path) {
        if self.search_paths.iter().any(|existing| existing == dir) {
            return;
        }
        self.loader.add_search_path(dir);
        self.search_paths.push(dir.to_path_buf());
    }

    pub fn module(&self, plugin_path: &Path) -> Option<&dyn PluginModule> {
        self.bindings
            .get(plugin_path)
            .map(|binding| binding.module.as_ref())
    }

    pub fn is_bound(&self, plugin_path: &Path) -> bool {
        self.bindings.contains_key(plugin_path)
    }

    /// Whether the module's installer ran to completion
    pub fn registration_completed(&self, plugin_path: &Path) -> bool {
        self.bindings
            .get(plugin_path)
            .is_some_and(|binding| binding.registration_completed)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Drop every binding, newest first.
    ///
    /// Bindings listed in `pinned` are leaked rather than unloaded: a thread
    /// that could not be stopped may still be running their code. The search
    /// path is append-only and survives.
    pub fn release_all(&mut self, pinned: &[PathBuf]) {
        while let Some(plugin_path) = self.order.pop() {
            let Some(binding) = self.bindings.remove(&plugin_path) else {
                continue;
            };
            if pinned.contains(&plugin_path) {
                log::warn!(
                    "Keeping module '{}' mapped; its worker is still running",
                    binding.module_name
                );
                std::mem::forget(binding);
            } else {
                log::debug!(
                    "Releasing module '{}' ({})",
                    binding.module_name,
                    binding.artifact.display()
                );
                drop(binding);
            }
        }
        self.bindings.clear();
    }
}

impl std::fmt::Debug for PluginBinder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginBinder")
            .field("bound", &self.order)
            .field("search_paths", &self.search_paths)
            .field("patterns", &self.resolver.patterns())
            .finish()
    }
}
