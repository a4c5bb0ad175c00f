//! Instance Manager
//!
//! One live instance per bound plugin. An instance that asked for a worker
//! is owned by that worker until shutdown hands it back; the manager only
//! remembers that it exists.

use crate::plugin::binder::PluginBinder;
use crate::plugin::error::{panic_message, PluginError, PluginResult};
use crate::plugin::error_handling::log_plugin_error_with_context;
use crate::plugin::traits::PluginInstance;
use crate::plugin::worker::{Placement, WorkerStartError, WorkerSupervisor};
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};

enum InstanceSlot {
    Local(Box<dyn PluginInstance>),
    OnWorker,
}

#[derive(Default)]
pub struct InstanceManager {
    slots: HashMap<PathBuf, InstanceSlot>,
    order: Vec<PathBuf>,
}

impl InstanceManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make sure `plugin_path` has a live instance, binding first if needed
    /// and moving the instance onto a worker when it asks for one.
    pub fn ensure_instance(
        &mut self,
        binder: &mut PluginBinder,
        workers: &mut WorkerSupervisor,
        plugin_path: &Path,
    ) -> PluginResult<()> {
        if self.slots.contains_key(plugin_path) {
            log::trace!("{} already instantiated", plugin_path.display());
            return Ok(());
        }

        binder.bind(plugin_path)?;
        let module = binder
            .module(plugin_path)
            .ok_or_else(|| PluginError::NotLoaded {
                plugin_path: plugin_path.to_path_buf(),
            })?;

        if !module.capabilities().factory {
            return Err(PluginError::NoFactory {
                plugin_path: plugin_path.to_path_buf(),
            });
        }

        let instance = match catch_unwind(AssertUnwindSafe(|| module.create_instance())) {
            Ok(Ok(instance)) => instance,
            Ok(Err(e)) => {
                return Err(PluginError::InstantiationFailed {
                    plugin_path: plugin_path.to_path_buf(),
                    cause: e.to_string(),
                })
            }
            Err(payload) => {
                return Err(PluginError::InstantiationFailed {
                    plugin_path: plugin_path.to_path_buf(),
                    cause: panic_message(payload.as_ref()),
                })
            }
        };
        log::info!("Instantiated plugin {}", plugin_path.display());

        let slot = match workers.start_worker_if_needed(plugin_path, instance) {
            Ok(Placement::Local(instance)) => InstanceSlot::Local(instance),
            Ok(Placement::OnWorker) => InstanceSlot::OnWorker,
            Err(WorkerStartError {
                error,
                mut instance,
            }) => {
                // Nothing is cached, so the next load retries instantiation.
                if let Err(e) = run_cleanup(plugin_path, instance.as_mut()) {
                    log_plugin_error_with_context(&e, "Discarding instance after worker failure");
                }
                return Err(error);
            }
        };

        self.slots.insert(plugin_path.to_path_buf(), slot);
        self.order.push(plugin_path.to_path_buf());
        Ok(())
    }

    pub fn contains(&self, plugin_path: &Path) -> bool {
        self.slots.contains_key(plugin_path)
    }

    pub fn is_on_worker(&self, plugin_path: &Path) -> bool {
        matches!(self.slots.get(plugin_path), Some(InstanceSlot::OnWorker))
    }

    /// Instance owned by the host side, if any
    pub fn local_mut(&mut self, plugin_path: &Path) -> Option<&mut dyn PluginInstance> {
        match self.slots.get_mut(plugin_path) {
            Some(InstanceSlot::Local(instance)) => Some(instance.as_mut()),
            _ => None,
        }
    }

    /// Take back an instance returned by its stopped worker
    pub fn reclaim(&mut self, plugin_path: &Path, instance: Box<dyn PluginInstance>) {
        match self.slots.get_mut(plugin_path) {
            Some(slot) if matches!(slot, InstanceSlot::OnWorker) => {
                *slot = InstanceSlot::Local(instance)
            }
            _ => log::warn!(
                "Worker for {} returned an instance that was not expected",
                plugin_path.display()
            ),
        }
    }

    /// Paths with a live instance, in creation order
    pub fn paths(&self) -> &[PathBuf] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Clean up and drop every instance, newest first.
    ///
    /// Returns the paths whose instance never came back from its worker;
    /// those are forgotten without cleanup.
    pub fn cleanup_all(&mut self) -> Vec<PathBuf> {
        let mut stranded = Vec::new();
        while let Some(plugin_path) = self.order.pop() {
            match self.slots.remove(&plugin_path) {
                Some(InstanceSlot::Local(mut instance)) => {
                    match run_cleanup(&plugin_path, instance.as_mut()) {
                        Ok(()) => log::debug!("Cleaned up {}", plugin_path.display()),
                        Err(e) => log_plugin_error_with_context(&e, "Cleaning up plugin instance"),
                    }
                }
                Some(InstanceSlot::OnWorker) => {
                    log::warn!(
                        "Instance for {} is still owned by its worker; skipping cleanup",
                        plugin_path.display()
                    );
                    stranded.push(plugin_path);
                }
                None => {}
            }
        }
        self.slots.clear();
        stranded
    }
}

fn run_cleanup(plugin_path: &Path, instance: &mut dyn PluginInstance) -> PluginResult<()> {
    match catch_unwind(AssertUnwindSafe(|| instance.cleanup())) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(PluginError::CleanupFailed {
            plugin_path: plugin_path.to_path_buf(),
            cause: e.to_string(),
        }),
        Err(payload) => Err(PluginError::CleanupFailed {
            plugin_path: plugin_path.to_path_buf(),
            cause: panic_message(payload.as_ref()),
        }),
    }
}

impl std::fmt::Debug for InstanceManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstanceManager")
            .field("instances", &self.order)
            .finish()
    }
}
