//! Plugin Trait System
//!
//! The manager only knows a plugin's shape, never what it computes. That
//! shape is expressed through three seams:
//!
//! - [`ModuleLoader`] turns an artifact file into a [`PluginModule`]
//!   (dynamic library in production, in-process modules in tests).
//! - [`PluginModule`] reports which entry points it exports and calls them.
//! - [`PluginInstance`] is the object produced by the factory; its optional
//!   capabilities have no-op defaults.
//!
//! [`UiEngine`] is the host-side collaborator that renders plugins.

use crate::plugin::error::PluginResult;
use crate::plugin::types::{ModuleCapabilities, PluginDescriptor};
use crate::plugin::worker::WorkerContext;
use std::path::Path;

/// Error type returned by plugin-side code
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Object produced by a plugin's instance factory.
///
/// Instances are `Send` because one that asks for a dedicated worker is
/// moved onto that worker's thread after construction.
pub trait PluginInstance: Send {
    /// Whether the instance must run on its own worker thread
    fn needs_dedicated_worker(&self) -> bool {
        false
    }

    /// Entry routine invoked once on the worker thread after it starts.
    ///
    /// Long-running bodies should poll `ctx.stop_requested()`; the worker
    /// keeps serving dispatched calls after this returns.
    fn start_thread(&mut self, _ctx: &WorkerContext) -> Result<(), BoxError> {
        Ok(())
    }

    /// Release plugin resources during host shutdown
    fn cleanup(&mut self) -> Result<(), BoxError> {
        Ok(())
    }
}

/// A loaded plugin module with its exported entry points
pub trait PluginModule: Send {
    /// Which entry points the module exports
    fn capabilities(&self) -> ModuleCapabilities;

    /// Run the process-wide registration routine. Only called when
    /// `capabilities().installer` is true.
    fn register_types(&self) -> Result<(), BoxError>;

    /// Produce a new instance. Only called when `capabilities().factory`
    /// is true.
    fn create_instance(&self) -> Result<Box<dyn PluginInstance>, BoxError>;
}

/// Loads an artifact into the process
pub trait ModuleLoader: Send {
    /// Load `artifact` into a namespace called `module_name`
    fn load(&self, module_name: &str, artifact: &Path) -> PluginResult<Box<dyn PluginModule>>;

    /// A plugin directory joined the host's search path. Called once per
    /// directory, before the first `load` from it. The native loader needs
    /// no hook since it resolves dependencies relative to the artifact.
    fn add_search_path(&self, _dir: &Path) {}
}

/// Declarative UI engine that consumes plugin descriptors
pub trait UiEngine: Send + Sync {
    fn name(&self) -> &str;

    /// The descriptor list was replaced
    fn plugins_changed(&self, _descriptors: &[PluginDescriptor]) {}

    /// A `load` request finished
    fn plugin_loaded(&self, _plugin_path: &Path, _ok: bool) {}
}
