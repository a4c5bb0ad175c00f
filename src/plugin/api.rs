//! Public API for the plugin system
//!
//! Hosts and plugin crates import from here rather than from the internal
//! modules.

// Lifecycle management
pub use crate::plugin::manager::{ManagerSettings, PluginManager, DEFAULT_WORKER_STOP_TIMEOUT};
pub use crate::plugin::shared::SharedPluginManager;

// Error handling
pub use crate::plugin::error::{PluginError, PluginErrorKind, PluginResult};

// Descriptors and status
pub use crate::plugin::registry::{
    load_config, try_load_config, DescriptorList, ManifestFormat, ManifestSource,
};
pub use crate::plugin::types::{plugin_key, ModuleCapabilities, PluginDescriptor, PluginStatus};

// Artifact discovery
pub use crate::plugin::resolver::{default_artifact_patterns, ArtifactResolver, Resolution};

// Seams for plugins, loaders and UI engines
pub use crate::plugin::traits::{BoxError, ModuleLoader, PluginInstance, PluginModule, UiEngine};
pub use crate::plugin::worker::WorkerContext;

// Native ABI
pub use crate::plugin::native::{NativeLoader, PluginBox};
