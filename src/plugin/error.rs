//! Plugin Error Handling
//!
//! One variant per lifecycle stage that can fail. Every variant carries the
//! plugin path (or manifest source) so a log line identifies the plugin.

use std::path::PathBuf;
use strum_macros::{Display, EnumIter};

/// Result type alias for plugin operations
pub type PluginResult<T> = std::result::Result<T, PluginError>;

/// Stage-level classification of a [`PluginError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum PluginErrorKind {
    ConfigUnreadable,
    ArtifactMissing,
    LoadFailed,
    InstallationFailed,
    NoFactory,
    InstantiationFailed,
    WorkerStartFailed,
    WorkerStopFailed,
    CleanupFailed,
    NotLoaded,
    DispatchFailed,
    LockPoisoned,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PluginError {
    /// Manifest could not be read or did not have the expected shape
    #[error("Plugin manifest '{source_name}' is unreadable: {cause}")]
    ConfigUnreadable { source_name: String, cause: String },

    /// No file in the plugin directory matched the artifact patterns
    #[error("No plugin artifact found in '{}'", .plugin_path.display())]
    ArtifactMissing { plugin_path: PathBuf },

    /// The dynamic loader rejected the artifact
    #[error("Failed to load artifact '{}': {cause}", .artifact.display())]
    LoadFailed { artifact: PathBuf, cause: String },

    /// The registration entry point failed or panicked
    #[error("Type registration failed for plugin '{}': {cause}", .plugin_path.display())]
    InstallationFailed { plugin_path: PathBuf, cause: String },

    /// The bound module exposes no instance factory
    #[error("Plugin '{}' has no instance factory", .plugin_path.display())]
    NoFactory { plugin_path: PathBuf },

    /// The instance factory exists but failed or panicked
    #[error("Instance factory failed for plugin '{}': {cause}", .plugin_path.display())]
    InstantiationFailed { plugin_path: PathBuf, cause: String },

    /// The worker context could not be created or its entry routine failed
    #[error("Worker for plugin '{}' failed to start: {cause}", .plugin_path.display())]
    WorkerStartFailed { plugin_path: PathBuf, cause: String },

    /// The worker did not stop cleanly (panic or timeout)
    #[error("Worker for plugin '{}' failed to stop: {cause}", .plugin_path.display())]
    WorkerStopFailed { plugin_path: PathBuf, cause: String },

    /// The instance's cleanup routine failed or panicked
    #[error("Cleanup failed for plugin '{}': {cause}", .plugin_path.display())]
    CleanupFailed { plugin_path: PathBuf, cause: String },

    /// A call targeted a plugin that has no live instance
    #[error("Plugin '{}' is not loaded", .plugin_path.display())]
    NotLoaded { plugin_path: PathBuf },

    /// A dispatched call could not be delivered or panicked
    #[error("Call into plugin '{}' failed: {cause}", .plugin_path.display())]
    DispatchFailed { plugin_path: PathBuf, cause: String },

    /// A shared manager lock was poisoned by a panicking caller
    #[error("{message}")]
    LockPoisoned { message: String },
}

impl PluginError {
    pub fn kind(&self) -> PluginErrorKind {
        match self {
            PluginError::ConfigUnreadable { .. } => PluginErrorKind::ConfigUnreadable,
            PluginError::ArtifactMissing { .. } => PluginErrorKind::ArtifactMissing,
            PluginError::LoadFailed { .. } => PluginErrorKind::LoadFailed,
            PluginError::InstallationFailed { .. } => PluginErrorKind::InstallationFailed,
            PluginError::NoFactory { .. } => PluginErrorKind::NoFactory,
            PluginError::InstantiationFailed { .. } => PluginErrorKind::InstantiationFailed,
            PluginError::WorkerStartFailed { .. } => PluginErrorKind::WorkerStartFailed,
            PluginError::WorkerStopFailed { .. } => PluginErrorKind::WorkerStopFailed,
            PluginError::CleanupFailed { .. } => PluginErrorKind::CleanupFailed,
            PluginError::NotLoaded { .. } => PluginErrorKind::NotLoaded,
            PluginError::DispatchFailed { .. } => PluginErrorKind::DispatchFailed,
            PluginError::LockPoisoned { .. } => PluginErrorKind::LockPoisoned,
        }
    }
}

impl crate::core::error_handling::ContextualError for PluginError {
    fn is_user_actionable(&self) -> bool {
        // A broken manifest or an empty plugin directory is fixed by the user.
        matches!(
            self,
            PluginError::ConfigUnreadable { .. } | PluginError::ArtifactMissing { .. }
        )
    }

    fn user_message(&self) -> Option<&str> {
        match self {
            PluginError::ConfigUnreadable { cause, .. } => Some(cause),
            PluginError::ArtifactMissing { .. } => {
                Some("plugin directory contains no artifact for this platform")
            }
            _ => None,
        }
    }
}

/// Render a caught panic payload as text
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("panicked: {}", message)
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("panicked: {}", message)
    } else {
        "panicked with a non-string payload".to_string()
    }
}
