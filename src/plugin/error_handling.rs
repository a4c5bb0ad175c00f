//! Plugin-specific error logging
//!
//! Thin wrappers that pick the log level from the error kind and delegate
//! to the generic helpers in `core::error_handling`.

use crate::core::error_handling::{log_error_with_context, log_warning_with_context};
use crate::plugin::error::{PluginError, PluginErrorKind};

/// Log a plugin failure with the stage it happened in.
///
/// Soft failures (a plugin that simply does not offer a capability, an
/// empty plugin directory) are warnings; everything else is an error.
pub fn log_plugin_error_with_context(error: &PluginError, operation_context: &str) {
    match error.kind() {
        PluginErrorKind::NoFactory | PluginErrorKind::ArtifactMissing => {
            log_warning_with_context(error, operation_context)
        }
        _ => log_error_with_context(error, operation_context),
    }
}
