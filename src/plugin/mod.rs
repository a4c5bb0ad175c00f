//! Plugin System Module
//!
//! Discovers plugins from a manifest, loads their compiled artifacts,
//! instantiates them, runs the ones that need it on dedicated workers and
//! tears everything down in reverse on shutdown.

// Internal modules - hosts should go through the api module
pub(crate) mod binder;
pub(crate) mod error;
pub(crate) mod error_handling;
pub(crate) mod instances;
pub(crate) mod manager;
pub(crate) mod registry;
pub(crate) mod resolver;
pub(crate) mod shared;
pub(crate) mod traits;
pub(crate) mod types;
pub(crate) mod worker;

// Referenced by code generated from `export_plugin!` in plugin crates
pub mod native;
pub mod sdk;

// Public API module - the only public interface for the plugin system
pub mod api;

#[cfg(test)]
mod tests;
