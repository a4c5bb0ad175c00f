//! Test modules for the plugin system
//!
//! Mock-module based tests for the manager's lifecycle, dispatch and the
//! shared wrapper. Component-level tests live next to each component.

mod utils;
