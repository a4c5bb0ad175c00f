//! Plugin-side helpers for building native plugins
//!
//! A plugin crate depends on `modshell`, builds as a `cdylib` and invokes
//! [`crate::export_plugin!`] once:
//!
//! ```rust,ignore
//! use modshell::plugin::api::{BoxError, PluginInstance, WorkerContext};
//!
//! #[derive(Default)]
//! struct SerialHandler;
//!
//! impl PluginInstance for SerialHandler {
//!     fn needs_dedicated_worker(&self) -> bool {
//!         true
//!     }
//!
//!     fn start_thread(&mut self, ctx: &WorkerContext) -> Result<(), BoxError> {
//!         log::info!("serial worker up for {}", ctx.plugin_path().display());
//!         Ok(())
//!     }
//! }
//!
//! fn register_types() -> Result<(), BoxError> {
//!     Ok(())
//! }
//!
//! modshell::export_plugin!(SerialHandler, register = register_types);
//! ```
//!
//! Panics never cross the C boundary: they are caught here and reported as
//! a failure status or a null instance.

use crate::plugin::native::PluginBox;
use crate::plugin::traits::{BoxError, PluginInstance};
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Status returned by the registration entry point
pub const REGISTER_OK: i32 = 0;
pub const REGISTER_FAILED: i32 = 1;
pub const REGISTER_PANICKED: i32 = 2;

/// Run a registration routine and translate its outcome into a status code
pub fn run_register<F>(register: F) -> i32
where
    F: FnOnce() -> Result<(), BoxError>,
{
    match catch_unwind(AssertUnwindSafe(register)) {
        Ok(Ok(())) => REGISTER_OK,
        Ok(Err(e)) => {
            log::error!("Plugin type registration failed: {}", e);
            REGISTER_FAILED
        }
        Err(_) => REGISTER_PANICKED,
    }
}

/// Run an instance constructor and hand ownership to the host
pub fn run_factory<T, F>(create: F) -> *mut PluginBox
where
    T: PluginInstance + 'static,
    F: FnOnce() -> T,
{
    match catch_unwind(AssertUnwindSafe(create)) {
        Ok(instance) => Box::into_raw(Box::new(PluginBox(Box::new(instance)))),
        Err(_) => std::ptr::null_mut(),
    }
}

/// Export the native entry points for a plugin type.
///
/// - `export_plugin!(Type)`: factory only, built with `Default`
/// - `export_plugin!(Type, register = path)`: factory and installer
/// - `export_plugin!(register = path)`: installer only
#[macro_export]
macro_rules! export_plugin {
    ($ty:ty) => {
        #[no_mangle]
        pub extern "C" fn modshell_create_instance() -> *mut $crate::plugin::native::PluginBox {
            $crate::plugin::sdk::run_factory(<$ty as ::std::default::Default>::default)
        }
    };
    ($ty:ty, register = $register:path) => {
        $crate::export_plugin!(register = $register);
        $crate::export_plugin!($ty);
    };
    (register = $register:path) => {
        #[no_mangle]
        pub extern "C" fn modshell_register_types() -> i32 {
            $crate::plugin::sdk::run_register($register)
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Calculator;

    impl PluginInstance for Calculator {}

    #[test]
    fn test_register_status_codes() {
        assert_eq!(run_register(|| Ok(())), REGISTER_OK);
        assert_eq!(run_register(|| Err("duplicate type".into())), REGISTER_FAILED);
        assert_eq!(run_register(|| panic!("boom")), REGISTER_PANICKED);
    }

    #[test]
    fn test_factory_round_trips_ownership() {
        let raw = run_factory(|| Calculator);
        assert!(!raw.is_null());
        // SAFETY: produced by run_factory above.
        let boxed = unsafe { Box::from_raw(raw) };
        assert!(!boxed.0.needs_dedicated_worker());
    }

    #[test]
    fn test_factory_panic_yields_null() {
        let raw = run_factory::<Calculator, _>(|| panic!("constructor failed"));
        assert!(raw.is_null());
    }
}
