//! Native plugin loader using libloading.
//!
//! A native plugin is a `cdylib` built against this crate that exports
//! (see [`crate::export_plugin!`]):
//!
//! - `modshell_register_types` : `extern "C" fn() -> i32`, 0 on success
//! - `modshell_create_instance`: `extern "C" fn() -> *mut PluginBox`, null on failure
//!
//! Both are optional at load time; their absence is reported through
//! [`ModuleCapabilities`]. Plugins must be built with the same toolchain as
//! the host, since trait objects cross the boundary.
//!
//! Libraries a plugin depends on may sit next to its artifact. The process
//! environment is never modified to find them:
//!
//! - Unix: the dynamic linker reads `LD_LIBRARY_PATH` / `DYLD_LIBRARY_PATH`
//!   once at startup, so plugins link with an `$ORIGIN` (Linux) or
//!   `@loader_path` (macOS) rpath, e.g. `-C link-arg=-Wl,-rpath,$ORIGIN`.
//! - Windows: artifacts are opened with `LOAD_LIBRARY_SEARCH_DLL_LOAD_DIR`,
//!   which puts the artifact's own directory on its dependency search path.

use crate::plugin::error::{PluginError, PluginResult};
use crate::plugin::traits::{BoxError, ModuleLoader, PluginInstance, PluginModule};
use crate::plugin::types::ModuleCapabilities;
use libloading::Library;
use std::path::{Path, PathBuf};

/// Exported name of the registration entry point
pub const REGISTER_TYPES_SYMBOL: &[u8] = b"modshell_register_types\0";
/// Exported name of the instance factory
pub const CREATE_INSTANCE_SYMBOL: &[u8] = b"modshell_create_instance\0";

/// Signature of the registration entry point
pub type RegisterTypesFn = unsafe extern "C" fn() -> i32;
/// Signature of the instance factory
pub type CreateInstanceFn = unsafe extern "C" fn() -> *mut PluginBox;

/// Thin, FFI-safe pointer target wrapping a fat trait object
pub struct PluginBox(pub Box<dyn PluginInstance>);

/// Loads plugin artifacts as shared libraries
#[derive(Debug, Default)]
pub struct NativeLoader;

impl NativeLoader {
    pub fn new() -> Self {
        Self
    }

    #[cfg(unix)]
    fn open(artifact: &Path) -> Result<Library, libloading::Error> {
        use libloading::os::unix::{Library as UnixLibrary, RTLD_LOCAL, RTLD_NOW};

        // RTLD_LOCAL keeps each plugin's symbols out of the global namespace.
        // SAFETY: running the library's initialisers is inherent to loading
        // a plugin; artifacts are trusted (no sandboxing).
        unsafe { UnixLibrary::open(Some(artifact), RTLD_NOW | RTLD_LOCAL).map(Library::from) }
    }

    #[cfg(windows)]
    fn open(artifact: &Path) -> Result<Library, libloading::Error> {
        use libloading::os::windows::{
            Library as WindowsLibrary, LOAD_LIBRARY_SEARCH_DEFAULT_DIRS,
            LOAD_LIBRARY_SEARCH_DLL_LOAD_DIR,
        };

        // The artifact path is absolute (plugin keys are), as DLL_LOAD_DIR requires.
        // SAFETY: see the unix variant.
        unsafe {
            WindowsLibrary::load_with_flags(
                artifact,
                LOAD_LIBRARY_SEARCH_DLL_LOAD_DIR | LOAD_LIBRARY_SEARCH_DEFAULT_DIRS,
            )
            .map(Library::from)
        }
    }

    #[cfg(not(any(unix, windows)))]
    fn open(artifact: &Path) -> Result<Library, libloading::Error> {
        // SAFETY: see the unix variant.
        unsafe { Library::new(artifact) }
    }
}

impl ModuleLoader for NativeLoader {
    fn load(&self, module_name: &str, artifact: &Path) -> PluginResult<Box<dyn PluginModule>> {
        log::debug!("dlopen {} as module '{}'", artifact.display(), module_name);
        let library = Self::open(artifact).map_err(|e| PluginError::LoadFailed {
            artifact: artifact.to_path_buf(),
            cause: e.to_string(),
        })?;

        // SAFETY: the symbol types are fixed by the export macro.
        let register_types = unsafe { library.get::<RegisterTypesFn>(REGISTER_TYPES_SYMBOL) }
            .ok()
            .map(|symbol| *symbol);
        let create_instance = unsafe { library.get::<CreateInstanceFn>(CREATE_INSTANCE_SYMBOL) }
            .ok()
            .map(|symbol| *symbol);

        Ok(Box::new(NativeModule {
            name: module_name.to_string(),
            artifact: artifact.to_path_buf(),
            register_types,
            create_instance,
            _library: library,
        }))
    }
}

/// A plugin library kept open for the lifetime of its binding
struct NativeModule {
    name: String,
    artifact: PathBuf,
    register_types: Option<RegisterTypesFn>,
    create_instance: Option<CreateInstanceFn>,
    // Declared last: the function pointers above point into this library.
    _library: Library,
}

impl PluginModule for NativeModule {
    fn capabilities(&self) -> ModuleCapabilities {
        ModuleCapabilities {
            installer: self.register_types.is_some(),
            factory: self.create_instance.is_some(),
        }
    }

    fn register_types(&self) -> Result<(), BoxError> {
        let register = self
            .register_types
            .ok_or_else(|| format!("module '{}' exports no installer", self.name))?;
        // SAFETY: resolved from this module's library, which is still open.
        let status = unsafe { register() };
        if status == 0 {
            Ok(())
        } else {
            Err(format!(
                "{} returned status {}",
                self.artifact.display(),
                status
            )
            .into())
        }
    }

    fn create_instance(&self) -> Result<Box<dyn PluginInstance>, BoxError> {
        let create = self
            .create_instance
            .ok_or_else(|| format!("module '{}' exports no factory", self.name))?;
        // SAFETY: resolved from this module's library, which is still open.
        let raw = unsafe { create() };
        if raw.is_null() {
            return Err(format!("factory in {} returned null", self.artifact.display()).into());
        }
        // SAFETY: non-null pointers come from Box::into_raw in export_plugin!.
        let boxed = unsafe { Box::from_raw(raw) };
        Ok(boxed.0)
    }
}
