//! Build metadata generated by the build script.
//!
//! The ABI version is informational only: artifacts are assumed to be built
//! against the same host release, so it is logged but never negotiated.

include!(concat!(env!("OUT_DIR"), "/version.rs"));

/// Plugin ABI revision declared in `[package.metadata]`
pub fn abi_version() -> u32 {
    PLUGIN_ABI_VERSION.parse().unwrap_or(20250901)
}

/// Build time string from the build script (UTC)
pub fn build_time() -> &'static str {
    BUILD_TIME
}

/// Short git hash captured by the build script
pub fn git_hash() -> &'static str {
    GIT_HASH
}

/// One-line version banner for `--version` and startup logging
pub fn long_version() -> String {
    format!(
        "{} (abi {}, built {}, git {})",
        env!("CARGO_PKG_VERSION"),
        abi_version(),
        build_time(),
        git_hash()
    )
}
