//! Artifact Resolver
//!
//! Finds the compiled artifact inside a plugin directory. Different
//! toolchains name the same logical library differently (`libcalc.so`,
//! `calc.cpython-310-darwin.so`, `calc.dll`), so matching is driven by a
//! configurable list of glob patterns applied to file names.

use glob::Pattern;
use std::path::{Path, PathBuf};

/// File-name patterns for native plugin libraries on the build target
pub fn default_artifact_patterns() -> Vec<String> {
    if cfg!(target_os = "macos") {
        vec!["*.dylib".to_string(), "*.so".to_string()]
    } else if cfg!(windows) {
        vec!["*.dll".to_string()]
    } else {
        vec!["*.so".to_string()]
    }
}

/// Outcome of resolving one plugin directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Found(PathBuf),
    NotFound,
}

#[derive(Debug, Clone)]
pub struct ArtifactResolver {
    patterns: Vec<Pattern>,
}

impl ArtifactResolver {
    /// Build a resolver from pattern strings. Invalid patterns are logged
    /// and skipped.
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Self {
        let patterns = patterns
            .iter()
            .filter_map(|raw| match Pattern::new(raw.as_ref()) {
                Ok(pattern) => Some(pattern),
                Err(e) => {
                    log::warn!("Ignoring invalid artifact pattern '{}': {}", raw.as_ref(), e);
                    None
                }
            })
            .collect();
        Self { patterns }
    }

    pub fn patterns(&self) -> Vec<String> {
        self.patterns.iter().map(|p| p.as_str().to_string()).collect()
    }

    fn matches(&self, file_name: &str) -> bool {
        self.patterns.iter().any(|pattern| pattern.matches(file_name))
    }

    /// Locate the artifact in `plugin_dir`.
    ///
    /// A missing directory is created and reported as `NotFound`. With
    /// several candidates the lexicographically first file name wins.
    pub fn resolve(&self, plugin_dir: &Path) -> Resolution {
        if !plugin_dir.exists() {
            log::info!("Creating plugin directory: {}", plugin_dir.display());
            if let Err(e) = std::fs::create_dir_all(plugin_dir) {
                log::warn!(
                    "Could not create plugin directory {}: {}",
                    plugin_dir.display(),
                    e
                );
            }
            return Resolution::NotFound;
        }

        let entries = match std::fs::read_dir(plugin_dir) {
            Ok(entries) => entries,
            Err(e) => {
                log::warn!("Could not read plugin directory {}: {}", plugin_dir.display(), e);
                return Resolution::NotFound;
            }
        };

        let mut candidates: Vec<PathBuf> = entries
            .flatten()
            .filter(|entry| entry.file_type().map(|t| !t.is_dir()).unwrap_or(false))
            .filter(|entry| self.matches(&entry.file_name().to_string_lossy()))
            .map(|entry| entry.path())
            .collect();
        candidates.sort();

        match candidates.len() {
            0 => {
                log::debug!(
                    "No artifact matching {:?} in {}",
                    self.patterns(),
                    plugin_dir.display()
                );
                Resolution::NotFound
            }
            1 => Resolution::Found(candidates.remove(0)),
            _ => {
                let chosen = candidates.remove(0);
                log::warn!(
                    "Several artifacts in {}; using {} and ignoring {:?}",
                    plugin_dir.display(),
                    chosen.display(),
                    candidates
                );
                Resolution::Found(chosen)
            }
        }
    }
}

impl Default for ArtifactResolver {
    fn default() -> Self {
        Self::new(&default_artifact_patterns())
    }
}
