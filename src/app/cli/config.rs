//! TOML host configuration
//!
//! Values from `modshell.toml` fill in whatever the command line left
//! unset; an explicit flag always wins.

use super::args::{keeps_stderr, Args};
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("The specified configuration file does not exist: {}", .0.display())]
    Missing(PathBuf),

    #[error("Error reading configuration file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Error parsing configuration file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

/// `<config dir>/Modshell/modshell.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("Modshell").join("modshell.toml"))
}

impl Args {
    /// Merge the config file into `args`. Returns the file that was used,
    /// if any. A file named with `--config-file` must exist; the default
    /// one is optional.
    pub fn apply_config_file(args: &mut Self) -> Result<Option<PathBuf>, ConfigError> {
        let path = match &args.config_file {
            Some(path) if !path.exists() => return Err(ConfigError::Missing(path.clone())),
            Some(path) => path.clone(),
            None => match default_config_path() {
                Some(path) if path.exists() => path,
                _ => return Ok(None),
            },
        };

        let table = read_table(&path)?;
        Self::apply_toml_values(args, &table)?;
        Ok(Some(path))
    }

    /// Apply TOML configuration values to fields not set on the command line
    pub fn apply_toml_values(args: &mut Self, config: &toml::Table) -> Result<(), ConfigError> {
        if args.manifest.is_none() {
            if let Some(manifest) = string_field(config, "manifest")? {
                args.manifest = Some(PathBuf::from(manifest));
            }
        }

        if args.artifact_patterns.is_empty() {
            if let Some(value) = config.get("artifact-patterns") {
                args.artifact_patterns = string_list(value, "artifact-patterns")?;
            }
        }

        if args.worker_stop_timeout.is_none() {
            if let Some(value) = config.get("worker-stop-timeout") {
                let secs = value
                    .as_integer()
                    .filter(|secs| *secs >= 0)
                    .ok_or_else(|| invalid("worker-stop-timeout", "expected seconds >= 0"))?;
                args.worker_stop_timeout = Some(secs as u64);
            }
        }

        if args.color_choice().is_none() {
            if let Some(value) = config.get("color") {
                let color = value
                    .as_bool()
                    .ok_or_else(|| invalid("color", "expected true or false"))?;
                args.color = color;
                args.no_color = !color;
            }
        }

        if args.log_level.is_none() {
            if let Some(level) = string_field(config, "log-level")? {
                match level.to_ascii_lowercase().as_str() {
                    "trace" | "debug" | "info" | "warn" | "error" | "off" => {
                        args.log_level = Some(level.to_ascii_lowercase())
                    }
                    _ => return Err(invalid("log-level", "unknown level")),
                }
            }
        }

        if args.log_format.is_none() {
            if let Some(format) = string_field(config, "log-format")? {
                if crate::core::logging::LogFormat::parse(&format).is_none() {
                    return Err(invalid("log-format", "expected text, ext or json"));
                }
                args.log_format = Some(format);
            }
        }

        if args.log_file.is_none() {
            if let Some(log_file) = string_field(config, "log-file")? {
                let log_file = PathBuf::from(log_file);
                if !keeps_stderr(&log_file) {
                    args.log_file = Some(log_file);
                }
            }
        }

        Ok(())
    }
}

fn read_table(path: &Path) -> Result<toml::Table, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str::<toml::Table>(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn invalid(key: &str, message: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        message: message.to_string(),
    }
}

fn string_field(config: &toml::Table, key: &str) -> Result<Option<String>, ConfigError> {
    match config.get(key) {
        None => Ok(None),
        Some(value) => value
            .as_str()
            .map(|s| Some(s.to_string()))
            .ok_or_else(|| invalid(key, "expected a string")),
    }
}

/// Accepts `"a,b"` or `["a", "b"]`
fn string_list(value: &toml::Value, key: &str) -> Result<Vec<String>, ConfigError> {
    let raw: Vec<&str> = if let Some(single) = value.as_str() {
        vec![single]
    } else if let Some(array) = value.as_array() {
        array
            .iter()
            .map(|item| item.as_str().ok_or_else(|| invalid(key, "expected strings")))
            .collect::<Result<_, _>>()?
    } else {
        return Err(invalid(key, "expected a string or an array of strings"));
    };

    let mut result: Vec<String> = Vec::new();
    for item in raw.iter().flat_map(|s| s.split(',')) {
        let item = item.trim();
        if !item.is_empty() && !result.iter().any(|existing| existing == item) {
            result.push(item.to_string());
        }
    }
    Ok(result)
}
