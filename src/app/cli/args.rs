//! Command-line arguments
//!
//! Global flags configure the host (manifest, logging, worker timeout);
//! the subcommand picks what to do with the plugins.

use crate::core::logging::{LogFormat, LogSettings};
use crate::plugin::api::{default_artifact_patterns, ManagerSettings, DEFAULT_WORKER_STOP_TIMEOUT};
use clap::{ArgAction, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Manifest used when neither the command line nor the config file names one
pub const DEFAULT_MANIFEST: &str = "modules.json";

#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "modshell")]
#[command(about = "Host shell that discovers, loads and supervises native plugins")]
#[command(version, long_version = crate::core::version::long_version())]
#[command(after_help = " * can be specified multiple times or as a comma-separated list")]
pub struct Args {
    /// Configuration file path
    #[arg(short = 'c', long = "config-file", value_name = "FILE", global = true)]
    pub config_file: Option<PathBuf>,

    /// Plugin manifest (JSON or TOML)
    #[arg(short = 'm', long = "manifest", value_name = "FILE", global = true)]
    pub manifest: Option<PathBuf>,

    /// Artifact file-name patterns*
    #[arg(
        short = 'a',
        long = "artifact-pattern",
        value_name = "GLOBS",
        action = ArgAction::Append,
        value_delimiter = ',',
        global = true
    )]
    pub artifact_patterns: Vec<String>,

    /// Seconds to wait for each plugin worker on shutdown (0 waits forever)
    #[arg(long = "worker-stop-timeout", value_name = "SECONDS", global = true)]
    pub worker_stop_timeout: Option<u64>,

    /// Force colored log output
    #[arg(long = "color", conflicts_with = "no_color", global = true)]
    pub color: bool,

    /// Disable colored log output
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,

    /// Log level
    #[arg(
        short = 'l',
        long = "log-level",
        value_name = "LEVEL",
        value_parser = ["trace", "debug", "info", "warn", "error", "off"],
        global = true
    )]
    pub log_level: Option<String>,

    /// Log file path (use 'none' to disable file logging)
    #[arg(short = 'f', long = "log-file", value_name = "FILE", global = true)]
    pub log_file: Option<PathBuf>,

    /// Log output format
    #[arg(
        short = 'o',
        long = "log-format",
        value_name = "FORMAT",
        value_parser = ["text", "ext", "json"],
        global = true
    )]
    pub log_format: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List the enabled plugins in the manifest
    List,
    /// Load plugins and keep them running until interrupted
    Run {
        /// Plugin directories to load (default: every enabled manifest entry)
        #[arg(value_name = "PATH")]
        paths: Vec<PathBuf>,
    },
    /// Load plugins, shut them down and report whether all loaded
    Check {
        /// Plugin directories to load (default: every enabled manifest entry)
        #[arg(value_name = "PATH")]
        paths: Vec<PathBuf>,
    },
}

impl Args {
    pub fn new() -> Self {
        Self::default()
    }

    /// The subcommand, defaulting to `list`
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::List)
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.manifest
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_MANIFEST))
    }

    /// Explicit color choice, `None` when neither flag was given
    pub fn color_choice(&self) -> Option<bool> {
        match (self.color, self.no_color) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }

    /// Stop timeout; `Some(0)` means wait indefinitely
    pub fn worker_stop_timeout_duration(&self) -> Option<Duration> {
        match self.worker_stop_timeout {
            Some(0) => None,
            Some(secs) => Some(Duration::from_secs(secs)),
            None => Some(DEFAULT_WORKER_STOP_TIMEOUT),
        }
    }

    pub fn manager_settings(&self) -> ManagerSettings {
        let artifact_patterns = if self.artifact_patterns.is_empty() {
            default_artifact_patterns()
        } else {
            self.artifact_patterns.clone()
        };
        ManagerSettings {
            artifact_patterns,
            worker_stop_timeout: self.worker_stop_timeout_duration(),
        }
    }

    /// Logging settings; color falls back to whether stderr is a terminal
    pub fn log_settings(&self, stderr_is_terminal: bool) -> LogSettings {
        LogSettings {
            level: self.log_level.clone(),
            format: self
                .log_format
                .as_deref()
                .and_then(LogFormat::parse)
                .unwrap_or_default(),
            file: self.log_file.clone().filter(|path| !keeps_stderr(path)),
            color: self.color_choice().unwrap_or(stderr_is_terminal),
        }
    }
}

/// `none` and `-` select stderr instead of a log file
pub(crate) fn keeps_stderr(path: &Path) -> bool {
    path.to_str()
        .is_some_and(|value| value.eq_ignore_ascii_case("none") || value == "-")
}

impl Default for Args {
    fn default() -> Self {
        Self {
            config_file: None,
            manifest: None,
            artifact_patterns: Vec::new(),
            worker_stop_timeout: None,
            color: false,
            no_color: false,
            log_level: None,
            log_file: None,
            log_format: None,
            command: None,
        }
    }
}
