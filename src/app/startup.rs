//! Application startup
//!
//! Parses arguments, layers the config file underneath them, starts logging
//! and runs the selected command on a single-threaded tokio runtime.

use super::cli::args::{Args, Command};
use super::cli::display::{display_load_report, display_plugin_table};
use super::console_engine::ConsoleEngine;
use crate::core::logging::init_logging;
use crate::core::shutdown::ShutdownCoordinator;
use crate::core::version::long_version;
use crate::plugin::api::{try_load_config, ManifestSource, PluginManager};
use clap::Parser;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;

/// Run the application and return the process exit code
pub fn startup() -> i32 {
    let mut args = Args::parse();
    if let Err(e) = Args::apply_config_file(&mut args) {
        eprintln!("Error: {}", e);
        return 1;
    }

    let log_settings = args.log_settings(std::io::stderr().is_terminal());
    if let Err(e) = init_logging(&log_settings) {
        eprintln!("Error: failed to initialise logging: {}", e);
        return 1;
    }
    log::info!("modshell {} starting", long_version());
    log::debug!("Arguments: {:?}", args);

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            log::error!("Failed to start async runtime: {}", e);
            return 1;
        }
    };

    runtime.block_on(async {
        let coordinator = ShutdownCoordinator::new();
        coordinator.install_signal_handlers();
        execute(&args, &coordinator).await
    })
}

/// Run the command selected in `args`. `run` returns once `coordinator`
/// fires; the plugins are shut down before this returns.
pub async fn execute(args: &Args, coordinator: &ShutdownCoordinator) -> i32 {
    let manifest = ManifestSource::File(args.manifest_path());
    let use_color = args.color_choice().unwrap_or(false);

    match args.command() {
        Command::List => match try_load_config(&manifest) {
            Ok(descriptors) => {
                display_plugin_table(&descriptors, use_color);
                0
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                1
            }
        },
        Command::Run { paths } => {
            let mut manager = start_manager(args, &manifest);
            let results = load_requested(&mut manager, &paths);
            display_load_report(&results, use_color);

            log::info!("Plugins running; waiting for termination signal");
            coordinator.wait().await;
            manager.shutdown();
            0
        }
        Command::Check { paths } => {
            let mut manager = start_manager(args, &manifest);
            let results = load_requested(&mut manager, &paths);
            manager.shutdown();
            display_load_report(&results, use_color);
            if results.iter().all(|(_, ok)| *ok) {
                0
            } else {
                1
            }
        }
    }
}

fn start_manager(args: &Args, manifest: &ManifestSource) -> PluginManager {
    let mut manager = PluginManager::new(args.manager_settings());
    manager.set_engine(Arc::new(ConsoleEngine::new()));
    manager.load_manifest(manifest);
    manager
}

/// Load the given paths, or every enabled manifest entry when none given
fn load_requested(manager: &mut PluginManager, paths: &[PathBuf]) -> Vec<(PathBuf, bool)> {
    if paths.is_empty() {
        manager.load_all()
    } else {
        paths
            .iter()
            .map(|path| (path.clone(), manager.load(path)))
            .collect()
    }
}
