//! CLI argument parsing tests

use clap::Parser;
use modshell::app::cli::args::*;
use std::path::PathBuf;
use std::time::Duration;

#[test]
fn test_no_subcommand_defaults_to_list() {
    let args = Args::try_parse_from(["modshell"]).unwrap();
    assert_eq!(args.command(), Command::List);
    assert_eq!(args.manifest_path(), PathBuf::from(DEFAULT_MANIFEST));
}

#[test]
fn test_run_collects_paths() {
    let args =
        Args::try_parse_from(["modshell", "run", "modules/calc", "modules/serial"]).unwrap();
    assert_eq!(
        args.command(),
        Command::Run {
            paths: vec![PathBuf::from("modules/calc"), PathBuf::from("modules/serial")]
        }
    );
}

#[test]
fn test_global_flags_after_subcommand() {
    let args = Args::try_parse_from([
        "modshell",
        "check",
        "--manifest",
        "plugins.toml",
        "--log-level",
        "debug",
    ])
    .unwrap();
    assert_eq!(args.manifest, Some(PathBuf::from("plugins.toml")));
    assert_eq!(args.log_level.as_deref(), Some("debug"));
    assert_eq!(args.command(), Command::Check { paths: Vec::new() });
}

#[test]
fn test_invalid_log_options_rejected() {
    assert!(Args::try_parse_from(["modshell", "--log-level", "loud"]).is_err());
    assert!(Args::try_parse_from(["modshell", "--log-format", "xml"]).is_err());
}

#[test]
fn test_color_flags_conflict() {
    assert!(Args::try_parse_from(["modshell", "--color", "--no-color"]).is_err());

    let args = Args::try_parse_from(["modshell", "--no-color"]).unwrap();
    assert_eq!(args.color_choice(), Some(false));
    assert_eq!(Args::default().color_choice(), None);
}

#[test]
fn test_artifact_patterns_comma_separated_and_repeated() {
    let args = Args::try_parse_from([
        "modshell",
        "--artifact-pattern",
        "*.so,*.dylib",
        "-a",
        "*.plugin",
    ])
    .unwrap();
    assert_eq!(args.artifact_patterns, vec!["*.so", "*.dylib", "*.plugin"]);
    assert_eq!(
        args.manager_settings().artifact_patterns,
        vec!["*.so", "*.dylib", "*.plugin"]
    );
}

#[test]
fn test_worker_stop_timeout_settings() {
    let default = Args::default().manager_settings();
    assert_eq!(default.worker_stop_timeout, Some(Duration::from_secs(10)));
    assert!(!default.artifact_patterns.is_empty());

    let args = Args::try_parse_from(["modshell", "--worker-stop-timeout", "3"]).unwrap();
    assert_eq!(
        args.manager_settings().worker_stop_timeout,
        Some(Duration::from_secs(3))
    );

    let forever = Args::try_parse_from(["modshell", "--worker-stop-timeout", "0"]).unwrap();
    assert_eq!(forever.manager_settings().worker_stop_timeout, None);
}

#[test]
fn test_log_settings_color_falls_back_to_terminal() {
    let args = Args::try_parse_from(["modshell", "--log-format", "json"]).unwrap();
    assert!(args.log_settings(true).color);
    assert!(!args.log_settings(false).color);
    assert_eq!(
        args.log_settings(false).format,
        modshell::core::logging::LogFormat::Json
    );

    let forced = Args::try_parse_from(["modshell", "--color"]).unwrap();
    assert!(forced.log_settings(false).color);
}

#[test]
fn test_log_file_none_or_dash_keeps_stderr() {
    for value in ["none", "NONE", "-"] {
        let args = Args::try_parse_from(["modshell", "-f", value, "list"]).unwrap();
        assert_eq!(args.log_settings(true).file, None, "value: {}", value);
    }

    let args = Args::try_parse_from(["modshell", "--log-file", "modshell.log"]).unwrap();
    assert_eq!(
        args.log_settings(false).file,
        Some(PathBuf::from("modshell.log"))
    );
}
