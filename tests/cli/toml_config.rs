//! CLI TOML configuration tests
//!
//! Config file values fill unset fields; command-line flags always win.

use clap::Parser;
use modshell::app::cli::args::*;
use modshell::app::cli::config::ConfigError;
use std::path::PathBuf;
use toml::Table;

fn table(text: &str) -> Table {
    toml::from_str(text).unwrap()
}

#[test]
fn test_toml_fills_unset_fields() {
    let mut args = Args::default();
    let config = table(
        r#"
        manifest = "conf/modules.toml"
        artifact-patterns = ["*.so", "*.cpython-*.so"]
        worker-stop-timeout = 0
        log-level = "DEBUG"
        log-format = "ext"
        log-file = "/var/log/modshell.log"
        color = false
        "#,
    );
    Args::apply_toml_values(&mut args, &config).unwrap();

    assert_eq!(args.manifest, Some(PathBuf::from("conf/modules.toml")));
    assert_eq!(args.artifact_patterns, vec!["*.so", "*.cpython-*.so"]);
    assert_eq!(args.manager_settings().worker_stop_timeout, None);
    assert_eq!(args.log_level.as_deref(), Some("debug"));
    assert_eq!(args.log_format.as_deref(), Some("ext"));
    assert_eq!(args.log_file, Some(PathBuf::from("/var/log/modshell.log")));
    assert_eq!(args.color_choice(), Some(false));
}

#[test]
fn test_cli_values_override_toml() {
    let mut args = Args::try_parse_from([
        "modshell",
        "--manifest",
        "cli.json",
        "--color",
        "--worker-stop-timeout",
        "2",
    ])
    .unwrap();
    let config = table(
        r#"
        manifest = "file.json"
        color = false
        worker-stop-timeout = 30
        "#,
    );
    Args::apply_toml_values(&mut args, &config).unwrap();

    assert_eq!(args.manifest, Some(PathBuf::from("cli.json")));
    assert_eq!(args.color_choice(), Some(true));
    assert_eq!(args.worker_stop_timeout, Some(2));
}

#[test]
fn test_comma_separated_patterns_are_deduplicated() {
    let mut args = Args::default();
    Args::apply_toml_values(&mut args, &table(r#"artifact-patterns = "*.so, *.so,*.dll""#))
        .unwrap();
    assert_eq!(args.artifact_patterns, vec!["*.so", "*.dll"]);
}

#[test]
fn test_log_file_none_keeps_stderr() {
    let mut args = Args::default();
    Args::apply_toml_values(&mut args, &table(r#"log-file = "none""#)).unwrap();
    assert_eq!(args.log_file, None);
}

#[test]
fn test_invalid_values_are_rejected() {
    for text in [
        "worker-stop-timeout = -1",
        r#"worker-stop-timeout = "ten""#,
        r#"color = "yes""#,
        r#"log-level = "chatty""#,
        r#"log-format = "xml""#,
        "artifact-patterns = [1, 2]",
        "manifest = 3",
    ] {
        let mut args = Args::default();
        let result = Args::apply_toml_values(&mut args, &table(text));
        assert!(
            matches!(result, Err(ConfigError::InvalidValue { .. })),
            "accepted: {}",
            text
        );
    }
}

#[test]
fn test_explicit_config_file_must_exist() {
    let temp = tempfile::tempdir().unwrap();
    let mut args = Args {
        config_file: Some(temp.path().join("missing.toml")),
        ..Args::default()
    };
    assert!(matches!(
        Args::apply_config_file(&mut args),
        Err(ConfigError::Missing(_))
    ));
}

#[test]
fn test_config_file_is_applied() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("modshell.toml");
    std::fs::write(&path, "manifest = \"from-file.json\"\n").unwrap();

    let mut args = Args {
        config_file: Some(path.clone()),
        ..Args::default()
    };
    assert_eq!(Args::apply_config_file(&mut args).unwrap(), Some(path));
    assert_eq!(args.manifest_path(), PathBuf::from("from-file.json"));
}

#[test]
fn test_unparseable_config_file() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("modshell.toml");
    std::fs::write(&path, "manifest = [unterminated\n").unwrap();

    let mut args = Args {
        config_file: Some(path),
        ..Args::default()
    };
    assert!(matches!(
        Args::apply_config_file(&mut args),
        Err(ConfigError::Parse { .. })
    ));
}
