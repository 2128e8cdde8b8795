//! Unit tests for bootstrap configuration and graceful degradation
//!
//! Uses serial_test to prevent environment variable races: tests that touch
//! PXM_ROOT_FOLDER or PXM_CONFIG are marked with #[serial].

use pxm_common::config::{
    locate_config_file, resolve_database_path, CompiledDefaults, RootFolderInitializer,
    RootFolderResolver, TomlConfig, CONFIG_FILE_ENV, ROOT_FOLDER_ENV,
};
use serial_test::serial;
use std::env;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

#[test]
fn test_compiled_defaults_for_current_platform() {
    let defaults = CompiledDefaults::for_current_platform();

    assert!(!defaults.root_folder.as_os_str().is_empty());
    assert_eq!(defaults.log_level, "info");
    assert!(defaults.interval_secs > 0);
}

#[test]
#[serial]
fn test_resolver_with_no_overrides_uses_default() {
    env::remove_var(ROOT_FOLDER_ENV);

    let resolver = RootFolderResolver::new("test-module");
    let root_folder = resolver.resolve();

    let defaults = CompiledDefaults::for_current_platform();
    assert_eq!(root_folder, defaults.root_folder);
}

#[test]
#[serial]
fn test_resolver_env_var_overrides_toml() {
    let toml = TomlConfig::parse("root_folder = \"/tmp/pxm-from-toml\"").unwrap();
    env::set_var(ROOT_FOLDER_ENV, "/tmp/pxm-test-env-folder");

    let root_folder = RootFolderResolver::new("test-module").with_toml(&toml).resolve();
    assert_eq!(root_folder, PathBuf::from("/tmp/pxm-test-env-folder"));

    env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
#[serial]
fn test_resolver_toml_used_without_env() {
    env::remove_var(ROOT_FOLDER_ENV);
    let toml = TomlConfig::parse("root_folder = \"/tmp/pxm-from-toml\"").unwrap();

    let root_folder = RootFolderResolver::new("test-module").with_toml(&toml).resolve();
    assert_eq!(root_folder, PathBuf::from("/tmp/pxm-from-toml"));
}

#[test]
#[serial]
fn test_resolver_cli_argument_wins() {
    env::set_var(ROOT_FOLDER_ENV, "/tmp/pxm-env");

    let root_folder =
        RootFolderResolver::new("test-module").resolve_with(Some(Path::new("/tmp/pxm-cli")));
    assert_eq!(root_folder, PathBuf::from("/tmp/pxm-cli"));

    env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
fn test_toml_parse_full() {
    let config = TomlConfig::parse(
        r#"
        root_folder = "/srv/photos"
        database_path = "/srv/photos/index.db"
        interval_secs = 600

        [logging]
        level = "debug"
        "#,
    )
    .unwrap();

    assert_eq!(config.root_folder, Some(PathBuf::from("/srv/photos")));
    assert_eq!(config.database_path, Some(PathBuf::from("/srv/photos/index.db")));
    assert_eq!(config.interval_secs, Some(600));
    assert_eq!(config.logging.level, "debug");
}

#[test]
fn test_toml_parse_empty_uses_defaults() {
    let config = TomlConfig::parse("").unwrap();
    assert!(config.root_folder.is_none());
    assert!(config.database_path.is_none());
    assert_eq!(config.logging.level, "info");
}

#[test]
fn test_toml_parse_invalid_is_config_error() {
    let err = TomlConfig::parse("interval_secs = \"soon\"").unwrap_err();
    assert!(err.to_string().contains("Configuration error"));
}

#[test]
#[serial]
fn test_missing_config_file_falls_back_to_defaults() {
    env::remove_var(CONFIG_FILE_ENV);
    let config = TomlConfig::load_or_default("pxm-nonexistent-module", None).unwrap();
    assert!(config.database_path.is_none());
}

#[test]
#[serial]
fn test_locate_config_file_prefers_env() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("custom.toml");
    std::fs::write(&path, "interval_secs = 30").unwrap();
    env::set_var(CONFIG_FILE_ENV, &path);

    assert_eq!(locate_config_file("pxm-meta", None), Some(path.clone()));
    let config = TomlConfig::load_or_default("pxm-meta", None).unwrap();
    assert_eq!(config.interval_secs, Some(30));

    env::remove_var(CONFIG_FILE_ENV);
}

#[test]
fn test_initializer_database_path() {
    let root = PathBuf::from("/tmp/pxm-test-root");
    let initializer = RootFolderInitializer::new(root.clone());

    assert_eq!(initializer.database_path(), root.join("pxm.db"));
}

#[test]
fn test_initializer_creates_directory() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("nested").join("root");
    let initializer = RootFolderInitializer::new(root.clone());

    initializer.ensure_directory_exists().unwrap();
    assert!(root.is_dir());
    assert!(!initializer.database_exists());
}

#[test]
fn test_resolve_database_path_priority() {
    let root = Path::new("/tmp/pxm-root");
    let toml = TomlConfig::parse("database_path = \"/tmp/from-toml.db\"").unwrap();

    assert_eq!(
        resolve_database_path(Some(Path::new("/tmp/cli.db")), &toml, root),
        PathBuf::from("/tmp/cli.db")
    );
    assert_eq!(
        resolve_database_path(None, &toml, root),
        PathBuf::from("/tmp/from-toml.db")
    );
    assert_eq!(
        resolve_database_path(None, &TomlConfig::default(), root),
        root.join("pxm.db")
    );
}
