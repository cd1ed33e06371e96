use std::path::PathBuf;

use jakartify_config::{ConfigError, MigrationConfig};
use pretty_assertions::assert_eq;

#[test]
fn loads_full_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("jakartify.toml");
    std::fs::write(
        &path,
        r#"
profile = "ee"
excludes = ["*-legacy.jar", "WEB-INF/lib/keep/*"]
enable_default_excludes = false
match_excludes_against_path_name = true
zip_in_memory = true

[cache]
dir = "cache"
retention_days = 7

[logging]
level = "debug"
json = true
"#,
    )
    .unwrap();

    let config = MigrationConfig::load_from_path(&path).unwrap();
    config.validate().unwrap();

    assert_eq!(config.resolve_profile().unwrap().name(), "EE");
    assert_eq!(config.excludes, vec!["*-legacy.jar", "WEB-INF/lib/keep/*"]);
    assert!(!config.enable_default_excludes);
    assert!(config.match_excludes_against_path_name);
    assert!(config.zip_in_memory);
    assert_eq!(config.cache.dir, Some(dir.path().join("cache")));
    assert_eq!(config.cache.retention_days, 7);
    assert_eq!(config.logging.level, "debug");
    assert!(config.logging.json);
    assert!(config.logging.stderr);
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = MigrationConfig::load_from_path(dir.path().join("nope.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }), "{err:?}");
}

#[test]
fn unknown_profile_fails_validation() {
    let config = MigrationConfig::load_from_str("profile = \"JAKARTA\"").unwrap();
    let err = config.validate().unwrap_err();
    assert!(matches!(err, ConfigError::UnknownProfile(_)), "{err:?}");
    assert!(err.to_string().contains("JAKARTA"));
}

#[test]
fn invalid_glob_fails_validation() {
    let config = MigrationConfig::load_from_str("excludes = [\"lib/[unclosed\"]").unwrap();
    match config.validate().unwrap_err() {
        ConfigError::InvalidExclude { pattern, .. } => assert_eq!(pattern, "lib/[unclosed"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn unknown_nested_keys_are_rejected() {
    let err = MigrationConfig::load_from_str("[cache]\nttl = 3\n").unwrap_err();
    assert!(matches!(err, ConfigError::Toml(_)), "{err:?}");
}

#[test]
fn absolute_cache_dir_is_kept() {
    let dir = tempfile::tempdir().unwrap();
    let absolute = dir.path().join("elsewhere");
    let path = dir.path().join("jakartify.toml");
    std::fs::write(
        &path,
        format!("[cache]\ndir = {:?}\n", absolute.display().to_string()),
    )
    .unwrap();

    let config = MigrationConfig::load_from_path(&path).unwrap();
    assert_eq!(config.cache.dir, Some(PathBuf::from(&absolute)));
}
