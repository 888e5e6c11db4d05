use galley_core::config::{dirs_path, GlobalConfig};

#[test]
fn test_global_config_defaults() {
    let config = GlobalConfig::default();
    assert_eq!(config.repository.name, "local");
    assert_eq!(config.repository.dir, "~/.galley/repository");
    assert_eq!(config.log.filter, "warn");
    assert!(config.default_universe.is_none());
}

#[test]
fn test_global_config_empty_toml_uses_defaults() {
    let config: GlobalConfig = toml::from_str("").unwrap();
    assert_eq!(config.log.filter, "warn");
    assert_eq!(config.repository.name, "local");
}

#[test]
fn test_dirs_path_contains_galley() {
    assert!(dirs_path().ends_with(".galley"));
}

#[test]
fn test_repository_root_expands_home() {
    let config = GlobalConfig::default();
    let root = config.repository_root();
    assert!(root.ends_with(".galley/repository"));
    assert!(!root.to_string_lossy().starts_with('~'));
}

#[test]
fn test_global_config_parse_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
default-universe = "implicit"

[repository]
dir = "/srv/galley"

[log]
filter = "galley=debug"
"#,
    )
    .unwrap();
    let config = GlobalConfig::load_from(&path).unwrap();
    assert_eq!(config.default_universe.as_deref(), Some("implicit"));
    assert_eq!(config.repository_root(), std::path::PathBuf::from("/srv/galley"));
    assert_eq!(config.log.filter, "galley=debug");
}

#[test]
fn test_missing_file_gives_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = GlobalConfig::load_from(&dir.path().join("missing.toml")).unwrap();
    assert_eq!(config.repository.name, "local");
}
