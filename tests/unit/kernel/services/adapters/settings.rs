use super::*;

#[test]
fn test_missing_config_file_yields_defaults() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config = load_config_from(&temp_dir.path().join("absent.json")).unwrap();
    assert_eq!(config, TreeConfig::default());
}

#[test]
fn test_config_file_overrides_defaults() {
    let temp_dir = tempfile::tempdir().unwrap();
    let path = temp_dir.path().join("config.json");
    std::fs::write(
        &path,
        r#"{ "grace_window_ms": 500, "case_sensitive_sort": true }"#,
    )
    .unwrap();

    let config = load_config_from(&path).unwrap();
    assert_eq!(config.grace_window_ms, 500);
    assert!(config.case_sensitive_sort);
    assert_eq!(config.scan_chunk_size, TreeConfig::default().scan_chunk_size);
}

#[test]
fn test_malformed_config_is_a_parse_error() {
    let temp_dir = tempfile::tempdir().unwrap();
    let path = temp_dir.path().join("config.json");
    std::fs::write(&path, "{ grace_window_ms: ").unwrap();

    let err = load_config_from(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
    assert!(err.to_string().contains("config.json"));
}

#[test]
fn test_default_file_is_written_once() {
    let temp_dir = tempfile::tempdir().unwrap();
    let path = temp_dir.path().join("nested").join("config.json");

    write_default_if_missing(&path).unwrap();
    assert_eq!(load_config_from(&path).unwrap(), TreeConfig::default());

    std::fs::write(&path, r#"{ "grace_window_ms": 7 }"#).unwrap();
    write_default_if_missing(&path).unwrap();
    assert_eq!(load_config_from(&path).unwrap().grace_window_ms, 7);
}

#[test]
fn test_configured_log_dir_is_created() {
    let temp_dir = tempfile::tempdir().unwrap();
    let wanted = temp_dir.path().join("logs").join("projtree");
    let config = TreeConfig {
        log_dir: Some(wanted.clone()),
        ..TreeConfig::default()
    };

    let dir = resolve_log_dir(&config).unwrap();
    assert_eq!(dir, wanted);
    assert!(dir.is_dir());
    assert_eq!(resolve_log_dir(&config).unwrap(), wanted);
}

#[test]
fn test_log_dir_that_is_a_file_is_an_error() {
    let temp_dir = tempfile::tempdir().unwrap();
    let file = temp_dir.path().join("taken");
    std::fs::write(&file, "x").unwrap();
    let config = TreeConfig {
        log_dir: Some(file),
        ..TreeConfig::default()
    };
    assert!(resolve_log_dir(&config).is_err());
}
