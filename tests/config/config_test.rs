//! Coverage for config parsing, file loading and env overrides.

use std::fs;

use cardsync::config::{Config, CONFIG_PATH_ENV};
use cardsync::verification::RetryPolicy;

#[test]
fn defaults_point_at_public_apis() {
    let config = Config::default();
    assert_eq!(config.openai.base_url, "https://api.openai.com/");
    assert_eq!(config.notion.base_url, "https://api.notion.com/");
    assert_eq!(config.notion.api_version, "2022-06-28");
    assert!(config.notion.database_id.is_empty());
    assert_eq!(config.verification.retry_policy(), RetryPolicy::default());
    assert!((config.review.low_confidence_threshold - 0.7).abs() < f64::EPSILON);
    assert_eq!(config.logging.level, "info");
    assert!(config.logging.dir.is_none());
}

#[test]
fn parse_partial_config_keeps_other_defaults() {
    let toml_str = r#"
[notion]
database_id = "db-123"

[verification]
max_attempts = 5
"#;
    let config = match Config::from_toml(toml_str) {
        Ok(config) => config,
        Err(err) => panic!("partial config should parse: {err}"),
    };
    assert_eq!(config.notion.database_id, "db-123");
    assert_eq!(config.notion.api_version, "2022-06-28");
    assert_eq!(config.verification.max_attempts, 5);
    assert_eq!(config.verification.initial_backoff_ms, 500);
}

#[test]
fn wrongly_typed_values_are_rejected() {
    assert!(Config::from_toml("[verification]\nmax_attempts = \"many\"\n").is_err());
}

#[test]
fn load_from_missing_file_uses_defaults() {
    let tmp = tempfile::tempdir().expect("should create temp dir");
    let config = match Config::load_from(&tmp.path().join("config.toml")) {
        Ok(config) => config,
        Err(err) => panic!("missing file should yield defaults: {err}"),
    };
    assert_eq!(config.logging.level, "info");
}

#[test]
fn load_from_reports_invalid_file() {
    let tmp = tempfile::tempdir().expect("should create temp dir");
    let path = tmp.path().join("config.toml");
    assert!(fs::write(&path, "[notion\n").is_ok());
    assert!(Config::load_from(&path).is_err());
}

#[test]
fn load_with_reads_path_from_env_and_applies_overrides() {
    let tmp = tempfile::tempdir().expect("should create temp dir");
    let path = tmp.path().join("cardsync.toml");
    assert!(fs::write(
        &path,
        "[notion]\ndatabase_id = \"from-file\"\n\n[logging]\nlevel = \"warn\"\n"
    )
    .is_ok());

    let path_str = path.display().to_string();
    let env = move |key: &str| match key {
        CONFIG_PATH_ENV => Some(path_str.clone()),
        "CARDSYNC_NOTION_DATABASE_ID" => Some("from-env".to_owned()),
        "CARDSYNC_VERIFY_ATTEMPTS" => Some("7".to_owned()),
        _ => None,
    };
    let config = match Config::load_with(env) {
        Ok(config) => config,
        Err(err) => panic!("config should load: {err}"),
    };
    assert_eq!(config.notion.database_id, "from-env");
    assert_eq!(config.verification.max_attempts, 7);
    assert_eq!(config.logging.level, "warn");
}

#[test]
fn invalid_numeric_override_is_ignored() {
    let mut config = Config::default();
    config.apply_overrides(|key| (key == "CARDSYNC_VERIFY_ATTEMPTS").then(|| "lots".to_owned()));
    assert_eq!(config.verification.max_attempts, 3);
}

#[test]
fn log_dir_override_enables_file_logging() {
    let mut config = Config::default();
    config.apply_overrides(|key| {
        (key == "CARDSYNC_LOG_DIR").then(|| "/tmp/cardsync-logs".to_owned())
    });
    assert_eq!(
        config.logging.dir.as_deref(),
        Some(std::path::Path::new("/tmp/cardsync-logs"))
    );
}
