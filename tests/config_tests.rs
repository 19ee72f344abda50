#![allow(clippy::unwrap_used, clippy::expect_used)]

use routeguard::config::{ConfigError, GuardConfig};
use routeguard::openapi::DocFormat;
use routeguard::router::DEFAULT_MAX_BODY_BYTES;
use routeguard::UnknownFields;
use std::fs;

#[test]
fn test_load_yaml() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("guard.yaml");
    fs::write(
        &path,
        r#"
validation:
  unknown_fields: strip
docs:
  title: Users API
  servers: ["http://localhost:8080"]
  format: yaml
auth:
  jwt_secret: change-me
"#,
    )
    .unwrap();

    let config = GuardConfig::load(&path).unwrap();
    assert_eq!(config.validation.unknown_fields, UnknownFields::Strip);
    assert_eq!(config.docs.title, "Users API");
    assert_eq!(config.docs.version, "1.0.0");
    assert_eq!(config.docs.servers, vec!["http://localhost:8080"]);
    assert_eq!(config.docs.format, DocFormat::Yaml);
    assert_eq!(config.http.max_body_bytes, DEFAULT_MAX_BODY_BYTES);
    assert_eq!(config.auth.jwt_secret.as_deref(), Some("change-me"));
}

#[test]
fn test_load_toml() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("guard.toml");
    fs::write(
        &path,
        r#"
[validation]
unknown_fields = "reject"

[http]
max_body_bytes = 4096
"#,
    )
    .unwrap();

    let config = GuardConfig::load(&path).unwrap();
    assert_eq!(config.validation.unknown_fields, UnknownFields::Reject);
    assert_eq!(config.http.max_body_bytes, 4096);
    assert_eq!(config.docs.format, DocFormat::Json);
}

#[test]
fn test_empty_yaml_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.yml");
    fs::write(&path, "{}\n").unwrap();
    assert_eq!(GuardConfig::load(&path).unwrap(), GuardConfig::default());
}

#[test]
fn test_load_errors() {
    let dir = tempfile::tempdir().unwrap();

    let missing = GuardConfig::load(dir.path().join("nope.yaml")).unwrap_err();
    assert!(matches!(missing, ConfigError::Io { .. }));

    let ini = dir.path().join("guard.ini");
    fs::write(&ini, "a=b").unwrap();
    assert!(matches!(
        GuardConfig::load(&ini).unwrap_err(),
        ConfigError::UnsupportedFormat { .. }
    ));

    let bad = dir.path().join("bad.yaml");
    fs::write(&bad, "validation:\n  unknown_fields: sometimes\n").unwrap();
    let err = GuardConfig::load(&bad).unwrap_err();
    assert!(matches!(err, ConfigError::Yaml { .. }));
    assert!(err.to_string().contains("bad.yaml"));
}

#[test]
fn test_env_overrides_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("guard.yaml");
    fs::write(&path, "docs:\n  format: json\n").unwrap();

    let mut config = GuardConfig::load(&path).unwrap();
    config
        .apply_env_from(|key| match key {
            "ROUTEGUARD_DOCS_FORMAT" => Some("YAML".to_string()),
            "ROUTEGUARD_UNKNOWN_FIELDS" => Some("strip".to_string()),
            _ => None,
        })
        .unwrap();
    assert_eq!(config.docs.format, DocFormat::Yaml);
    assert_eq!(config.validation.unknown_fields, UnknownFields::Strip);

    let err = config
        .apply_env_from(|key| (key == "ROUTEGUARD_UNKNOWN_FIELDS").then(|| "maybe".to_string()))
        .unwrap_err();
    assert!(err.to_string().contains("ROUTEGUARD_UNKNOWN_FIELDS"));
}
