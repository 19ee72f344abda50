//! # Configuration
//!
//! [`GuardConfig`] gathers the knobs of the validation layer. It is loaded
//! from a YAML or TOML file (chosen by extension) and then overridden from the
//! environment.
//!
//! ## File format
//!
//! ```yaml
//! validation:
//!   unknown_fields: strip      # passthrough | strip | reject
//! http:
//!   max_body_bytes: 1048576
//! docs:
//!   title: Users API
//!   version: 1.0.0
//!   servers: ["http://localhost:8080"]
//!   format: yaml               # json | yaml
//! auth:
//!   jwt_secret: change-me
//! ```
//!
//! Every section and key is optional.
//!
//! ## Environment Variables
//!
//! | Variable                     | Overrides                   |
//! |------------------------------|-----------------------------|
//! | `ROUTEGUARD_UNKNOWN_FIELDS`  | `validation.unknown_fields` |
//! | `ROUTEGUARD_MAX_BODY_BYTES`  | `http.max_body_bytes`       |
//! | `ROUTEGUARD_DOCS_FORMAT`     | `docs.format`               |
//! | `ROUTEGUARD_JWT_SECRET`      | `auth.jwt_secret`           |

use crate::coerce::UnknownFields;
use crate::openapi::DocFormat;
use crate::router::DEFAULT_MAX_BODY_BYTES;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    pub unknown_fields: UnknownFields,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub max_body_bytes: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        HttpConfig {
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocsConfig {
    pub title: String,
    pub version: String,
    pub servers: Vec<String>,
    pub format: DocFormat,
}

impl Default for DocsConfig {
    fn default() -> Self {
        DocsConfig {
            title: "API".to_string(),
            version: "1.0.0".to_string(),
            servers: Vec::new(),
            format: DocFormat::Json,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub jwt_secret: Option<String>,
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    pub validation: ValidationConfig,
    pub http: HttpConfig,
    pub docs: DocsConfig,
    pub auth: AuthConfig,
}

/// Configuration loading failure.
#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Yaml { path: PathBuf, source: serde_yaml::Error },
    Toml { path: PathBuf, source: toml::de::Error },
    UnsupportedFormat { path: PathBuf },
    InvalidEnv { var: &'static str, reason: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(f, "failed to read config {}: {source}", path.display())
            }
            ConfigError::Yaml { path, source } => {
                write!(f, "invalid YAML in {}: {source}", path.display())
            }
            ConfigError::Toml { path, source } => {
                write!(f, "invalid TOML in {}: {source}", path.display())
            }
            ConfigError::UnsupportedFormat { path } => write!(
                f,
                "unsupported config format for {} (expected .yaml, .yml or .toml)",
                path.display()
            ),
            ConfigError::InvalidEnv { var, reason } => write!(f, "invalid {var}: {reason}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Yaml { source, .. } => Some(source),
            ConfigError::Toml { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl GuardConfig {
    /// Parse a config file; `.yaml`/`.yml` as YAML, `.toml` as TOML.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for unreadable files, parse errors and unknown
    /// extensions.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        match ext.as_deref() {
            Some("yaml") | Some("yml") => {
                serde_yaml::from_str(&content).map_err(|source| ConfigError::Yaml {
                    path: path.to_path_buf(),
                    source,
                })
            }
            Some("toml") => toml::from_str(&content).map_err(|source| ConfigError::Toml {
                path: path.to_path_buf(),
                source,
            }),
            _ => Err(ConfigError::UnsupportedFormat {
                path: path.to_path_buf(),
            }),
        }
    }

    /// Apply `ROUTEGUARD_*` overrides from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidEnv`] for unparsable values.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides read through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidEnv`] for unparsable values.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("ROUTEGUARD_UNKNOWN_FIELDS") {
            self.validation.unknown_fields =
                v.parse().map_err(|reason| ConfigError::InvalidEnv {
                    var: "ROUTEGUARD_UNKNOWN_FIELDS",
                    reason,
                })?;
        }
        if let Some(v) = lookup("ROUTEGUARD_MAX_BODY_BYTES") {
            self.http.max_body_bytes =
                v.trim()
                    .parse()
                    .map_err(|e: std::num::ParseIntError| ConfigError::InvalidEnv {
                        var: "ROUTEGUARD_MAX_BODY_BYTES",
                        reason: e.to_string(),
                    })?;
        }
        if let Some(v) = lookup("ROUTEGUARD_DOCS_FORMAT") {
            self.docs.format = v.parse().map_err(|reason| ConfigError::InvalidEnv {
                var: "ROUTEGUARD_DOCS_FORMAT",
                reason,
            })?;
        }
        if let Some(v) = lookup("ROUTEGUARD_JWT_SECRET") {
            self.auth.jwt_secret = Some(v);
        }
        Ok(())
    }

    /// Load `path` when given (defaults otherwise), then apply the environment.
    ///
    /// # Errors
    ///
    /// Propagates [`GuardConfig::load`] and [`GuardConfig::apply_env`] errors.
    pub fn resolve(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(p) => Self::load(p)?,
            None => Self::default(),
        };
        config.apply_env()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = GuardConfig::default();
        assert_eq!(config.validation.unknown_fields, UnknownFields::Passthrough);
        assert_eq!(config.http.max_body_bytes, DEFAULT_MAX_BODY_BYTES);
        assert_eq!(config.docs.format, DocFormat::Json);
        assert!(config.auth.jwt_secret.is_none());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("ROUTEGUARD_UNKNOWN_FIELDS", "reject"),
            ("ROUTEGUARD_MAX_BODY_BYTES", "2048"),
            ("ROUTEGUARD_DOCS_FORMAT", "yaml"),
            ("ROUTEGUARD_JWT_SECRET", "s3cret"),
        ]);
        let mut config = GuardConfig::default();
        config
            .apply_env_from(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.validation.unknown_fields, UnknownFields::Reject);
        assert_eq!(config.http.max_body_bytes, 2048);
        assert_eq!(config.docs.format, DocFormat::Yaml);
        assert_eq!(config.auth.jwt_secret.as_deref(), Some("s3cret"));
    }

    #[test]
    fn test_invalid_env_value() {
        let mut config = GuardConfig::default();
        let err = config
            .apply_env_from(|k| (k == "ROUTEGUARD_MAX_BODY_BYTES").then(|| "lots".to_string()))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidEnv {
                var: "ROUTEGUARD_MAX_BODY_BYTES",
                ..
            }
        ));
    }
}
