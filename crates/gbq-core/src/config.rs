//! Configuration schema (gbq.toml)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default number of rows printed by `query`
pub const DEFAULT_QUERY_LIMIT: i64 = 10;

/// Default number of rows printed by `--sample`
pub const DEFAULT_SAMPLE_ROWS: i64 = 5;

/// Environment variable overriding the configured project
pub const PROJECT_ENV: &str = "GBQ_PROJECT";

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Google Cloud project used for billing and private datasets
    #[serde(default)]
    pub project: Option<String>,

    /// Row limit for `query` when `--limit` is not given
    #[serde(default = "default_query_limit")]
    pub query_limit: i64,

    /// Rows shown by `--sample`
    #[serde(default = "default_sample_rows")]
    pub sample_rows: i64,

    /// Service account key file; Application Default Credentials when unset
    #[serde(default)]
    pub credentials: Option<PathBuf>,
}

fn default_query_limit() -> i64 {
    DEFAULT_QUERY_LIMIT
}

fn default_sample_rows() -> i64 {
    DEFAULT_SAMPLE_ROWS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            project: None,
            query_limit: DEFAULT_QUERY_LIMIT,
            sample_rows: DEFAULT_SAMPLE_ROWS,
            credentials: None,
        }
    }
}

impl Config {
    /// Load config from TOML file
    ///
    /// A relative `credentials` path is resolved against the config file's
    /// directory.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(format!("{}: {}", path.display(), e)))?;

        let mut config = Self::from_toml(&contents)?;

        if let (Some(creds), Some(parent)) = (config.credentials.as_ref(), path.parent()) {
            if creds.is_relative() {
                config.credentials = Some(parent.join(creds));
            }
        }

        Ok(config)
    }

    /// Load config from TOML string
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml)
            .map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Apply the `GBQ_PROJECT` override, if set and non-blank
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(project) = std::env::var(PROJECT_ENV) {
            if !project.trim().is_empty() {
                self.project = Some(project);
            }
        }
        self
    }

    /// Resolve the active project: explicit flag first, then config/env
    pub fn project_or<'a>(&'a self, flag: Option<&'a str>) -> Option<&'a str> {
        flag.or(self.project.as_deref())
            .filter(|p| !p.trim().is_empty())
    }
}

/// Config error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.project, None);
        assert_eq!(config.query_limit, 10);
        assert_eq!(config.sample_rows, 5);
    }

    #[test]
    fn parse_partial_toml() {
        let config = Config::from_toml("project = \"my-proj\"\n").unwrap();
        assert_eq!(config.project.as_deref(), Some("my-proj"));
        assert_eq!(config.query_limit, DEFAULT_QUERY_LIMIT);
    }

    #[test]
    fn parse_full_toml() {
        let config = Config::from_toml(
            r#"
            project = "p"
            query_limit = 50
            sample_rows = 3
            credentials = "/keys/sa.json"
            "#,
        )
        .unwrap();
        assert_eq!(config.query_limit, 50);
        assert_eq!(config.sample_rows, 3);
        assert_eq!(config.credentials, Some(PathBuf::from("/keys/sa.json")));
    }

    #[test]
    fn invalid_toml_is_parse_error() {
        let err = Config::from_toml("query_limit = \"lots\"").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn flag_wins_over_config() {
        let config = Config {
            project: Some("from-config".to_string()),
            ..Config::default()
        };
        assert_eq!(config.project_or(Some("from-flag")), Some("from-flag"));
        assert_eq!(config.project_or(None), Some("from-config"));
        assert_eq!(Config::default().project_or(Some(" ")), None);
    }

    #[test]
    fn relative_credentials_resolve_against_config_dir() {
        let dir = std::env::temp_dir().join(format!("gbq-config-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("gbq.toml");
        std::fs::write(&path, "credentials = \"sa.json\"\n").unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.credentials, Some(dir.join("sa.json")));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = Config::from_file(Path::new("/definitely/not/here/gbq.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::IoError(_)));
    }
}
