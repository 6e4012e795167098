//! Configuration types and structures.

use crate::permissions::DEFAULT_FEATURE_CODES;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Client configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub permissions: PermissionsConfig,

    #[serde(default)]
    pub session: SessionConfig,
}

/// Where and how to reach the Task API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL the resource paths hang off (e.g. `https://hr.example.com/api`).
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Bearer token sent with every request.
    #[serde(default)]
    pub token: Option<String>,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Page size for list requests.
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Append `/` to every resource path.
    #[serde(default)]
    pub trailing_slash: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            token: None,
            timeout_seconds: default_timeout(),
            page_size: default_page_size(),
            trailing_slash: false,
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8000/api".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_page_size() -> u32 {
    20
}

/// Which role permission entries govern tasks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermissionsConfig {
    #[serde(default = "default_feature_codes")]
    pub feature_codes: Vec<String>,
}

impl Default for PermissionsConfig {
    fn default() -> Self {
        Self {
            feature_codes: default_feature_codes(),
        }
    }
}

fn default_feature_codes() -> Vec<String> {
    DEFAULT_FEATURE_CODES.iter().map(|s| s.to_string()).collect()
}

/// Where the signed-in session document lives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_session_path")]
    pub path: PathBuf,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            path: default_session_path(),
        }
    }
}

fn default_session_path() -> PathBuf {
    PathBuf::from(".hr-task-desk/session.json")
}

impl Config {
    /// Load configuration from a single YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        // Empty or comment-only files parse as null
        let config: Option<Config> = serde_yaml::from_str(&content)?;
        Ok(config.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.api.page_size, 20);
        assert_eq!(config.api.timeout_seconds, 30);
        assert_eq!(
            config.permissions.feature_codes,
            vec!["task".to_string(), "task_management".to_string()]
        );
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config: Config = serde_yaml::from_str(
            r#"
api:
  base_url: https://hr.example.com/api
  trailing_slash: true
"#,
        )
        .unwrap();
        assert_eq!(config.api.base_url, "https://hr.example.com/api");
        assert!(config.api.trailing_slash);
        assert_eq!(config.api.page_size, 20);
        assert_eq!(config.session, SessionConfig::default());
    }
}
