//! Configuration loader with tier-based merging.

use super::merge::deep_merge_all;
use super::types::Config;
use anyhow::Result;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::warn;

pub const ENV_CONFIG_PATH: &str = "HR_TASK_DESK_CONFIG_PATH";
pub const ENV_PROJECT_DIR: &str = "HR_TASK_DESK_PROJECT_DIR";
pub const ENV_USER_DIR: &str = "HR_TASK_DESK_USER_DIR";
pub const ENV_API_URL: &str = "HR_TASK_DESK_API_URL";
pub const ENV_TOKEN: &str = "HR_TASK_DESK_TOKEN";
pub const ENV_SESSION: &str = "HR_TASK_DESK_SESSION";
pub const ENV_PAGE_SIZE: &str = "HR_TASK_DESK_PAGE_SIZE";

/// Configuration tier priority (lowest to highest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConfigTier {
    Defaults = 0,
    /// `$CWD/hr-task-desk/config.yaml`
    Project = 1,
    /// `~/.hr-task-desk/config.yaml`
    User = 2,
    Environment = 3,
}

impl std::fmt::Display for ConfigTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigTier::Defaults => write!(f, "defaults"),
            ConfigTier::Project => write!(f, "project"),
            ConfigTier::User => write!(f, "user"),
            ConfigTier::Environment => write!(f, "environment"),
        }
    }
}

/// Directories searched for `config.yaml`.
#[derive(Debug, Clone)]
pub struct ConfigPaths {
    pub project_dir: Option<PathBuf>,
    pub user_dir: Option<PathBuf>,
}

impl Default for ConfigPaths {
    fn default() -> Self {
        Self::discover()
    }
}

impl ConfigPaths {
    /// Discover configuration paths from environment and defaults.
    pub fn discover() -> Self {
        let user_dir = std::env::var(ENV_USER_DIR)
            .ok()
            .map(PathBuf::from)
            .or_else(|| dirs::home_dir().map(|h| h.join(".hr-task-desk")));

        let project_dir = std::env::var(ENV_PROJECT_DIR)
            .ok()
            .map(PathBuf::from)
            .or_else(|| Some(PathBuf::from("hr-task-desk")));

        Self {
            project_dir,
            user_dir,
        }
    }

    pub fn with_dirs(project_dir: Option<PathBuf>, user_dir: Option<PathBuf>) -> Self {
        Self {
            project_dir,
            user_dir,
        }
    }
}

/// Loads and merges configuration from every tier.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    pub paths: ConfigPaths,
    config: Config,
    /// Highest-priority file that contributed, if any.
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    /// Load configuration from all tiers, reading overrides from the process environment.
    pub fn load() -> Result<Self> {
        Self::load_with(ConfigPaths::discover(), |key| std::env::var(key).ok())
    }

    /// Load configuration with explicit paths and no environment tier.
    pub fn load_with_paths(paths: ConfigPaths) -> Result<Self> {
        Self::load_with(paths, |_| None)
    }

    /// Load configuration with explicit paths and an environment lookup.
    pub fn load_with<F>(paths: ConfigPaths, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(explicit) = env(ENV_CONFIG_PATH) {
            let path = PathBuf::from(explicit);
            let mut config = Config::load(&path)?;
            apply_env_overrides(&mut config, &env);
            return Ok(Self {
                paths,
                config,
                config_path: Some(path),
            });
        }

        let mut tiers: Vec<Value> = Vec::new();
        if let Ok(defaults) = serde_json::to_value(Config::default()) {
            tiers.push(defaults);
        }

        let mut config_path = None;
        for (tier, dir) in [
            (ConfigTier::Project, paths.project_dir.as_deref()),
            (ConfigTier::User, paths.user_dir.as_deref()),
        ] {
            let Some(dir) = dir else { continue };
            if let Some(value) = read_tier(tier, &dir.join("config.yaml")) {
                tiers.push(value);
                config_path = Some(dir.join("config.yaml"));
            }
        }

        let merged = deep_merge_all(tiers);
        let mut config: Config = serde_json::from_value(merged)?;
        apply_env_overrides(&mut config, &env);

        Ok(Self {
            paths,
            config,
            config_path,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    pub fn into_config(self) -> Config {
        self.config
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }
}

/// Parse one tier's file. Unreadable or malformed files are skipped with a warning.
fn read_tier(tier: ConfigTier, file: &Path) -> Option<Value> {
    if !file.exists() {
        return None;
    }
    let content = match std::fs::read_to_string(file) {
        Ok(content) => content,
        Err(e) => {
            warn!(%tier, file = %file.display(), error = %e, "skipping unreadable config");
            return None;
        }
    };
    match serde_yaml::from_str::<Value>(&content) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(%tier, file = %file.display(), error = %e, "skipping malformed config");
            None
        }
    }
}

fn apply_env_overrides<F>(config: &mut Config, env: &F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = env(ENV_API_URL) {
        config.api.base_url = url;
    }
    if let Some(token) = env(ENV_TOKEN) {
        config.api.token = Some(token);
    }
    if let Some(session) = env(ENV_SESSION) {
        config.session.path = PathBuf::from(session);
    }
    if let Some(size) = env(ENV_PAGE_SIZE) {
        match size.parse() {
            Ok(size) => config.api.page_size = size,
            Err(_) => warn!(value = %size, "ignoring invalid {}", ENV_PAGE_SIZE),
        }
    }
}
