//! Application configuration: YAML file plus environment overrides.

use std::path::Path;

use gitsync_directory::LdapConfig;
use gitsync_engine::SyncConfig;
use serde::Deserialize;

use crate::error::{AppError, AppResult};

const DEFAULT_CONFIG_PATH: &str = "./config/gitsync.yaml";

/// Complete configuration of the binary.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub gitlab: GitlabSettings,

    pub ldap: LdapConfig,

    #[serde(default)]
    pub sync: SyncConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Clone, Deserialize)]
pub struct GitlabSettings {
    /// Instance root or API root.
    pub url: String,

    /// Personal access token of the technical account.
    #[serde(default)]
    pub token: Option<String>,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl std::fmt::Debug for GitlabSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitlabSettings")
            .field("url", &self.url)
            .field("token", &self.token.as_ref().map(|_| "***REDACTED***"))
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

fn default_request_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl AppConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {}: {e}", path.display()))
        })?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> AppResult<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))
    }

    /// Path of the configuration file when `--config` is not given.
    #[must_use]
    pub fn config_path() -> String {
        std::env::var("GITSYNC_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string())
    }

    /// Apply `GITSYNC_*` environment variables on top of the file values.
    pub fn apply_env_overrides(&mut self) -> AppResult<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides<F>(&mut self, lookup: F) -> AppResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup("GITSYNC_GITLAB_TOKEN") {
            self.gitlab.token = Some(token);
        }
        if let Some(password) = lookup("GITSYNC_LDAP_PASSWORD") {
            self.ldap.bind_password = Some(password);
        }
        if let Some(value) = lookup("GITSYNC_DRY_RUN") {
            self.sync.dry_run = parse_flag(&value).ok_or_else(|| {
                AppError::Config(format!("GITSYNC_DRY_RUN must be true or false, got '{value}'"))
            })?;
        }
        Ok(())
    }

    /// Check every section before anything connects.
    pub fn validate(&self) -> AppResult<()> {
        if self.gitlab.url.trim().is_empty() {
            return Err(AppError::Config("gitlab.url is required".into()));
        }
        if self
            .gitlab
            .token
            .as_deref()
            .map_or(true, |t| t.trim().is_empty())
        {
            return Err(AppError::Config(
                "gitlab.token is required (or set GITSYNC_GITLAB_TOKEN)".into(),
            ));
        }
        if self.gitlab.request_timeout_secs == 0 {
            return Err(AppError::Config(
                "gitlab.request_timeout_secs must be positive".into(),
            ));
        }
        self.ldap
            .validate()
            .map_err(|e| AppError::Config(e.to_string()))?;
        self.sync
            .validate()
            .map_err(|e| AppError::Config(e.to_string()))?;
        Ok(())
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" | "" => Some(false),
        _ => None,
    }
}
