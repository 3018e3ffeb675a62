//! # Repo Sync Configuration
//!
//! Loads configuration from environment variables or a TOML file.
//!
//! # Environment Variables
//! - `GH_USERNAME`: owner whose repositories are mirrored (required)
//! - `GH_PAT`: GitHub personal access token (required)
//! - `REPO_SYNC_API_BASE_URL`: API root (default: "https://api.github.com")
//! - `REPO_SYNC_SNAPSHOT_PATH`: mirror snapshot file (default: "data.json")
//! - `REPO_SYNC_PORT`: front end port (default: 3000)
//! - `REPO_SYNC_MAX_CONCURRENCY`: repositories fetched at once (default: 8)
//! - `REPO_SYNC_TIMEOUT_SECONDS`: per-request timeout (default: 30)
//! - `REPO_SYNC_COMMIT_PREFIX`: commit message prefix for marker writes

use crate::error::{RepoSyncError, RepoSyncResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use validator::Validate;

#[derive(Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct RepoSyncConfig {
    /// Account whose repositories are mirrored
    #[validate(length(min = 1, max = 100))]
    pub owner: String,

    /// Personal access token used for every API call
    #[validate(length(min = 1))]
    pub api_token: String,

    #[serde(default = "default_api_base_url")]
    #[validate(length(min = 1))]
    pub api_base_url: String,

    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: PathBuf,

    #[serde(default = "default_listen_port")]
    #[validate(range(min = 1, max = 65535))]
    pub listen_port: u16,

    /// Upper bound on repositories whose marker files are fetched at once
    #[serde(default = "default_max_concurrency")]
    #[validate(range(min = 1, max = 64))]
    pub max_concurrency: usize,

    #[serde(default = "default_request_timeout")]
    #[validate(range(min = 1, max = 300))]
    pub request_timeout_seconds: u64,

    #[serde(default = "default_commit_message_prefix")]
    #[validate(length(min = 1))]
    pub commit_message_prefix: String
}

fn default_api_base_url() -> String {
    "https://api.github.com".to_string()
}

fn default_snapshot_path() -> PathBuf {
    PathBuf::from("data.json")
}

fn default_listen_port() -> u16 {
    3000
}

fn default_max_concurrency() -> usize {
    8
}

fn default_request_timeout() -> u64 {
    30
}

fn default_commit_message_prefix() -> String {
    "GitHub Repo Manager Settings Update".to_string()
}

impl Default for RepoSyncConfig {
    fn default() -> Self {
        Self {
            owner: String::new(),
            api_token: String::new(),
            api_base_url: default_api_base_url(),
            snapshot_path: default_snapshot_path(),
            listen_port: default_listen_port(),
            max_concurrency: default_max_concurrency(),
            request_timeout_seconds: default_request_timeout(),
            commit_message_prefix: default_commit_message_prefix()
        }
    }
}

impl fmt::Debug for RepoSyncConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepoSyncConfig")
            .field("owner", &self.owner)
            .field("api_token", &"<redacted>")
            .field("api_base_url", &self.api_base_url)
            .field("snapshot_path", &self.snapshot_path)
            .field("listen_port", &self.listen_port)
            .field("max_concurrency", &self.max_concurrency)
            .field("request_timeout_seconds", &self.request_timeout_seconds)
            .field("commit_message_prefix", &self.commit_message_prefix)
            .finish()
    }
}

impl RepoSyncConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn check(&self) -> RepoSyncResult<()> {
        self.validate()
            .map_err(|e| RepoSyncError::ConfigError(e.to_string()))
    }
}

/// Load configuration from environment variables, falling back to defaults
/// for everything except the owner and token.
pub fn load_from_env() -> RepoSyncResult<RepoSyncConfig> {
    let defaults = RepoSyncConfig::default();
    let config = RepoSyncConfig {
        owner: env::var("GH_USERNAME").unwrap_or_default(),
        api_token: env::var("GH_PAT").unwrap_or_default(),
        api_base_url: env::var("REPO_SYNC_API_BASE_URL").unwrap_or(defaults.api_base_url),
        snapshot_path: env::var("REPO_SYNC_SNAPSHOT_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.snapshot_path),
        listen_port: parse_env("REPO_SYNC_PORT")?.unwrap_or(defaults.listen_port),
        max_concurrency: parse_env("REPO_SYNC_MAX_CONCURRENCY")?
            .unwrap_or(defaults.max_concurrency),
        request_timeout_seconds: parse_env("REPO_SYNC_TIMEOUT_SECONDS")?
            .unwrap_or(defaults.request_timeout_seconds),
        commit_message_prefix: env::var("REPO_SYNC_COMMIT_PREFIX")
            .unwrap_or(defaults.commit_message_prefix)
    };

    Ok(config)
}

/// Load configuration from a TOML file.
pub fn load_from_toml(path: &Path) -> RepoSyncResult<RepoSyncConfig> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        RepoSyncError::ConfigError(format!("Failed to read {}: {}", path.display(), e))
    })?;

    toml::from_str(&contents).map_err(|e| RepoSyncError::ConfigError(e.to_string()))
}

fn parse_env<T>(key: &str) -> RepoSyncResult<Option<T>>
where
    T: std::str::FromStr,
    T::Err: fmt::Display
{
    match env::var(key) {
        Ok(s) => s
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| RepoSyncError::ConfigError(format!("{}: {}", key, e))),
        Err(_) => Ok(None)
    }
}
