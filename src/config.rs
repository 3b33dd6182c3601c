//! Configuration loading and management.

use crate::reconcile::OverlapPolicy;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Client configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub remote: RemoteConfig,

    #[serde(default)]
    pub sync: SyncConfig,

    #[serde(default)]
    pub session: SessionConfig,
}

/// Where the todo API lives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Base URL; collections are under `{api_url}/api/`.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Per-request timeout in seconds. Unset means requests may hang.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            timeout_secs: None,
        }
    }
}

impl RemoteConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

fn default_api_url() -> String {
    "http://localhost:8080".to_string()
}

/// Reorder persistence behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Only send items whose ordering key or status changed.
    #[serde(default = "default_skip_unchanged")]
    pub skip_unchanged: bool,

    #[serde(default)]
    pub overlap: OverlapPolicy,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            skip_unchanged: default_skip_unchanged(),
            overlap: OverlapPolicy::default(),
        }
    }
}

fn default_skip_unchanged() -> bool {
    true
}

/// Where the signed-in session is kept.
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

fn user_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".todo-board")
}

fn default_session_path() -> PathBuf {
    user_dir().join("session.json")
}

impl Config {
    /// Load configuration from file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Candidate config files, highest priority first.
    pub fn search_paths() -> Vec<PathBuf> {
        vec![
            PathBuf::from("todo-board/config.yaml"),
            user_dir().join("config.yaml"),
        ]
    }

    /// Load configuration from an explicit path, the default locations, or
    /// defaults, then apply environment overrides.
    ///
    /// An explicit path that cannot be loaded is an error; missing default
    /// files are skipped.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::load(path)?,
            None => Self::search_paths()
                .into_iter()
                .find(|p| p.exists())
                .map(|p| {
                    debug!(path = %p.display(), "Loading config");
                    Self::load(p)
                })
                .transpose()?
                .unwrap_or_default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply `TODO_BOARD_*` overrides. Unparseable values are ignored.
    pub fn apply_env<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = var("TODO_BOARD_API_URL") {
            self.remote.api_url = url;
        }

        if let Some(timeout) = var("TODO_BOARD_TIMEOUT") {
            if let Ok(timeout) = timeout.parse() {
                self.remote.timeout_secs = Some(timeout);
            }
        }

        if let Some(overlap) = var("TODO_BOARD_OVERLAP") {
            if let Some(overlap) = OverlapPolicy::from_str(&overlap) {
                self.sync.overlap = overlap;
            }
        }

        if let Some(path) = var("TODO_BOARD_SESSION_PATH") {
            self.session.path = PathBuf::from(path);
        }
    }
}
