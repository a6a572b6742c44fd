//! Runtime configuration.
//!
//! Values are resolved in order, later sources winning:
//! built-in defaults, the JSON config file in the user's config directory,
//! environment variables, then CLI flags (applied by the binary).
//!
//! - `PROJECT_COST_ARTIFACTS` - directory holding the model and lookup artifacts
//! - `PROJECT_COST_PORT` - HTTP port
//! - `PROJECT_COST_BIND` - HTTP bind address
//! - `PROJECT_COST_SESSION_IDLE_MINUTES` - minutes before an idle session is dropped

use std::fs;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

const APP_NAME: &str = "project-cost";
const CONFIG_FILE: &str = "config.json";
const LOCAL_ARTIFACTS: &str = "artifacts";

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_SESSION_IDLE_MINUTES: u64 = 120;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory with `model.json` and the lookup artifacts.
    pub artifacts_dir: PathBuf,
    pub port: u16,
    pub bind: IpAddr,
    pub session_idle_minutes: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            artifacts_dir: default_artifacts_dir(),
            port: DEFAULT_PORT,
            bind: IpAddr::from([127, 0, 0, 1]),
            session_idle_minutes: DEFAULT_SESSION_IDLE_MINUTES,
        }
    }
}

impl Config {
    /// Load the config file (if any) and apply environment overrides.
    /// An unreadable config file falls back to defaults.
    pub fn load() -> Self {
        let config = match config_path() {
            Some(path) => Self::from_file(&path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config, using defaults: {:#}", e);
                Self::default()
            }),
            None => Self::default(),
        };
        config.with_env(|key| std::env::var(key).ok())
    }

    /// Read a config file. A missing file yields the defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Apply overrides from an environment lookup. Unparsable values are ignored.
    pub fn with_env(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(dir) = var("PROJECT_COST_ARTIFACTS") {
            self.artifacts_dir = PathBuf::from(dir);
        }
        if let Some(port) = var("PROJECT_COST_PORT") {
            match port.parse() {
                Ok(port) => self.port = port,
                Err(_) => tracing::warn!("Ignoring invalid PROJECT_COST_PORT: {}", port),
            }
        }
        if let Some(bind) = var("PROJECT_COST_BIND") {
            match bind.parse() {
                Ok(bind) => self.bind = bind,
                Err(_) => tracing::warn!("Ignoring invalid PROJECT_COST_BIND: {}", bind),
            }
        }
        if let Some(minutes) = var("PROJECT_COST_SESSION_IDLE_MINUTES") {
            match minutes.parse() {
                Ok(minutes) => self.session_idle_minutes = minutes,
                Err(_) => tracing::warn!(
                    "Ignoring invalid PROJECT_COST_SESSION_IDLE_MINUTES: {}",
                    minutes
                ),
            }
        }
        self
    }

    pub fn session_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.session_idle_minutes.saturating_mul(60))
    }
}

fn config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().join(CONFIG_FILE))
}

/// `./artifacts` when run from a checkout that ships one, otherwise
/// `artifacts/` under the user's data directory.
fn default_artifacts_dir() -> PathBuf {
    let data_dir = directories::ProjectDirs::from("", "", APP_NAME)
        .map(|dirs| dirs.data_dir().join("artifacts"));
    pick_artifacts_dir(Path::new(LOCAL_ARTIFACTS), data_dir)
}

fn pick_artifacts_dir(local: &Path, data_dir: Option<PathBuf>) -> PathBuf {
    match data_dir {
        Some(dir) if !local.is_dir() => dir,
        _ => local.to_path_buf(),
    }
}
