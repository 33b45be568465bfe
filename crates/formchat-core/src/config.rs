//! Configuration types and loading for formchat.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::Error;
use crate::error::Result;

/// Default backend origin.
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Origin of the chat/forms backend.
    pub api_url: String,

    /// Per-request timeout in seconds. Requests never time out when unset.
    pub request_timeout_secs: Option<u64>,

    /// Log file for the terminal UI (defaults to the XDG state dir).
    pub log_file: Option<PathBuf>,

    /// Terminal UI configuration.
    pub tui: TuiConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            request_timeout_secs: None,
            log_file: None,
            tui: TuiConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a specific file.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {e}")))?;
        config.expand_paths();
        config.apply_env_overrides();
        Ok(config)
    }

    /// Get the default config file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(crate::APP_NAME)
            .join("config.toml")
    }

    /// Save configuration to a specific file path.
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Ensure config exists at the given path, creating defaults if missing.
    pub fn ensure_at(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load_from_path(path)
        } else {
            let mut config = Self::default();
            config.save_to_path(path)?;
            config.apply_env_overrides();
            Ok(config)
        }
    }

    /// Expand a path, replacing ~ with home directory.
    pub fn expand_path(path: &str) -> PathBuf {
        let expanded = shellexpand::full(path)
            .map(|v| v.into_owned())
            .unwrap_or_else(|_| path.to_string());
        PathBuf::from(expanded)
    }

    fn expand_paths(&mut self) {
        self.log_file = self
            .log_file
            .as_ref()
            .map(|p| Self::expand_path(&p.to_string_lossy()));
    }

    /// Apply `FORMCHAT_*` environment overrides.
    pub fn apply_env_overrides(&mut self) {
        let key = format!("{}_API_URL", crate::env_prefix());
        if let Ok(url) = std::env::var(key) {
            let url = url.trim();
            if !url.is_empty() {
                self.api_url = url.to_string();
            }
        }
    }

    /// Request timeout, if configured.
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    /// Log file used by the terminal UI.
    pub fn tui_log_path(&self) -> PathBuf {
        self.log_file
            .clone()
            .unwrap_or_else(crate::paths::tui_log_path)
    }
}

/// Terminal UI configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TuiConfig {
    /// Re-fetch the active view every N seconds (0 disables).
    pub refresh_interval_secs: u64,
}

impl Default for TuiConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: 0,
        }
    }
}

impl TuiConfig {
    pub fn refresh_interval(&self) -> Option<Duration> {
        if self.refresh_interval_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.refresh_interval_secs))
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
