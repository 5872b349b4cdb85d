use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::conversation::ReplyOrder;
use crate::events::SessionIdentity;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_APP_NAME: &str = "doc-test-model";
pub const DEFAULT_USER_ID: &str = "0";
pub const DEFAULT_SESSION_ID: &str = "1";

const BASE_URL_ENV: &str = "AGENTCHAT_BASE_URL";
const APP_NAME_ENV: &str = "AGENTCHAT_APP_NAME";

/// Main application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Agent server root, e.g. `http://localhost:8000`
    pub base_url: String,

    /// Agent application the sessions belong to
    pub app_name: String,

    pub user_id: String,

    pub session_id: String,

    /// Per-request timeout in seconds, 0 disables it
    pub request_timeout_secs: u64,

    /// How reply fragments are joined into one message
    pub reply_order: ReplyOrder,

    /// UI preferences
    pub ui: UiConfig,
}

/// UI configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub title: String,
    pub show_timestamps: bool,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            title: "agentchat".to_string(),
            show_timestamps: true,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            base_url: DEFAULT_BASE_URL.to_string(),
            app_name: DEFAULT_APP_NAME.to_string(),
            user_id: DEFAULT_USER_ID.to_string(),
            session_id: DEFAULT_SESSION_ID.to_string(),
            request_timeout_secs: 120,
            reply_order: ReplyOrder::default(),
            ui: UiConfig::default(),
        }
    }
}

impl Config {
    /// Directory holding the config file and the log
    pub fn home_dir() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not find home directory")?;
        Ok(home.join(".agentchat"))
    }

    /// Default location of the config file
    pub fn default_path() -> Result<PathBuf> {
        Ok(Self::home_dir()?.join("config.toml"))
    }

    /// Load configuration from `path` (or the default location) and apply
    /// environment overrides. A missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::default_path()?,
        };

        let mut config = Self::from_file(&path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Read a config file without applying any overrides
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Save configuration to `path` (or the default location)
    pub fn save(&self, path: Option<&Path>) -> Result<PathBuf> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::default_path()?,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&path, content).context("Failed to write config file")?;

        Ok(path)
    }

    fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(base_url) = lookup(BASE_URL_ENV).filter(|v| !v.trim().is_empty()) {
            self.base_url = base_url;
        }
        if let Some(app_name) = lookup(APP_NAME_ENV).filter(|v| !v.trim().is_empty()) {
            self.app_name = app_name;
        }
    }

    /// Session identity described by this configuration
    pub fn identity(&self) -> Result<SessionIdentity> {
        SessionIdentity::new(&self.app_name, &self.user_id, &self.session_id)
            .context("Invalid session identity in configuration")
    }

    /// Per-request timeout, `None` when disabled
    pub fn request_timeout(&self) -> Option<Duration> {
        match self.request_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}
