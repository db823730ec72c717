//! Application configuration management.
//!
//! Holds the credential pair the login form is checked against, where the
//! session store lives, and the artificial login delay.
//!
//! Configuration is stored at `~/.config/iotdash/config.json`. Environment
//! variables (`IOTDASH_USERNAME`, `IOTDASH_PASSWORD`, `IOTDASH_DATA_DIR`)
//! take precedence over the file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Application name used for config/data directory paths
pub const APP_NAME: &str = "iotdash";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Delay before the credential comparison, only long enough to show a spinner.
const DEFAULT_LOGIN_DELAY_MS: u64 = 1000;

const ENV_USERNAME: &str = "IOTDASH_USERNAME";
const ENV_PASSWORD: &str = "IOTDASH_PASSWORD";
const ENV_DATA_DIR: &str = "IOTDASH_DATA_DIR";

/// The single operator account. Compared verbatim, this is not a secret store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthConfig {
    pub username: String,
    pub password: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            username: "charoenlap".to_string(),
            password: "Ch@roenlap89".to_string(),
        }
    }
}

fn default_login_delay_ms() -> u64 {
    DEFAULT_LOGIN_DELAY_MS
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    #[serde(default = "default_login_delay_ms")]
    pub login_delay_ms: u64,
    #[serde(default)]
    pub last_username: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            auth: AuthConfig::default(),
            data_dir: None,
            login_delay_ms: DEFAULT_LOGIN_DELAY_MS,
            last_username: None,
        }
    }
}

impl Config {
    /// Load from the default location, then apply environment overrides.
    pub fn load() -> Result<Self> {
        let path = Self::default_path()?;
        let mut config = Self::load_from(&path)?;
        config.apply_env();
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            let config = serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
            debug!(path = %path.display(), "Config loaded");
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::default_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from a variable lookup. Empty values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(username) = get(ENV_USERNAME) {
            self.auth.username = username;
        }
        if let Some(password) = get(ENV_PASSWORD) {
            self.auth.password = password;
        }
        if let Some(dir) = get(ENV_DATA_DIR) {
            self.data_dir = Some(PathBuf::from(dir));
        }
    }

    /// `<config_dir>/iotdash/config.json`
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Directory holding the persisted session keys and the log file.
    pub fn data_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.data_dir {
            return Ok(dir.clone());
        }
        let data_dir = dirs::data_local_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }

    pub fn login_delay(&self) -> Duration {
        Duration::from_millis(self.login_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("nope.json")).unwrap();
        assert_eq!(config.auth, AuthConfig::default());
        assert_eq!(config.login_delay_ms, 1000);
        assert!(config.data_dir.is_none());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"auth": {"username": "a", "password": "b"}}"#).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.auth.username, "a");
        assert_eq!(config.auth.password, "b");
        assert_eq!(config.login_delay(), Duration::from_secs(1));
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = Config {
            last_username: Some("operator".to_string()),
            login_delay_ms: 0,
            ..Config::default()
        };
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.last_username.as_deref(), Some("operator"));
        assert_eq!(loaded.login_delay_ms, 0);
    }

    #[test]
    fn test_garbage_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_overrides_skip_empty_values() {
        let mut config = Config::default();
        config.apply_overrides(|key| match key {
            "IOTDASH_USERNAME" => Some("ops".to_string()),
            "IOTDASH_PASSWORD" => Some(String::new()),
            "IOTDASH_DATA_DIR" => Some("/var/lib/iotdash".to_string()),
            _ => None,
        });
        assert_eq!(config.auth.username, "ops");
        assert_eq!(config.auth.password, AuthConfig::default().password);
        assert_eq!(config.data_dir().unwrap(), PathBuf::from("/var/lib/iotdash"));
    }
}
