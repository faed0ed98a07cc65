//! Application configuration management.
//!
//! This module handles loading and saving the application configuration,
//! which includes the API base URL, the session storage backend, and the last
//! used username.
//!
//! Configuration is stored at `~/.config/javahub/config.json`.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Application name used for config/data directory paths
pub const APP_NAME: &str = "javahub";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Server used when nothing else is configured
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8080";

/// Overrides `api_base_url` from the config file
pub const API_BASE_URL_ENV: &str = "JAVAHUB_API_BASE_URL";

/// HTTP request timeout in seconds.
/// The compiler endpoint compiles and runs code, so this is generous.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Where the session credential is persisted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    /// JSON file in the data directory
    #[default]
    File,
    /// OS keychain
    Keyring,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    pub api_base_url: Option<String>,
    pub last_username: Option<String>,
    #[serde(default)]
    pub storage: StorageKind,
    pub request_timeout_secs: Option<u64>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, contents)
            .with_context(|| format!("Failed to write config file {}", path.display()))?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Directory for the session file and logs
    pub fn data_dir(&self) -> Result<PathBuf> {
        let data_dir = dirs::data_local_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }

    /// Base URL from the environment, then the config file, then the default
    pub fn api_base_url(&self) -> String {
        resolve_base_url(
            std::env::var(API_BASE_URL_ENV).ok(),
            self.api_base_url.as_deref(),
        )
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(
            self.request_timeout_secs
                .filter(|secs| *secs > 0)
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        )
    }
}

fn resolve_base_url(from_env: Option<String>, configured: Option<&str>) -> String {
    from_env
        .filter(|url| !url.trim().is_empty())
        .or_else(|| configured.filter(|url| !url.trim().is_empty()).map(String::from))
        .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string())
        .trim()
        .trim_end_matches('/')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_resolve_base_url_precedence() {
        assert_eq!(resolve_base_url(None, None), DEFAULT_API_BASE_URL);
        assert_eq!(
            resolve_base_url(None, Some("https://hub.example.com/")),
            "https://hub.example.com"
        );
        assert_eq!(
            resolve_base_url(Some("http://10.0.0.5:8080".into()), Some("https://hub.example.com")),
            "http://10.0.0.5:8080"
        );
        assert_eq!(resolve_base_url(Some("  ".into()), None), DEFAULT_API_BASE_URL);
    }

    #[test]
    fn test_request_timeout_default() {
        let mut config = Config::default();
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        config.request_timeout_secs = Some(0);
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        config.request_timeout_secs = Some(5);
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_config_parses_partial_file() {
        let config: Config = serde_json::from_str(r#"{"last_username":"alice"}"#).unwrap();
        assert_eq!(config.last_username.as_deref(), Some("alice"));
        assert_eq!(config.storage, StorageKind::File);

        let config: Config = serde_json::from_str(r#"{"storage":"keyring"}"#).unwrap();
        assert_eq!(config.storage, StorageKind::Keyring);
    }
}
