//! Persisted collector settings
//!
//! The collector URL and credential entered by a user survive restarts in a
//! small JSON document keyed by `METLO_URL_KEY` / `METLO_API_KEY`.

use std::path::{Path, PathBuf};

use contracts::{ContractError, RelayConfig};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Stored key for the collector URL
pub const URL_KEY: &str = "METLO_URL_KEY";

/// Stored key for the collector credential
pub const API_KEY: &str = "METLO_API_KEY";

/// Collector URL and credential as persisted
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSettings {
    #[serde(rename = "METLO_URL_KEY", default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(rename = "METLO_API_KEY", default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl StoredSettings {
    /// Both values present and non-empty
    pub fn is_complete(&self) -> bool {
        let filled = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        filled(&self.url) && filled(&self.api_key)
    }

    /// Overwrite the collector section with whatever is stored
    pub fn apply(&self, config: &mut RelayConfig) {
        if let Some(url) = &self.url {
            config.collector.url = url.clone();
        }
        if let Some(key) = &self.api_key {
            config.collector.api_key = key.clone();
        }
    }
}

impl From<&RelayConfig> for StoredSettings {
    fn from(config: &RelayConfig) -> Self {
        Self {
            url: Some(config.collector.url.clone()),
            api_key: Some(config.collector.api_key.clone()),
        }
    }
}

/// JSON file holding [`StoredSettings`]
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<config dir>/trace-relay/settings.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("trace-relay").join("settings.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load stored settings; a missing file yields empty settings
    ///
    /// # Errors
    /// File unreadable or not valid JSON
    pub fn load(&self) -> Result<StoredSettings, ContractError> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "No stored settings");
            return Ok(StoredSettings::default());
        }

        let content = std::fs::read_to_string(&self.path)?;
        serde_json::from_str(&content).map_err(|e| ContractError::ConfigParse {
            message: format!("settings file '{}': {e}", self.path.display()),
            source: Some(Box::new(e)),
        })
    }

    /// Persist settings, creating parent directories as needed
    ///
    /// # Errors
    /// Directory creation or write failure
    pub fn save(&self, settings: &StoredSettings) -> Result<(), ContractError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(settings)
            .map_err(|e| ContractError::config_parse(format!("JSON serialize error: {e}")))?;
        std::fs::write(&self.path, json)?;

        info!(path = %self.path.display(), "Collector settings saved");
        Ok(())
    }
}
