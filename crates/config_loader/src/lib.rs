//! # Config Loader
//!
//! Configuration loading and parsing module.
//!
//! Responsibilities:
//! - Parse TOML/JSON relay configuration files
//! - Layer persisted settings, the credentials file and environment variables on top
//! - Validate configuration legality
//! - Generate `RelayConfig`
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let config = ConfigLoader::load_from_path(Path::new("relay.toml")).unwrap();
//! println!("Collector: {}", config.collector.url);
//! ```

mod overrides;
mod parser;
mod settings;
mod validator;

pub use contracts::RelayConfig;
pub use overrides::{CredentialOverrides, EnvOverlay};
pub use parser::ConfigFormat;
pub use settings::{SettingsStore, StoredSettings, API_KEY, URL_KEY};

use contracts::ContractError;
use std::path::Path;

/// Configuration loader
///
/// Provides static methods to load configuration from files or strings.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from file path
    ///
    /// Automatically detects format from file extension (.toml / .json).
    ///
    /// # Errors
    /// - File read failure
    /// - Unsupported format
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_path(path: &Path) -> Result<RelayConfig, ContractError> {
        let config = Self::parse_path(path)?;
        validator::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from string
    ///
    /// # Errors
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_str(content: &str, format: ConfigFormat) -> Result<RelayConfig, ContractError> {
        let config = parser::parse(content, format)?;
        validator::validate(&config)?;
        Ok(config)
    }

    /// Load a file, apply overlays in order, then validate once.
    ///
    /// Precedence (later wins): file, stored settings, credentials file,
    /// environment.
    ///
    /// # Errors
    /// Same as [`ConfigLoader::load_from_path`]
    pub fn load_layered(path: &Path, layers: &ConfigLayers) -> Result<RelayConfig, ContractError> {
        let mut config = Self::parse_path(path)?;
        layers.apply(&mut config);
        validator::validate(&config)?;
        Ok(config)
    }

    /// Validate a config assembled in code
    pub fn validate(config: &RelayConfig) -> Result<(), ContractError> {
        validator::validate(config)
    }

    /// Serialize RelayConfig to TOML string
    pub fn to_toml(config: &RelayConfig) -> Result<String, ContractError> {
        toml::to_string_pretty(config)
            .map_err(|e| ContractError::config_parse(format!("TOML serialize error: {e}")))
    }

    /// Serialize RelayConfig to JSON string
    pub fn to_json(config: &RelayConfig) -> Result<String, ContractError> {
        serde_json::to_string_pretty(config)
            .map_err(|e| ContractError::config_parse(format!("JSON serialize error: {e}")))
    }
}

impl ConfigLoader {
    /// Infer configuration format from file extension
    fn detect_format(path: &Path) -> Result<ConfigFormat, ContractError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            ContractError::config_parse("cannot determine file format from extension")
        })?;

        ConfigFormat::from_extension(ext).ok_or_else(|| {
            ContractError::config_parse(format!("unsupported config format: .{ext}"))
        })
    }

    fn parse_path(path: &Path) -> Result<RelayConfig, ContractError> {
        let format = Self::detect_format(path)?;
        let content = std::fs::read_to_string(path)?;
        parser::parse(&content, format)
    }
}

/// Overlays applied on top of a parsed file
#[derive(Debug, Clone, Default)]
pub struct ConfigLayers {
    pub settings: Option<StoredSettings>,
    pub credentials: Option<CredentialOverrides>,
    pub env: Option<EnvOverlay>,
}

impl ConfigLayers {
    pub fn apply(&self, config: &mut RelayConfig) {
        if let Some(settings) = &self.settings {
            settings.apply(config);
        }
        if let Some(credentials) = &self.credentials {
            credentials.apply(config);
        }
        if let Some(env) = &self.env {
            env.apply(config);
        }
    }
}
