//! Effective configuration assembly for commands.

use std::path::{Path, PathBuf};

use config_loader::{
    ConfigLayers, ConfigLoader, CredentialOverrides, EnvOverlay, RelayConfig, SettingsStore,
};
use tracing::{debug, info};

use crate::cli::ConfigSource;
use crate::error::{CliError, Result};

/// Settings store chosen by `--settings` or the platform default
pub fn settings_store(path: Option<&Path>) -> Option<SettingsStore> {
    path.map(Path::to_path_buf)
        .or_else(SettingsStore::default_path)
        .map(SettingsStore::new)
}

/// Overlays in precedence order
pub fn overlays(source: &ConfigSource) -> Result<ConfigLayers> {
    if source.no_overlays {
        return Ok(ConfigLayers::default());
    }

    let settings = match settings_store(source.settings.as_deref()) {
        Some(store) => Some(store.load()?),
        None => None,
    };
    let credentials = CredentialOverrides::default_path().map(|p| CredentialOverrides::load(&p));

    Ok(ConfigLayers {
        settings,
        credentials,
        env: Some(EnvOverlay::from_env()),
    })
}

/// Load the config file with overlays, or fall back to stored settings alone
pub fn resolve(source: &ConfigSource) -> Result<RelayConfig> {
    let layers = overlays(source)?;

    if source.config.exists() {
        info!(config = %source.config.display(), "Loading configuration");
        return Ok(ConfigLoader::load_layered(&source.config, &layers)?);
    }

    let stored_complete = layers
        .settings
        .as_ref()
        .is_some_and(|settings| settings.is_complete());
    let env_complete = layers
        .env
        .as_ref()
        .is_some_and(|env| env.host.is_some() && env.key.is_some());
    if !stored_complete && !env_complete {
        return Err(CliError::config_not_found(source.config.display().to_string()));
    }

    debug!(
        config = %source.config.display(),
        "No config file, using stored settings and defaults"
    );
    let mut config = RelayConfig::new("", "");
    layers.apply(&mut config);
    ConfigLoader::validate(&config)?;
    Ok(config)
}

/// Credentials file location shown by `info`
pub fn credentials_path() -> Option<PathBuf> {
    CredentialOverrides::default_path()
}

/// Copy of `config` safe to print
pub fn redacted(config: &RelayConfig) -> RelayConfig {
    let mut config = config.clone();
    if !config.collector.api_key.is_empty() {
        config.collector.api_key = "***".to_string();
    }
    config
}
