//! `save` command implementation.

use std::time::Duration;

use config_loader::StoredSettings;
use contracts::collector_endpoint;
use contracts::VERIFY_PATH;
use tracing::{info, warn};

use crate::cli::SaveArgs;
use crate::commands::probe::verify;
use crate::config::settings_store;
use crate::error::{CliError, Result};

const SAVE_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Execute the `save` command
pub async fn run_save(args: &SaveArgs) -> Result<()> {
    // Reject unusable URLs before touching the settings file
    collector_endpoint(&args.url, VERIFY_PATH)?;

    let store = settings_store(args.settings.as_deref()).ok_or_else(|| {
        CliError::Other(anyhow::anyhow!(
            "no settings location available, pass --settings"
        ))
    })?;

    if !args.no_probe {
        let outcome = verify(&args.url, &args.api_key, SAVE_PROBE_TIMEOUT).await?;
        if outcome.enables() {
            println!("✓ {outcome}");
        } else {
            warn!(outcome = %outcome, "Saving settings for a collector that failed verification");
            println!("⚠ {outcome}");
        }
    }

    let settings = StoredSettings {
        url: Some(args.url.trim().to_string()),
        api_key: Some(args.api_key.trim().to_string()),
    };
    store.save(&settings)?;

    info!(path = %store.path().display(), "Collector settings saved");
    println!("Saved collector settings to {}", store.path().display());
    Ok(())
}
