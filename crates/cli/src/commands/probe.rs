//! `probe` command implementation.

use std::time::Duration;

use dispatcher::{ConnectivityCheck, ProbeOutcome};
use tracing::info;

use crate::cli::ProbeArgs;
use crate::config::resolve;
use crate::error::{CliError, Result};

/// Execute the `probe` command
pub async fn run_probe(args: &ProbeArgs) -> Result<()> {
    let (url, api_key) = match (&args.url, &args.api_key) {
        (Some(url), Some(key)) => (url.clone(), key.clone()),
        (url, key) => {
            let config = resolve(&args.source)?;
            (
                url.clone().unwrap_or(config.collector.url),
                key.clone().unwrap_or(config.collector.api_key),
            )
        }
    };

    info!(collector = %url, "Probing collector");
    let outcome = verify(&url, &api_key, Duration::from_millis(args.timeout_ms)).await?;

    println!("{url}: {outcome}");
    if outcome.enables() {
        Ok(())
    } else {
        Err(CliError::probe_failed(outcome.to_string()))
    }
}

/// Run one connectivity check
pub async fn verify(url: &str, api_key: &str, timeout: Duration) -> Result<ProbeOutcome> {
    let checker = ConnectivityCheck::new()?;
    Ok(checker.check(url, api_key, timeout).await)
}
