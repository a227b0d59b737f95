//! Collector endpoint paths

use url::Url;

use crate::ContractError;

/// Sub-path receiving one transaction per POST
pub const LOG_REQUEST_PATH: &str = "api/v1/log-request/single";

/// Sub-path answering the connectivity probe
pub const VERIFY_PATH: &str = "api/v1/verify";

/// Append a trailing `/` if the base URL lacks one
pub fn normalize_base_url(base: &str) -> String {
    let base = base.trim();
    if base.ends_with('/') {
        base.to_string()
    } else {
        format!("{base}/")
    }
}

/// Join a collector sub-path onto a base URL.
///
/// The base is normalized first so a base with its own path prefix
/// (`https://host/metlo`) keeps it.
pub fn collector_endpoint(base: &str, sub_path: &str) -> Result<Url, ContractError> {
    let normalized = normalize_base_url(base);
    let base_url = Url::parse(&normalized).map_err(|e| {
        ContractError::config_validation("collector.url", format!("invalid url '{base}': {e}"))
    })?;

    match base_url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(ContractError::config_validation(
                "collector.url",
                format!("unsupported scheme '{other}'"),
            ))
        }
    }

    base_url.join(sub_path).map_err(|e| {
        ContractError::config_validation("collector.url", format!("cannot join '{sub_path}': {e}"))
    })
}
