//! Config overlays applied after the file is parsed
//!
//! - credentials file (`~/.metlo/credentials`): `REQUESTS_PER_SEC`, `MAX_THREADS`
//! - process environment: `METLO_HOST`, `METLO_KEY`, `PORT`, `METLO_MAX_RPS` / `MAX_RPS`
//!
//! Malformed values are logged and ignored; the existing value is kept.

use std::path::{Path, PathBuf};

use contracts::RelayConfig;
use tracing::{debug, warn};

const REQUESTS_PER_SEC: &str = "REQUESTS_PER_SEC";
const MAX_THREADS: &str = "MAX_THREADS";

/// Rate and worker overrides read from the credentials file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialOverrides {
    pub rate_limit: Option<u32>,
    pub max_workers: Option<usize>,
}

impl CredentialOverrides {
    /// `~/.metlo/credentials`
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".metlo").join("credentials"))
    }

    /// Parse `KEY=VALUE` lines
    pub fn parse(content: &str) -> Self {
        let mut overrides = Self::default();
        for line in content.lines() {
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            match key.trim() {
                REQUESTS_PER_SEC => overrides.rate_limit = parse_number(REQUESTS_PER_SEC, value),
                MAX_THREADS => overrides.max_workers = parse_number(MAX_THREADS, value),
                _ => {}
            }
        }
        overrides
    }

    /// Read and parse a credentials file; unreadable files yield no overrides
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::parse(&content),
            Err(e) => {
                debug!(path = %path.display(), error = %e, "Credentials file not read");
                Self::default()
            }
        }
    }

    pub fn apply(&self, config: &mut RelayConfig) {
        if let Some(rate) = self.rate_limit {
            config.rate_limit = rate;
        }
        if let Some(workers) = self.max_workers {
            config.max_workers = workers;
        }
    }
}

/// Environment variables understood by the relay
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvOverlay {
    pub host: Option<String>,
    pub key: Option<String>,
    pub rpc_port: Option<u16>,
    pub max_rps: Option<u32>,
}

impl EnvOverlay {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        Self {
            host: non_empty("METLO_HOST"),
            key: non_empty("METLO_KEY"),
            rpc_port: non_empty("PORT").and_then(|v| parse_number("PORT", &v)),
            max_rps: non_empty("METLO_MAX_RPS")
                .or_else(|| non_empty("MAX_RPS"))
                .and_then(|v| parse_number("MAX_RPS", &v)),
        }
    }

    pub fn apply(&self, config: &mut RelayConfig) {
        if let Some(host) = &self.host {
            config.collector.url = host.clone();
        }
        if let Some(key) = &self.key {
            config.collector.api_key = key.clone();
        }
        if let Some(port) = self.rpc_port {
            config.delivery.rpc_port = Some(port);
        }
        if let Some(rps) = self.max_rps {
            config.rate_limit = rps;
        }
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, raw: &str) -> Option<T> {
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key = name, value = raw.trim(), "Ignoring malformed numeric override");
            None
        }
    }
}
