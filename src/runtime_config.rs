// =============================================================================
// Runtime Configuration - analyzer settings from file + environment
// =============================================================================
//
// Settings are read from an optional JSON file and then overridden by
// `ANALYZER_*` environment variables. All fields carry `#[serde(default)]`
// so a partial file (or `{}`) loads cleanly.
// =============================================================================

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::nse::client::NSE_BASE_URL;

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_symbol() -> String {
    "NIFTY".to_string()
}

fn default_base_url() -> String {
    NSE_BASE_URL.to_string()
}

fn default_poll_interval_secs() -> u64 {
    60
}

fn default_request_timeout_secs() -> u64 {
    15
}

fn default_stop_timeout_secs() -> u64 {
    5
}

fn default_bind_addr() -> String {
    "0.0.0.0:5000".to_string()
}

// =============================================================================
// AnalyzerConfig
// =============================================================================

/// Top-level configuration for the analyzer service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// Index symbol whose option chain is polled.
    #[serde(default = "default_symbol")]
    pub symbol: String,

    /// Upstream host, without trailing slash.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Seconds between the end of one publish and the next fetch.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Per-request HTTP timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// How long shutdown waits for the polling task to finish.
    #[serde(default = "default_stop_timeout_secs")]
    pub stop_timeout_secs: u64,

    /// Listen address of the read API.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            symbol: default_symbol(),
            base_url: default_base_url(),
            poll_interval_secs: default_poll_interval_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            stop_timeout_secs: default_stop_timeout_secs(),
            bind_addr: default_bind_addr(),
        }
    }
}

impl AnalyzerConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// A missing file is an error so the caller can fall back to defaults
    /// with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read analyzer config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse analyzer config from {}", path.display()))?;

        info!(
            path = %path.display(),
            symbol = %config.symbol,
            poll_interval_secs = config.poll_interval_secs,
            "analyzer config loaded"
        );

        Ok(config)
    }

    /// Apply `ANALYZER_*` overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from `lookup`. Unparseable numeric values are ignored
    /// with a warning.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(sym) = lookup("ANALYZER_SYMBOL") {
            let sym = sym.trim().to_uppercase();
            if !sym.is_empty() {
                self.symbol = sym;
            }
        }
        if let Some(url) = lookup("ANALYZER_BASE_URL") {
            let url = url.trim().trim_end_matches('/');
            if !url.is_empty() {
                self.base_url = url.to_string();
            }
        }
        if let Some(addr) = lookup("ANALYZER_BIND_ADDR") {
            if !addr.trim().is_empty() {
                self.bind_addr = addr.trim().to_string();
            }
        }

        let numeric = [
            ("ANALYZER_POLL_INTERVAL_SECS", &mut self.poll_interval_secs),
            ("ANALYZER_REQUEST_TIMEOUT_SECS", &mut self.request_timeout_secs),
            ("ANALYZER_STOP_TIMEOUT_SECS", &mut self.stop_timeout_secs),
        ];
        for (key, slot) in numeric {
            if let Some(raw) = lookup(key) {
                match raw.trim().parse::<u64>() {
                    Ok(v) => *slot = v,
                    Err(e) => warn!(key, value = %raw, error = %e, "ignoring invalid env override"),
                }
            }
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_secs(self.stop_timeout_secs)
    }
}
