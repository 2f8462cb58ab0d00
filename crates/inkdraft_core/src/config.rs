//! Configuration loading from environment variables.

use crate::constants::{
    DEFAULT_AUTO_SAVE_INTERVAL_MS, DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_SERVER_URL,
};
use std::env;
use std::time::Duration;

/// Runtime configuration for inkdraft clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Base URL of the document store, e.g. `https://localhost:8000/api/v1`.
    pub server_url: String,
    /// Bearer credential attached to every request.
    pub token: Option<String>,
    /// Autosave quiet period in milliseconds.
    pub auto_save_interval: u64,
    pub request_timeout_secs: u64,
    /// Accept self-signed certificates (the reference store runs on localhost https).
    pub accept_invalid_certs: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            token: None,
            auto_save_interval: DEFAULT_AUTO_SAVE_INTERVAL_MS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            accept_invalid_certs: false,
        }
    }
}

/// Parse a boolean-like environment flag value.
///
/// Truthy: `1`, `true`, `yes`, `on`. Falsy: `0`, `false`, `no`, `off`, empty.
/// Matching is case-insensitive and ignores surrounding whitespace.
pub fn parse_env_flag(value: &str) -> Option<bool> {
    let normalized = value.trim().to_ascii_lowercase();
    match normalized.as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "" | "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Read a boolean flag from the environment; missing or unrecognized is `false`.
pub fn env_flag_enabled(name: &str) -> bool {
    env::var(name)
        .ok()
        .and_then(|value| parse_env_flag(&value))
        .unwrap_or(false)
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parsed_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    non_empty_var(name).and_then(|value| value.parse().ok())
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Returns
    /// A populated [`Config`] with defaults applied when env vars are missing
    /// or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            server_url: non_empty_var("INKDRAFT_SERVER").unwrap_or(defaults.server_url),
            token: non_empty_var("INKDRAFT_TOKEN"),
            auto_save_interval: parsed_var("AUTO_SAVE_INTERVAL")
                .unwrap_or(defaults.auto_save_interval),
            request_timeout_secs: parsed_var("INKDRAFT_REQUEST_TIMEOUT_SECS")
                .unwrap_or(defaults.request_timeout_secs),
            accept_invalid_certs: env_flag_enabled("INKDRAFT_ACCEPT_INVALID_CERTS"),
        }
    }

    pub fn auto_save_delay(&self) -> Duration {
        Duration::from_millis(self.auto_save_interval)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
