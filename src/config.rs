//! Configuration management for ipsync.
//!
//! Values come from an optional TOML file and are overridden by environment
//! variables, which is how the daemon is normally configured.

use crate::error::{Result, SyncError};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_TOKEN: &str = "NETLIFY_TOKEN";
pub const ENV_TARGET: &str = "DNS_TARGET";
pub const ENV_INTERVAL: &str = "IPSYNC_TIMEOUT";
pub const ENV_IP_SERVICE: &str = "IPSYNC_IP_SERVICE";
pub const ENV_REQUEST_TIMEOUT: &str = "IPSYNC_REQUEST_TIMEOUT";
pub const ENV_API_URL: &str = "NETLIFY_API_URL";

const DEFAULT_POLL_INTERVAL_SECS: u64 = 300;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;
const DEFAULT_IP_SERVICE: &str = "https://api.ipify.org";
const DEFAULT_API_URL: &str = "https://api.netlify.com/api/v1";

/// Validated runtime configuration.
#[derive(Clone, PartialEq, Eq)]
pub struct Config {
    /// Netlify personal access token.
    pub token: String,
    /// Fully qualified hostname whose A record is managed.
    pub dns_target: String,
    /// Seconds to sleep between polls.
    pub poll_interval_secs: u64,
    /// IP-echo endpoint answering with plain text or `{"ip": ...}`.
    pub ip_service: String,
    /// Upper bound for any single HTTP request.
    pub request_timeout_secs: u64,
    /// Netlify API base URL.
    pub api_url: String,
}

/// On-disk shape; every field is optional so the environment can fill gaps.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    token: Option<String>,
    dns_target: Option<String>,
    poll_interval_secs: Option<u64>,
    ip_service: Option<String>,
    request_timeout_secs: Option<u64>,
    api_url: Option<String>,
}

impl Config {
    /// Load from the process environment only.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from `path` (if it exists), then apply environment overrides.
    pub fn load_from(path: &Path) -> Result<Self> {
        let file = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            toml::from_str(&content)?
        } else {
            FileConfig::default()
        };

        Self::merge(file, |key| std::env::var(key).ok())
    }

    /// Load using an arbitrary variable lookup instead of the environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::merge(FileConfig::default(), lookup)
    }

    fn merge<F>(file: FileConfig, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let token = var(ENV_TOKEN)
            .or(file.token)
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| SyncError::Config(format!("{} not set", ENV_TOKEN)))?;

        let dns_target = var(ENV_TARGET)
            .or(file.dns_target)
            .map(|t| t.trim().trim_end_matches('.').to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| SyncError::Config(format!("{} not set", ENV_TARGET)))?;

        let poll_interval_secs = match var(ENV_INTERVAL) {
            Some(raw) => parse_secs(ENV_INTERVAL, &raw, DEFAULT_POLL_INTERVAL_SECS),
            None => file
                .poll_interval_secs
                .filter(|s| *s > 0)
                .unwrap_or(DEFAULT_POLL_INTERVAL_SECS),
        };

        let request_timeout_secs = match var(ENV_REQUEST_TIMEOUT) {
            Some(raw) => parse_secs(ENV_REQUEST_TIMEOUT, &raw, DEFAULT_REQUEST_TIMEOUT_SECS),
            None => file
                .request_timeout_secs
                .filter(|s| *s > 0)
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        };

        let ip_service = var(ENV_IP_SERVICE)
            .or(file.ip_service)
            .unwrap_or_else(|| DEFAULT_IP_SERVICE.to_string());

        let api_url = var(ENV_API_URL)
            .or(file.api_url)
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            token,
            dns_target,
            poll_interval_secs,
            ip_service,
            request_timeout_secs,
            api_url,
        })
    }

    /// Candidate config file locations, most specific first.
    pub fn default_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("ipsync").join("config.toml"));
        }
        paths.push(PathBuf::from("/etc/ipsync/config.toml"));
        paths
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Token with everything but the last four characters masked.
    pub fn redacted_token(&self) -> String {
        let chars: Vec<char> = self.token.chars().collect();
        if chars.len() <= 8 {
            return "****".to_string();
        }
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("****{}", tail)
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("token", &self.redacted_token())
            .field("dns_target", &self.dns_target)
            .field("poll_interval_secs", &self.poll_interval_secs)
            .field("ip_service", &self.ip_service)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("api_url", &self.api_url)
            .finish()
    }
}

fn parse_secs(key: &str, raw: &str, default: u64) -> u64 {
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => secs,
        _ => {
            tracing::warn!(key, value = raw, default, "Invalid duration, using default");
            default
        }
    }
}
