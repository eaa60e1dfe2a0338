//! Configuration management for Helmsman.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use armada_common::constants::{
    DEFAULT_DISPATCH_TIMEOUT_SECS, DEFAULT_LISTEN_ADDR, DEFAULT_MAX_CONCURRENCY,
    DEFAULT_PROBE_INTERVAL_SECS, DEFAULT_REDIS_URL,
};

use crate::prober::DEFAULT_PROBE_PATH;

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Redis connection URL
    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// HTTP listen address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Run without Redis, keeping the node registry in memory
    #[serde(default)]
    pub standalone: bool,

    /// Dispatcher configuration
    #[serde(default)]
    pub dispatch: DispatchSettings,

    /// Health probe configuration
    #[serde(default)]
    pub probe: ProbeSettings,
}

/// Dispatcher-specific configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DispatchSettings {
    /// Per-node timeout in seconds
    #[serde(default = "default_dispatch_timeout")]
    pub timeout_secs: u64,

    /// Maximum concurrent units of work per dispatch
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_dispatch_timeout(),
            max_concurrency: default_max_concurrency(),
        }
    }
}

/// Health probe configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ProbeSettings {
    /// Probe interval in seconds
    #[serde(default = "default_probe_interval")]
    pub interval_secs: u64,

    /// Identity/resource endpoint path probed on every node
    #[serde(default = "default_probe_path")]
    pub path: String,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            interval_secs: default_probe_interval(),
            path: default_probe_path(),
        }
    }
}

// Default value functions
fn default_redis_url() -> String { DEFAULT_REDIS_URL.to_string() }
fn default_listen_addr() -> String { DEFAULT_LISTEN_ADDR.to_string() }
fn default_dispatch_timeout() -> u64 { DEFAULT_DISPATCH_TIMEOUT_SECS }
fn default_max_concurrency() -> usize { DEFAULT_MAX_CONCURRENCY }
fn default_probe_interval() -> u64 { DEFAULT_PROBE_INTERVAL_SECS }
fn default_probe_path() -> String { DEFAULT_PROBE_PATH.to_string() }

impl AppConfig {
    /// Load configuration from file, with CLI overrides
    pub fn load(config_path: &str, args: &super::Args) -> Result<Self> {
        let mut config = if Path::new(config_path).exists() {
            let settings = config::Config::builder()
                .add_source(config::File::with_name(config_path))
                .build()
                .context("Failed to load config file")?;

            settings
                .try_deserialize()
                .context("Failed to parse config")?
        } else {
            // Use defaults if config file doesn't exist
            tracing::warn!("Config file not found, using defaults");
            Self::default()
        };

        // Apply CLI overrides
        if let Some(ref redis_url) = args.redis_url {
            config.redis_url = redis_url.clone();
        }
        if let Some(ref listen) = args.listen {
            config.listen_addr = listen.clone();
        }
        if args.standalone {
            config.standalone = true;
        }

        Ok(config)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            redis_url: default_redis_url(),
            listen_addr: default_listen_addr(),
            standalone: false,
            dispatch: DispatchSettings::default(),
            probe: ProbeSettings::default(),
        }
    }
}
