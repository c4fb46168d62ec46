//! Broker configuration.
//!
//! Structural settings come from an optional TOML file (`TETHER_CONFIG`);
//! secrets — the credential master key and provider application
//! credentials — come from the environment only and are never written to
//! a config file.

use crate::error::AuthError;
use crate::provider::AppCredentials;
use anyhow::{Context, Result};
use serde::Deserialize;

/// Complete broker configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TetherConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Address the HTTP server binds to
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    /// Public base URL callbacks are built from (no trailing slash)
    #[serde(default = "default_callback_base_url")]
    pub callback_base_url: String,
}

fn default_bind_addr() -> String {
    "127.0.0.1:8090".to_string()
}

fn default_callback_base_url() -> String {
    "http://127.0.0.1:8090".to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            callback_base_url: default_callback_base_url(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite credential database
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

fn default_db_path() -> String {
    "tether.db".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Handshake session lifetime (seconds)
    #[serde(default = "default_ttl_seconds")]
    pub ttl_seconds: i64,
    /// Maximum concurrent handshake sessions before LRU eviction
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    /// How often the expired-session sweeper runs (seconds)
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_seconds: u64,
}

fn default_ttl_seconds() -> i64 {
    crate::session::DEFAULT_TTL_SECONDS
}

fn default_capacity() -> usize {
    crate::session::DEFAULT_CAPACITY
}

fn default_sweep_interval() -> u64 {
    60
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: default_ttl_seconds(),
            capacity: default_capacity(),
            sweep_interval_seconds: default_sweep_interval(),
        }
    }
}

impl TetherConfig {
    /// Loads configuration from the file named by `TETHER_CONFIG`, or
    /// defaults when the variable is unset.
    pub fn load() -> Result<Self> {
        match std::env::var("TETHER_CONFIG") {
            Ok(path) => {
                let contents = std::fs::read_to_string(&path)
                    .with_context(|| format!("failed to read config file {path}"))?;
                toml::from_str(&contents)
                    .with_context(|| format!("failed to parse config file {path}"))
            }
            Err(_) => Ok(Self::default()),
        }
    }
}

/// The credential master key (base64, 32 bytes decoded), from
/// `TETHER_MASTER_KEY`.
pub fn master_key_from_env() -> Result<String, AuthError> {
    std::env::var("TETHER_MASTER_KEY").map_err(|_| {
        AuthError::Configuration(
            "credential master key missing; set TETHER_MASTER_KEY to a base64-encoded 32-byte key"
                .to_string(),
        )
    })
}

/// Twitter application credentials from `TETHER_TWITTER_API_KEY` and
/// `TETHER_TWITTER_API_SECRET_KEY`. `None` when either is unset, in
/// which case the Twitter provider is not registered.
pub fn twitter_app_credentials() -> Option<AppCredentials> {
    let consumer_key = std::env::var("TETHER_TWITTER_API_KEY").ok()?;
    let consumer_secret = std::env::var("TETHER_TWITTER_API_SECRET_KEY").ok()?;
    Some(AppCredentials {
        consumer_key,
        consumer_secret,
    })
}
