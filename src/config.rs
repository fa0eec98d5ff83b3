use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::Duration;

use crate::media::{DeviceInfo, MediaConstraints};

/// Process-wide configuration. Loaded once at start and read-only afterwards.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub token: TokenServiceConfig,
    pub recording: RecordingServiceConfig,
    pub transport: TransportConfig,
    #[serde(default)]
    pub media: MediaConfig,
    pub links: LinkConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenServiceConfig {
    /// Full URL of the token issuing endpoint
    pub endpoint: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Upper bound on token attempts per join (1 = no retry)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    /// Optional role forwarded to the token service
    pub role: Option<String>,
}

impl TokenServiceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecordingServiceConfig {
    /// Base URL; `/recording/start` and `/recording/stop` are appended
    pub base_url: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_min_participants")]
    pub min_participants: usize,
}

impl RecordingServiceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransportConfig {
    pub nats_url: String,
    #[serde(default = "default_subject_prefix")]
    pub subject_prefix: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaConfig {
    #[serde(default)]
    pub constraints: MediaConstraints,
    /// Devices the local factory may open
    #[serde(default)]
    pub devices: Vec<DeviceInfo>,
    #[serde(default = "default_true")]
    pub permission_granted: bool,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            constraints: MediaConstraints::default(),
            devices: Vec::new(),
            permission_granted: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LinkConfig {
    /// Page the join link points at
    pub base_url: String,
    #[serde(default = "default_token_bytes")]
    pub token_bytes: usize,
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_max_attempts() -> u32 {
    2
}

fn default_retry_backoff_ms() -> u64 {
    250
}

fn default_min_participants() -> usize {
    2
}

fn default_subject_prefix() -> String {
    "media.room".to_string()
}

fn default_token_bytes() -> usize {
    24
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load from a file (extension optional) with `TELEHEALTH__` env overrides,
    /// e.g. `TELEHEALTH__TOKEN__ENDPOINT`.
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("TELEHEALTH").separator("__"))
            .build()
            .with_context(|| format!("Failed to read config from {}", path))?;

        Ok(settings.try_deserialize()?)
    }
}
