//! Configuration management
//!
//! Settings are layered: built-in defaults, then an optional TOML file, then
//! environment variables prefixed with `MICRODEMO_` using `__` between
//! sections (`MICRODEMO_RECEIVER__TOKEN`, `MICRODEMO_AWS__REGION`, ...).

use serde::Deserialize;
use std::fmt;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Longest long-poll wait SQS accepts
pub const MAX_WAIT_TIME_SECS: u64 = 20;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("No shared-secret token configured (set MICRODEMO_RECEIVER__TOKEN)")]
    MissingToken,

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main configuration structure
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub aws: AwsConfig,

    #[serde(default)]
    pub queue: QueueConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub receiver: ReceiverConfig,

    #[serde(default)]
    pub relay: RelayConfig,
}

/// Connection settings shared by the SQS and S3 clients
#[derive(Debug, Clone, Deserialize)]
pub struct AwsConfig {
    #[serde(default = "default_region")]
    pub region: String,

    /// Override for LocalStack-style endpoints
    #[serde(default)]
    pub endpoint_url: Option<String>,

    #[serde(default)]
    pub access_key_id: Option<String>,

    #[serde(default)]
    pub secret_access_key: Option<Secret>,

    #[serde(default = "default_true")]
    pub force_path_style: bool,
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self {
            region: default_region(),
            endpoint_url: None,
            access_key_id: None,
            secret_access_key: None,
            force_path_style: default_true(),
        }
    }
}

impl AwsConfig {
    /// Static credentials, when both halves are configured
    pub fn static_credentials(&self) -> Option<(&str, &str)> {
        match (&self.access_key_id, &self.secret_access_key) {
            (Some(id), Some(secret)) => Some((id.as_str(), secret.expose())),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueueConfig {
    #[serde(default = "default_queue_url")]
    pub url: String,

    /// Per-receive override; unset leaves the queue's own policy in charge
    #[serde(default)]
    pub visibility_timeout_secs: Option<u64>,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            url: default_queue_url(),
            visibility_timeout_secs: None,
        }
    }
}

impl QueueConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn visibility_timeout(&self) -> Option<Duration> {
        self.visibility_timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_bucket")]
    pub bucket: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            bucket: default_bucket(),
        }
    }
}

impl StoreConfig {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReceiverConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub token: Option<Secret>,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            token: None,
        }
    }
}

impl ReceiverConfig {
    /// The shared secret; empty values count as missing
    pub fn token(&self) -> Result<&str, ConfigError> {
        match &self.token {
            Some(secret) if !secret.expose().is_empty() => Ok(secret.expose()),
            _ => Err(ConfigError::MissingToken),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_wait_time_secs")]
    pub wait_time_secs: u64,

    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    #[serde(default = "default_key_extension")]
    pub key_extension: String,

    #[serde(default)]
    pub backoff: BackoffConfig,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            wait_time_secs: default_wait_time_secs(),
            key_prefix: default_key_prefix(),
            key_extension: default_key_extension(),
            backoff: BackoffConfig::default(),
        }
    }
}

impl RelayConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn wait_time(&self) -> Duration {
        Duration::from_secs(self.wait_time_secs)
    }
}

/// Delay growth after dependency failures
#[derive(Debug, Clone, Deserialize)]
pub struct BackoffConfig {
    #[serde(default = "default_backoff_initial_ms")]
    pub initial_ms: u64,

    #[serde(default = "default_backoff_max_ms")]
    pub max_ms: u64,

    #[serde(default = "default_backoff_multiplier")]
    pub multiplier: u32,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_ms: default_backoff_initial_ms(),
            max_ms: default_backoff_max_ms(),
            multiplier: default_backoff_multiplier(),
        }
    }
}

/// A configured secret that never shows up in `Debug` output
#[derive(Clone, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

fn default_region() -> String {
    "us-east-2".to_string()
}

fn default_queue_url() -> String {
    "http://localstack:4566/000000000000/microdemo-queue".to_string()
}

fn default_bucket() -> String {
    "demo-bucket".to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_poll_interval_ms() -> u64 {
    5000
}

fn default_wait_time_secs() -> u64 {
    5
}

fn default_key_prefix() -> String {
    "data".to_string()
}

fn default_key_extension() -> String {
    "json".to_string()
}

fn default_backoff_initial_ms() -> u64 {
    1000
}

fn default_backoff_max_ms() -> u64 {
    60_000
}

fn default_backoff_multiplier() -> u32 {
    2
}

fn default_true() -> bool {
    true
}

impl Settings {
    /// Load configuration from an optional file and the process environment.
    ///
    /// Without an explicit path, `microdemo.toml` in the working directory is
    /// read if present.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_env(path, environment())
    }

    fn load_with_env(
        path: Option<&Path>,
        env: config::Environment,
    ) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name("microdemo").required(false),
        };

        let settings = config::Config::builder()
            .add_source(file)
            .add_source(env)
            .build()?
            .try_deserialize::<Settings>()?;

        settings.validate()?;
        Ok(settings)
    }

    /// Reject values the services cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.queue.url.is_empty() {
            return Err(ConfigError::Invalid("queue.url is empty".to_string()));
        }
        if self.store.bucket.is_empty() {
            return Err(ConfigError::Invalid("store.bucket is empty".to_string()));
        }
        if self.relay.wait_time_secs > MAX_WAIT_TIME_SECS {
            return Err(ConfigError::Invalid(format!(
                "relay.wait_time_secs must be at most {MAX_WAIT_TIME_SECS}"
            )));
        }
        if self.relay.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "relay.poll_interval_ms must be positive".to_string(),
            ));
        }
        let backoff = &self.relay.backoff;
        if backoff.multiplier == 0 || backoff.initial_ms == 0 || backoff.initial_ms > backoff.max_ms
        {
            return Err(ConfigError::Invalid(
                "relay.backoff needs 0 < initial_ms <= max_ms and multiplier >= 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn environment() -> config::Environment {
    config::Environment::with_prefix("MICRODEMO")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}
