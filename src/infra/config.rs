// src/infra/config.rs — Configuration loading (TOML + env overrides)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::infra::errors::PurgeError;
use crate::infra::paths;

pub const CONSUMER_KEY_ENV: &str = "TWITTER_CONSUMER_KEY";
pub const CONSUMER_SECRET_ENV: &str = "TWITTER_CONSUMER_SECRET";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub upstream: UpstreamConfig,

    #[serde(default)]
    pub oauth: OAuthConfig,

    #[serde(default)]
    pub sweep: SweepConfig,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub watchdog: WatchdogConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Upstream endpoints. Paths for the v2 API are joined onto `api_base`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    pub api_base: String,
    pub request_token_url: String,
    pub authorize_url: String,
    pub access_token_url: String,
    pub timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.twitter.com".into(),
            request_token_url: "https://api.twitter.com/oauth/request_token".into(),
            authorize_url: "https://api.twitter.com/oauth/authorize".into(),
            access_token_url: "https://api.twitter.com/oauth/access_token".into(),
            timeout_secs: 30,
        }
    }
}

impl UpstreamConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// App (consumer) credentials and the default handshake callback.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct OAuthConfig {
    #[serde(default)]
    pub consumer_key: Option<String>,
    #[serde(default)]
    pub consumer_secret: Option<String>,
    #[serde(default)]
    pub callback_url: Option<String>,
}

impl std::fmt::Debug for OAuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthConfig")
            .field("consumer_key", &self.consumer_key)
            .field(
                "consumer_secret",
                &self.consumer_secret.as_ref().map(|_| "<redacted>"),
            )
            .field("callback_url", &self.callback_url)
            .finish()
    }
}

impl OAuthConfig {
    /// Apply `TWITTER_CONSUMER_KEY` / `TWITTER_CONSUMER_SECRET` if set.
    pub fn apply_env(&mut self) {
        if let Ok(key) = std::env::var(CONSUMER_KEY_ENV) {
            if !key.is_empty() {
                self.consumer_key = Some(key);
            }
        }
        if let Ok(secret) = std::env::var(CONSUMER_SECRET_ENV) {
            if !secret.is_empty() {
                self.consumer_secret = Some(secret);
            }
        }
    }

    /// Both consumer credentials, or a configuration error naming what is missing.
    pub fn consumer_pair(&self) -> Result<(String, String), PurgeError> {
        let key = self.consumer_key.clone().filter(|k| !k.is_empty()).ok_or_else(|| {
            PurgeError::Config(format!(
                "consumer key missing: set {CONSUMER_KEY_ENV} or [oauth].consumer_key"
            ))
        })?;
        let secret = self
            .consumer_secret
            .clone()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                PurgeError::Config(format!(
                    "consumer secret missing: set {CONSUMER_SECRET_ENV} or [oauth].consumer_secret"
                ))
            })?;
        Ok((key, secret))
    }
}

/// Fetch and delete pacing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    pub page_size: u32,
    pub hard_cap: u32,
    pub page_delay_ms: u64,
    pub batch_size: usize,
    pub batch_delay_ms: u64,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            page_size: 100,
            hard_cap: 3200,
            page_delay_ms: 1_000,
            batch_size: 10,
            batch_delay_ms: 5_000,
        }
    }
}

impl SweepConfig {
    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }

    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub bind: String,
    pub port: u16,
    /// Allowed CORS origins. Empty means any origin.
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".into(),
            port: 8787,
            cors_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub db_path: Option<String>,
}

impl StorageConfig {
    pub fn resolved_db_path(&self) -> PathBuf {
        self.db_path
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(paths::db_path)
    }
}

/// Reclassifies `processing` sessions that stopped making progress.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchdogConfig {
    pub enabled: bool,
    pub stale_after_secs: u64,
    pub interval_secs: u64,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            stale_after_secs: 1_800,
            interval_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

impl Config {
    /// Load config from the default location, falling back to defaults.
    pub fn load() -> anyhow::Result<Self> {
        let path = paths::config_file_path();
        if path.exists() {
            return Self::load_from(&path);
        }
        let mut config = Self::default();
        config.oauth.apply_env();
        Ok(config)
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;
        config.oauth.apply_env();
        Ok(config)
    }
}
