//! Dashboard configuration loaded from TOML.
//!
//! ```toml
//! log_level = "info"
//!
//! [refresh]
//! interval_secs = 20
//! fetch_timeout_secs = 10
//!
//! [provider]
//! kind = "yahoo"
//! circuit_cooldown_secs = 600
//! failure_threshold = 3
//! max_retries = 1
//!
//! [universe]
//! tracked = ["^TNX", "DX-Y.NYB"]
//!
//! [[universe.instruments]]
//! symbol = "^N225"
//! label = "Nikkei 225"
//! role = "asia_tech"
//! ```
//!
//! Every section is optional and falls back to its defaults. Unknown keys
//! are rejected.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use overnight_core::data::{Universe, UniverseError, YahooOptions};

/// Allowed refresh cadence in seconds.
pub const REFRESH_INTERVAL_RANGE: std::ops::RangeInclusive<u64> = 15..=30;

/// Upper bound on per-symbol retries. Retries must finish inside one refresh
/// interval to be of any use.
pub const MAX_RETRIES_LIMIT: u32 = 5;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("serialize config TOML: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("refresh.interval_secs must be within 15..=30, got {0}")]
    IntervalOutOfRange(u64),

    #[error("refresh.fetch_timeout_secs must be positive")]
    ZeroTimeout,

    #[error("provider.max_retries must be at most 5, got {0}")]
    TooManyRetries(u32),

    #[error("invalid universe: {0}")]
    Universe(#[from] UniverseError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RefreshConfig {
    pub interval_secs: u64,
    pub fetch_timeout_secs: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_secs: 20,
            fetch_timeout_secs: 10,
        }
    }
}

impl RefreshConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    Yahoo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    pub circuit_cooldown_secs: u64,
    pub failure_threshold: u32,
    pub max_retries: u32,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: ProviderKind::Yahoo,
            circuit_cooldown_secs: 600,
            failure_threshold: 3,
            max_retries: 1,
        }
    }
}

impl ProviderConfig {
    pub fn circuit_cooldown(&self) -> Duration {
        Duration::from_secs(self.circuit_cooldown_secs)
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub log_level: String,
    pub refresh: RefreshConfig,
    pub provider: ProviderConfig,
    pub universe: Universe,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            refresh: RefreshConfig::default(),
            provider: ProviderConfig::default(),
            universe: Universe::default_overnight(),
        }
    }
}

impl AppConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if given, otherwise the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => Self::from_file(p),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !REFRESH_INTERVAL_RANGE.contains(&self.refresh.interval_secs) {
            return Err(ConfigError::IntervalOutOfRange(self.refresh.interval_secs));
        }
        if self.refresh.fetch_timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.provider.max_retries > MAX_RETRIES_LIMIT {
            return Err(ConfigError::TooManyRetries(self.provider.max_retries));
        }
        self.universe.validate()?;
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Connection settings for the Yahoo provider.
    pub fn yahoo_options(&self) -> YahooOptions {
        YahooOptions {
            timeout: self.refresh.fetch_timeout(),
            max_retries: self.provider.max_retries,
            ..YahooOptions::default()
        }
    }
}
