//! Navigation monitor timing

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Settle delay after a detected URL change.
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 100;
/// Delay between a history API call and re-reading the location.
pub const DEFAULT_HISTORY_DELAY_MS: u64 = 50;
/// Safety-net poll interval.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2000;

const MAX_SETTLE_DELAY_MS: u64 = 1000;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("settle_delay_ms must be at most 1000, got {0}")]
    SettleDelayTooLong(u64),
    #[error("poll_interval_ms must be positive")]
    ZeroPollInterval,
    #[error("config must be a JSON object")]
    NotAnObject,
    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub settle_delay_ms: u64,
    pub history_delay_ms: u64,
    pub poll_interval_ms: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: DEFAULT_SETTLE_DELAY_MS,
            history_delay_ms: DEFAULT_HISTORY_DELAY_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl MonitorConfig {
    /// Parse and validate a JSON document. Missing fields take defaults.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let value: serde_json::Value = serde_json::from_str(text)?;
        if !value.is_object() {
            return Err(ConfigError::NotAnObject);
        }
        let config: Self = serde_json::from_value(value)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.settle_delay_ms > MAX_SETTLE_DELAY_MS {
            return Err(ConfigError::SettleDelayTooLong(self.settle_delay_ms));
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::ZeroPollInterval);
        }
        Ok(())
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn history_delay(&self) -> Duration {
        Duration::from_millis(self.history_delay_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
