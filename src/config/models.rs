// src/config/models.rs
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Check interval must be greater than zero")]
    ZeroInterval,

    #[error("Check name must not be empty")]
    EmptyName,

    #[error("No tokio runtime available to spawn the check scheduler")]
    NoRuntime,
}

pub const DEFAULT_CHECK_NAME: &str = "async";
pub const DEFAULT_INTERVAL_MS: u64 = 10_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AsyncCheckConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

fn default_name() -> String {
    DEFAULT_CHECK_NAME.to_string()
}

fn default_interval_ms() -> u64 {
    DEFAULT_INTERVAL_MS
}

impl Default for AsyncCheckConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            interval_ms: default_interval_ms(),
        }
    }
}

impl AsyncCheckConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::EmptyName);
        }
        if self.interval_ms == 0 {
            return Err(ConfigError::ZeroInterval);
        }
        Ok(())
    }
}
