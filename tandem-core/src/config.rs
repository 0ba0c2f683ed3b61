//! Configuration
//!
//! Every section deserializes with defaults for missing keys, so an empty
//! JSON object is a valid configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::preferences::DefaultPreferences;

/// Top-level configuration for a document instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub runtime: RuntimeConfig,
    pub preferences: PreferencesConfig,
    pub timer: TimerConfig,
}

impl Config {
    /// Parse and validate a configuration from JSON.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the runtime cannot operate with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timer.tick_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "timer.tick_interval_ms",
                reason: "must be at least 1",
            });
        }
        Ok(())
    }
}

/// Reactive runtime settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// How many rounds of effects may reschedule each other before a flush
    /// gives up.
    pub max_flush_rounds: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_flush_rounds: 100,
        }
    }
}

/// Preference resolution settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreferencesConfig {
    /// Treat a missing or unrecognized color scheme as `system`.
    pub infer_dark_mode: bool,
    /// Last link of every fallback chain.
    pub defaults: DefaultPreferences,
}

/// Timer settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimerConfig {
    /// Shared document field that holds the timer.
    pub field_key: String,
    /// Polling period of the completion watcher, in milliseconds.
    pub tick_interval_ms: u64,
}

impl TimerConfig {
    /// Polling period of the completion watcher.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            field_key: "timer".to_owned(),
            tick_interval_ms: 250,
        }
    }
}
