//! Deployment Configuration
//!
//! Defaults for the refresh scheduler and the notification snooze timer.
//! A deployment may overlay these with a JSON blob served next to the web
//! client; unknown keys are ignored and missing keys keep their defaults, so
//! old clients survive new server-side config files and vice versa.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default fixed delay between two scheduled refreshes, in seconds.
pub const DEFAULT_SCHEDULER_FIXED_DELAY_SECONDS: u64 = 60;

/// Default notification snooze duration, in minutes.
pub const DEFAULT_NOTIFICATION_SNOOZE_MINUTES: u64 = 10;

/// Default display time of a toast notification, in seconds.
pub const DEFAULT_TOAST_DISPLAY_SECONDS: u64 = 8;

/// Configuration loading error
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration blob is not valid JSON for [`AppConfig`]
    #[error("invalid configuration: {source}")]
    Parse {
        #[from]
        source: serde_json::Error,
    },
    /// A value is out of its valid range
    #[error("invalid configuration value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

/// Application configuration relevant to refresh scheduling and
/// notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Fixed delay between scheduled refreshes, in seconds
    pub scheduler_fixed_delay_in_seconds: u64,
    /// How long "don't disturb" silences notifications, in minutes
    pub notification_snooze_duration_in_minutes: u64,
    /// How long a toast notification stays visible, in seconds
    pub toast_notification_display_time_in_sec: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            scheduler_fixed_delay_in_seconds: DEFAULT_SCHEDULER_FIXED_DELAY_SECONDS,
            notification_snooze_duration_in_minutes: DEFAULT_NOTIFICATION_SNOOZE_MINUTES,
            toast_notification_display_time_in_sec: DEFAULT_TOAST_DISPLAY_SECONDS,
        }
    }
}

impl AppConfig {
    /// Parse a deployment configuration blob, overlaying the defaults.
    pub fn from_json(blob: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(blob)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.scheduler_fixed_delay_in_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "scheduler_fixed_delay_in_seconds".to_string(),
                message: "must be positive".to_string(),
            });
        }
        Ok(())
    }

    /// Fixed delay between scheduled refreshes.
    pub fn refresh_delay(&self) -> Duration {
        Duration::from_secs(self.scheduler_fixed_delay_in_seconds)
    }

    /// Duration of a notification snooze.
    pub fn snooze_duration(&self) -> Duration {
        Duration::from_secs(self.notification_snooze_duration_in_minutes * 60)
    }
}
