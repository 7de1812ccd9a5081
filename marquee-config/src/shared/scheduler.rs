//! Scheduler configuration for the periodic background job.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::shared::ValidationError;

/// Configuration for the periodic background scheduler.
///
/// The scheduler runs one unit of work per tick while the service is up and, once
/// shutdown is requested, waits out a grace window so an in-progress pass can
/// finish before the process exits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SchedulerConfig {
    /// Interval in seconds between background passes.
    ///
    /// Default: 5
    #[serde(default = "default_tick_interval_secs")]
    pub tick_interval_secs: u64,

    /// Grace window in seconds granted to in-progress work during shutdown.
    ///
    /// Default: 10
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,
}

impl SchedulerConfig {
    /// Default tick interval: 5 seconds.
    pub const DEFAULT_TICK_INTERVAL_SECS: u64 = 5;

    /// Default shutdown grace window: 10 seconds.
    pub const DEFAULT_SHUTDOWN_GRACE_SECS: u64 = 10;

    /// Validates the scheduler configuration.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.tick_interval_secs == 0 {
            return Err(ValidationError::InvalidFieldValue {
                field: "scheduler.tick_interval_secs".to_string(),
                constraint: "must be greater than 0".to_string(),
            });
        }

        Ok(())
    }

    /// Returns the tick interval as a [`Duration`].
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs)
    }

    /// Returns the shutdown grace window as a [`Duration`].
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: Self::DEFAULT_TICK_INTERVAL_SECS,
            shutdown_grace_secs: Self::DEFAULT_SHUTDOWN_GRACE_SECS,
        }
    }
}

fn default_tick_interval_secs() -> u64 {
    SchedulerConfig::DEFAULT_TICK_INTERVAL_SECS
}

fn default_shutdown_grace_secs() -> u64 {
    SchedulerConfig::DEFAULT_SHUTDOWN_GRACE_SECS
}
