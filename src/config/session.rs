//! Validated session configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Idle timeout bounds (milliseconds).
pub const TIMEOUT_MS_RANGE: (u64, u64) = (60_000, 157_680_000_000);
/// Expiration sweep interval bounds (milliseconds).
pub const CLEANUP_INTERVAL_MS_RANGE: (u64, u64) = (10_000, 3_600_000);
/// Heartbeat interval bounds (milliseconds).
pub const KEEP_ALIVE_INTERVAL_MS_RANGE: (u64, u64) = (5_000, 300_000);
/// Missed heartbeat threshold bounds.
pub const MAX_MISSED_HEARTBEATS_RANGE: (u64, u64) = (1, 100);
/// Registry capacity bounds.
pub const MAX_COUNT_RANGE: (u64, u64) = (1, 10_000);

/// Raw session settings as read from TOML/env/CLI, before validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Idle time after which the sweep terminates a session
    pub timeout_ms: u64,
    /// Expiration sweep period
    pub cleanup_interval_ms: u64,
    /// Heartbeat probe period
    pub keep_alive_interval_ms: u64,
    /// Consecutive unanswered probes before a session is terminated
    pub max_missed_heartbeats: u32,
    /// Maximum number of live sessions
    pub max_count: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            timeout_ms: 1_800_000,
            cleanup_interval_ms: 60_000,
            keep_alive_interval_ms: 30_000,
            max_missed_heartbeats: 3,
            max_count: 1_000,
        }
    }
}

/// Immutable, bounds-checked session configuration.
///
/// The only way to build one is [`SessionConfig::new`] (or `Default`, which
/// yields the validated defaults), so holders never re-check ranges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    timeout: Duration,
    cleanup_interval: Duration,
    keep_alive_interval: Duration,
    max_missed_heartbeats: u32,
    max_count: usize,
}

impl SessionConfig {
    /// Validate raw settings against field bounds and cross-field rules.
    pub fn new(settings: &SessionSettings) -> Result<Self, ConfigError> {
        check_range("timeout_ms", settings.timeout_ms, TIMEOUT_MS_RANGE)?;
        check_range(
            "cleanup_interval_ms",
            settings.cleanup_interval_ms,
            CLEANUP_INTERVAL_MS_RANGE,
        )?;
        check_range(
            "keep_alive_interval_ms",
            settings.keep_alive_interval_ms,
            KEEP_ALIVE_INTERVAL_MS_RANGE,
        )?;
        check_range(
            "max_missed_heartbeats",
            u64::from(settings.max_missed_heartbeats),
            MAX_MISSED_HEARTBEATS_RANGE,
        )?;
        check_range("max_count", settings.max_count as u64, MAX_COUNT_RANGE)?;

        if settings.cleanup_interval_ms > settings.timeout_ms {
            return Err(ConfigError::Constraint(format!(
                "cleanup_interval_ms ({}) must not exceed timeout_ms ({})",
                settings.cleanup_interval_ms, settings.timeout_ms
            )));
        }
        if settings.keep_alive_interval_ms >= settings.timeout_ms {
            return Err(ConfigError::Constraint(format!(
                "keep_alive_interval_ms ({}) must be less than timeout_ms ({})",
                settings.keep_alive_interval_ms, settings.timeout_ms
            )));
        }

        Ok(Self {
            timeout: Duration::from_millis(settings.timeout_ms),
            cleanup_interval: Duration::from_millis(settings.cleanup_interval_ms),
            keep_alive_interval: Duration::from_millis(settings.keep_alive_interval_ms),
            max_missed_heartbeats: settings.max_missed_heartbeats,
            max_count: settings.max_count,
        })
    }

    /// Idle timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Sweep period
    pub fn cleanup_interval(&self) -> Duration {
        self.cleanup_interval
    }

    /// Heartbeat period
    pub fn keep_alive_interval(&self) -> Duration {
        self.keep_alive_interval
    }

    /// Missed heartbeat threshold
    pub fn max_missed_heartbeats(&self) -> u32 {
        self.max_missed_heartbeats
    }

    /// Registry capacity
    pub fn max_count(&self) -> usize {
        self.max_count
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        let defaults = SessionSettings::default();
        Self {
            timeout: Duration::from_millis(defaults.timeout_ms),
            cleanup_interval: Duration::from_millis(defaults.cleanup_interval_ms),
            keep_alive_interval: Duration::from_millis(defaults.keep_alive_interval_ms),
            max_missed_heartbeats: defaults.max_missed_heartbeats,
            max_count: defaults.max_count,
        }
    }
}

fn check_range(field: &'static str, value: u64, (min, max): (u64, u64)) -> Result<(), ConfigError> {
    if value < min || value > max {
        return Err(ConfigError::OutOfRange {
            field,
            value,
            min,
            max,
        });
    }
    Ok(())
}
