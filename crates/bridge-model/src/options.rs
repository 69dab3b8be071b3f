//! Batch-level options for a migration run.

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Options controlling how a batch is loaded into target systems.
///
/// Serialized in camelCase; unknown keys are rejected so that typos in a
/// deployment file do not silently fall back to defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct BatchConfig {
    /// Reference date of the migration, with an explicit UTC offset.
    ///
    /// Mappers and rules that compare against "today" should use this
    /// instead of the wall clock so that re-runs are reproducible. A value
    /// without an offset is rejected when parsing.
    pub migration_key_date: Option<DateTime<FixedOffset>>,

    /// Upper bound on poll calls per submitted record.
    pub max_poll_attempts: u32,

    /// Delay before the second poll attempt, in milliseconds.
    pub poll_interval_ms: u64,

    /// Factor applied to the delay after each pending poll. `1.0` keeps it constant.
    pub poll_backoff_multiplier: f64,

    /// Ceiling for the backoff delay, in milliseconds.
    pub max_poll_interval_ms: u64,

    /// Timeout for a single poll call.
    pub poll_attempt_timeout_ms: Option<u64>,

    /// Timeout for the whole polling phase of one record.
    pub poll_timeout_ms: Option<u64>,

    /// Whether the verify phase runs for targets that support it.
    pub verify_enabled: bool,

    /// Number of records processed concurrently.
    pub worker_concurrency: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            migration_key_date: None,
            max_poll_attempts: 10,
            poll_interval_ms: 1000,
            poll_backoff_multiplier: 1.0,
            max_poll_interval_ms: 30_000,
            poll_attempt_timeout_ms: None,
            poll_timeout_ms: None,
            verify_enabled: true,
            worker_concurrency: 4,
        }
    }
}

impl BatchConfig {
    /// Parses and validates a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON config file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    #[must_use]
    pub fn with_migration_key_date(mut self, key_date: DateTime<FixedOffset>) -> Self {
        self.migration_key_date = Some(key_date);
        self
    }

    #[must_use]
    pub fn with_max_poll_attempts(mut self, attempts: u32) -> Self {
        self.max_poll_attempts = attempts;
        self
    }

    #[must_use]
    pub fn with_poll_interval_ms(mut self, interval_ms: u64) -> Self {
        self.poll_interval_ms = interval_ms;
        self
    }

    #[must_use]
    pub fn with_verify_enabled(mut self, enabled: bool) -> Self {
        self.verify_enabled = enabled;
        self
    }

    #[must_use]
    pub fn with_worker_concurrency(mut self, workers: usize) -> Self {
        self.worker_concurrency = workers;
        self
    }

    /// Checks cross-field constraints.
    pub fn validate(&self) -> Result<()> {
        if self.max_poll_attempts == 0 {
            return Err(ConfigError::invalid(
                "maxPollAttempts",
                "must be at least 1",
            ));
        }
        if self.worker_concurrency == 0 {
            return Err(ConfigError::invalid(
                "workerConcurrency",
                "must be at least 1",
            ));
        }
        if !self.poll_backoff_multiplier.is_finite() || self.poll_backoff_multiplier < 1.0 {
            return Err(ConfigError::invalid(
                "pollBackoffMultiplier",
                format!(
                    "must be a finite number >= 1.0, got {}",
                    self.poll_backoff_multiplier
                ),
            ));
        }
        if self.max_poll_interval_ms < self.poll_interval_ms {
            return Err(ConfigError::invalid(
                "maxPollIntervalMs",
                format!(
                    "must not be smaller than pollIntervalMs ({} < {})",
                    self.max_poll_interval_ms, self.poll_interval_ms
                ),
            ));
        }
        if self.poll_attempt_timeout_ms == Some(0) {
            return Err(ConfigError::invalid(
                "pollAttemptTimeoutMs",
                "must be greater than 0 when set",
            ));
        }
        if self.poll_timeout_ms == Some(0) {
            return Err(ConfigError::invalid(
                "pollTimeoutMs",
                "must be greater than 0 when set",
            ));
        }
        Ok(())
    }

    /// The configured key date, if any.
    pub fn key_date(&self) -> Option<DateTime<FixedOffset>> {
        self.migration_key_date
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn max_poll_interval(&self) -> Duration {
        Duration::from_millis(self.max_poll_interval_ms)
    }

    pub fn poll_attempt_timeout(&self) -> Option<Duration> {
        self.poll_attempt_timeout_ms.map(Duration::from_millis)
    }

    pub fn poll_timeout(&self) -> Option<Duration> {
        self.poll_timeout_ms.map(Duration::from_millis)
    }
}
