//! Polling and verification policy.

use std::time::Duration;

use bridge_model::BatchConfig;

/// Tunable parameters of the poll phase.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadPolicy {
    /// Maximum number of poll calls per record.
    pub max_poll_attempts: u32,
    /// Delay before the second poll.
    pub poll_interval: Duration,
    /// Factor by which the delay grows after each pending poll.
    pub backoff_multiplier: f64,
    /// Upper bound on the delay between polls.
    pub max_poll_interval: Duration,
    /// Limit on a single poll call; exceeding it fails the record.
    pub poll_attempt_timeout: Option<Duration>,
    /// Limit on the whole poll loop, sleeps included.
    pub poll_timeout: Option<Duration>,
    /// Run the verify phase on targets that support it.
    pub verify_enabled: bool,
}

impl Default for LoadPolicy {
    fn default() -> Self {
        Self::from(&BatchConfig::default())
    }
}

impl From<&BatchConfig> for LoadPolicy {
    fn from(config: &BatchConfig) -> Self {
        Self {
            max_poll_attempts: config.max_poll_attempts,
            poll_interval: config.poll_interval(),
            backoff_multiplier: config.poll_backoff_multiplier,
            max_poll_interval: config.max_poll_interval(),
            poll_attempt_timeout: config.poll_attempt_timeout(),
            poll_timeout: config.poll_timeout(),
            verify_enabled: config.verify_enabled,
        }
    }
}

impl LoadPolicy {
    /// Calculate the next delay from the current one, clamped to
    /// [`LoadPolicy::max_poll_interval`].
    pub fn next_delay(&self, current: Duration) -> Duration {
        let next_ms = (current.as_millis() as f64 * self.backoff_multiplier) as u64;
        Duration::from_millis(next_ms).min(self.max_poll_interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Delays slept between polls while the target stays pending.
    fn schedule(policy: &LoadPolicy) -> Vec<Duration> {
        let sleeps = policy.max_poll_attempts.saturating_sub(1) as usize;
        std::iter::successors(Some(policy.poll_interval), |d| Some(policy.next_delay(*d)))
            .take(sleeps)
            .collect()
    }

    fn exponential() -> LoadPolicy {
        LoadPolicy {
            max_poll_attempts: 8,
            poll_interval: Duration::from_secs(1),
            backoff_multiplier: 2.0,
            max_poll_interval: Duration::from_secs(30),
            ..Default::default()
        }
    }

    #[test]
    fn next_delay_constant_by_default() {
        let policy = LoadPolicy::default();
        assert_eq!(
            policy.next_delay(Duration::from_secs(1)),
            Duration::from_secs(1)
        );
    }

    #[test]
    fn next_delay_clamps_at_max() {
        let policy = LoadPolicy {
            max_poll_interval: Duration::from_secs(10),
            ..exponential()
        };
        assert_eq!(
            policy.next_delay(Duration::from_secs(8)),
            Duration::from_secs(10)
        );
    }

    #[test]
    fn full_backoff_schedule() {
        let secs: Vec<u64> = schedule(&exponential())
            .iter()
            .map(Duration::as_secs)
            .collect();
        assert_eq!(secs, [1, 2, 4, 8, 16, 30, 30]);
    }

    #[test]
    fn single_attempt_never_sleeps() {
        let policy = LoadPolicy {
            max_poll_attempts: 1,
            ..exponential()
        };
        assert!(schedule(&policy).is_empty());
    }
}
