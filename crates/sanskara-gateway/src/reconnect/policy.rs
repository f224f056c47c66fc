//! Bounded exponential backoff for backend stream recovery.

use std::time::Duration;

use sanskara_core::config::ReconnectConfig;

/// Exponential backoff reconnection policy.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
    /// Multiplier applied after each failed attempt.
    pub multiplier: f64,
    /// Maximum consecutive retries (None = unlimited).
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::from(&ReconnectConfig::default())
    }
}

impl From<&ReconnectConfig> for ReconnectPolicy {
    fn from(config: &ReconnectConfig) -> Self {
        Self {
            initial_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            multiplier: 2.0,
            max_attempts: Some(config.max_attempts),
        }
    }
}

impl ReconnectPolicy {
    /// Calculate the delay for a given attempt number (0-indexed).
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_possible_wrap
    )]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base_ms = self.initial_delay.as_millis() as f64;
        let delay_ms = base_ms * self.multiplier.powi(attempt as i32);
        let capped_ms = delay_ms.min(self.max_delay.as_millis() as f64);
        Duration::from_millis(capped_ms as u64)
    }

    /// Whether another attempt should be made after `attempt` retries.
    pub fn should_retry(&self, attempt: u32) -> bool {
        self.max_attempts.is_none_or(|max| attempt < max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_matches_reconnect_config() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.initial_delay, Duration::from_millis(750));
        assert_eq!(policy.max_delay, Duration::from_secs(30));
        assert_eq!(policy.max_attempts, Some(3));
    }

    #[test]
    fn delays_double_from_base() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.delay_for_attempt(0), Duration::from_millis(750));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(1500));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(3000));
    }

    #[test]
    fn delays_are_capped() {
        let policy = ReconnectPolicy {
            max_delay: Duration::from_secs(2),
            ..Default::default()
        };
        assert_eq!(policy.delay_for_attempt(5), Duration::from_secs(2));
    }

    #[test]
    fn retry_budget() {
        let policy = ReconnectPolicy::default();
        assert!(policy.should_retry(0));
        assert!(policy.should_retry(2));
        assert!(!policy.should_retry(3));

        let unlimited = ReconnectPolicy {
            max_attempts: None,
            ..Default::default()
        };
        assert!(unlimited.should_retry(u32::MAX));
    }
}
