//! Reconnection configuration and exponential backoff.

use std::time::Duration;

/// Configuration for reconnection behavior.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectConfig {
    /// Delay before the first reconnection attempt.
    pub initial_delay: Duration,
    /// Maximum delay between reconnection attempts.
    pub max_delay: Duration,
    /// Multiplier applied after each failed attempt.
    pub backoff_multiplier: f64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(800),
            max_delay: Duration::from_secs(15),
            backoff_multiplier: 1.7,
        }
    }
}

impl ReconnectConfig {
    /// The delay that follows `previous` after another failed attempt.
    ///
    /// Delays are kept in whole milliseconds.
    #[must_use]
    pub fn next_delay(&self, previous: Duration) -> Duration {
        let grown = (previous.as_millis() as f64 * self.backoff_multiplier).round() as u64;
        Duration::from_millis(grown).min(self.max_delay)
    }

    /// Delay before the given attempt (1-based) when every earlier attempt failed.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        (1..attempt).fold(self.initial_delay.min(self.max_delay), |delay, _| {
            self.next_delay(delay)
        })
    }
}

/// Backoff tracker for one connection.
#[derive(Debug, Clone)]
pub struct Backoff {
    config: ReconnectConfig,
    current: Duration,
    attempt: u32,
}

impl Backoff {
    /// Create a tracker at the floor delay.
    #[must_use]
    pub fn new(config: ReconnectConfig) -> Self {
        let current = config.initial_delay.min(config.max_delay);
        Self {
            config,
            current,
            attempt: 1,
        }
    }

    /// Delay to wait before the next attempt.
    #[must_use]
    pub const fn current(&self) -> Duration {
        self.current
    }

    /// Number of the next attempt since the last reset (1-based).
    #[must_use]
    pub const fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Record a failed attempt and grow the delay.
    pub fn fail(&mut self) -> Duration {
        self.current = self.config.next_delay(self.current);
        self.attempt = self.attempt.saturating_add(1);
        self.current
    }

    /// Return to the floor delay.
    pub fn reset(&mut self) {
        self.current = self.config.initial_delay.min(self.config.max_delay);
        self.attempt = 1;
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(ReconnectConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_reconnect_config_default() {
        let config = ReconnectConfig::default();
        assert_eq!(config.initial_delay, Duration::from_millis(800));
        assert_eq!(config.max_delay, Duration::from_secs(15));
        assert!((config.backoff_multiplier - 1.7).abs() < f64::EPSILON);
    }

    #[test]
    fn test_default_backoff_sequence() {
        let mut backoff = Backoff::default();
        let mut delays = vec![backoff.current().as_millis()];
        for _ in 0..7 {
            delays.push(backoff.fail().as_millis());
        }
        assert_eq!(delays, vec![800, 1360, 2312, 3930, 6681, 11358, 15000, 15000]);
    }

    #[test]
    fn test_delay_for_attempt_matches_tracker() {
        let config = ReconnectConfig::default();
        assert_eq!(config.delay_for_attempt(0), Duration::from_millis(800));
        assert_eq!(config.delay_for_attempt(1), Duration::from_millis(800));
        assert_eq!(config.delay_for_attempt(2), Duration::from_millis(1360));
        assert_eq!(config.delay_for_attempt(3), Duration::from_millis(2312));
        assert_eq!(config.delay_for_attempt(20), Duration::from_secs(15)); // capped
    }

    #[test]
    fn test_reset_returns_to_floor() {
        let mut backoff = Backoff::default();
        backoff.fail();
        backoff.fail();
        assert_eq!(backoff.attempt(), 3);

        backoff.reset();
        assert_eq!(backoff.current(), Duration::from_millis(800));
        assert_eq!(backoff.attempt(), 1);
    }

    #[test]
    fn test_backoff_with_different_multipliers() {
        let config = ReconnectConfig {
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(60),
            backoff_multiplier: 1.5,
        };
        assert_eq!(config.delay_for_attempt(2), Duration::from_millis(150));
        assert_eq!(config.delay_for_attempt(3), Duration::from_millis(225));
    }

    proptest! {
        #[test]
        fn prop_delay_never_exceeds_cap_and_never_shrinks(failures in 0usize..64) {
            let mut backoff = Backoff::default();
            let mut previous = backoff.current();
            for _ in 0..failures {
                let next = backoff.fail();
                prop_assert!(next >= previous);
                prop_assert!(next <= Duration::from_secs(15));
                previous = next;
            }
        }
    }
}
