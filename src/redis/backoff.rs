//! Exponential backoff for Redis reconnection

use std::time::Duration;

use rand::Rng;

/// Exponential backoff configuration
#[derive(Debug, Clone)]
pub struct BackoffConfig {
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub multiplier: f64,
    /// Jitter factor (0.0 to 1.0)
    pub jitter_factor: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: 250,
            max_delay_ms: 30_000,
            multiplier: 2.0,
            jitter_factor: 0.1,
        }
    }
}

/// Exponential backoff calculator with jitter.
///
/// The first delay is `initial_delay_ms`; each following one is multiplied
/// and capped at `max_delay_ms` before jitter is applied.
pub struct ExponentialBackoff {
    config: BackoffConfig,
    next_base_ms: f64,
    attempt: u32,
}

impl ExponentialBackoff {
    pub fn new() -> Self {
        Self::with_config(BackoffConfig::default())
    }

    pub fn with_config(config: BackoffConfig) -> Self {
        let initial = config.initial_delay_ms as f64;
        Self {
            config,
            next_base_ms: initial,
            attempt: 0,
        }
    }

    pub fn next_delay(&mut self) -> Duration {
        self.attempt += 1;

        let base = self.next_base_ms.min(self.config.max_delay_ms as f64);
        self.next_base_ms = base * self.config.multiplier;

        let delay = if self.config.jitter_factor > 0.0 {
            let range = base * self.config.jitter_factor;
            base + rand::rng().random_range(-range..=range)
        } else {
            base
        };

        Duration::from_millis(delay.max(1.0) as u64)
    }

    /// Back to the initial delay, after a successful connection.
    pub fn reset(&mut self) {
        self.next_base_ms = self.config.initial_delay_ms as f64;
        self.attempt = 0;
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_jitter(initial: u64, max: u64, multiplier: f64) -> ExponentialBackoff {
        ExponentialBackoff::with_config(BackoffConfig {
            initial_delay_ms: initial,
            max_delay_ms: max,
            multiplier,
            jitter_factor: 0.0,
        })
    }

    #[test]
    fn test_delays_double() {
        let mut backoff = no_jitter(100, 10_000, 2.0);

        assert_eq!(backoff.next_delay(), Duration::from_millis(100));
        assert_eq!(backoff.next_delay(), Duration::from_millis(200));
        assert_eq!(backoff.next_delay(), Duration::from_millis(400));
        assert_eq!(backoff.attempt(), 3);
    }

    #[test]
    fn test_caps_at_max() {
        let mut backoff = no_jitter(1000, 5000, 10.0);
        for _ in 0..5 {
            backoff.next_delay();
        }
        assert_eq!(backoff.next_delay(), Duration::from_millis(5000));
    }

    #[test]
    fn test_jitter_stays_in_range() {
        let mut backoff = ExponentialBackoff::with_config(BackoffConfig {
            initial_delay_ms: 1000,
            max_delay_ms: 1000,
            multiplier: 2.0,
            jitter_factor: 0.1,
        });
        for _ in 0..20 {
            let delay = backoff.next_delay().as_millis();
            assert!((900..=1100).contains(&delay), "delay {} out of range", delay);
        }
    }

    #[test]
    fn test_reset() {
        let mut backoff = no_jitter(100, 10_000, 2.0);
        backoff.next_delay();
        backoff.next_delay();

        backoff.reset();
        assert_eq!(backoff.attempt(), 0);
        assert_eq!(backoff.next_delay(), Duration::from_millis(100));
    }
}
