//! Retry policy: redelivery backoff delays.

use std::time::Duration;

/// Upper bound on `max_receives` accepted from configuration.
pub const MAX_RECEIVES_LIMIT: u32 = 100;

/// Backoff between redeliveries of an unacknowledged message.
/// delay = min(base_delay * multiplier^(receive_count - 1), max_delay)
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Delay before the first redelivery.
    pub base_delay: Duration,

    pub multiplier: f64,

    /// Cap on any single backoff.
    pub max_delay: Duration,

    /// Deliveries allowed before the message is dead-lettered.
    pub max_receives: u32,
}

impl RetryPolicy {
    pub fn new(base_delay: Duration, max_receives: u32) -> Self {
        Self {
            base_delay,
            multiplier: 2.0,
            max_delay: Duration::from_secs(15 * 60),
            max_receives,
        }
    }

    /// Delay before the next delivery, given the deliveries already made (1-indexed).
    ///
    /// With base_delay=2s, multiplier=2.0: 2s, 4s, 8s, 16s, ...
    pub fn next_delay(&self, receive_count: u32) -> Duration {
        // 2^64 already dwarfs any max_delay
        let exponent = receive_count.saturating_sub(1).min(64) as i32;
        let delay_secs = self.base_delay.as_secs_f64() * self.multiplier.powi(exponent);
        Duration::try_from_secs_f64(delay_secs)
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }

    pub fn is_exhausted(&self, receive_count: u32) -> bool {
        receive_count >= self.max_receives
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(2), 5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_has_reasonable_values() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.base_delay, Duration::from_secs(2));
        assert_eq!(policy.multiplier, 2.0);
        assert_eq!(policy.max_receives, 5);
    }

    #[test]
    fn exponential_backoff_increases() {
        let policy = RetryPolicy::default();

        let d1 = policy.next_delay(1);
        let d2 = policy.next_delay(2);
        let d3 = policy.next_delay(3);

        assert_eq!(d1, Duration::from_secs(2));
        assert_eq!(d2, Duration::from_secs(4));
        assert_eq!(d3, Duration::from_secs(8));
    }

    #[test]
    fn zero_receives_uses_base_delay() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.next_delay(0), policy.base_delay);
    }

    #[test]
    fn delay_is_capped_for_large_receive_counts() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.next_delay(10), Duration::from_secs(15 * 60));
        assert_eq!(policy.next_delay(64), policy.max_delay);
        assert_eq!(policy.next_delay(MAX_RECEIVES_LIMIT), policy.max_delay);
        assert_eq!(policy.next_delay(u32::MAX), policy.max_delay);
    }

    #[test]
    fn exhausted_at_max_receives() {
        let policy = RetryPolicy::new(Duration::from_millis(10), 3);
        assert!(!policy.is_exhausted(2));
        assert!(policy.is_exhausted(3));
    }
}
