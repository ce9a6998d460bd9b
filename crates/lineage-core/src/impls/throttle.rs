//! Throttle の実装

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;

use crate::ports::Throttle;

/// Sleeps for a uniformly random duration in `[min, max]`.
#[derive(Debug, Clone)]
pub struct RandomThrottle {
    min: Duration,
    max: Duration,
}

impl RandomThrottle {
    /// `min` and `max` are swapped if given in the wrong order.
    pub fn new(min: Duration, max: Duration) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    fn sample(&self) -> Duration {
        if self.min == self.max {
            return self.min;
        }
        rand::thread_rng().gen_range(self.min..=self.max)
    }
}

impl Default for RandomThrottle {
    fn default() -> Self {
        Self::new(Duration::from_millis(1000), Duration::from_millis(2500))
    }
}

#[async_trait]
impl Throttle for RandomThrottle {
    async fn pause(&self) {
        let delay = self.sample();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

/// No delay (tests, replays from local pages).
#[derive(Debug, Clone, Copy, Default)]
pub struct NoThrottle;

#[async_trait]
impl Throttle for NoThrottle {
    async fn pause(&self) {}
}
