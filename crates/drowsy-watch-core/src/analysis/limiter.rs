//! Minimum-interval frame admission.

use std::time::{Duration, Instant};

use tracing::trace;

/// Default minimum interval between admitted frames.
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_millis(50);

/// Drops frames that arrive sooner than `min_interval` after the last
/// admitted frame, bounding how often the classifier runs.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    min_interval: Duration,
    last_admitted: Option<Instant>,
}

impl RateLimiter {
    /// Creates a limiter that has not admitted any frame yet.
    #[must_use]
    pub const fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_admitted: None,
        }
    }

    /// Returns the minimum interval between admitted frames.
    #[must_use]
    pub const fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Decides whether a frame stamped `now` is admitted, recording `now` if so.
    ///
    /// The first frame is always admitted. A timestamp earlier than the last
    /// admission counts as zero elapsed time.
    pub fn admit(&mut self, now: Instant) -> bool {
        if let Some(last) = self.last_admitted {
            let elapsed = now.saturating_duration_since(last);
            if elapsed < self.min_interval {
                trace!("Frame throttled: {elapsed:?} since last admission");
                return false;
            }
        }
        self.last_admitted = Some(now);
        true
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_INTERVAL)
    }
}
