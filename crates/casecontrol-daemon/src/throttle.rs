//! Rate limiting for repeated warnings.

use std::fmt::Display;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Minimum time between two warnings of one failure streak.
const LOG_INTERVAL: Duration = Duration::from_secs(60);

/// Logs the first failure of a streak, then at most one summary a minute.
pub struct WarnThrottle {
    context: &'static str,
    streak: u32,
    suppressed: u32,
    last_log: Instant,
}

impl WarnThrottle {
    pub fn new(context: &'static str) -> Self {
        Self {
            context,
            streak: 0,
            suppressed: 0,
            last_log: Instant::now(),
        }
    }

    /// Records a failure, logging it if due. Returns true if it was logged.
    pub fn failure(&mut self, error: &dyn Display) -> bool {
        self.streak = self.streak.saturating_add(1);
        let elapsed = self.last_log.elapsed();
        if self.streak > 1 && elapsed < LOG_INTERVAL {
            self.suppressed = self.suppressed.saturating_add(1);
            return false;
        }

        if self.suppressed > 0 {
            warn!(
                "{} (repeated {} times in {:?}): {}",
                self.context, self.suppressed, elapsed, error
            );
        } else {
            warn!("{}: {}", self.context, error);
        }
        self.last_log = Instant::now();
        self.suppressed = 0;
        true
    }

    /// Ends a failure streak.
    pub fn success(&mut self) {
        if self.streak > 1 {
            info!("{} cleared after {} failures", self.context, self.streak);
        }
        self.streak = 0;
        self.suppressed = 0;
    }

    /// Failures since the last success.
    #[cfg(test)]
    pub fn streak(&self) -> u32 {
        self.streak
    }

    /// Failures not logged since the last warning.
    #[cfg(test)]
    pub fn suppressed(&self) -> u32 {
        self.suppressed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_streak_logs_once() {
        let mut throttle = WarnThrottle::new("Link error");
        assert!(throttle.failure(&"first"));
        assert!(!throttle.failure(&"second"));
        assert!(!throttle.failure(&"third"));
        assert_eq!(throttle.suppressed, 2);

        // A new streak logs right away
        throttle.success();
        assert!(throttle.failure(&"again"));
    }

    #[test]
    fn test_summary_after_interval() {
        let mut throttle = WarnThrottle::new("Link error");
        throttle.failure(&"first");
        throttle.failure(&"second");
        throttle.last_log = Instant::now() - LOG_INTERVAL;
        assert!(throttle.failure(&"third"));
        assert_eq!(throttle.suppressed, 0);
    }

    #[test]
    fn test_endless_streak_saturates() {
        let mut throttle = WarnThrottle::new("Link error");
        throttle.failure(&"first");
        throttle.streak = u32::MAX;
        throttle.suppressed = u32::MAX;
        assert!(!throttle.failure(&"again"));
        assert_eq!(throttle.streak(), u32::MAX);
        assert_eq!(throttle.suppressed(), u32::MAX);
    }
}
