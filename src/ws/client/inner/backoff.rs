use std::time::Duration;

/// Retry policy for a foreground client: a few quick attempts, then give up.
///
/// The delay before retry `n` (the attempt count after `n` failed attempts) is
/// `min(base_delay * growth_factor ^ n, max_delay)`. Once the attempt count reaches
/// `max_attempts` no retry is permitted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffPolicy {
    /// delay unit, scaled by the growth factor
    pub base_delay: Duration,
    /// per-attempt growth, `1.0` means a constant delay
    pub growth_factor: f64,
    /// upper bound of any single delay
    pub max_delay: Duration,
    /// attempt ceiling, counted since the last successful connect
    pub max_attempts: u32,
    /// bound on opening one transport, an attempt still pending after it counts as failed
    pub connect_timeout: Duration,
}

pub(crate) const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1000);
pub(crate) const DEFAULT_GROWTH_FACTOR: f64 = 1.3;
pub(crate) const DEFAULT_MAX_DELAY: Duration = Duration::from_millis(10_000);
pub(crate) const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub(crate) const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base_delay: DEFAULT_BASE_DELAY,
            growth_factor: DEFAULT_GROWTH_FACTOR,
            max_delay: DEFAULT_MAX_DELAY,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

impl BackoffPolicy {
    /// Whether another attempt is allowed after `attempt_count` attempts.
    pub fn permits(&self, attempt_count: u32) -> bool {
        attempt_count < self.max_attempts
    }

    /// Delay before the next attempt, `None` once the ceiling is reached.
    pub fn next_delay(&self, attempt_count: u32) -> Option<Duration> {
        if !self.permits(attempt_count) {
            return None;
        }

        let exponent = i32::try_from(attempt_count).unwrap_or(i32::MAX);
        let scaled = self.base_delay.as_millis() as f64 * self.growth_factor.powi(exponent);
        let scaled = scaled.round();
        let max = self.max_delay.as_millis();

        let millis = if scaled.is_finite() && scaled >= 0.0 && scaled < max as f64 {
            scaled as u128
        } else {
            max
        };

        Some(Duration::from_millis(u64::try_from(millis).unwrap_or(u64::MAX)))
    }
}
