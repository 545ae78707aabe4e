//! Retry/backoff configuration (spec.md §4.6/§6).
use std::time::Duration;

/// `Retry wait = clamp(factor * exponent_base^attempt, min_wait, max_wait)`
/// with uniform jitter in `[0, computed]`.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    pub exponent_base: f64,
    pub factor: Duration,
    pub min_wait: Duration,
    pub max_wait: Duration,
    /// Not one of spec.md §6's named configuration keys: a bound on retry
    /// attempts is needed for the backoff function's "return `None` to mean
    /// give up" case to ever actually trigger, since the clamp alone never
    /// produces it. Resolved as an internal default rather than a new
    /// public configuration surface; see DESIGN.md.
    pub max_attempts: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            exponent_base: 2.0,
            factor: Duration::from_millis(10),
            min_wait: Duration::from_millis(1280),
            max_wait: Duration::from_millis(655_360),
            max_attempts: 5,
        }
    }
}

impl RetryConfig {
    /// The wait before retry attempt number `attempt` (1-based), or `None`
    /// once `max_attempts` is exceeded, meaning give up and surface the
    /// original error.
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Option<Duration> {
        if attempt > self.max_attempts {
            return None;
        }
        let computed_ms = (self.factor.as_secs_f64() * 1000.0) * self.exponent_base.powi(attempt as i32);
        let clamped_ms = computed_ms.clamp(self.min_wait.as_secs_f64() * 1000.0, self.max_wait.as_secs_f64() * 1000.0);
        let jittered_ms = rand::Rng::gen_range(&mut rand::thread_rng(), 0.0..=clamped_ms);
        Some(Duration::from_secs_f64(jittered_ms / 1000.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_clamps_to_min_and_max() {
        let cfg = RetryConfig::default();
        let low = cfg.backoff(0).unwrap();
        assert!(low <= cfg.max_wait);
        let high = cfg.backoff(40).unwrap();
        assert!(high <= cfg.max_wait);
    }

    #[test]
    fn gives_up_past_max_attempts() {
        let cfg = RetryConfig::default();
        assert!(cfg.backoff(cfg.max_attempts + 1).is_none());
    }
}
