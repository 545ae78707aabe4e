//! Pool configuration (spec.md §4.5/§6), built with the same chained
//! `&mut self -> &mut Self` builder idiom used elsewhere in this crate.
use crate::error::{ClientError, ClientResult};
use std::time::Duration;

/// Per-node connection pool configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PoolConfig {
    pub(crate) min: usize,
    pub(crate) soft_max: usize,
    pub(crate) hard_max: usize,
    pub(crate) idle_timeout: Duration,
    pub(crate) circuit_breaker_trip_after: Duration,
    pub(crate) max_concurrent_connection_requests: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            min: 0,
            soft_max: 20,
            hard_max: 20,
            idle_timeout: Duration::from_millis(60_000),
            circuit_breaker_trip_after: Duration::from_millis(60_000),
            max_concurrent_connection_requests: 20,
        }
    }
}

impl PoolConfig {
    #[must_use]
    pub fn builder() -> PoolConfigBuilder {
        PoolConfigBuilder::default()
    }
}

/// Builds a [`PoolConfig`], validating `min ≤ soft_max ≤ hard_max` at
/// [`build`](Self::build) time.
#[derive(Clone, Debug, Default)]
pub struct PoolConfigBuilder {
    inner: PoolConfig,
}

impl PoolConfigBuilder {
    pub fn min(&mut self, min: usize) -> &mut Self {
        self.inner.min = min;
        self
    }

    pub fn soft_max(&mut self, soft_max: usize) -> &mut Self {
        self.inner.soft_max = soft_max;
        self
    }

    pub fn hard_max(&mut self, hard_max: usize) -> &mut Self {
        self.inner.hard_max = hard_max;
        self
    }

    pub fn idle_timeout(&mut self, idle_timeout: Duration) -> &mut Self {
        self.inner.idle_timeout = idle_timeout;
        self
    }

    pub fn circuit_breaker_trip_after(&mut self, window: Duration) -> &mut Self {
        self.inner.circuit_breaker_trip_after = window;
        self
    }

    pub fn max_concurrent_connection_requests(&mut self, n: usize) -> &mut Self {
        self.inner.max_concurrent_connection_requests = n;
        self
    }

    pub fn build(&self) -> ClientResult<PoolConfig> {
        let cfg = self.inner.clone();
        if cfg.soft_max > cfg.hard_max {
            return Err(ClientError::InvalidConfiguration(format!(
                "soft_max ({}) must be ≤ hard_max ({})",
                cfg.soft_max, cfg.hard_max
            )));
        }
        if cfg.min > cfg.soft_max {
            return Err(ClientError::InvalidConfiguration(format!(
                "min ({}) must be ≤ soft_max ({})",
                cfg.min, cfg.soft_max
            )));
        }
        if cfg.hard_max == 0 {
            return Err(ClientError::InvalidConfiguration("hard_max must be > 0".to_string()));
        }
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_soft_max_above_hard_max() {
        let err = PoolConfig::builder().soft_max(30).hard_max(20).build().unwrap_err();
        assert!(matches!(err, ClientError::InvalidConfiguration(_)));
    }

    #[test]
    fn defaults_match_spec() {
        let cfg = PoolConfig::default();
        assert_eq!(cfg.min, 0);
        assert_eq!(cfg.soft_max, 20);
        assert_eq!(cfg.hard_max, 20);
        assert_eq!(cfg.idle_timeout, Duration::from_millis(60_000));
    }
}
