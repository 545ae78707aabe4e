//! The pool's circuit breaker (spec.md §4.5): trips after a continuous
//! window of failed connection attempts, fails new leases fast while open,
//! closes again on the first successful dial.
use std::time::{Duration, Instant};

#[derive(Debug)]
enum State {
    Closed,
    /// Dial attempts have been failing continuously since `since`.
    Failing { since: Instant },
    /// The breaker is open; leases fail fast until `retry_after`.
    Open { retry_after: Instant },
}

/// Not `Clone`/`Sync` on its own; the pool wraps one behind its own mutex
/// alongside the idle queue, so both are updated under one lock.
#[derive(Debug)]
pub struct CircuitBreaker {
    state: State,
    trip_after: Duration,
}

impl CircuitBreaker {
    #[must_use]
    pub fn new(trip_after: Duration) -> Self {
        Self {
            state: State::Closed,
            trip_after,
        }
    }

    /// True while the breaker is open and new leases should fail with
    /// [`crate::error::ClientError::PoolUnavailable`] without attempting a
    /// dial.
    #[must_use]
    pub fn is_open(&self) -> bool {
        matches!(self.state, State::Open { .. })
    }

    /// Record a failed dial attempt, tripping the breaker once failures
    /// have been continuous for `trip_after`.
    pub fn record_failure(&mut self) {
        let now = Instant::now();
        self.state = match &self.state {
            State::Closed => State::Failing { since: now },
            State::Failing { since } if now.duration_since(*since) >= self.trip_after => {
                warn!("circuit breaker tripped after continuous dial failures for {:?}", self.trip_after);
                State::Open { retry_after: now }
            }
            State::Failing { since } => State::Failing { since: *since },
            State::Open { .. } => State::Open { retry_after: now },
        };
    }

    /// Record a successful dial, closing the breaker immediately.
    pub fn record_success(&mut self) {
        if !matches!(self.state, State::Closed) {
            debug!("circuit breaker closed after a successful dial");
        }
        self.state = State::Closed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stays_closed_under_the_trip_window() {
        let mut cb = CircuitBreaker::new(Duration::from_secs(60));
        cb.record_failure();
        assert!(!cb.is_open());
    }

    #[test]
    fn trips_once_failures_span_the_window() {
        let mut cb = CircuitBreaker::new(Duration::from_millis(0));
        cb.record_failure();
        cb.record_failure();
        assert!(cb.is_open());
    }

    #[test]
    fn a_success_closes_it_again() {
        let mut cb = CircuitBreaker::new(Duration::from_millis(0));
        cb.record_failure();
        cb.record_failure();
        assert!(cb.is_open());
        cb.record_success();
        assert!(!cb.is_open());
    }
}
