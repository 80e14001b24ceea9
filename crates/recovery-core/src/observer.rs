//! Observability hook for resilience events.
//!
//! Components call into an observer whenever something worth recording
//! happens. All methods have empty defaults so implementors only override
//! the events they care about.

use crate::types::{CircuitState, DataOrigin};
use std::time::Duration;

/// Receives retry, circuit breaker and fallback events.
pub trait ResilienceObserver: Send + Sync {
    /// A failed attempt is about to be retried after `delay`
    fn on_retry(&self, operation: &str, attempt: u32, delay: Duration) {
        let _ = (operation, attempt, delay);
    }

    /// All attempts failed and the last error is being returned
    fn on_retries_exhausted(&self, operation: &str, attempts: u32) {
        let _ = (operation, attempts);
    }

    /// A circuit breaker changed state
    fn on_state_change(&self, breaker: &str, from: CircuitState, to: CircuitState) {
        let _ = (breaker, from, to);
    }

    /// A circuit breaker rejected a call without invoking the dependency
    fn on_rejected(&self, breaker: &str) {
        let _ = breaker;
    }

    /// A fallback accessor answered from `origin`
    fn on_fallback(&self, key: &str, origin: DataOrigin) {
        let _ = (key, origin);
    }
}

/// Observer that ignores every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl ResilienceObserver for NoopObserver {}
