//! Circuit breaker pattern implementation.
//!
//! The circuit breaker prevents cascading failures by stopping requests
//! to a failing dependency and allowing it time to recover.
//!
//! ```text
//! Closed   → Open:     consecutive failures reach the threshold
//! Open     → HalfOpen: next call after the reset timeout (evaluated lazily)
//! HalfOpen → Closed:   the single probe succeeds
//! HalfOpen → Open:     the single probe fails
//! ```
//!
//! All state lives behind one mutex per breaker. The lock is taken to admit
//! a call and again to record its outcome, never across the operation itself.

use parking_lot::Mutex;
use recovery_core::{CircuitOpenError, CircuitState, ResilienceObserver};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Circuit breaker configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that open the circuit (at least 1)
    pub threshold: u32,
    /// Time to stay open before admitting a probe
    pub reset_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            threshold: 5,
            reset_timeout: Duration::from_secs(30),
        }
    }
}

impl CircuitBreakerConfig {
    /// Create a configuration
    #[must_use]
    pub fn new(threshold: u32, reset_timeout: Duration) -> Self {
        Self {
            threshold,
            reset_timeout,
        }
    }
}

/// Mutable breaker state, guarded by [`CircuitBreaker::core`]
#[derive(Debug)]
struct BreakerCore {
    state: CircuitState,
    /// Consecutive failures; only meaningful while closed
    failure_count: u32,
    opened_at: Option<Instant>,
    probe_in_flight: bool,
    total_calls: u64,
    rejected_calls: u64,
    successes: u64,
    failures: u64,
}

impl BreakerCore {
    fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            failure_count: 0,
            opened_at: None,
            probe_in_flight: false,
            total_calls: 0,
            rejected_calls: 0,
            successes: 0,
            failures: 0,
        }
    }

    fn reset_timeout_elapsed(&self, reset_timeout: Duration) -> bool {
        self.opened_at
            .map_or(true, |opened| opened.elapsed() >= reset_timeout)
    }

    /// Move to `to`, returning the change if the state actually differs
    fn transition(&mut self, to: CircuitState) -> Option<StateChange> {
        let from = self.state;
        self.state = to;
        self.probe_in_flight = false;

        match to {
            CircuitState::Closed => {
                self.failure_count = 0;
                self.opened_at = None;
            }
            CircuitState::Open => {
                self.opened_at = Some(Instant::now());
            }
            CircuitState::HalfOpen => {}
        }

        (from != to).then_some(StateChange { from, to })
    }
}

#[derive(Debug, Clone, Copy)]
struct StateChange {
    from: CircuitState,
    to: CircuitState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Admission {
    /// Admitted while closed
    Normal,
    /// Admitted as the single half-open probe
    Probe,
}

/// Circuit breaker protecting a single dependency.
///
/// Construct one per dependency and share it (usually behind an [`Arc`])
/// between every call path that reaches that dependency.
pub struct CircuitBreaker {
    /// Dependency identifier
    name: String,
    config: CircuitBreakerConfig,
    core: Mutex<BreakerCore>,
    observer: Option<Arc<dyn ResilienceObserver>>,
}

impl fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl CircuitBreaker {
    /// Create a new circuit breaker. A threshold of 0 is treated as 1.
    #[must_use]
    pub fn new(name: impl Into<String>, mut config: CircuitBreakerConfig) -> Self {
        config.threshold = config.threshold.max(1);
        Self {
            name: name.into(),
            config,
            core: Mutex::new(BreakerCore::new()),
            observer: None,
        }
    }

    /// Create with default configuration
    #[must_use]
    pub fn with_defaults(name: impl Into<String>) -> Self {
        Self::new(name, CircuitBreakerConfig::default())
    }

    /// Report transitions and rejections to `observer`
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn ResilienceObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Get the dependency name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the configuration
    #[must_use]
    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Get the current state
    #[must_use]
    pub fn state(&self) -> CircuitState {
        self.core.lock().state
    }

    /// Whether calls are currently being rejected
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state() == CircuitState::Open
    }

    /// Whether the breaker is waiting on (or about to admit) a probe
    #[must_use]
    pub fn is_half_open(&self) -> bool {
        self.state() == CircuitState::HalfOpen
    }

    /// Whether calls flow normally
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state() == CircuitState::Closed
    }

    /// Execute an operation through the breaker.
    ///
    /// When open, the operation is not invoked and a [`CircuitOpenError`]
    /// is returned (converted into the caller's error type).
    ///
    /// # Errors
    /// Returns the rejection, or the operation's own error unchanged
    pub async fn execute<F, Fut, T, E>(&self, operation: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<CircuitOpenError> + fmt::Display,
    {
        let permit = self.acquire()?;

        match operation().await {
            Ok(result) => {
                permit.succeed();
                Ok(result)
            }
            Err(error) => {
                debug!(breaker = %self.name, error = %error, "Call through breaker failed");
                permit.fail();
                Err(error)
            }
        }
    }

    /// Admit a call or reject it
    fn acquire(&self) -> Result<CallPermit<'_>, CircuitOpenError> {
        let mut change = None;

        let admission = {
            let mut core = self.core.lock();
            core.total_calls += 1;

            let admission = match core.state {
                CircuitState::Closed => Some(Admission::Normal),
                CircuitState::Open => {
                    if core.reset_timeout_elapsed(self.config.reset_timeout) {
                        change = core.transition(CircuitState::HalfOpen);
                        core.probe_in_flight = true;
                        Some(Admission::Probe)
                    } else {
                        None
                    }
                }
                CircuitState::HalfOpen => {
                    if core.probe_in_flight {
                        None
                    } else {
                        core.probe_in_flight = true;
                        Some(Admission::Probe)
                    }
                }
            };

            if admission.is_none() {
                core.rejected_calls += 1;
            }
            admission
        };

        self.notify(change);

        match admission {
            Some(admission) => {
                if admission == Admission::Probe {
                    debug!(breaker = %self.name, "Admitting half-open probe");
                }
                Ok(CallPermit {
                    breaker: self,
                    admission,
                    settled: false,
                })
            }
            None => {
                debug!(breaker = %self.name, "Circuit breaker rejected call");
                if let Some(observer) = &self.observer {
                    observer.on_rejected(&self.name);
                }
                Err(CircuitOpenError::new(&self.name))
            }
        }
    }

    fn record_success(&self, admission: Admission) {
        let change = {
            let mut core = self.core.lock();
            core.successes += 1;

            match (admission, core.state) {
                (Admission::Normal, CircuitState::Closed) => {
                    core.failure_count = 0;
                    None
                }
                (Admission::Probe, CircuitState::HalfOpen) => core.transition(CircuitState::Closed),
                // Outcome of a call admitted before a forced or concurrent transition
                _ => None,
            }
        };

        self.notify(change);
    }

    fn record_failure(&self, admission: Admission) {
        let change = {
            let mut core = self.core.lock();
            core.failures += 1;

            match (admission, core.state) {
                (Admission::Normal, CircuitState::Closed) => {
                    core.failure_count += 1;
                    if core.failure_count >= self.config.threshold {
                        debug!(
                            breaker = %self.name,
                            failures = core.failure_count,
                            threshold = self.config.threshold,
                            "Circuit breaker failure threshold reached"
                        );
                        core.transition(CircuitState::Open)
                    } else {
                        None
                    }
                }
                (Admission::Probe, CircuitState::HalfOpen) => core.transition(CircuitState::Open),
                _ => None,
            }
        };

        self.notify(change);
    }

    /// Probe dropped before it completed
    fn release_probe(&self) {
        let mut core = self.core.lock();
        if core.state == CircuitState::HalfOpen {
            core.probe_in_flight = false;
            debug!(breaker = %self.name, "Half-open probe abandoned");
        }
    }

    fn notify(&self, change: Option<StateChange>) {
        let Some(StateChange { from, to }) = change else {
            return;
        };

        match to {
            CircuitState::Open => warn!(breaker = %self.name, from = %from, "Circuit breaker opened"),
            CircuitState::HalfOpen => {
                info!(breaker = %self.name, from = %from, "Circuit breaker half-open, testing");
            }
            CircuitState::Closed => info!(breaker = %self.name, from = %from, "Circuit breaker closed"),
        }

        if let Some(observer) = &self.observer {
            observer.on_state_change(&self.name, from, to);
        }
    }

    fn force(&self, to: CircuitState) {
        let change = self.core.lock().transition(to);
        self.notify(change);
    }

    /// Reset the circuit breaker to closed state
    pub fn reset(&self) {
        self.force(CircuitState::Closed);
    }

    /// Force the circuit open (for testing or manual intervention)
    pub fn force_open(&self) {
        self.force(CircuitState::Open);
    }

    /// Force the circuit half-open so the next call becomes a probe
    pub fn force_half_open(&self) {
        self.force(CircuitState::HalfOpen);
    }

    /// Get current statistics
    #[must_use]
    pub fn stats(&self) -> CircuitBreakerStats {
        let core = self.core.lock();
        CircuitBreakerStats {
            state: core.state,
            failure_count: core.failure_count,
            total_calls: core.total_calls,
            rejected_calls: core.rejected_calls,
            successes: core.successes,
            failures: core.failures,
        }
    }
}

/// Outcome slot for an admitted call.
///
/// Dropping an unsettled probe (the caller's future was cancelled) frees the
/// probe slot so a later call can test the dependency.
struct CallPermit<'a> {
    breaker: &'a CircuitBreaker,
    admission: Admission,
    settled: bool,
}

impl CallPermit<'_> {
    fn succeed(mut self) {
        self.settled = true;
        self.breaker.record_success(self.admission);
    }

    fn fail(mut self) {
        self.settled = true;
        self.breaker.record_failure(self.admission);
    }
}

impl Drop for CallPermit<'_> {
    fn drop(&mut self) {
        if !self.settled && self.admission == Admission::Probe {
            self.breaker.release_probe();
        }
    }
}

/// Circuit breaker statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircuitBreakerStats {
    /// Current state
    pub state: CircuitState,
    /// Consecutive failures while closed
    pub failure_count: u32,
    /// Calls submitted, including rejected ones
    pub total_calls: u64,
    /// Calls rejected without reaching the dependency
    pub rejected_calls: u64,
    /// Calls that reached the dependency and succeeded
    pub successes: u64,
    /// Calls that reached the dependency and failed
    pub failures: u64,
}

impl CircuitBreakerStats {
    /// Failure rate among calls that reached the dependency
    #[must_use]
    pub fn failure_rate(&self) -> f64 {
        let executed = self.successes + self.failures;
        if executed == 0 {
            0.0
        } else {
            self.failures as f64 / executed as f64
        }
    }
}
