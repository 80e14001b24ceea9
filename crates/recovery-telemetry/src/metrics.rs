//! Prometheus metrics for resilience events.
//!
//! [`ResilienceMetrics`] implements [`ResilienceObserver`], so it can be
//! handed to breakers, retry executors and fallback accessors directly.

use prometheus::{
    Histogram, HistogramOpts, HistogramVec, IntCounterVec, IntGaugeVec, Opts, Registry,
    TextEncoder,
};
use recovery_core::{CircuitState, DataOrigin, ResilienceObserver};
use std::fmt;
use std::time::Duration;

/// Metrics error
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// Registration or encoding failed
    #[error("Prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
}

/// Counters and gauges for retries, breakers and fallbacks
#[derive(Clone)]
pub struct ResilienceMetrics {
    registry: Registry,
    retries: IntCounterVec,
    retry_delay: HistogramVec,
    retries_exhausted: IntCounterVec,
    state_transitions: IntCounterVec,
    circuit_state: IntGaugeVec,
    rejections: IntCounterVec,
    fallbacks: IntCounterVec,
}

impl fmt::Debug for ResilienceMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResilienceMetrics").finish_non_exhaustive()
    }
}

impl ResilienceMetrics {
    /// Create metrics on a fresh registry
    ///
    /// # Errors
    /// Returns error if a metric cannot be registered
    pub fn new() -> Result<Self, MetricsError> {
        Self::with_registry(Registry::new())
    }

    /// Create metrics on `registry`
    ///
    /// # Errors
    /// Returns error if a metric cannot be registered
    pub fn with_registry(registry: Registry) -> Result<Self, MetricsError> {
        let retries = IntCounterVec::new(
            Opts::new("recovery_retries_total", "Retries scheduled after a failed attempt"),
            &["operation"],
        )?;
        registry.register(Box::new(retries.clone()))?;

        let retry_delay = HistogramVec::new(
            HistogramOpts::new(
                "recovery_retry_delay_seconds",
                "Backoff wait before each retry",
            )
            .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
            &["operation"],
        )?;
        registry.register(Box::new(retry_delay.clone()))?;

        let retries_exhausted = IntCounterVec::new(
            Opts::new(
                "recovery_retries_exhausted_total",
                "Operations that failed on every attempt",
            ),
            &["operation"],
        )?;
        registry.register(Box::new(retries_exhausted.clone()))?;

        let state_transitions = IntCounterVec::new(
            Opts::new(
                "recovery_circuit_transitions_total",
                "Circuit breaker state transitions",
            ),
            &["breaker", "from", "to"],
        )?;
        registry.register(Box::new(state_transitions.clone()))?;

        let circuit_state = IntGaugeVec::new(
            Opts::new(
                "recovery_circuit_state",
                "Current breaker state (0 = closed, 1 = open, 2 = half-open)",
            ),
            &["breaker"],
        )?;
        registry.register(Box::new(circuit_state.clone()))?;

        let rejections = IntCounterVec::new(
            Opts::new(
                "recovery_circuit_rejections_total",
                "Calls rejected by an open circuit",
            ),
            &["breaker"],
        )?;
        registry.register(Box::new(rejections.clone()))?;

        let fallbacks = IntCounterVec::new(
            Opts::new("recovery_fallback_total", "Fallback reads by answering tier"),
            &["source"],
        )?;
        registry.register(Box::new(fallbacks.clone()))?;

        Ok(Self {
            registry,
            retries,
            retry_delay,
            retries_exhausted,
            state_transitions,
            circuit_state,
            rejections,
            fallbacks,
        })
    }

    /// The registry the metrics live on
    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Render every metric in the Prometheus text format
    ///
    /// # Errors
    /// Returns error if encoding fails
    pub fn render(&self) -> Result<String, MetricsError> {
        let families = self.registry.gather();
        Ok(TextEncoder::new().encode_to_string(&families)?)
    }

    /// Retries recorded for `operation`
    #[must_use]
    pub fn retry_count(&self, operation: &str) -> u64 {
        self.retries.with_label_values(&[operation]).get()
    }

    /// Rejections recorded for `breaker`
    #[must_use]
    pub fn rejection_count(&self, breaker: &str) -> u64 {
        self.rejections.with_label_values(&[breaker]).get()
    }

    /// Fallback reads answered from `source`
    #[must_use]
    pub fn fallback_count(&self, source: DataOrigin) -> u64 {
        self.fallbacks.with_label_values(&[source.as_str()]).get()
    }

    fn delay_histogram(&self, operation: &str) -> Histogram {
        self.retry_delay.with_label_values(&[operation])
    }
}

fn state_value(state: CircuitState) -> i64 {
    match state {
        CircuitState::Closed => 0,
        CircuitState::Open => 1,
        CircuitState::HalfOpen => 2,
    }
}

impl ResilienceObserver for ResilienceMetrics {
    fn on_retry(&self, operation: &str, _attempt: u32, delay: Duration) {
        self.retries.with_label_values(&[operation]).inc();
        self.delay_histogram(operation).observe(delay.as_secs_f64());
    }

    fn on_retries_exhausted(&self, operation: &str, _attempts: u32) {
        self.retries_exhausted.with_label_values(&[operation]).inc();
    }

    fn on_state_change(&self, breaker: &str, from: CircuitState, to: CircuitState) {
        self.state_transitions
            .with_label_values(&[breaker, from.as_str(), to.as_str()])
            .inc();
        self.circuit_state
            .with_label_values(&[breaker])
            .set(state_value(to));
    }

    fn on_rejected(&self, breaker: &str) {
        self.rejections.with_label_values(&[breaker]).inc();
    }

    fn on_fallback(&self, _key: &str, origin: DataOrigin) {
        self.fallbacks.with_label_values(&[origin.as_str()]).inc();
    }
}
