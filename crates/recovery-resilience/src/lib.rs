//! # Recovery Resilience
//!
//! Fault-tolerance patterns for calls to unreliable dependencies:
//! - Retry with exponential backoff
//! - Circuit breaker for failing fast on known-bad dependencies
//! - Graceful degradation from live data to cache to a default
//! - Rate-limit-aware retries for "too many requests" responses

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod circuit_breaker;
pub mod fallback;
pub mod memory_cache;
pub mod pipeline;
pub mod rate_limit;
pub mod retry;

// Re-export main types
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerStats};
pub use fallback::{FallbackAccessor, FallbackResult};
pub use memory_cache::MemoryCache;
pub use pipeline::ResiliencePipeline;
pub use rate_limit::RateLimitAwareCaller;
pub use retry::{retry_with_backoff, RetryExecutor, RetryPolicy};
