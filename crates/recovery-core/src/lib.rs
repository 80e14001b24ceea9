//! # Recovery Core
//!
//! Core types, traits, and error handling for the recovery toolkit.
//!
//! This crate provides the foundational types shared by the other crates:
//! - Error types and the rate-limit classification trait
//! - Circuit state and data provenance types
//! - Collaborator traits (data sources, cache stores, observers)

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod observer;
pub mod source;
pub mod types;

// Re-export commonly used types
pub use error::{CircuitOpenError, RateLimitSignal, RecoveryError, RecoveryResult};
pub use observer::{NoopObserver, ResilienceObserver};
pub use source::{CacheStore, DataSource};
pub use types::{CircuitState, DataOrigin};
