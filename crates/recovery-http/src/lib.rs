//! # Recovery HTTP
//!
//! JSON-over-HTTP access for the recovery toolkit:
//! - [`JsonClient`] maps one request onto `RecoveryError`
//! - [`HttpSource`] runs it through breaker, retry and rate-limit handling

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod client;
pub mod source;

pub use client::JsonClient;
pub use source::HttpSource;
