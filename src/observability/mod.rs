//! Metrics for the measurement loop.
//!
//! Logging is set up separately in [`crate::logging`].

pub mod metrics;

pub use self::metrics::*;
