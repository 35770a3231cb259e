//! Harness metrics emitted through the `metrics` facade.
//!
//! Nothing is exported unless the embedding process installs a recorder; the
//! macros are no-ops otherwise. Labels are limited to the index strategy and
//! the decision so that cardinality stays fixed.

use std::time::Duration;

use metrics::{counter, histogram};

use crate::engine::{Decision, IndexStrategy};

pub const ENGINE_CONSTRUCTION_MS: &str = "pdp_bench_engine_construction_ms";
pub const DECISION_MS: &str = "pdp_bench_decision_ms";
pub const DECISIONS_TOTAL: &str = "pdp_bench_decisions_total";
pub const CONFIGURATIONS_TOTAL: &str = "pdp_bench_configurations_total";

/// Convert a measured duration to fractional milliseconds.
pub fn as_millis_f64(duration: Duration) -> f64 {
    duration.as_nanos() as f64 / 1_000_000.0
}

pub fn record_engine_construction(index: IndexStrategy, duration: Duration) {
    histogram!(ENGINE_CONSTRUCTION_MS, "index" => index.as_str()).record(as_millis_f64(duration));
}

pub fn record_decision(index: IndexStrategy, decision: Decision, duration: Duration) {
    counter!(
        DECISIONS_TOTAL,
        "index" => index.as_str(),
        "decision" => decision.to_string()
    )
    .increment(1);
    histogram!(DECISION_MS, "index" => index.as_str()).record(as_millis_f64(duration));
}

pub fn record_configuration_completed(index: IndexStrategy) {
    counter!(CONFIGURATIONS_TOTAL, "index" => index.as_str()).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_millisecond_conversion() {
        assert_eq!(as_millis_f64(Duration::from_millis(5)), 5.0);
        assert_eq!(as_millis_f64(Duration::from_micros(1500)), 1.5);
        assert_eq!(as_millis_f64(Duration::from_nanos(1)), 0.000001);
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        // No recorder installed; these must not panic.
        record_engine_construction(IndexStrategy::Fast, Duration::from_millis(2));
        record_decision(IndexStrategy::Simple, Decision::Permit, Duration::from_millis(1));
        record_configuration_completed(IndexStrategy::Improved);
    }
}
