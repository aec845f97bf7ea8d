//! Metrics for pipeline throughput and result classification.
//!
//! Recording goes through the `metrics` facade; without an installed
//! recorder every call is a no-op.

use std::time::Instant;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use tracing::debug;

use crate::arbitrage::PatternStatus;

// === Metric Name Constants ===

/// Group evaluation latency metric name.
pub const METRIC_EVALUATION_LATENCY: &str = "group_evaluation_latency_ms";
/// Groups built counter metric name.
pub const METRIC_GROUPS_BUILT: &str = "groups_built_total";
/// Pattern results counter metric name.
pub const METRIC_PATTERN_RESULTS: &str = "pattern_results_total";
/// Financing fallback counter metric name.
pub const METRIC_FINANCING_FALLBACKS: &str = "financing_fallbacks_total";
/// Dropped records counter metric name.
pub const METRIC_RECORDS_DROPPED: &str = "records_dropped_total";

/// Initialize all metric descriptions.
/// Call this once at startup to register metrics with descriptions.
pub fn init_metrics() {
    describe_histogram!(
        METRIC_EVALUATION_LATENCY,
        "Time to evaluate every group of a trading day in milliseconds"
    );
    describe_counter!(METRIC_GROUPS_BUILT, "Total number of instrument/tenor groups built");
    describe_counter!(
        METRIC_PATTERN_RESULTS,
        "Total number of pattern results, labelled by status"
    );
    describe_counter!(
        METRIC_FINANCING_FALLBACKS,
        "Financing legs priced from recorded interest instead of a rate"
    );
    describe_counter!(
        METRIC_RECORDS_DROPPED,
        "Input records dropped for an unrecognized venue, side or role"
    );

    debug!("Metrics initialized");
}

/// Count groups built in one pass.
pub fn record_groups_built(count: usize) {
    counter!(METRIC_GROUPS_BUILT).increment(count as u64);
}

/// Count one pattern result.
pub fn inc_pattern_results(status: PatternStatus) {
    counter!(METRIC_PATTERN_RESULTS, "status" => status.to_string()).increment(1);
}

/// Count one financing fallback.
pub fn inc_financing_fallbacks() {
    counter!(METRIC_FINANCING_FALLBACKS).increment(1);
}

/// Count one dropped record.
pub fn inc_records_dropped(kind: &'static str) {
    counter!(METRIC_RECORDS_DROPPED, "kind" => kind).increment(1);
}

/// RAII guard for timing operations.
/// Automatically records latency when dropped.
pub struct LatencyTimer {
    start: Instant,
    metric_name: &'static str,
}

impl LatencyTimer {
    /// Create a new latency timer for the given metric.
    pub fn new(metric_name: &'static str) -> Self {
        Self {
            start: Instant::now(),
            metric_name,
        }
    }

    /// Get elapsed time in milliseconds (without recording).
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

impl Drop for LatencyTimer {
    fn drop(&mut self) {
        histogram!(self.metric_name).record(self.elapsed_ms());
    }
}

/// Create a latency timer for group evaluation.
pub fn timer_evaluation() -> LatencyTimer {
    LatencyTimer::new(METRIC_EVALUATION_LATENCY)
}
