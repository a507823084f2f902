//! Prometheus metrics for conversions and external processes.
//!
//! This module provides metrics for:
//! - Conversions (by format pair and result)
//! - Fallback attempts through the alternate tool chain
//! - External process durations and timeouts

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry};

// =============================================================================
// Conversion Metrics
// =============================================================================

/// Conversions total by format pair and result.
pub static CONVERSIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("vecconv_conversions_total", "Total document conversions"),
        &["from", "to", "result"], // result: "success", "failed"
    )
    .unwrap()
});

/// Fallback attempts by result.
pub static FALLBACK_ATTEMPTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "vecconv_fallback_attempts_total",
            "Conversions retried through the alternate tool chain",
        ),
        &["result"], // "success", "failed"
    )
    .unwrap()
});

// =============================================================================
// Process Metrics
// =============================================================================

/// External process wall time in seconds, by tool.
pub static PROCESS_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "vecconv_process_duration_seconds",
            "Duration of external tool invocations",
        )
        .buckets(vec![0.05, 0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0]),
        &["tool"],
    )
    .unwrap()
});

/// Processes terminated by the timeout watchdog.
pub static PROCESS_TIMEOUTS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "vecconv_process_timeouts_total",
        "External processes terminated after exceeding their timeout",
    )
    .unwrap()
});

// =============================================================================
// Registration
// =============================================================================

/// Registers every metric above with `registry`.
pub fn register_metrics(registry: &Registry) -> prometheus::Result<()> {
    registry.register(Box::new(CONVERSIONS_TOTAL.clone()))?;
    registry.register(Box::new(FALLBACK_ATTEMPTS.clone()))?;
    registry.register(Box::new(PROCESS_DURATION.clone()))?;
    registry.register(Box::new(PROCESS_TIMEOUTS.clone()))?;
    Ok(())
}
