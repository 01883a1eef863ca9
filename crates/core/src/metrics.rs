//! Prometheus metrics for the conversion queue.
//!
//! This module provides metrics for:
//! - Submissions (accepted and rejected files)
//! - Conversions (outcome counts and durations)
//! - Queue depth

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts};

// =============================================================================
// Submission Metrics
// =============================================================================

/// Files accepted into the queue.
pub static JOBS_SUBMITTED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("remuxq_jobs_submitted_total", "Total files accepted into the queue").unwrap()
});

/// Files rejected at submission.
pub static JOBS_REJECTED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("remuxq_jobs_rejected_total", "Total files rejected at submission"),
        &["reason"], // "file_too_large"
    )
    .unwrap()
});

// =============================================================================
// Conversion Metrics
// =============================================================================

/// Conversions by outcome.
pub static CONVERSIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("remuxq_conversions_total", "Total conversions by outcome"),
        &["result"], // "completed", "failed"
    )
    .unwrap()
});

/// Conversion wall time in seconds.
pub static CONVERSION_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "remuxq_conversion_duration_seconds",
            "Duration of a single conversion",
        )
        .buckets(vec![0.5, 1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 600.0, 1800.0, 3600.0]),
        &["result"],
    )
    .unwrap()
});

// =============================================================================
// Queue Metrics
// =============================================================================

/// Jobs in the active queue, including the converting one.
pub static QUEUE_DEPTH: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("remuxq_queue_depth", "Jobs waiting or converting").unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(JOBS_SUBMITTED.clone()),
        Box::new(JOBS_REJECTED.clone()),
        Box::new(CONVERSIONS_TOTAL.clone()),
        Box::new(CONVERSION_DURATION.clone()),
        Box::new(QUEUE_DEPTH.clone()),
    ]
}
