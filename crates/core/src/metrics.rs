//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Scheduler (submissions, admissions)
//! - Jobs (outcomes, stage durations)
//! - External tools (process runs by result)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Scheduler Metrics
// =============================================================================

/// Workers submitted to the scheduler.
pub static JOBS_SUBMITTED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("yayd_jobs_submitted_total", "Total workers submitted")
        .unwrap()
});

/// Workers admitted (started) by the scheduler.
pub static JOBS_ADMITTED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "yayd_jobs_admitted_total",
        "Total workers started by the scheduler",
    )
    .unwrap()
});

// =============================================================================
// Job Metrics
// =============================================================================

/// Jobs that produced their output file.
pub static JOBS_COMPLETED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("yayd_jobs_completed_total", "Total jobs completed")
        .unwrap()
});

/// Failed jobs by failure kind.
pub static JOBS_FAILED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("yayd_jobs_failed_total", "Total jobs failed"),
        &["failure"], // "probe_failed", "duplicate_job", "download_failed", ...
    )
    .unwrap()
});

/// Time spent in each job stage.
pub static STAGE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "yayd_stage_duration_seconds",
            "Duration of job stages",
        )
        .buckets(vec![
            0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0, 600.0,
        ]),
        &["stage"],
    )
    .unwrap()
});

// =============================================================================
// External Tool Metrics
// =============================================================================

/// External process runs by component and result.
pub static TOOL_RUNS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("yayd_tool_runs_total", "Total external tool runs"),
        &["tool", "result"], // result: "successful", "error", "launch_failed"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(JOBS_SUBMITTED.clone()),
        Box::new(JOBS_ADMITTED.clone()),
        Box::new(JOBS_COMPLETED.clone()),
        Box::new(JOBS_FAILED.clone()),
        Box::new(STAGE_DURATION.clone()),
        Box::new(TOOL_RUNS.clone()),
    ]
}
