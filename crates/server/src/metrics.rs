//! Prometheus metrics for observability.
//!
//! This module provides metrics for monitoring the yayd server:
//! - HTTP request metrics (latency, counts)
//! - Scheduler and job counts (collected dynamically)
//!
//! Core metrics (jobs, stages, tool runs) live in `yayd_core::metrics` and
//! are registered here as well.

use once_cell::sync::Lazy;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, IntGaugeVec, Opts,
    Registry, TextEncoder,
};
use yayd_core::JobStage;

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "yayd_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("yayd_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "yayd_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

// =============================================================================
// Scheduler Metrics (collected dynamically)
// =============================================================================

/// Jobs the scheduler is currently running.
pub static SCHEDULER_RUNNING: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("yayd_scheduler_running_jobs", "Jobs currently running").unwrap()
});

/// Jobs waiting for admission.
pub static SCHEDULER_QUEUED: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("yayd_scheduler_queued_jobs", "Jobs waiting for admission").unwrap()
});

/// Known jobs by current stage.
pub static JOBS_BY_STAGE: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new("yayd_jobs_by_stage", "Current job count by stage"),
        &["stage"],
    )
    .unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    // HTTP
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))
        .unwrap();

    // Scheduler
    registry
        .register(Box::new(SCHEDULER_RUNNING.clone()))
        .unwrap();
    registry
        .register(Box::new(SCHEDULER_QUEUED.clone()))
        .unwrap();
    registry.register(Box::new(JOBS_BY_STAGE.clone())).unwrap();

    // Core metrics (scheduler admissions, job outcomes, tool runs)
    for metric in yayd_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Collect dynamic metrics from current application state.
///
/// Called before encoding so the gauges reflect the scheduler snapshot and
/// the stages of the recorded jobs.
pub async fn collect_dynamic_metrics(state: &crate::state::AppState) {
    let status = state.scheduler().status();
    SCHEDULER_RUNNING.set(status.running as i64);
    SCHEDULER_QUEUED.set(status.queued as i64);

    let jobs = state.jobs().await;
    for stage in [
        JobStage::Init,
        JobStage::ProbeMeta,
        JobStage::Downloading,
        JobStage::FetchingThumbnail,
        JobStage::Converting,
        JobStage::Done,
        JobStage::Failed,
    ] {
        let count = jobs
            .iter()
            .filter(|job| job.job().stage() == stage)
            .count();
        JOBS_BY_STAGE
            .with_label_values(&[stage.as_str()])
            .set(count as i64);
    }
}

/// Normalize a path for metric labels (replace IDs with placeholders).
pub fn normalize_path(path: &str) -> String {
    static UUID: Lazy<regex_lite::Regex> = Lazy::new(|| {
        regex_lite::Regex::new(
            r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}",
        )
        .unwrap()
    });
    UUID.replace_all(path, "{id}").into_owned()
}
