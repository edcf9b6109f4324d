//! Job API handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use yayd_core::adapter::IdListing;
use yayd_core::{
    Destination, JobFacade, JobRequest, JobSnapshot, PipelineJob, TagMetadata, Worker, WorkerId,
    WorkerStatus,
};

use super::handlers::{api_error, ApiError};
use super::tools::run_to_completion;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for creating a job
#[derive(Debug, Deserialize)]
pub struct CreateJobBody {
    /// Media URL handed to the downloader
    pub url: String,
    /// Output file; a file named `default` (or none) names the output
    /// after the downloaded media
    pub dest: Option<PathBuf>,
    /// Tags overriding the probed ones
    #[serde(default)]
    pub tags: TagMetadata,
}

/// Request body for expanding a playlist into jobs
#[derive(Debug, Deserialize)]
pub struct BatchBody {
    pub url: String,
    /// Directory for the outputs; defaults to `pipeline.output_dir`
    pub dest_dir: Option<PathBuf>,
}

/// Response for listing jobs
#[derive(Debug, Serialize)]
pub struct ListJobsResponse {
    pub jobs: Vec<JobSnapshot>,
    pub total: usize,
}

/// Response for a playlist expansion
#[derive(Debug, Serialize)]
pub struct BatchResponse {
    pub ids: Vec<String>,
    pub jobs: Vec<JobSnapshot>,
}

// ============================================================================
// Handlers
// ============================================================================

/// Create a job and queue it for admission
pub async fn create_job(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateJobBody>,
) -> Result<(StatusCode, Json<JobSnapshot>), ApiError> {
    let url = body.url.trim();
    if url.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "url must not be empty"));
    }

    let destination = match &body.dest {
        Some(path) => Destination::parse(path),
        None => Destination::placeholder(&state.config().pipeline.output_dir),
    };
    let request = JobRequest::new(url, destination).with_tags(body.tags);
    let job = submit(&state, request).await?;

    Ok((StatusCode::CREATED, Json(job.snapshot(false))))
}

/// List every job submitted since startup
pub async fn list_jobs(State(state): State<Arc<AppState>>) -> Json<ListJobsResponse> {
    let jobs: Vec<JobSnapshot> = state
        .jobs()
        .await
        .iter()
        .map(|job| job.snapshot(false))
        .collect();
    let total = jobs.len();
    Json(ListJobsResponse { jobs, total })
}

/// One job with its recent log lines
pub async fn get_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<JobSnapshot>, ApiError> {
    let not_found = || api_error(StatusCode::NOT_FOUND, format!("Job not found: {}", id));
    let job_id: WorkerId = id.parse().map_err(|_| not_found())?;
    let job = state.find_job(job_id).await.ok_or_else(not_found)?;
    Ok(Json(job.snapshot(true)))
}

/// List the identifiers behind a URL and queue one job per identifier
pub async fn create_batch(
    State(state): State<Arc<AppState>>,
    Json(body): Json<BatchBody>,
) -> Result<(StatusCode, Json<BatchResponse>), ApiError> {
    let url = body.url.trim();
    if url.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "url must not be empty"));
    }

    let toolbox = state.toolbox();
    let listing = IdListing::new(
        Arc::clone(&toolbox.launcher),
        &toolbox.config.downloader_path,
        url,
    );
    let (status, logs) = run_to_completion(&listing).await;
    if status != WorkerStatus::Successful {
        warn!(url, %status, "Identifier listing failed");
        return Err(api_error(
            StatusCode::BAD_GATEWAY,
            format!("Identifier listing failed: {}", logs.join("\n")),
        ));
    }

    let mut seen = HashSet::new();
    let mut ids = listing.ids();
    ids.retain(|id| seen.insert(id.clone()));
    let dir = body
        .dest_dir
        .unwrap_or_else(|| state.config().pipeline.output_dir.clone());

    let mut jobs = Vec::with_capacity(ids.len());
    for id in &ids {
        // The downloader accepts a bare identifier wherever it accepts a URL.
        let request = JobRequest::new(id.as_str(), Destination::placeholder(&dir));
        jobs.push(submit(&state, request).await?.snapshot(false));
    }
    info!(url, count = jobs.len(), "Batch queued");

    Ok((StatusCode::CREATED, Json(BatchResponse { ids, jobs })))
}

async fn submit(state: &AppState, request: JobRequest) -> Result<Arc<JobFacade>, ApiError> {
    let job = PipelineJob::new(
        request,
        state.config().pipeline.clone(),
        state.toolbox().clone(),
    );
    let job = Arc::new(JobFacade::new(job));
    state
        .scheduler()
        .submit(job.clone())
        .map_err(|e| api_error(StatusCode::SERVICE_UNAVAILABLE, e.to_string()))?;
    state.record_job(job.clone()).await;
    info!(job = %job.provenance(), url = job.job().url(), "Job submitted");
    Ok(job)
}
