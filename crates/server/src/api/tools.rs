//! Tool maintenance handlers: downloader self-update and temp dir cleanup.

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use yayd_core::adapter::ToolUpdate;
use yayd_core::pipeline::remove_stale_temp_dir;
use yayd_core::{PipelineError, Worker, WorkerEvent, WorkerStatus};

use super::handlers::{api_error, ApiError};
use crate::state::AppState;

/// Result of a one-off tool run.
#[derive(Debug, Serialize)]
pub struct ToolRunResponse {
    pub status: WorkerStatus,
    pub logs: Vec<String>,
}

/// Request body for removing a stale temp directory
#[derive(Debug, Deserialize)]
pub struct RemoveTempBody {
    pub path: PathBuf,
}

#[derive(Debug, Serialize)]
pub struct RemoveTempResponse {
    pub removed: PathBuf,
}

/// Starts `worker` and waits for it, collecting its log lines.
pub(crate) async fn run_to_completion(worker: &dyn Worker) -> (WorkerStatus, Vec<String>) {
    let mut events = worker.subscribe();
    worker.ready();
    if !worker.start() {
        return (worker.status(), Vec::new());
    }

    let mut logs = Vec::new();
    while let Some(event) = events.recv().await {
        match event {
            WorkerEvent::Output(line) | WorkerEvent::Error(line) => {
                logs.push(line.line().to_string())
            }
            WorkerEvent::Finished(status) => return (status, logs),
            _ => {}
        }
    }
    (worker.status(), logs)
}

/// Runs the downloader's self-update and returns its output.
pub async fn update_tools(State(state): State<Arc<AppState>>) -> Json<ToolRunResponse> {
    let toolbox = state.toolbox();
    let update = ToolUpdate::new(
        Arc::clone(&toolbox.launcher),
        &toolbox.config.downloader_path,
    );
    let (status, logs) = run_to_completion(&update).await;
    info!(%status, "Downloader self-update finished");
    Json(ToolRunResponse { status, logs })
}

/// Removes a temp directory left behind by a failed or refused job.
///
/// Only directories directly inside the configured output directory or a
/// known job's destination directory are eligible.
pub async fn remove_temp_dir(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RemoveTempBody>,
) -> Result<Json<RemoveTempResponse>, ApiError> {
    let roots = state.output_dirs().await;
    match remove_stale_temp_dir(&body.path, &roots).await {
        Ok(()) => Ok(Json(RemoveTempResponse { removed: body.path })),
        Err(e @ PipelineError::NotATempDir(_)) => Err(api_error(StatusCode::BAD_REQUEST, e.to_string())),
        Err(e @ PipelineError::OutsideOutputDirs(_)) => {
            warn!(path = %body.path.display(), "Refused temp dir cleanup outside output dirs");
            Err(api_error(StatusCode::FORBIDDEN, e.to_string()))
        }
        Err(e @ PipelineError::TempDirNotFound(_)) => {
            Err(api_error(StatusCode::NOT_FOUND, e.to_string()))
        }
        Err(e) => {
            warn!(path = %body.path.display(), error = %e, "Temp dir cleanup failed");
            Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}
