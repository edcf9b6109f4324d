//! Snapshot types for the job facade.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;

use crate::pipeline::{FailureKind, JobStage};
use crate::progress::ProgressReport;
use crate::worker::{WorkerId, WorkerStatus};

/// Point-in-time view of one job, as served by the API.
#[derive(Debug, Clone, Serialize)]
pub struct JobSnapshot {
    pub id: WorkerId,
    pub url: String,
    pub status: WorkerStatus,
    pub stage: JobStage,
    /// Overall percentage, 0-100.
    pub percent: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<ProgressReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temp_dir: Option<PathBuf>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    /// Recent log lines in full form, oldest first. Empty in list views.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub logs: Vec<String>,
}
