use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;
use yayd_core::{Config, JobFacade, SchedulerHandle, Toolbox, Worker, WorkerId};

/// Shared application state
pub struct AppState {
    config: Config,
    toolbox: Toolbox,
    scheduler: SchedulerHandle,
    /// Submitted jobs, oldest first. Finished jobs beyond
    /// `server.job_history` are dropped oldest first.
    jobs: RwLock<Vec<Arc<JobFacade>>>,
}

impl AppState {
    pub fn new(config: Config, toolbox: Toolbox, scheduler: SchedulerHandle) -> Self {
        Self {
            config,
            toolbox,
            scheduler,
            jobs: RwLock::new(Vec::new()),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn toolbox(&self) -> &Toolbox {
        &self.toolbox
    }

    pub fn scheduler(&self) -> &SchedulerHandle {
        &self.scheduler
    }

    pub async fn record_job(&self, job: Arc<JobFacade>) {
        let mut jobs = self.jobs.write().await;
        jobs.push(job);

        let finished = jobs.iter().filter(|j| j.status().is_terminal()).count();
        let mut excess = finished.saturating_sub(self.config.server.job_history);
        if excess > 0 {
            let evicted = excess;
            jobs.retain(|j| {
                if excess > 0 && j.status().is_terminal() {
                    excess -= 1;
                    false
                } else {
                    true
                }
            });
            debug!(evicted, kept = jobs.len(), "Dropped finished jobs from history");
        }
    }

    pub async fn jobs(&self) -> Vec<Arc<JobFacade>> {
        self.jobs.read().await.clone()
    }

    pub async fn find_job(&self, id: WorkerId) -> Option<Arc<JobFacade>> {
        self.jobs
            .read()
            .await
            .iter()
            .find(|job| job.id() == id)
            .cloned()
    }

    /// Directories job temp folders may live in: the configured output
    /// directory plus every known job's destination directory.
    pub async fn output_dirs(&self) -> Vec<PathBuf> {
        let mut dirs = vec![self.config.pipeline.output_dir.clone()];
        for job in self.jobs.read().await.iter() {
            let dir = job.job().request().destination.dir();
            if !dirs.contains(&dir) {
                dirs.push(dir);
            }
        }
        dirs
    }
}
