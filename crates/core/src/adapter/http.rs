//! Thumbnail fetched directly over HTTP.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::warn;

use crate::progress::ProgressReport;
use crate::tools::{FetchEvent, Fetcher};
use crate::worker::{ComponentKind, Subscription, Worker, WorkerCore, WorkerId, WorkerStatus};

/// Downloads a thumbnail URL to a file, reporting byte progress.
pub struct HttpThumbnail {
    core: Arc<WorkerCore>,
    fetcher: Arc<dyn Fetcher>,
    url: String,
    destination: PathBuf,
}

impl HttpThumbnail {
    pub fn new(fetcher: Arc<dyn Fetcher>, url: &str, destination: &Path) -> Self {
        Self {
            core: Arc::new(WorkerCore::new(ComponentKind::HttpThumbnail)),
            fetcher,
            url: url.to_string(),
            destination: destination.to_path_buf(),
        }
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }
}

impl Worker for HttpThumbnail {
    fn id(&self) -> WorkerId {
        self.core.id()
    }

    fn kind(&self) -> ComponentKind {
        self.core.kind()
    }

    fn status(&self) -> WorkerStatus {
        self.core.status()
    }

    fn ready(&self) -> bool {
        self.core.ready()
    }

    fn start(&self) -> bool {
        if !self.core.try_start() {
            return false;
        }
        let core = Arc::clone(&self.core);
        let fetcher = Arc::clone(&self.fetcher);
        let url = self.url.clone();
        let destination = self.destination.clone();
        tokio::spawn(async move {
            let mut events = fetcher.fetch(&url, &destination).await;
            let mut outcome = None;
            while let Some(event) = events.recv().await {
                match event {
                    FetchEvent::Progress { received, total } => {
                        report_progress(&core, received, total)
                    }
                    FetchEvent::Completed(result) => {
                        outcome = Some(result);
                        break;
                    }
                }
            }

            match outcome {
                Some(Ok(_)) => {
                    core.output("Finished!");
                    core.finish(WorkerStatus::Successful);
                }
                Some(Err(e)) => {
                    warn!(worker = %core.provenance(), "Thumbnail fetch failed: {}", e);
                    core.error_line(e.to_string());
                    core.finish(WorkerStatus::Error);
                }
                None => {
                    core.error_line("Transfer ended without completing");
                    core.finish(WorkerStatus::Error);
                }
            }
        });
        true
    }

    fn subscribe(&self) -> Subscription {
        self.core.subscribe()
    }
}

fn report_progress(core: &WorkerCore, received: u64, total: Option<u64>) {
    match total.filter(|t| *t > 0) {
        Some(total) => {
            let percent = received as f64 / total as f64 * 100.0;
            core.output(format!(
                "Downloaded {} bytes out of {} bytes, finished {:.0}%",
                received, total, percent
            ));
            core.progress(ProgressReport::from_percent(percent));
        }
        None => core.output(format!("Downloaded {} bytes out of unknown bytes", received)),
    }
}
