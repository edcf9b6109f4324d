//! Worker driven by hand from tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

use crate::progress::ProgressReport;
use crate::worker::{ComponentKind, Subscription, Worker, WorkerCore, WorkerId, WorkerStatus};

/// A worker that does nothing once started until the test calls
/// [`complete`](Self::complete).
///
/// Useful for scheduler tests where the timing of completion matters.
#[derive(Debug)]
pub struct ManualWorker {
    core: Arc<WorkerCore>,
    start_calls: AtomicUsize,
    started: Notify,
}

impl Default for ManualWorker {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualWorker {
    pub fn new() -> Self {
        Self::with_kind(ComponentKind::Pipeline)
    }

    pub fn with_kind(kind: ComponentKind) -> Self {
        Self {
            core: Arc::new(WorkerCore::new(kind)),
            start_calls: AtomicUsize::new(0),
            started: Notify::new(),
        }
    }

    /// Number of `start` calls that actually started the worker.
    pub fn start_calls(&self) -> usize {
        self.start_calls.load(Ordering::SeqCst)
    }

    /// Raises an output line.
    pub fn emit_output(&self, line: &str) {
        self.core.output(line);
    }

    /// Raises an error line.
    pub fn emit_error(&self, line: &str) {
        self.core.error_line(line);
    }

    pub fn emit_progress(&self, percent: f64) {
        self.core.progress(ProgressReport::from_percent(percent));
    }

    /// Finishes the worker. Returns `false` if it already finished.
    pub fn complete(&self, status: WorkerStatus) -> bool {
        self.core.finish(status)
    }

    /// Resolves once the worker has left `Pending`/`Ready`.
    pub async fn wait_until_started(&self) {
        loop {
            let notified = self.started.notified();
            if !matches!(
                self.core.status(),
                WorkerStatus::Pending | WorkerStatus::Ready
            ) {
                return;
            }
            notified.await;
        }
    }
}

impl Worker for ManualWorker {
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
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        self.started.notify_waiters();
        true
    }

    fn subscribe(&self) -> Subscription {
        self.core.subscribe()
    }
}
