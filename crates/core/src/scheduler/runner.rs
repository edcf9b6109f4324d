//! Admission scheduler implementation.

use std::collections::HashSet;
use std::pin::Pin;
use std::sync::Arc;

use futures::stream::{SelectAll, Stream, StreamExt};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::metrics;
use crate::worker::{Worker, WorkerEvent, WorkerId, WorkerStatus};

use super::config::SchedulerConfig;
use super::types::{SchedulerError, SchedulerStatus};

type TaggedEvents = Pin<Box<dyn Stream<Item = (WorkerId, WorkerEvent)> + Send>>;

/// Holds submitted workers and starts them under a concurrency ceiling.
///
/// Jobs are kept in submission order. Each [`tick`](Self::tick) starts at
/// most one job, and only while fewer than `max_concurrent_jobs` are
/// running. A job leaves the list when its `Finished` event is handled;
/// a job that reached a final status without being admitted here is dropped
/// on the next tick.
///
/// All state is owned by whoever drives the scheduler; [`spawn`](Self::spawn)
/// moves it into a single task.
pub struct Scheduler {
    config: SchedulerConfig,
    jobs: Vec<Arc<dyn Worker>>,
    /// Jobs started by this scheduler; their removal waits for `Finished`.
    admitted: HashSet<WorkerId>,
    events: SelectAll<TaggedEvents>,
}

impl Scheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            jobs: Vec::new(),
            admitted: HashSet::new(),
            events: SelectAll::new(),
        }
    }

    /// Appends a job. Returns `false` if a job with the same id is queued.
    pub fn enqueue(&mut self, job: Arc<dyn Worker>) -> bool {
        let id = job.id();
        if self.jobs.iter().any(|j| j.id() == id) {
            warn!(job = %job.provenance(), "Job already scheduled");
            return false;
        }
        debug!(job = %job.provenance(), "Job queued");
        metrics::JOBS_SUBMITTED.inc();
        self.jobs.push(job);
        true
    }

    pub fn running_count(&self) -> usize {
        self.jobs
            .iter()
            .filter(|j| j.status() == WorkerStatus::Running)
            .count()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn contains(&self, id: WorkerId) -> bool {
        self.jobs.iter().any(|j| j.id() == id)
    }

    pub fn status(&self) -> SchedulerStatus {
        let running = self.running_count();
        let waiting = self
            .jobs
            .iter()
            .filter(|j| !j.status().is_terminal() && j.status() != WorkerStatus::Running)
            .count();
        SchedulerStatus {
            queued: waiting,
            running,
            max_running: self.config.max_concurrent_jobs,
        }
    }

    /// One admission attempt. Returns the id of the job started, if any.
    pub fn tick(&mut self) -> Option<WorkerId> {
        self.drop_finished_elsewhere();
        if self.running_count() >= self.config.max_concurrent_jobs {
            return None;
        }

        for job in &self.jobs {
            if !job.ready() {
                continue;
            }
            let id = job.id();
            // Subscribe first so no event between start and subscribe is lost.
            let events = job.subscribe().map(move |event| (id, event));
            if !job.start() {
                continue;
            }
            self.events.push(Box::pin(events));
            self.admitted.insert(id);
            metrics::JOBS_ADMITTED.inc();
            info!(job = %job.provenance(), "Job admitted");
            return Some(id);
        }
        None
    }

    /// Removes a job. Returns `false` if it was not in the list.
    pub fn remove(&mut self, id: WorkerId) -> bool {
        let before = self.jobs.len();
        self.jobs.retain(|j| j.id() != id);
        self.admitted.remove(&id);
        let removed = self.jobs.len() < before;
        if removed {
            debug!(job = %id.short(), "Job removed");
        }
        removed
    }

    fn drop_finished_elsewhere(&mut self) {
        let admitted = &self.admitted;
        self.jobs.retain(|job| {
            let stale = job.status().is_terminal() && !admitted.contains(&job.id());
            if stale {
                warn!(
                    job = %job.provenance(),
                    status = %job.status(),
                    "Dropping job finished outside the scheduler"
                );
            }
            !stale
        });
    }

    /// Applies one event from an admitted job.
    pub fn handle_event(&mut self, id: WorkerId, event: &WorkerEvent) {
        if let WorkerEvent::Finished(status) = event {
            if self.remove(id) {
                info!(job = %id.short(), %status, "Job finished");
            }
        }
    }

    /// Next event from any admitted job; `None` when nothing is running.
    pub async fn next_event(&mut self) -> Option<(WorkerId, WorkerEvent)> {
        if self.events.is_empty() {
            return None;
        }
        self.events.next().await
    }

    /// Moves the scheduler into its own task.
    pub fn spawn(self) -> (SchedulerHandle, JoinHandle<()>) {
        let (submit_tx, submit_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(self.status());
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let task = tokio::spawn(self.run(submit_rx, status_tx, shutdown_rx));
        let handle = SchedulerHandle {
            submit_tx,
            status_rx,
            shutdown_tx,
        };
        (handle, task)
    }

    async fn run(
        mut self,
        mut submissions: mpsc::UnboundedReceiver<Arc<dyn Worker>>,
        status_tx: watch::Sender<SchedulerStatus>,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) {
        info!(
            max_concurrent_jobs = self.config.max_concurrent_jobs,
            poll_interval_ms = self.config.poll_interval_ms,
            "Scheduler loop started"
        );
        let mut ticker = tokio::time::interval(self.config.poll_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("Scheduler loop received shutdown signal");
                    break;
                }
                _ = ticker.tick() => {
                    self.tick();
                }
                submitted = submissions.recv() => match submitted {
                    Some(job) => {
                        self.enqueue(job);
                    }
                    None => break,
                },
                Some((id, event)) = self.events.next(), if !self.events.is_empty() => {
                    self.handle_event(id, &event);
                }
            }
            status_tx.send_replace(self.status());
        }
        info!(remaining = self.jobs.len(), "Scheduler loop stopped");
    }
}

/// Cloneable handle to a spawned [`Scheduler`].
#[derive(Clone)]
pub struct SchedulerHandle {
    submit_tx: mpsc::UnboundedSender<Arc<dyn Worker>>,
    status_rx: watch::Receiver<SchedulerStatus>,
    shutdown_tx: broadcast::Sender<()>,
}

impl SchedulerHandle {
    /// Queues a job; it starts on a later tick.
    pub fn submit(&self, job: Arc<dyn Worker>) -> Result<(), SchedulerError> {
        self.submit_tx
            .send(job)
            .map_err(|_| SchedulerError::Stopped)
    }

    /// Latest published snapshot.
    pub fn status(&self) -> SchedulerStatus {
        *self.status_rx.borrow()
    }

    /// Waits for the next snapshot change.
    pub async fn changed(&mut self) -> Result<SchedulerStatus, SchedulerError> {
        self.status_rx
            .changed()
            .await
            .map_err(|_| SchedulerError::Stopped)?;
        Ok(*self.status_rx.borrow_and_update())
    }

    pub fn is_running(&self) -> bool {
        !self.submit_tx.is_closed()
    }

    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }
}

impl std::fmt::Debug for SchedulerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchedulerHandle")
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}
