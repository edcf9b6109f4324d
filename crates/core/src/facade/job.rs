//! Job facade implementation.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};

use crate::pipeline::PipelineJob;
use crate::progress::ProgressReport;
use crate::worker::{
    ComponentKind, LogEvent, Subscription, Worker, WorkerCore, WorkerEvent, WorkerId, WorkerStatus,
};

use super::types::JobSnapshot;

/// Default number of log lines kept per job.
pub const DEFAULT_LOG_CAPACITY: usize = 200;

#[derive(Debug)]
struct Record {
    logs: VecDeque<String>,
    capacity: usize,
    last_progress: Option<ProgressReport>,
    finished_at: Option<DateTime<Utc>>,
}

impl Record {
    fn push_line(&mut self, line: &LogEvent) {
        if self.logs.len() == self.capacity {
            self.logs.pop_front();
        }
        self.logs.push_back(line.full_line());
    }
}

/// One API job record wrapping a [`PipelineJob`].
///
/// Re-exposes the job through the worker contract under its own identity,
/// so every forwarded line gains one more provenance link, and keeps what
/// the API needs to render the job after the fact: recent log lines, the
/// last progress report and the finish time.
pub struct JobFacade {
    core: Arc<WorkerCore>,
    job: Arc<PipelineJob>,
    inner: Mutex<Option<Subscription>>,
    record: Arc<Mutex<Record>>,
    created_at: DateTime<Utc>,
}

impl JobFacade {
    pub fn new(job: PipelineJob) -> Self {
        Self::with_log_capacity(job, DEFAULT_LOG_CAPACITY)
    }

    pub fn with_log_capacity(job: PipelineJob, capacity: usize) -> Self {
        let job = Arc::new(job);
        // Subscribed up front so nothing the job raises is missed.
        let inner = job.subscribe();
        Self {
            core: Arc::new(WorkerCore::new(ComponentKind::Facade)),
            job,
            inner: Mutex::new(Some(inner)),
            record: Arc::new(Mutex::new(Record {
                logs: VecDeque::with_capacity(capacity.min(DEFAULT_LOG_CAPACITY)),
                capacity: capacity.max(1),
                last_progress: None,
                finished_at: None,
            })),
            created_at: Utc::now(),
        }
    }

    /// The wrapped job.
    pub fn job(&self) -> &PipelineJob {
        &self.job
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Current view of the job; `with_logs` includes the recent log lines.
    pub fn snapshot(&self, with_logs: bool) -> JobSnapshot {
        let record = lock(&self.record);
        JobSnapshot {
            id: self.core.id(),
            url: self.job.url().to_string(),
            status: self.core.status(),
            stage: self.job.stage(),
            percent: self.job.percent(),
            progress: record.last_progress.clone(),
            failure: self.job.failure(),
            title: self.job.metadata().and_then(|m| m.title),
            output: self.job.output_path(),
            temp_dir: self.job.temp_dir(),
            created_at: self.created_at,
            finished_at: record.finished_at,
            logs: if with_logs {
                record.logs.iter().cloned().collect()
            } else {
                Vec::new()
            },
        }
    }
}

impl Worker for JobFacade {
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
        self.job.ready() && self.core.ready()
    }

    fn start(&self) -> bool {
        let Some(inner) = self
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        else {
            return false;
        };
        if !self.core.try_start() {
            *self.inner.lock().unwrap_or_else(PoisonError::into_inner) = Some(inner);
            return false;
        }
        tokio::spawn(relay(
            inner,
            Arc::clone(&self.core),
            Arc::clone(&self.record),
        ));
        if !self.job.start() {
            self.core.error_line("Wrapped job could not be started");
            self.core.finish(WorkerStatus::Error);
        }
        true
    }

    fn subscribe(&self) -> Subscription {
        self.core.subscribe()
    }
}

async fn relay(mut inner: Subscription, core: Arc<WorkerCore>, record: Arc<Mutex<Record>>) {
    while let Some(event) = inner.recv().await {
        match event {
            WorkerEvent::Output(line) => {
                lock(&record).push_line(&line);
                core.forward(line, false);
            }
            WorkerEvent::Error(line) => {
                lock(&record).push_line(&line);
                core.forward(line, true);
            }
            WorkerEvent::Progress(report) => {
                lock(&record).last_progress = Some(report.clone());
                core.progress(report);
            }
            WorkerEvent::StatusChanged(_) => {}
            WorkerEvent::Finished(status) => {
                lock(&record).finished_at = Some(Utc::now());
                core.finish(status);
                return;
            }
        }
    }
    core.finish(WorkerStatus::Error);
}

fn lock(record: &Mutex<Record>) -> MutexGuard<'_, Record> {
    record.lock().unwrap_or_else(PoisonError::into_inner)
}
