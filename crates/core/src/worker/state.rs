//! Shared state machine and event fan-out used by every worker implementation.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Mutex, PoisonError};

use tokio::sync::mpsc;
use tracing::debug;

use crate::progress::ProgressReport;

use super::status::WorkerStatus;
use super::traits::Subscription;
use super::types::{ComponentKind, LogEvent, Provenance, WorkerEvent, WorkerId};

/// Status cell plus subscriber list.
///
/// Transitions use compare-and-swap so that `ready`/`start` are race-free and
/// `start` can succeed only once. `finish` publishes the terminal status and
/// raises `Finished` at most once.
#[derive(Debug)]
pub struct WorkerCore {
    id: WorkerId,
    kind: ComponentKind,
    status: AtomicU8,
    finished: AtomicBool,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<WorkerEvent>>>,
}

impl WorkerCore {
    pub fn new(kind: ComponentKind) -> Self {
        Self {
            id: WorkerId::new(),
            kind,
            status: AtomicU8::new(WorkerStatus::Pending.to_u8()),
            finished: AtomicBool::new(false),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    pub fn id(&self) -> WorkerId {
        self.id
    }

    pub fn kind(&self) -> ComponentKind {
        self.kind
    }

    pub fn provenance(&self) -> Provenance {
        Provenance {
            kind: self.kind,
            id: self.id,
        }
    }

    pub fn status(&self) -> WorkerStatus {
        WorkerStatus::from_u8(self.status.load(Ordering::SeqCst))
    }

    /// `Pending -> Ready`. Returns whether the worker is `Ready` afterwards.
    pub fn ready(&self) -> bool {
        if self.transition(WorkerStatus::Pending, WorkerStatus::Ready) {
            self.emit(WorkerEvent::StatusChanged(WorkerStatus::Ready));
            return true;
        }
        self.status() == WorkerStatus::Ready
    }

    /// `Ready -> Running`. Returns `false` without side effects otherwise.
    pub fn try_start(&self) -> bool {
        if self.transition(WorkerStatus::Ready, WorkerStatus::Running) {
            debug!(worker = %self.provenance(), "Worker started");
            self.emit(WorkerEvent::StatusChanged(WorkerStatus::Running));
            true
        } else {
            false
        }
    }

    /// Publishes the terminal status, then `Finished`. No-op after the first call.
    pub fn finish(&self, status: WorkerStatus) -> bool {
        debug_assert!(status.is_terminal());
        let mut subscribers = self.lock_subscribers();
        if self.finished.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.status.store(status.to_u8(), Ordering::SeqCst);
        debug!(worker = %self.provenance(), %status, "Worker finished");
        for event in [WorkerEvent::StatusChanged(status), WorkerEvent::Finished(status)] {
            subscribers.retain(|tx| tx.send(event.clone()).is_ok());
        }
        // Nothing follows Finished; release the listeners.
        subscribers.clear();
        true
    }

    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }

    /// New event stream. A stream opened after `Finished` receives it immediately.
    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut subscribers = self.lock_subscribers();
        // Checked under the lock so a concurrent `finish` cannot slip between.
        if self.is_finished() {
            let _ = tx.send(WorkerEvent::Finished(self.status()));
        } else {
            subscribers.push(tx);
        }
        Subscription::new(self.id, rx)
    }

    /// Sends an event to every live subscriber, pruning dropped ones.
    pub fn emit(&self, event: WorkerEvent) {
        self.lock_subscribers()
            .retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Raises an output line from this worker.
    pub fn output(&self, line: impl Into<String>) {
        self.emit(WorkerEvent::Output(LogEvent::new(line, self.provenance())));
    }

    /// Raises an error line from this worker.
    pub fn error_line(&self, line: impl Into<String>) {
        self.emit(WorkerEvent::Error(LogEvent::new(line, self.provenance())));
    }

    pub fn progress(&self, report: ProgressReport) {
        self.emit(WorkerEvent::Progress(report));
    }

    /// Re-raises a child's line with this worker appended to its provenance.
    pub fn forward(&self, event: LogEvent, is_error: bool) {
        let event = event.forwarded(self.provenance());
        if is_error {
            self.emit(WorkerEvent::Error(event));
        } else {
            self.emit(WorkerEvent::Output(event));
        }
    }

    fn transition(&self, from: WorkerStatus, to: WorkerStatus) -> bool {
        self.status
            .compare_exchange(from.to_u8(), to.to_u8(), Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    fn lock_subscribers(&self) -> std::sync::MutexGuard<'_, Vec<mpsc::UnboundedSender<WorkerEvent>>> {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
