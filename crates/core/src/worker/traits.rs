//! The worker contract.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;

use super::status::WorkerStatus;
use super::types::{ComponentKind, Provenance, WorkerEvent, WorkerId};

/// A single-use asynchronous unit of work with an observable state machine.
///
/// Implemented by every process adapter, by the pipeline orchestrator and by
/// the job facade, so that all of them can be scheduled and observed the same
/// way.
pub trait Worker: Send + Sync {
    fn id(&self) -> WorkerId;

    fn kind(&self) -> ComponentKind;

    fn status(&self) -> WorkerStatus;

    /// Arms the worker. `Pending -> Ready` on the first call.
    ///
    /// Returns whether the worker is now `Ready`; `false` once it is running
    /// or finished.
    fn ready(&self) -> bool;

    /// Starts the work. Only succeeds from `Ready`, and only once.
    ///
    /// Must be called from within a tokio runtime.
    fn start(&self) -> bool;

    /// Opens a new ordered event stream for this worker.
    fn subscribe(&self) -> Subscription;

    fn provenance(&self) -> Provenance {
        Provenance {
            kind: self.kind(),
            id: self.id(),
        }
    }
}

/// An ordered stream of events from one worker.
///
/// Dropping it detaches the listener.
#[derive(Debug)]
pub struct Subscription {
    worker: WorkerId,
    rx: mpsc::UnboundedReceiver<WorkerEvent>,
}

impl Subscription {
    pub(crate) fn new(worker: WorkerId, rx: mpsc::UnboundedReceiver<WorkerEvent>) -> Self {
        Self { worker, rx }
    }

    /// Id of the worker this stream belongs to.
    pub fn worker_id(&self) -> WorkerId {
        self.worker
    }

    /// Receives the next event, or `None` once the worker is gone.
    pub async fn recv(&mut self) -> Option<WorkerEvent> {
        self.rx.recv().await
    }

    /// Non-blocking receive of an already delivered event.
    pub fn try_recv(&mut self) -> Option<WorkerEvent> {
        self.rx.try_recv().ok()
    }
}

impl Stream for Subscription {
    type Item = WorkerEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}
