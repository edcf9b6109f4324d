//! Worker contract shared by adapters, the pipeline orchestrator and the scheduler.
//!
//! A worker is a single-use unit of asynchronous work:
//! - created `Pending`, armed with [`Worker::ready`]
//! - launched exactly once with [`Worker::start`]
//! - observed through ordered [`Subscription`] streams of [`WorkerEvent`]s
//! - finishes `Successful` or `Error`, raising `Finished` exactly once

mod state;
mod status;
mod traits;
mod types;

pub use state::WorkerCore;
pub use status::WorkerStatus;
pub use traits::{Subscription, Worker};
pub use types::{ComponentKind, LogEvent, ProbeField, Provenance, WorkerEvent, WorkerId};
