//! Job facade: one API job record around a pipeline job.

mod job;
mod types;

pub use job::{JobFacade, DEFAULT_LOG_CAPACITY};
pub use types::JobSnapshot;
