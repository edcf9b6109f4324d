//! Admission scheduler.
//!
//! Keeps submitted workers in order and starts them under a concurrency
//! ceiling:
//! - **Tick**: at most one admission per poll interval
//! - **Ceiling**: nothing is started while `max_concurrent_jobs` are running
//! - **Removal**: a job leaves the list on its own `Finished` event

mod config;
mod runner;
mod types;

pub use config::SchedulerConfig;
pub use runner::{Scheduler, SchedulerHandle};
pub use types::{SchedulerError, SchedulerStatus};
