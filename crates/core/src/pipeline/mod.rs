//! Download-and-convert jobs.
//!
//! A job runs four stages in order, each owning a quarter of the overall
//! percentage:
//! 1. probe metadata
//! 2. download the best audio into a temp directory
//! 3. fetch a cover image (skippable)
//! 4. transcode to MP3 with tags, then remove the temp directory

mod config;
mod error;
mod job;
mod progress;
mod temp;
mod types;

pub use config::{PipelineConfig, TempDirNaming, ThumbnailSource};
pub use error::PipelineError;
pub use job::PipelineJob;
pub use progress::{overall_percent, stage_end_percent, STAGE_SPAN};
pub use temp::{
    remove_stale_temp_dir, sanitize_title, temp_dir_for, IDENTIFIER_PREFIX, TITLE_PREFIX,
};
pub use types::{Destination, FailureKind, JobRequest, JobStage};
