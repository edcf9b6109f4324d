//! Pipeline error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from temp directory housekeeping.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The path is not named like a job temp directory.
    #[error("Not a temp directory: {0}")]
    NotATempDir(PathBuf),

    /// The directory does not exist.
    #[error("Temp directory not found: {0}")]
    TempDirNotFound(PathBuf),

    /// The directory is not inside an output directory.
    #[error("Temp directory is outside the output directories: {0}")]
    OutsideOutputDirs(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
