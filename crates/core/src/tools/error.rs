//! Error types for external tool collaborators.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while launching an external program.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Program binary not found.
    #[error("Program not found: {program}")]
    NotFound { program: PathBuf },

    /// Spawning failed for another reason.
    #[error("Failed to launch {program}: {reason}")]
    LaunchFailed { program: PathBuf, reason: String },

    /// I/O error while talking to the process.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ToolError {
    pub fn launch_failed(program: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::LaunchFailed {
            program: program.into(),
            reason: reason.into(),
        }
    }
}

/// Errors raised by a network transfer.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request could not be sent or the body could not be read.
    #[error("HTTP request failed: {0}")]
    Request(String),

    /// The server answered with a non-success status.
    #[error("HTTP {status} for {url}")]
    Status { status: u16, url: String },

    /// Writing the destination file failed.
    #[error("Failed to write {path}: {reason}")]
    Write { path: PathBuf, reason: String },
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        Self::Request(err.to_string())
    }
}
