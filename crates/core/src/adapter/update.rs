//! Downloader self-update.

use std::path::Path;
use std::sync::Arc;

use crate::tools::{CommandSpec, ProcessLauncher};
use crate::worker::ComponentKind;

use super::process::{PassThrough, ProcessWorker};

/// Runs the downloader's `-U` and forwards its output.
pub type ToolUpdate = ProcessWorker<PassThrough>;

impl ToolUpdate {
    pub fn new(launcher: Arc<dyn ProcessLauncher>, downloader: &Path) -> Self {
        Self::from_parts(
            ComponentKind::ToolUpdate,
            launcher,
            CommandSpec::new(downloader).arg("-U"),
            PassThrough,
        )
    }
}
