//! Expanding a URL (e.g. a playlist) into content identifiers.

use std::path::Path;
use std::sync::Arc;

use crate::progress::ProgressReport;
use crate::tools::{CommandSpec, OutputSource, ProcessLauncher};
use crate::worker::ComponentKind;

use super::process::{LineInterpreter, ProcessWorker};

/// `<url> -i --get-id`
pub fn id_listing_command(downloader: &Path, url: &str) -> CommandSpec {
    CommandSpec::new(downloader).args([url, "-i", "--get-id"])
}

/// Collects every non-blank stdout line as an identifier.
#[derive(Debug, Default, Clone)]
pub struct IdCollector {
    ids: Vec<String>,
}

impl IdCollector {
    pub fn ids(&self) -> &[String] {
        &self.ids
    }
}

impl LineInterpreter for IdCollector {
    fn interpret(&mut self, source: OutputSource, line: &str) -> Option<ProgressReport> {
        if source == OutputSource::Stdout {
            let id = line.trim();
            if !id.is_empty() {
                self.ids.push(id.to_string());
            }
        }
        None
    }
}

/// Lists the content identifiers behind a URL.
pub type IdListing = ProcessWorker<IdCollector>;

impl IdListing {
    pub fn new(launcher: Arc<dyn ProcessLauncher>, downloader: &Path, url: &str) -> Self {
        Self::from_parts(
            ComponentKind::IdListing,
            launcher,
            id_listing_command(downloader, url),
            IdCollector::default(),
        )
    }

    /// Identifiers printed so far.
    pub fn ids(&self) -> Vec<String> {
        self.inspect(|collector| collector.ids().to_vec())
    }
}
