//! Bundle of collaborators handed to jobs.

use std::sync::Arc;

use super::config::ToolsConfig;
use super::error::FetchError;
use super::fetcher::{Fetcher, HttpFetcher};
use super::launcher::{ProcessLauncher, TokioLauncher};

/// Process launcher, HTTP fetcher and tool paths shared by every job.
#[derive(Clone)]
pub struct Toolbox {
    pub launcher: Arc<dyn ProcessLauncher>,
    pub fetcher: Arc<dyn Fetcher>,
    pub config: ToolsConfig,
}

impl Toolbox {
    pub fn new(
        launcher: Arc<dyn ProcessLauncher>,
        fetcher: Arc<dyn Fetcher>,
        config: ToolsConfig,
    ) -> Self {
        Self {
            launcher,
            fetcher,
            config,
        }
    }

    /// Real processes and a real HTTP client.
    pub fn from_config(config: ToolsConfig) -> Result<Self, FetchError> {
        let fetcher = HttpFetcher::new(config.http_timeout())?;
        Ok(Self::new(
            Arc::new(TokioLauncher::new()),
            Arc::new(fetcher),
            config,
        ))
    }
}

impl std::fmt::Debug for Toolbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Toolbox")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
