//! Collaborators for external programs and network transfers.
//!
//! Workers never spawn processes or open connections directly; they go through
//! [`ProcessLauncher`] and [`Fetcher`] so tests can script both.

mod config;
mod error;
mod fetcher;
mod launcher;
mod toolbox;

pub use config::ToolsConfig;
pub use error::{FetchError, ToolError};
pub use fetcher::{FetchEvent, Fetcher, HttpFetcher};
pub use launcher::{CommandSpec, OutputSource, ProcessEvent, ProcessLauncher, TokioLauncher};
pub use toolbox::Toolbox;
