//! Downloader-backed workers: media download and thumbnail via the downloader.

use once_cell::sync::Lazy;
use regex_lite::Regex;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::progress::{parse_downloader, ProgressReport};
use crate::tools::{CommandSpec, OutputSource, ProcessLauncher};
use crate::worker::ComponentKind;

use super::process::{LineInterpreter, ProcessWorker};

/// Format selector used by the pipeline's download stage.
pub const BEST_AUDIO: &str = "bestaudio";

static THUMBNAIL_WRITTEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Writing (?:video )?thumbnail(?: [0-9]+)? to: (.+)$").unwrap());

/// `--no-playlist <url> -f <format> -o <output>`
pub fn download_command(downloader: &Path, url: &str, format: &str, output: &Path) -> CommandSpec {
    let output = output.to_string_lossy();
    CommandSpec::new(downloader).args([
        "--no-playlist",
        url,
        "-f",
        format,
        "-o",
        &*output,
    ])
}

/// `--no-playlist <url> --write-thumbnail --skip-download -o <output>`
pub fn thumbnail_command(downloader: &Path, url: &str, output: &Path) -> CommandSpec {
    let output = output.to_string_lossy();
    CommandSpec::new(downloader).args([
        "--no-playlist",
        url,
        "--write-thumbnail",
        "--skip-download",
        "-o",
        &*output,
    ])
}

/// Publishes downloader status lines with a non-zero percentage.
#[derive(Debug, Default, Clone)]
pub struct DownloadProgress;

impl LineInterpreter for DownloadProgress {
    fn interpret(&mut self, source: OutputSource, line: &str) -> Option<ProgressReport> {
        if source != OutputSource::Stdout {
            return None;
        }
        let report = parse_downloader(line);
        (report.percent > 0.0).then_some(report)
    }
}

/// Download progress plus discovery of the written thumbnail path.
#[derive(Debug, Default, Clone)]
pub struct ThumbnailLocator {
    progress: DownloadProgress,
    path: Option<PathBuf>,
}

impl ThumbnailLocator {
    /// Path announced by the downloader; the last announcement wins.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

impl LineInterpreter for ThumbnailLocator {
    fn interpret(&mut self, source: OutputSource, line: &str) -> Option<ProgressReport> {
        if let Some(caps) = THUMBNAIL_WRITTEN.captures(line.trim_end()) {
            if let Some(path) = caps.get(1) {
                self.path = Some(PathBuf::from(path.as_str().trim()));
            }
            return None;
        }
        self.progress.interpret(source, line)
    }
}

/// Downloads one media item in the requested format.
pub type MediaDownload = ProcessWorker<DownloadProgress>;

/// Fetches only the thumbnail through the downloader.
pub type ThumbnailDownload = ProcessWorker<ThumbnailLocator>;

impl MediaDownload {
    pub fn new(
        launcher: Arc<dyn ProcessLauncher>,
        downloader: &Path,
        url: &str,
        format: &str,
        output: &Path,
    ) -> Self {
        Self::from_parts(
            ComponentKind::MediaDownload,
            launcher,
            download_command(downloader, url, format, output),
            DownloadProgress,
        )
    }
}

impl ThumbnailDownload {
    pub fn new(
        launcher: Arc<dyn ProcessLauncher>,
        downloader: &Path,
        url: &str,
        output: &Path,
    ) -> Self {
        Self::from_parts(
            ComponentKind::ThumbnailDownload,
            launcher,
            thumbnail_command(downloader, url, output),
            ThumbnailLocator::default(),
        )
    }

    /// The thumbnail file, once the downloader has announced it.
    pub fn discovered_path(&self) -> Option<PathBuf> {
        self.inspect(|locator| locator.path().map(Path::to_path_buf))
    }
}
