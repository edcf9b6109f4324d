//! Configuration for external tools.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Locations of the external programs and HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Path to the media downloader (yt-dlp or youtube-dl).
    #[serde(default = "default_downloader_path")]
    pub downloader_path: PathBuf,

    /// Path to ffmpeg.
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: PathBuf,

    /// Connect timeout for thumbnail fetches, in seconds.
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,
}

fn default_downloader_path() -> PathBuf {
    PathBuf::from("yt-dlp")
}

fn default_ffmpeg_path() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_http_timeout() -> u64 {
    30
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            downloader_path: default_downloader_path(),
            ffmpeg_path: default_ffmpeg_path(),
            http_timeout_secs: default_http_timeout(),
        }
    }
}

impl ToolsConfig {
    /// Creates a config with custom downloader/ffmpeg paths.
    pub fn with_paths(downloader_path: PathBuf, ffmpeg_path: PathBuf) -> Self {
        Self {
            downloader_path,
            ffmpeg_path,
            ..Default::default()
        }
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}
