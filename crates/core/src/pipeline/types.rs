//! Types for download-and-convert jobs.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::adapter::TagMetadata;

/// File names that ask for the output name to be derived from the download.
const PLACEHOLDER_NAMES: [&str; 2] = ["default", "default.mp3"];

/// Progress through a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStage {
    Init,
    ProbeMeta,
    Downloading,
    FetchingThumbnail,
    Converting,
    Done,
    Failed,
}

impl JobStage {
    /// 1-based position among the four working stages.
    pub fn ordinal(&self) -> Option<u8> {
        match self {
            Self::ProbeMeta => Some(1),
            Self::Downloading => Some(2),
            Self::FetchingThumbnail => Some(3),
            Self::Converting => Some(4),
            Self::Init | Self::Done | Self::Failed => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::ProbeMeta => "probe_meta",
            Self::Downloading => "downloading",
            Self::FetchingThumbnail => "fetching_thumbnail",
            Self::Converting => "converting",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for JobStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a job ended in `Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    ProbeFailed,
    /// The temp directory already existed; another job for the same item
    /// may be running.
    DuplicateJob,
    Filesystem,
    DownloadFailed,
    ThumbnailFailed,
    TranscodeFailed,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProbeFailed => "probe_failed",
            Self::DuplicateJob => "duplicate_job",
            Self::Filesystem => "filesystem",
            Self::DownloadFailed => "download_failed",
            Self::ThumbnailFailed => "thumbnail_failed",
            Self::TranscodeFailed => "transcode_failed",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output location of a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum Destination {
    /// Write exactly this file.
    File { path: PathBuf },
    /// Name the file after the downloaded media, inside `dir`.
    Placeholder { dir: PathBuf },
}

impl Destination {
    /// Interprets a user supplied path. A file named `default` or
    /// `default.mp3` is a placeholder for its directory.
    pub fn parse(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let is_placeholder = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| PLACEHOLDER_NAMES.iter().any(|p| n.eq_ignore_ascii_case(p)))
            .unwrap_or(false);

        if is_placeholder {
            let dir = match path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                _ => PathBuf::from("."),
            };
            Self::Placeholder { dir }
        } else {
            Self::File {
                path: path.to_path_buf(),
            }
        }
    }

    pub fn placeholder(dir: impl Into<PathBuf>) -> Self {
        Self::Placeholder { dir: dir.into() }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, Self::Placeholder { .. })
    }

    /// Directory the output (and the temp directory) lives in.
    pub fn dir(&self) -> PathBuf {
        match self {
            Self::File { path } => match path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                _ => PathBuf::from("."),
            },
            Self::Placeholder { dir } => dir.clone(),
        }
    }

    /// Final file path, naming placeholders after `stem`.
    pub fn resolve(&self, stem: &str, extension: &str) -> PathBuf {
        match self {
            Self::File { path } => path.clone(),
            Self::Placeholder { dir } => dir.join(format!("{}.{}", stem, extension)),
        }
    }
}

/// What to download and where to put it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRequest {
    pub url: String,
    pub destination: Destination,
    /// Tags overriding the probed ones.
    #[serde(default)]
    pub tags: TagMetadata,
}

impl JobRequest {
    pub fn new(url: impl Into<String>, destination: Destination) -> Self {
        Self {
            url: url.into(),
            destination,
            tags: TagMetadata::default(),
        }
    }

    pub fn with_tags(mut self, tags: TagMetadata) -> Self {
        self.tags = tags;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_names() {
        assert_eq!(
            Destination::parse("/music/default"),
            Destination::placeholder("/music")
        );
        assert_eq!(
            Destination::parse("/music/DEFAULT.MP3"),
            Destination::placeholder("/music")
        );
        assert_eq!(Destination::parse("default"), Destination::placeholder("."));
        assert!(!Destination::parse("/music/song.mp3").is_placeholder());
    }

    #[test]
    fn test_resolve_and_dir() {
        let file = Destination::parse("/music/song.mp3");
        assert_eq!(file.dir(), PathBuf::from("/music"));
        assert_eq!(file.resolve("ignored", "mp3"), PathBuf::from("/music/song.mp3"));

        let placeholder = Destination::placeholder("/music");
        assert_eq!(
            placeholder.resolve("Never Gonna Give You Up", "mp3"),
            PathBuf::from("/music/Never Gonna Give You Up.mp3")
        );
    }

    #[test]
    fn test_stage_ordinals() {
        assert_eq!(JobStage::ProbeMeta.ordinal(), Some(1));
        assert_eq!(JobStage::Converting.ordinal(), Some(4));
        assert_eq!(JobStage::Done.ordinal(), None);
    }

    #[test]
    fn test_request_deserializes_with_default_tags() {
        let json = r#"{"url":"https://example.com/v","destination":{"type":"placeholder","dir":"/music"}}"#;
        let request: JobRequest = serde_json::from_str(json).unwrap();
        assert!(request.destination.is_placeholder());
        assert_eq!(request.tags, TagMetadata::default());
    }
}
