//! Pipeline configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::adapter::Mp3Encoding;

/// Where the cover image comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThumbnailSource {
    /// Fetch the probed thumbnail URL directly.
    #[default]
    Http,
    /// Ask the downloader to write the thumbnail.
    Downloader,
}

/// How a job's temporary directory is named.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TempDirNaming {
    /// `yayd_temp_<content id>`
    #[default]
    Identifier,
    /// `temp_<sanitized title>`
    Title,
}

/// Configuration for download-and-convert jobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Fetch a thumbnail and attach it as the cover.
    #[serde(default = "default_include_thumbnail")]
    pub include_thumbnail: bool,

    #[serde(default)]
    pub thumbnail_source: ThumbnailSource,

    #[serde(default)]
    pub temp_dir_naming: TempDirNaming,

    /// Extension appended to names resolved from a placeholder destination.
    #[serde(default = "default_output_extension")]
    pub output_extension: String,

    /// Directory used when a job names no destination.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    #[serde(default)]
    pub encoding: Mp3Encoding,
}

fn default_include_thumbnail() -> bool {
    true
}

fn default_output_extension() -> String {
    "mp3".to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            include_thumbnail: default_include_thumbnail(),
            thumbnail_source: ThumbnailSource::default(),
            temp_dir_naming: TempDirNaming::default(),
            output_extension: default_output_extension(),
            output_dir: default_output_dir(),
            encoding: Mp3Encoding::default(),
        }
    }
}

impl PipelineConfig {
    pub fn with_thumbnail(mut self, include: bool) -> Self {
        self.include_thumbnail = include;
        self
    }

    pub fn with_thumbnail_source(mut self, source: ThumbnailSource) -> Self {
        self.thumbnail_source = source;
        self
    }

    pub fn with_temp_dir_naming(mut self, naming: TempDirNaming) -> Self {
        self.temp_dir_naming = naming;
        self
    }

    pub fn with_encoding(mut self, encoding: Mp3Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::BitrateMode;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert!(config.include_thumbnail);
        assert_eq!(config.thumbnail_source, ThumbnailSource::Http);
        assert_eq!(config.temp_dir_naming, TempDirNaming::Identifier);
        assert_eq!(config.output_extension, "mp3");
        assert_eq!(config.encoding, Mp3Encoding::default());
    }

    #[test]
    fn test_deserialize_with_encoding() {
        let toml = r#"
            include_thumbnail = false
            temp_dir_naming = "title"

            [encoding]
            method = "cbr"
            value = 320
        "#;
        let config: PipelineConfig = toml::from_str(toml).unwrap();
        assert!(!config.include_thumbnail);
        assert_eq!(config.temp_dir_naming, TempDirNaming::Title);
        assert_eq!(config.encoding.method, BitrateMode::Cbr);
        assert_eq!(config.encoding.value, 320);
        assert_eq!(config.encoding.sample_rate, 48000);
    }
}
