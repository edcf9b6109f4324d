//! Transcoding to MP3 with tags and an optional attached cover.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::progress::{is_transcoder_status, parse_duration_line, parse_transcoder, ProgressReport};
use crate::tools::{CommandSpec, OutputSource, ProcessLauncher};
use crate::worker::ComponentKind;

use super::process::{LineInterpreter, ProcessWorker};

const DEFAULT_ENCODER_TAG: &str = "FFmpeg via yayd";

/// Bitrate strategy of the MP3 encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BitrateMode {
    /// Variable bitrate; `value` is the quality level 0 (best) to 9.
    #[default]
    Vbr,
    /// Average bitrate; `value` is the target in kbit/s.
    Abr,
    /// Constant bitrate; `value` is the bitrate in kbit/s.
    Cbr,
}

/// MP3 output encoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mp3Encoding {
    #[serde(default)]
    pub method: BitrateMode,

    #[serde(default)]
    pub value: u32,

    /// Output sample rate in Hz.
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
}

fn default_sample_rate() -> u32 {
    48000
}

impl Default for Mp3Encoding {
    fn default() -> Self {
        Self {
            method: BitrateMode::Vbr,
            value: 0,
            sample_rate: default_sample_rate(),
        }
    }
}

impl Mp3Encoding {
    pub fn vbr(quality: u32) -> Self {
        Self {
            method: BitrateMode::Vbr,
            value: quality,
            ..Default::default()
        }
    }

    pub fn abr(kbps: u32) -> Self {
        Self {
            method: BitrateMode::Abr,
            value: kbps,
            ..Default::default()
        }
    }

    pub fn cbr(kbps: u32) -> Self {
        Self {
            method: BitrateMode::Cbr,
            value: kbps,
            ..Default::default()
        }
    }

    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    /// Encoder arguments for ffmpeg.
    pub fn to_args(&self) -> Vec<String> {
        let rate = self.sample_rate.to_string();
        let mut args: Vec<String> = match self.method {
            BitrateMode::Vbr if self.value <= 9 => vec![
                "-c:a".into(),
                "libmp3lame".into(),
                "-q:a".into(),
                self.value.to_string(),
            ],
            BitrateMode::Vbr => vec!["-q:a".into(), "0".into()],
            BitrateMode::Abr => vec![
                "-c:a".into(),
                "libmp3lame".into(),
                "-abr".into(),
                "1".into(),
                "-b:a".into(),
                format!("{}k", self.value),
            ],
            BitrateMode::Cbr => vec![
                "-c:a".into(),
                "libmp3lame".into(),
                "-b:a".into(),
                format!("{}k", self.value),
            ],
        };
        args.extend(["-ar".to_string(), rate]);
        args
    }
}

/// ID3 tags written into the output file. Blank fields are omitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TagMetadata {
    pub album: Option<String>,
    pub composer: Option<String>,
    pub genre: Option<String>,
    pub copyright: Option<String>,
    pub encoded_by: Option<String>,
    pub title: Option<String>,
    pub language: Option<String>,
    pub album_artist: Option<String>,
    pub performer: Option<String>,
    pub disc: Option<String>,
    pub publisher: Option<String>,
    pub track: Option<String>,
    pub encoder: Option<String>,
    pub lyrics: Option<String>,
    /// Joined with `/` into the `artist` tag.
    pub artists: Vec<String>,
}

impl Default for TagMetadata {
    fn default() -> Self {
        Self {
            album: None,
            composer: None,
            genre: None,
            copyright: None,
            encoded_by: Some(DEFAULT_ENCODER_TAG.to_string()),
            title: None,
            language: None,
            album_artist: None,
            performer: None,
            disc: None,
            publisher: None,
            track: None,
            encoder: Some(DEFAULT_ENCODER_TAG.to_string()),
            lyrics: None,
            artists: Vec::new(),
        }
    }
}

impl TagMetadata {
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Copies every field set in `overrides` over this one.
    pub fn merged_with(mut self, overrides: &TagMetadata) -> Self {
        fn take(dst: &mut Option<String>, src: &Option<String>) {
            if src.as_deref().is_some_and(|v| !v.trim().is_empty()) {
                dst.clone_from(src);
            }
        }
        take(&mut self.album, &overrides.album);
        take(&mut self.composer, &overrides.composer);
        take(&mut self.genre, &overrides.genre);
        take(&mut self.copyright, &overrides.copyright);
        take(&mut self.encoded_by, &overrides.encoded_by);
        take(&mut self.title, &overrides.title);
        take(&mut self.language, &overrides.language);
        take(&mut self.album_artist, &overrides.album_artist);
        take(&mut self.performer, &overrides.performer);
        take(&mut self.disc, &overrides.disc);
        take(&mut self.publisher, &overrides.publisher);
        take(&mut self.track, &overrides.track);
        take(&mut self.encoder, &overrides.encoder);
        take(&mut self.lyrics, &overrides.lyrics);
        if !overrides.artists.is_empty() {
            self.artists = overrides.artists.clone();
        }
        self
    }

    fn fields(&self) -> [(&'static str, &Option<String>); 14] {
        [
            ("album", &self.album),
            ("composer", &self.composer),
            ("genre", &self.genre),
            ("copyright", &self.copyright),
            ("encoded_by", &self.encoded_by),
            ("title", &self.title),
            ("language", &self.language),
            ("album_artist", &self.album_artist),
            ("performer", &self.performer),
            ("disc", &self.disc),
            ("publisher", &self.publisher),
            ("track", &self.track),
            ("encoder", &self.encoder),
            ("lyrics", &self.lyrics),
        ]
    }

    /// `-id3v2_version 3 [-metadata key=value]...`
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec!["-id3v2_version".to_string(), "3".to_string()];
        for (key, value) in self.fields() {
            if let Some(value) = value.as_deref().filter(|v| !v.trim().is_empty()) {
                args.push("-metadata".to_string());
                args.push(format!("{}={}", key, value));
            }
        }
        if !self.artists.is_empty() {
            args.push("-metadata".to_string());
            args.push(format!("artist={}", self.artists.join("/")));
        }
        args
    }
}

/// Inputs and output of one transcode.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscodeRequest {
    pub input: PathBuf,
    /// Image attached as the front cover.
    pub cover: Option<PathBuf>,
    pub output: PathBuf,
    pub tags: TagMetadata,
    pub encoding: Mp3Encoding,
}

/// Full ffmpeg argument list; the output is always overwritten.
pub fn transcode_args(request: &TranscodeRequest) -> Vec<String> {
    let mut args = vec!["-i".to_string(), request.input.to_string_lossy().to_string()];

    if let Some(cover) = &request.cover {
        args.extend([
            "-i".to_string(),
            cover.to_string_lossy().to_string(),
            "-map".to_string(),
            "0:a".to_string(),
            "-map".to_string(),
            "1:0".to_string(),
            "-metadata:s:v".to_string(),
            "title=Album cover".to_string(),
            "-metadata:s:v".to_string(),
            "comment=Cover (front)".to_string(),
        ]);
    }

    args.extend(request.tags.to_args());
    args.extend(request.encoding.to_args());
    args.push(request.output.to_string_lossy().to_string());
    args.push("-y".to_string());
    args
}

/// Converts transcoder `time=` into a percentage of the input duration.
///
/// The total is taken from the input banner's `Duration:` lines, largest
/// wins (an attached cover reports its own near-zero duration). Until a
/// duration is seen no progress is published.
#[derive(Debug, Default, Clone)]
pub struct TranscodeProgress {
    total: Option<Duration>,
}

impl TranscodeProgress {
    pub fn total(&self) -> Option<Duration> {
        self.total
    }
}

impl LineInterpreter for TranscodeProgress {
    fn interpret(&mut self, _source: OutputSource, line: &str) -> Option<ProgressReport> {
        if let Some(duration) = parse_duration_line(line) {
            self.total = Some(self.total.map_or(duration, |t| t.max(duration)));
            return None;
        }
        if !is_transcoder_status(line) {
            return None;
        }
        let report = parse_transcoder(line, self.total);
        (report.percent > 0.0).then_some(report)
    }
}

/// Runs ffmpeg for one [`TranscodeRequest`].
pub type Transcode = ProcessWorker<TranscodeProgress>;

impl Transcode {
    pub fn new(
        launcher: Arc<dyn ProcessLauncher>,
        ffmpeg: &Path,
        request: &TranscodeRequest,
    ) -> Self {
        Self::from_parts(
            ComponentKind::Transcode,
            launcher,
            CommandSpec::new(ffmpeg).args(transcode_args(request)),
            TranscodeProgress::default(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(cover: Option<&str>) -> TranscodeRequest {
        TranscodeRequest {
            input: PathBuf::from("/tmp/work/audio/Song.webm"),
            cover: cover.map(PathBuf::from),
            output: PathBuf::from("/music/Song.mp3"),
            tags: TagMetadata {
                encoded_by: None,
                encoder: None,
                ..Default::default()
            }
            .with_title("Song"),
            encoding: Mp3Encoding::default(),
        }
    }

    #[test]
    fn test_args_without_cover() {
        let args = transcode_args(&request(None));
        assert_eq!(
            args,
            vec![
                "-i",
                "/tmp/work/audio/Song.webm",
                "-id3v2_version",
                "3",
                "-metadata",
                "title=Song",
                "-c:a",
                "libmp3lame",
                "-q:a",
                "0",
                "-ar",
                "48000",
                "/music/Song.mp3",
                "-y",
            ]
        );
    }

    #[test]
    fn test_args_with_cover_map_the_image() {
        let args = transcode_args(&request(Some("/tmp/work/thumbnail")));
        let joined = args.join(" ");
        assert!(joined.starts_with(
            "-i /tmp/work/audio/Song.webm -i /tmp/work/thumbnail -map 0:a -map 1:0 \
             -metadata:s:v title=Album cover -metadata:s:v comment=Cover (front)"
        ));
        assert!(joined.ends_with("/music/Song.mp3 -y"));
    }

    #[test]
    fn test_encoding_blocks() {
        assert_eq!(
            Mp3Encoding::vbr(2).to_args(),
            vec!["-c:a", "libmp3lame", "-q:a", "2", "-ar", "48000"]
        );
        assert_eq!(
            Mp3Encoding::vbr(12).with_sample_rate(44100).to_args(),
            vec!["-q:a", "0", "-ar", "44100"]
        );
        assert_eq!(
            Mp3Encoding::abr(192).to_args(),
            vec!["-c:a", "libmp3lame", "-abr", "1", "-b:a", "192k", "-ar", "48000"]
        );
        assert_eq!(
            Mp3Encoding::cbr(320).to_args(),
            vec!["-c:a", "libmp3lame", "-b:a", "320k", "-ar", "48000"]
        );
    }

    #[test]
    fn test_tags_join_artists_and_skip_blanks() {
        let tags = TagMetadata {
            album: Some("  ".to_string()),
            genre: Some("Pop".to_string()),
            artists: vec!["A".to_string(), "B".to_string()],
            ..Default::default()
        };
        let args = tags.to_args();
        assert!(args.contains(&"genre=Pop".to_string()));
        assert!(args.contains(&"artist=A/B".to_string()));
        assert!(args.contains(&format!("encoder={}", DEFAULT_ENCODER_TAG)));
        assert!(!args.iter().any(|a| a.starts_with("album=")));
    }

    #[test]
    fn test_merge_keeps_unset_fields() {
        let base = TagMetadata::default().with_title("Probed");
        let overrides = TagMetadata {
            encoded_by: None,
            encoder: None,
            album: Some("Album".to_string()),
            ..Default::default()
        };
        let merged = base.merged_with(&overrides);
        assert_eq!(merged.title.as_deref(), Some("Probed"));
        assert_eq!(merged.album.as_deref(), Some("Album"));
        assert_eq!(merged.encoder.as_deref(), Some(DEFAULT_ENCODER_TAG));
    }

    #[test]
    fn test_progress_waits_for_duration() {
        let mut progress = TranscodeProgress::default();
        let status = "size=  100kB time=00:00:30.00 bitrate= 27.3kbits/s speed=30x";
        assert!(progress.interpret(OutputSource::Stderr, status).is_none());

        progress.interpret(
            OutputSource::Stderr,
            "  Duration: 00:01:00.00, start: 0.000000, bitrate: 128 kb/s",
        );
        progress.interpret(OutputSource::Stderr, "  Duration: 00:00:00.04, start: 0.000000");
        assert_eq!(progress.total(), Some(Duration::from_secs(60)));

        let report = progress.interpret(OutputSource::Stderr, status).unwrap();
        assert!((report.percent - 50.0).abs() < 1e-9);
    }
}
