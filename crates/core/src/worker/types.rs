//! Identity, provenance and event types for workers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::progress::ProgressReport;

use super::status::WorkerStatus;

/// Unique identifier of a worker instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkerId(Uuid);

impl WorkerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// First eight hex digits, used in log lines.
    pub fn short(&self) -> String {
        self.0.simple().to_string()[..8].to_string()
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for WorkerId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for WorkerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for WorkerId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// The single-value and listing queries issued by the metadata probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeField {
    Id,
    Title,
    Duration,
    Thumbnail,
    Formats,
    BestFormat,
    BestAudioFormat,
    BestVideoFormat,
}

impl ProbeField {
    /// Every probe query, in launch order.
    pub const ALL: [ProbeField; 8] = [
        ProbeField::Id,
        ProbeField::Title,
        ProbeField::Duration,
        ProbeField::Thumbnail,
        ProbeField::Formats,
        ProbeField::BestFormat,
        ProbeField::BestAudioFormat,
        ProbeField::BestVideoFormat,
    ];

    /// Downloader arguments selecting this query (appended after the URL).
    pub fn query_args(&self) -> &'static [&'static str] {
        match self {
            Self::Id => &["--get-id"],
            Self::Title => &["--get-title"],
            Self::Duration => &["--get-duration"],
            Self::Thumbnail => &["--get-thumbnail"],
            Self::Formats => &["-F"],
            Self::BestFormat => &["-f", "best", "--get-format"],
            Self::BestAudioFormat => &["-f", "bestaudio", "--get-format"],
            Self::BestVideoFormat => &["-f", "bestvideo", "--get-format"],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Title => "title",
            Self::Duration => "duration",
            Self::Thumbnail => "thumbnail",
            Self::Formats => "formats",
            Self::BestFormat => "best_format",
            Self::BestAudioFormat => "best_audio_format",
            Self::BestVideoFormat => "best_video_format",
        }
    }
}

/// What kind of component raised or forwarded an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "field")]
pub enum ComponentKind {
    ProbeQuery(ProbeField),
    MetadataProbe,
    MediaDownload,
    ThumbnailDownload,
    HttpThumbnail,
    Transcode,
    IdListing,
    ToolUpdate,
    Pipeline,
    Facade,
}

impl ComponentKind {
    /// Short label without the probe field, used for metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProbeQuery(_) => "probe",
            Self::MetadataProbe => "metadata-probe",
            Self::MediaDownload => "media-download",
            Self::ThumbnailDownload => "thumbnail-download",
            Self::HttpThumbnail => "http-thumbnail",
            Self::Transcode => "transcode",
            Self::IdListing => "id-listing",
            Self::ToolUpdate => "tool-update",
            Self::Pipeline => "pipeline",
            Self::Facade => "job",
        }
    }
}

impl std::fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ProbeQuery(field) => write!(f, "probe:{}", field.as_str()),
            other => f.write_str(other.as_str()),
        }
    }
}

/// One link of a provenance chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    pub kind: ComponentKind,
    pub id: WorkerId,
}

impl std::fmt::Display for Provenance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.kind, self.id.short())
    }
}

/// A log line together with the chain of components it passed through.
///
/// The chain is ordered innermost first. Forwarding appends; the line and
/// timestamp are fixed when the event is first raised.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEvent {
    line: String,
    provenance: Vec<Provenance>,
    timestamp: DateTime<Utc>,
}

impl LogEvent {
    pub fn new(line: impl Into<String>, origin: Provenance) -> Self {
        Self {
            line: line.into(),
            provenance: vec![origin],
            timestamp: Utc::now(),
        }
    }

    pub fn line(&self) -> &str {
        &self.line
    }

    pub fn provenance(&self) -> &[Provenance] {
        &self.provenance
    }

    /// The component that raised the line.
    pub fn origin(&self) -> &Provenance {
        // Never empty: constructed with an origin and only ever appended to.
        &self.provenance[0]
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Returns the same event with `via` appended to the chain.
    pub fn forwarded(mut self, via: Provenance) -> Self {
        self.provenance.push(via);
        self
    }

    /// `[HH:MM:SS.mmm] outermost<...<innermost<line`
    pub fn full_line(&self) -> String {
        let mut out = format!("[{}]", self.timestamp.format("%H:%M:%S%.3f"));
        for link in self.provenance.iter().rev() {
            out.push_str(&link.to_string());
            out.push('<');
        }
        out.push_str(&self.line);
        out
    }
}

/// Events delivered to worker subscribers, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerEvent {
    Output(LogEvent),
    Error(LogEvent),
    Progress(ProgressReport),
    StatusChanged(WorkerStatus),
    /// Raised exactly once, after the terminal `StatusChanged`.
    Finished(WorkerStatus),
}

impl WorkerEvent {
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Finished(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forwarding_appends_and_keeps_line() {
        let inner = Provenance {
            kind: ComponentKind::MediaDownload,
            id: WorkerId::new(),
        };
        let outer = Provenance {
            kind: ComponentKind::Pipeline,
            id: WorkerId::new(),
        };

        let event = LogEvent::new("[download]  10.0%", inner);
        let timestamp = event.timestamp();
        let forwarded = event.forwarded(outer);

        assert_eq!(forwarded.line(), "[download]  10.0%");
        assert_eq!(forwarded.provenance(), &[inner, outer]);
        assert_eq!(forwarded.origin(), &inner);
        assert_eq!(forwarded.timestamp(), timestamp);
    }

    #[test]
    fn test_full_line_lists_outermost_first() {
        let inner = Provenance {
            kind: ComponentKind::Transcode,
            id: WorkerId::new(),
        };
        let outer = Provenance {
            kind: ComponentKind::Pipeline,
            id: WorkerId::new(),
        };
        let line = LogEvent::new("size=1kB", inner).forwarded(outer).full_line();

        let pipeline_at = line.find("pipeline#").unwrap();
        let transcode_at = line.find("transcode#").unwrap();
        assert!(line.starts_with('['));
        assert!(pipeline_at < transcode_at);
        assert!(line.ends_with("<size=1kB"));
    }

    #[test]
    fn test_worker_id_round_trips_through_display() {
        let id = WorkerId::new();
        let parsed: WorkerId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
        assert_eq!(id.short().len(), 8);
    }

    #[test]
    fn test_probe_query_args() {
        assert_eq!(ProbeField::Id.query_args(), &["--get-id"]);
        assert_eq!(
            ProbeField::BestAudioFormat.query_args(),
            &["-f", "bestaudio", "--get-format"]
        );
        assert_eq!(ProbeField::ALL.len(), 8);
    }
}
