//! Metadata probe: eight concurrent downloader queries merged into one worker.

use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, warn};

use crate::progress::{parse_clock, ProgressReport};
use crate::tools::{CommandSpec, OutputSource, ProcessLauncher};
use crate::worker::{
    ComponentKind, ProbeField, Subscription, Worker, WorkerCore, WorkerEvent, WorkerId,
    WorkerStatus,
};

use super::process::{LineInterpreter, ProcessWorker};

/// `--no-playlist <url> <query args>`
pub fn probe_command(downloader: &Path, url: &str, field: ProbeField) -> CommandSpec {
    CommandSpec::new(downloader)
        .args(["--no-playlist", url])
        .args(field.query_args().iter().copied())
}

/// Everything the probe learned about one media item.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MediaMetadata {
    pub id: Option<String>,
    pub title: Option<String>,
    pub duration_secs: Option<f64>,
    pub thumbnail_url: Option<String>,
    /// Rows of the format table, header excluded.
    pub formats: Vec<String>,
    pub best_format: Option<String>,
    pub best_audio_format: Option<String>,
    pub best_video_format: Option<String>,
}

impl MediaMetadata {
    pub fn duration(&self) -> Option<Duration> {
        self.duration_secs
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
    }
}

/// Captures the stdout answer of one probe query.
#[derive(Debug, Clone)]
pub struct ProbeCapture {
    field: ProbeField,
    lines: Vec<String>,
    in_table: bool,
}

impl ProbeCapture {
    pub fn new(field: ProbeField) -> Self {
        Self {
            field,
            lines: Vec::new(),
            in_table: false,
        }
    }

    /// First captured line, for single-value queries.
    pub fn value(&self) -> Option<&str> {
        self.lines.first().map(String::as_str)
    }

    /// First token of the first line, for the best-format queries.
    pub fn format_code(&self) -> Option<String> {
        self.value()
            .and_then(|v| v.split_whitespace().next())
            .map(str::to_string)
    }

    pub fn rows(&self) -> &[String] {
        &self.lines
    }
}

impl LineInterpreter for ProbeCapture {
    fn interpret(&mut self, source: OutputSource, line: &str) -> Option<ProgressReport> {
        if source != OutputSource::Stdout {
            return None;
        }
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return None;
        }

        if self.field == ProbeField::Formats {
            if self.in_table {
                if !is_table_rule(trimmed) {
                    self.lines.push(trimmed.to_string());
                }
            } else if is_table_header(trimmed) {
                self.in_table = true;
            }
        } else if self.lines.is_empty() {
            self.lines.push(trimmed.to_string());
        }
        None
    }
}

fn is_table_header(line: &str) -> bool {
    line.starts_with("format code") || (line.starts_with("ID ") && line.contains("EXT"))
}

fn is_table_rule(line: &str) -> bool {
    line.chars().all(|c| matches!(c, '-' | '─' | ' ' | '|' | '│'))
}

type ProbeQuery = ProcessWorker<ProbeCapture>;

/// Runs every [`ProbeField`] query concurrently against one URL.
///
/// Finishes only after all queries exited. Any failed query makes the probe
/// finish `Error`, but never stops the others. Progress is the share of
/// queries that have exited.
pub struct MetadataProbe {
    core: Arc<WorkerCore>,
    launcher: Arc<dyn ProcessLauncher>,
    downloader: PathBuf,
    url: String,
    metadata: Arc<Mutex<Option<MediaMetadata>>>,
}

impl MetadataProbe {
    pub fn new(launcher: Arc<dyn ProcessLauncher>, downloader: &Path, url: &str) -> Self {
        Self {
            core: Arc::new(WorkerCore::new(ComponentKind::MetadataProbe)),
            launcher,
            downloader: downloader.to_path_buf(),
            url: url.to_string(),
            metadata: Arc::new(Mutex::new(None)),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Values captured so far; complete once the probe finished.
    pub fn metadata(&self) -> Option<MediaMetadata> {
        self.metadata
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Worker for MetadataProbe {
    fn id(&self) -> WorkerId {
        self.core.id()
    }

    fn kind(&self) -> ComponentKind {
        self.core.kind()
    }

    fn status(&self) -> WorkerStatus {
        self.core.status()
    }

    fn ready(&self) -> bool {
        self.core.ready()
    }

    fn start(&self) -> bool {
        if !self.core.try_start() {
            return false;
        }
        let queries: Vec<ProbeQuery> = ProbeField::ALL
            .iter()
            .map(|&field| {
                ProcessWorker::from_parts(
                    ComponentKind::ProbeQuery(field),
                    Arc::clone(&self.launcher),
                    probe_command(&self.downloader, &self.url, field),
                    ProbeCapture::new(field),
                )
            })
            .collect();
        tokio::spawn(run_probe(
            Arc::clone(&self.core),
            queries,
            Arc::clone(&self.metadata),
        ));
        true
    }

    fn subscribe(&self) -> Subscription {
        self.core.subscribe()
    }
}

async fn run_probe(
    core: Arc<WorkerCore>,
    queries: Vec<ProbeQuery>,
    metadata: Arc<Mutex<Option<MediaMetadata>>>,
) {
    let total = queries.len();
    let mut subscriptions = Vec::with_capacity(total);
    for query in &queries {
        subscriptions.push(query.subscribe());
        query.ready();
        query.start();
    }

    let mut merged = stream::select_all(subscriptions);
    let mut completed = 0usize;
    let mut failed = false;
    while let Some(event) = merged.next().await {
        match event {
            WorkerEvent::Output(line) => core.forward(line, false),
            WorkerEvent::Error(line) => core.forward(line, true),
            WorkerEvent::Finished(status) => {
                completed += 1;
                if status != WorkerStatus::Successful {
                    failed = true;
                }
                core.progress(ProgressReport::from_percent(
                    completed as f64 / total as f64 * 100.0,
                ));
            }
            WorkerEvent::Progress(_) | WorkerEvent::StatusChanged(_) => {}
        }
    }
    if completed < total {
        failed = true;
    }

    let collected = collect_metadata(&queries);
    debug!(
        worker = %core.provenance(),
        title = ?collected.title,
        "Probe collected metadata"
    );
    *metadata.lock().unwrap_or_else(PoisonError::into_inner) = Some(collected);

    if failed {
        warn!(worker = %core.provenance(), "One or more probe queries failed");
        core.error_line("One or more metadata queries failed");
        core.finish(WorkerStatus::Error);
    } else {
        core.finish(WorkerStatus::Successful);
    }
}

fn collect_metadata(queries: &[ProbeQuery]) -> MediaMetadata {
    let mut metadata = MediaMetadata::default();
    for query in queries {
        query.inspect(|capture| match capture.field {
            ProbeField::Id => metadata.id = capture.value().map(str::to_string),
            ProbeField::Title => metadata.title = capture.value().map(str::to_string),
            ProbeField::Duration => {
                metadata.duration_secs = capture
                    .value()
                    .and_then(parse_clock)
                    .map(|d| d.as_secs_f64())
            }
            ProbeField::Thumbnail => metadata.thumbnail_url = capture.value().map(str::to_string),
            ProbeField::Formats => metadata.formats = capture.rows().to_vec(),
            ProbeField::BestFormat => metadata.best_format = capture.format_code(),
            ProbeField::BestAudioFormat => metadata.best_audio_format = capture.format_code(),
            ProbeField::BestVideoFormat => metadata.best_video_format = capture.format_code(),
        });
    }
    metadata
}
