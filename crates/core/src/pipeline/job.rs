//! Download-and-convert job.
//!
//! A [`PipelineJob`] probes an item, downloads its best audio into a private
//! temp directory, optionally fetches a cover image, transcodes to MP3 with
//! tags and removes the temp directory. Each stage is a child worker; the
//! job forwards the child's lines with itself appended to their provenance
//! and maps the child's progress into the stage's quarter of the overall
//! percentage.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use tracing::{debug, info, warn};

use super::config::{PipelineConfig, ThumbnailSource};
use super::progress::{overall_percent, stage_end_percent};
use super::temp::temp_dir_for;
use super::types::{FailureKind, JobRequest, JobStage};
use crate::adapter::{
    HttpThumbnail, MediaDownload, MediaMetadata, MetadataProbe, TagMetadata, ThumbnailDownload,
    Transcode, TranscodeRequest, BEST_AUDIO,
};
use crate::metrics;
use crate::progress::ProgressReport;
use crate::tools::Toolbox;
use crate::worker::{ComponentKind, Subscription, Worker, WorkerCore, WorkerEvent, WorkerId, WorkerStatus};

/// Observable state of a job.
#[derive(Debug, Clone)]
struct JobState {
    stage: JobStage,
    failure: Option<FailureKind>,
    metadata: Option<MediaMetadata>,
    temp_dir: Option<PathBuf>,
    output: Option<PathBuf>,
    percent: f64,
}

impl Default for JobState {
    fn default() -> Self {
        Self {
            stage: JobStage::Init,
            failure: None,
            metadata: None,
            temp_dir: None,
            output: None,
            percent: 0.0,
        }
    }
}

/// One URL through probe, download, thumbnail and transcode.
pub struct PipelineJob {
    core: Arc<WorkerCore>,
    state: Arc<Mutex<JobState>>,
    request: JobRequest,
    config: PipelineConfig,
    toolbox: Toolbox,
}

impl PipelineJob {
    pub fn new(request: JobRequest, config: PipelineConfig, toolbox: Toolbox) -> Self {
        Self {
            core: Arc::new(WorkerCore::new(ComponentKind::Pipeline)),
            state: Arc::new(Mutex::new(JobState::default())),
            request,
            config,
            toolbox,
        }
    }

    pub fn request(&self) -> &JobRequest {
        &self.request
    }

    pub fn url(&self) -> &str {
        &self.request.url
    }

    pub fn stage(&self) -> JobStage {
        self.lock().stage
    }

    /// Set once the job finished `Error`.
    pub fn failure(&self) -> Option<FailureKind> {
        self.lock().failure
    }

    /// Probed metadata, available after the first stage.
    pub fn metadata(&self) -> Option<MediaMetadata> {
        self.lock().metadata.clone()
    }

    /// Resolved output file, known once the download finished.
    pub fn output_path(&self) -> Option<PathBuf> {
        self.lock().output.clone()
    }

    pub fn temp_dir(&self) -> Option<PathBuf> {
        self.lock().temp_dir.clone()
    }

    /// Last overall percentage published.
    pub fn percent(&self) -> f64 {
        self.lock().percent
    }

    fn lock(&self) -> MutexGuard<'_, JobState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Worker for PipelineJob {
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
        let driver = Driver {
            core: Arc::clone(&self.core),
            state: Arc::clone(&self.state),
            request: self.request.clone(),
            config: self.config.clone(),
            toolbox: self.toolbox.clone(),
        };
        tokio::spawn(driver.run());
        true
    }

    fn subscribe(&self) -> Subscription {
        self.core.subscribe()
    }
}

/// Owns the running job; lives in the spawned task.
struct Driver {
    core: Arc<WorkerCore>,
    state: Arc<Mutex<JobState>>,
    request: JobRequest,
    config: PipelineConfig,
    toolbox: Toolbox,
}

impl Driver {
    async fn run(self) {
        info!(job = %self.core.provenance(), url = %self.request.url, "Job started");
        let started = Instant::now();

        let status = match self.drive().await {
            Ok(()) => {
                self.set_stage(JobStage::Done);
                metrics::JOBS_COMPLETED.inc();
                info!(
                    job = %self.core.provenance(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Job completed"
                );
                WorkerStatus::Successful
            }
            Err(kind) => {
                {
                    let mut state = self.lock();
                    state.stage = JobStage::Failed;
                    state.failure = Some(kind);
                }
                metrics::JOBS_FAILED.with_label_values(&[kind.as_str()]).inc();
                warn!(job = %self.core.provenance(), failure = %kind, "Job failed");
                WorkerStatus::Error
            }
        };
        self.core.finish(status);
    }

    async fn drive(&self) -> Result<(), FailureKind> {
        let metadata = self.probe().await?;
        let temp_dir = self.prepare_temp_dir(&metadata).await?;

        // Left in place on failure for inspection.
        self.process(&metadata, &temp_dir).await?;
        self.remove_temp_dir(&temp_dir).await;
        Ok(())
    }

    async fn process(&self, metadata: &MediaMetadata, temp_dir: &Path) -> Result<(), FailureKind> {
        let audio = self.download(temp_dir).await?;
        let output = self
            .request
            .destination
            .resolve(&file_stem(&audio), &self.config.output_extension);
        self.lock().output = Some(output.clone());
        self.complete_stage(JobStage::Downloading);

        let cover = self.fetch_thumbnail(metadata, temp_dir).await?;
        self.complete_stage(JobStage::FetchingThumbnail);

        self.convert(metadata, &audio, cover, &output).await?;
        self.complete_stage(JobStage::Converting);
        Ok(())
    }

    async fn probe(&self) -> Result<MediaMetadata, FailureKind> {
        self.set_stage(JobStage::ProbeMeta);
        let probe = MetadataProbe::new(
            Arc::clone(&self.toolbox.launcher),
            &self.toolbox.config.downloader_path,
            &self.request.url,
        );
        if self.run_stage(&probe, JobStage::ProbeMeta).await != WorkerStatus::Successful {
            return Err(FailureKind::ProbeFailed);
        }
        let metadata = probe.metadata().unwrap_or_default();
        self.lock().metadata = Some(metadata.clone());
        Ok(metadata)
    }

    async fn prepare_temp_dir(&self, metadata: &MediaMetadata) -> Result<PathBuf, FailureKind> {
        let parent = self.request.destination.dir();
        let Some(temp_dir) = temp_dir_for(&parent, self.config.temp_dir_naming, metadata) else {
            self.core
                .error_line("Probe returned neither an id nor a title for this item");
            return Err(FailureKind::ProbeFailed);
        };

        if let Err(e) = tokio::fs::create_dir_all(&parent).await {
            self.core.error_line(format!(
                "Failed to create output folder {}: {}",
                parent.display(),
                e
            ));
            return Err(FailureKind::Filesystem);
        }

        // Non-recursive create is the claim: exactly one job wins the folder.
        match tokio::fs::create_dir(&temp_dir).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                self.core.error_line(
                    "Temp folder already exists. This might mean another job for this item is already running.",
                );
                self.core
                    .error_line("If no other job is running, delete the folder manually.");
                self.core
                    .error_line(format!("Location: {}", temp_dir.display()));
                return Err(FailureKind::DuplicateJob);
            }
            Err(e) => {
                self.core.error_line(format!(
                    "Failed to create temp folder {}: {}",
                    temp_dir.display(),
                    e
                ));
                return Err(FailureKind::Filesystem);
            }
        }

        if let Err(e) = tokio::fs::create_dir(temp_dir.join("audio")).await {
            self.core.error_line(format!(
                "Failed to create temp folder {}: {}",
                temp_dir.display(),
                e
            ));
            return Err(FailureKind::Filesystem);
        }
        debug!(job = %self.core.provenance(), temp_dir = %temp_dir.display(), "Created temp folder");
        self.lock().temp_dir = Some(temp_dir.clone());
        self.complete_stage(JobStage::ProbeMeta);
        Ok(temp_dir)
    }

    async fn download(&self, temp_dir: &Path) -> Result<PathBuf, FailureKind> {
        self.set_stage(JobStage::Downloading);
        let audio_dir = temp_dir.join("audio");
        let download = MediaDownload::new(
            Arc::clone(&self.toolbox.launcher),
            &self.toolbox.config.downloader_path,
            &self.request.url,
            BEST_AUDIO,
            &audio_dir.join("%(title)s.%(ext)s"),
        );
        if self.run_stage(&download, JobStage::Downloading).await != WorkerStatus::Successful {
            return Err(FailureKind::DownloadFailed);
        }

        match find_downloaded_file(&audio_dir).await {
            Some(audio) => Ok(audio),
            None => {
                self.core.error_line(format!(
                    "Download finished but no audio file was found in {}",
                    audio_dir.display()
                ));
                Err(FailureKind::DownloadFailed)
            }
        }
    }

    async fn fetch_thumbnail(
        &self,
        metadata: &MediaMetadata,
        temp_dir: &Path,
    ) -> Result<Option<PathBuf>, FailureKind> {
        if !self.config.include_thumbnail {
            return Ok(None);
        }
        self.set_stage(JobStage::FetchingThumbnail);

        match self.config.thumbnail_source {
            ThumbnailSource::Http => {
                let Some(url) = metadata.thumbnail_url.as_deref() else {
                    self.core.output("No thumbnail available, skipping cover");
                    return Ok(None);
                };
                let destination = temp_dir.join("thumbnail");
                let fetch = HttpThumbnail::new(
                    Arc::clone(&self.toolbox.fetcher),
                    url,
                    &destination,
                );
                if self.run_stage(&fetch, JobStage::FetchingThumbnail).await
                    != WorkerStatus::Successful
                {
                    return Err(FailureKind::ThumbnailFailed);
                }
                Ok(Some(destination))
            }
            ThumbnailSource::Downloader => {
                let download = ThumbnailDownload::new(
                    Arc::clone(&self.toolbox.launcher),
                    &self.toolbox.config.downloader_path,
                    &self.request.url,
                    &temp_dir.join("thumbnail.%(ext)s"),
                );
                if self.run_stage(&download, JobStage::FetchingThumbnail).await
                    != WorkerStatus::Successful
                {
                    return Err(FailureKind::ThumbnailFailed);
                }
                let cover = download.discovered_path();
                if cover.is_none() {
                    self.core
                        .output("Downloader did not report a thumbnail, skipping cover");
                }
                Ok(cover)
            }
        }
    }

    async fn convert(
        &self,
        metadata: &MediaMetadata,
        audio: &Path,
        cover: Option<PathBuf>,
        output: &Path,
    ) -> Result<(), FailureKind> {
        self.set_stage(JobStage::Converting);

        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                self.core.error_line(format!(
                    "Failed to create output folder {}: {}",
                    parent.display(),
                    e
                ));
                return Err(FailureKind::Filesystem);
            }
        }

        let mut tags = TagMetadata::default();
        if let Some(title) = &metadata.title {
            tags = tags.with_title(title.clone());
        }
        let request = TranscodeRequest {
            input: audio.to_path_buf(),
            cover,
            output: output.to_path_buf(),
            tags: tags.merged_with(&self.request.tags),
            encoding: self.config.encoding.clone(),
        };
        let transcode = Transcode::new(
            Arc::clone(&self.toolbox.launcher),
            &self.toolbox.config.ffmpeg_path,
            &request,
        );
        if self.run_stage(&transcode, JobStage::Converting).await != WorkerStatus::Successful {
            return Err(FailureKind::TranscodeFailed);
        }
        Ok(())
    }

    /// Runs one child to completion, forwarding its lines and progress.
    ///
    /// The subscription is dropped as soon as the child finishes.
    async fn run_stage(&self, child: &dyn Worker, stage: JobStage) -> WorkerStatus {
        let started = Instant::now();
        let mut events = child.subscribe();
        child.ready();
        if !child.start() {
            self.core
                .error_line(format!("Could not start {}", child.provenance()));
            return WorkerStatus::Error;
        }

        let mut status = WorkerStatus::Error;
        while let Some(event) = events.recv().await {
            match event {
                WorkerEvent::Output(line) => self.core.forward(line, false),
                WorkerEvent::Error(line) => self.core.forward(line, true),
                WorkerEvent::Progress(report) => {
                    let percent = overall_percent(stage, report.percent);
                    self.publish(report.with_percent(percent));
                }
                WorkerEvent::StatusChanged(_) => {}
                WorkerEvent::Finished(final_status) => {
                    status = final_status;
                    break;
                }
            }
        }

        metrics::STAGE_DURATION
            .with_label_values(&[stage.as_str()])
            .observe(started.elapsed().as_secs_f64());
        debug!(job = %self.core.provenance(), %stage, %status, "Stage finished");
        status
    }

    fn set_stage(&self, stage: JobStage) {
        self.lock().stage = stage;
        debug!(job = %self.core.provenance(), %stage, "Entering stage");
    }

    fn complete_stage(&self, stage: JobStage) {
        self.publish(ProgressReport::from_percent(stage_end_percent(stage)));
    }

    /// Publishes progress unless it would move the overall percentage back.
    fn publish(&self, report: ProgressReport) {
        {
            let mut state = self.lock();
            if report.percent < state.percent {
                return;
            }
            state.percent = report.percent;
        }
        self.core.progress(report);
    }

    async fn remove_temp_dir(&self, temp_dir: &Path) {
        if let Err(e) = tokio::fs::remove_dir_all(temp_dir).await {
            warn!(job = %self.core.provenance(), temp_dir = %temp_dir.display(), "Failed to remove temp folder: {}", e);
            self.core.error_line(format!(
                "Failed to remove temp folder {}: {}",
                temp_dir.display(),
                e
            ));
            self.core
                .error_line("The folder can be deleted manually.");
        }
    }

    fn lock(&self) -> MutexGuard<'_, JobState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// First completed download in `dir`, skipping partial files.
async fn find_downloaded_file(dir: &Path) -> Option<PathBuf> {
    let mut entries = tokio::fs::read_dir(dir).await.ok()?;
    let mut files = Vec::new();
    while let Ok(Some(entry)) = entries.next_entry().await {
        let path = entry.path();
        let partial = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| matches!(e, "part" | "ytdl"))
            .unwrap_or(false);
        if !partial && entry.file_type().await.map(|t| t.is_file()).unwrap_or(false) {
            files.push(path);
        }
    }
    files.sort();
    files.into_iter().next()
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "output".to_string())
}
