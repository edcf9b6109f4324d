//! Pipeline lifecycle integration tests.
//!
//! These tests drive a full job through mock tools:
//! - Stage sequencing (probe -> download -> thumbnail -> convert)
//! - Progress blending and stage boundaries
//! - Temp directory lifecycle (created, removed on success, kept on failure)
//! - Command lines handed to the downloader and the transcoder

use std::path::Path;
use std::sync::Arc;

use tempfile::TempDir;

use yayd_core::{
    pipeline::{Destination, FailureKind, JobRequest, JobStage, PipelineConfig, ThumbnailSource},
    testing::{fixtures, MockFetcher, MockLauncher, ScriptedRun},
    Mp3Encoding, PipelineJob, TagMetadata, Toolbox, ToolsConfig, Worker, WorkerEvent,
    WorkerStatus,
};

/// Test helper holding the mocks and the output directory.
struct TestHarness {
    launcher: Arc<MockLauncher>,
    fetcher: Arc<MockFetcher>,
    output_dir: TempDir,
}

impl TestHarness {
    fn new() -> Self {
        let launcher = Arc::new(MockLauncher::new());
        fixtures::script_probe(&launcher, "dQw4w9WgXcQ", "Never Gonna Give You Up");
        Self {
            launcher,
            fetcher: Arc::new(MockFetcher::new()),
            output_dir: TempDir::new().expect("Failed to create output dir"),
        }
    }

    fn toolbox(&self) -> Toolbox {
        Toolbox::new(
            self.launcher.clone(),
            self.fetcher.clone(),
            ToolsConfig::with_paths("yt-dlp".into(), "ffmpeg".into()),
        )
    }

    fn job(&self, request: JobRequest, config: PipelineConfig) -> PipelineJob {
        PipelineJob::new(request, config, self.toolbox())
    }

    fn placeholder_request(&self) -> JobRequest {
        JobRequest::new(
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            Destination::parse(self.output_dir.path().join("default.mp3")),
        )
    }

    fn dir(&self) -> &Path {
        self.output_dir.path()
    }
}

async fn run_to_end(job: &PipelineJob) -> Vec<WorkerEvent> {
    let mut events = job.subscribe();
    assert!(job.ready());
    assert!(job.start());
    let mut collected = Vec::new();
    while let Some(event) = events.recv().await {
        collected.push(event);
    }
    collected
}

fn progress(events: &[WorkerEvent]) -> Vec<f64> {
    events
        .iter()
        .filter_map(|e| match e {
            WorkerEvent::Progress(r) => Some(r.percent),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_full_job_with_http_thumbnail() {
    let harness = TestHarness::new();
    fixtures::script_download(&harness.launcher, "Never Gonna Give You Up.webm");
    fixtures::script_transcode(&harness.launcher);
    let job = harness.job(harness.placeholder_request(), PipelineConfig::default());

    let events = run_to_end(&job).await;

    assert_eq!(job.status(), WorkerStatus::Successful);
    assert_eq!(job.stage(), JobStage::Done);
    assert_eq!(
        job.output_path(),
        Some(harness.dir().join("Never Gonna Give You Up.mp3"))
    );

    // Downloader saw the audio template inside the temp folder.
    let download = &harness.launcher.commands_containing("-f bestaudio -o")[0];
    let template = download.args.last().unwrap();
    assert!(template.ends_with("%(title)s.%(ext)s"));
    assert!(template.contains("yayd_temp_dQw4w9WgXcQ"));

    // Cover fetched from the probed URL and attached.
    assert_eq!(
        harness.fetcher.recorded_fetches()[0].url,
        "https://img.example.com/dQw4w9WgXcQ.jpg"
    );
    let transcode = &harness.launcher.commands_containing("-id3v2_version")[0];
    assert_eq!(transcode.program, Path::new("ffmpeg"));
    assert!(transcode.args.contains(&"title=Never Gonna Give You Up".to_string()));
    assert!(transcode.args.contains(&"libmp3lame".to_string()));
    assert_eq!(transcode.args.last().unwrap(), "-y");

    // Temp folder removed.
    assert!(!harness.dir().join("yayd_temp_dQw4w9WgXcQ").exists());

    // Progress: monotonic, stage boundaries exact, stage-internal values blended.
    let percents = progress(&events);
    assert!(percents.windows(2).all(|w| w[0] <= w[1]), "{:?}", percents);
    for boundary in [25.0, 50.0, 75.0, 100.0] {
        assert!(percents.contains(&boundary), "missing {} in {:?}", boundary, percents);
    }
    assert!(percents.contains(&35.5)); // download 42%
    assert!(percents.contains(&87.5)); // transcode half way
}

#[tokio::test]
async fn test_title_naming_and_explicit_destination() {
    let harness = TestHarness::new();
    fixtures::script_download(&harness.launcher, "Never Gonna Give You Up.webm");
    let target = harness.dir().join("rick.mp3");
    let request = JobRequest::new(
        "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
        Destination::parse(&target),
    )
    .with_tags(TagMetadata {
        title: Some("Custom Title".to_string()),
        artists: vec!["Rick Astley".to_string(), "Someone".to_string()],
        ..TagMetadata::default()
    });
    let config = PipelineConfig::default()
        .with_temp_dir_naming(yayd_core::pipeline::TempDirNaming::Title)
        .with_encoding(Mp3Encoding::cbr(320));
    let job = harness.job(request, config);

    run_to_end(&job).await;

    assert_eq!(job.status(), WorkerStatus::Successful);
    assert_eq!(job.output_path(), Some(target.clone()));
    let download = &harness.launcher.commands_containing("-f bestaudio -o")[0];
    assert!(download
        .args
        .last()
        .unwrap()
        .contains("temp_Never Gonna Give You Up"));

    let transcode = &harness.launcher.commands_containing("-id3v2_version")[0];
    assert!(transcode.args.contains(&"title=Custom Title".to_string()));
    assert!(transcode.args.contains(&"artist=Rick Astley/Someone".to_string()));
    assert!(transcode.args.contains(&"320k".to_string()));
}

#[tokio::test]
async fn test_downloader_thumbnail_source() {
    let harness = TestHarness::new();
    harness.launcher.on_args_containing(
        "--write-thumbnail",
        ScriptedRun::exit(0).stdout("[info] Writing video thumbnail 0 to: /tmp/cover.webp"),
    );
    fixtures::script_download(&harness.launcher, "Never Gonna Give You Up.webm");
    let config = PipelineConfig::default().with_thumbnail_source(ThumbnailSource::Downloader);
    let job = harness.job(harness.placeholder_request(), config);

    run_to_end(&job).await;

    assert_eq!(job.status(), WorkerStatus::Successful);
    assert!(harness.fetcher.recorded_fetches().is_empty());
    let transcode = &harness.launcher.commands_containing("-id3v2_version")[0];
    assert!(transcode.args.contains(&"/tmp/cover.webp".to_string()));
}

#[tokio::test]
async fn test_thumbnail_failure_fails_job() {
    let harness = TestHarness::new();
    fixtures::script_download(&harness.launcher, "Never Gonna Give You Up.webm");
    harness
        .fetcher
        .set_next_error(yayd_core::tools::FetchError::Status {
            status: 500,
            url: "https://img.example.com/dQw4w9WgXcQ.jpg".to_string(),
        });
    let job = harness.job(harness.placeholder_request(), PipelineConfig::default());

    let events = run_to_end(&job).await;

    assert_eq!(job.failure(), Some(FailureKind::ThumbnailFailed));
    assert!(harness.launcher.commands_containing("-id3v2_version").is_empty());
    assert!(!progress(&events).contains(&75.0));
    // Left behind for inspection.
    assert!(harness.dir().join("yayd_temp_dQw4w9WgXcQ").exists());
}

#[tokio::test]
async fn test_second_job_for_same_item_is_refused() {
    let harness = TestHarness::new();
    fixtures::script_download(&harness.launcher, "Never Gonna Give You Up.webm");
    harness.launcher.on_args_containing(
        "-id3v2_version",
        ScriptedRun::exit(0).delayed(std::time::Duration::from_millis(300)),
    );

    let first = harness.job(harness.placeholder_request(), PipelineConfig::default());
    let second = harness.job(harness.placeholder_request(), PipelineConfig::default());

    let mut first_events = first.subscribe();
    first.ready();
    first.start();
    // Wait until the first job owns its temp folder.
    while let Some(event) = first_events.recv().await {
        if matches!(event, WorkerEvent::Progress(ref r) if r.percent > 25.0) {
            break;
        }
    }

    run_to_end(&second).await;
    assert_eq!(second.failure(), Some(FailureKind::DuplicateJob));

    while first_events.recv().await.is_some() {}
    assert_eq!(first.status(), WorkerStatus::Successful);
}
