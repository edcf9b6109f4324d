//! Scheduler admission integration tests.
//!
//! These tests run the spawned scheduler loop against manual workers and
//! real pipeline jobs:
//! - Concurrency ceiling respected while jobs run
//! - Queued jobs admitted as running ones finish
//! - Status snapshots published through the handle

use std::sync::Arc;
use std::time::Duration;

use yayd_core::{
    pipeline::{Destination, JobRequest, PipelineConfig},
    testing::{fixtures, ManualWorker, MockFetcher, MockLauncher},
    JobFacade, PipelineJob, Scheduler, SchedulerConfig, SchedulerStatus, Toolbox, ToolsConfig,
    Worker, WorkerStatus,
};

fn fast_scheduler(max: usize) -> Scheduler {
    Scheduler::new(SchedulerConfig::new(max, 10))
}

#[tokio::test]
async fn test_ceiling_holds_until_jobs_finish() {
    let (mut handle, task) = fast_scheduler(2).spawn();
    let jobs: Vec<Arc<ManualWorker>> = (0..4).map(|_| Arc::new(ManualWorker::new())).collect();
    for job in &jobs {
        handle.submit(job.clone()).unwrap();
    }

    jobs[0].wait_until_started().await;
    jobs[1].wait_until_started().await;

    // Several ticks later the ceiling still holds.
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(jobs[2].status(), WorkerStatus::Pending);
    assert_eq!(jobs[3].status(), WorkerStatus::Pending);
    assert_eq!(
        handle.status(),
        SchedulerStatus {
            queued: 2,
            running: 2,
            max_running: 2
        }
    );

    jobs[1].complete(WorkerStatus::Successful);
    jobs[2].wait_until_started().await;
    assert_eq!(jobs[3].status(), WorkerStatus::Pending);

    jobs[0].complete(WorkerStatus::Error);
    jobs[2].complete(WorkerStatus::Successful);
    jobs[3].wait_until_started().await;
    jobs[3].complete(WorkerStatus::Successful);

    let status = loop {
        let status = handle.changed().await.unwrap();
        if status.running == 0 && status.queued == 0 {
            break status;
        }
    };
    assert_eq!(status.max_running, 2);
    for job in &jobs {
        assert_eq!(job.start_calls(), 1);
    }

    handle.shutdown();
    task.await.unwrap();
}

#[tokio::test]
async fn test_pipeline_jobs_through_scheduler() {
    let output = tempfile::tempdir().unwrap();
    let launcher = Arc::new(MockLauncher::new());
    fixtures::script_probe(&launcher, "abc123", "A Song");
    fixtures::script_download(&launcher, "A Song.webm");
    let toolbox = Toolbox::new(launcher.clone(), Arc::new(MockFetcher::new()), ToolsConfig::default());

    let (handle, task) = fast_scheduler(1).spawn();
    let facade = Arc::new(JobFacade::new(PipelineJob::new(
        JobRequest::new("https://example.com/watch?v=abc123", Destination::placeholder(output.path())),
        PipelineConfig::default(),
        toolbox,
    )));
    let mut events = facade.subscribe();
    handle.submit(facade.clone()).unwrap();

    let mut finished = None;
    while let Some(event) = events.recv().await {
        if let yayd_core::WorkerEvent::Finished(status) = event {
            finished = Some(status);
        }
    }

    assert_eq!(finished, Some(WorkerStatus::Successful));
    assert_eq!(
        facade.snapshot(false).output,
        Some(output.path().join("A Song.mp3"))
    );
    assert_eq!(launcher.commands_containing("-id3v2_version").len(), 1);

    handle.shutdown();
    task.await.unwrap();
}
