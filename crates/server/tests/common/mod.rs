//! Common test utilities for API testing with mocks.
//!
//! This module provides a test fixture that creates an in-process server
//! with a scripted process launcher and fetcher injected, so jobs run end
//! to end without yt-dlp, ffmpeg or the network.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tokio::task::JoinHandle;
use tower::ServiceExt;

use yayd_core::testing::{MockFetcher, MockLauncher};
use yayd_core::{
    Config, PipelineConfig, Scheduler, SchedulerConfig, SchedulerHandle, ServerConfig, Toolbox,
    ToolsConfig,
};

/// Re-export fixtures for test convenience
pub use yayd_core::testing::fixtures;

/// Test fixture for API testing with mock tools.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_job_creation() {
///     let fixture = TestFixture::new().await;
///     fixtures::script_probe(&fixture.launcher, "abc", "A Song");
///
///     let response = fixture.post("/api/v1/jobs", json!({ "url": "https://example.com/abc" })).await;
///
///     assert_eq!(response.status, 201);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock launcher - script downloader and ffmpeg runs
    pub launcher: Arc<MockLauncher>,
    /// Mock fetcher - control thumbnail transfers
    pub fetcher: Arc<MockFetcher>,
    /// Handle to the running scheduler loop
    pub scheduler: SchedulerHandle,
    /// Temporary directory holding job outputs
    pub temp_dir: TempDir,
    scheduler_task: JoinHandle<()>,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestFixture {
    /// Create a new test fixture with default pipeline settings.
    pub async fn new() -> Self {
        Self::with_pipeline(PipelineConfig::default()).await
    }

    /// Create a test fixture with custom pipeline settings.
    ///
    /// The output directory is always replaced by the fixture's temp dir.
    pub async fn with_pipeline(pipeline: PipelineConfig) -> Self {
        Self::build(ServerConfig::default(), pipeline).await
    }

    /// Create a test fixture with custom server settings.
    pub async fn with_server(server: ServerConfig) -> Self {
        Self::build(server, PipelineConfig::default()).await
    }

    async fn build(server: ServerConfig, pipeline: PipelineConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");

        let launcher = Arc::new(MockLauncher::new());
        let fetcher = Arc::new(MockFetcher::new());
        let tools = ToolsConfig::default();
        let toolbox = Toolbox::new(launcher.clone(), fetcher.clone(), tools.clone());

        let config = Config {
            server,
            tools,
            // Fast polling so tests do not wait on admission ticks
            scheduler: SchedulerConfig::new(2, 10),
            pipeline: PipelineConfig {
                output_dir: temp_dir.path().to_path_buf(),
                ..pipeline
            },
        };

        let (scheduler, scheduler_task) = Scheduler::new(config.scheduler.clone()).spawn();

        let state = Arc::new(yayd_server::state::AppState::new(
            config,
            toolbox,
            scheduler.clone(),
        ));
        let router = yayd_server::api::create_router(state);

        Self {
            router,
            launcher,
            fetcher,
            scheduler,
            temp_dir,
            scheduler_task,
        }
    }

    /// Directory job outputs land in.
    pub fn output_dir(&self) -> PathBuf {
        self.temp_dir.path().to_path_buf()
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Send a POST request without a body.
    pub async fn post_empty(&self, path: &str) -> TestResponse {
        self.request("POST", path, None).await
    }

    /// Send a DELETE request with JSON body.
    pub async fn delete_with_body(&self, path: &str, body: Value) -> TestResponse {
        self.request("DELETE", path, Some(body)).await
    }

    /// Send a GET request and return the raw body text.
    pub async fn get_text(&self, path: &str) -> (StatusCode, String) {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();
        (status, String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Poll a job until `done` holds for its snapshot, or panic after ~5s.
    pub async fn wait_for_job(&self, id: &str, done: impl Fn(&Value) -> bool) -> Value {
        for _ in 0..500 {
            let response = self.get(&format!("/api/v1/jobs/{}", id)).await;
            if done(&response.body) {
                return response.body;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("Job {} did not reach the expected state", id);
    }

    /// Send a request to the test server.
    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        let request = request_builder.body(body).unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }
}

impl Drop for TestFixture {
    fn drop(&mut self) {
        self.scheduler.shutdown();
        self.scheduler_task.abort();
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}
