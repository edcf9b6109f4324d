//! Mock network fetcher for testing.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;

use crate::tools::{FetchError, FetchEvent, Fetcher};

/// A recorded fetch for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedFetch {
    pub url: String,
    pub destination: PathBuf,
}

/// Mock implementation of the Fetcher trait.
///
/// Successful fetches write a small body to the destination and report it in
/// two progress steps. `set_next_error` makes the next fetch fail.
#[derive(Debug)]
pub struct MockFetcher {
    fetches: Arc<Mutex<Vec<RecordedFetch>>>,
    body: Arc<Mutex<Vec<u8>>>,
    next_error: Arc<Mutex<Option<FetchError>>>,
}

impl Default for MockFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl MockFetcher {
    pub fn new() -> Self {
        Self {
            fetches: Arc::new(Mutex::new(Vec::new())),
            body: Arc::new(Mutex::new(b"\xff\xd8\xff\xe0fake-jpeg".to_vec())),
            next_error: Arc::new(Mutex::new(None)),
        }
    }

    /// Get all recorded fetches.
    pub fn recorded_fetches(&self) -> Vec<RecordedFetch> {
        lock(&self.fetches).clone()
    }

    /// Set the body written by successful fetches.
    pub fn set_body(&self, body: impl Into<Vec<u8>>) {
        *lock(&self.body) = body.into();
    }

    /// Make the next fetch fail with this error.
    pub fn set_next_error(&self, error: FetchError) {
        *lock(&self.next_error) = Some(error);
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(&self, url: &str, destination: &Path) -> mpsc::UnboundedReceiver<FetchEvent> {
        lock(&self.fetches).push(RecordedFetch {
            url: url.to_string(),
            destination: destination.to_path_buf(),
        });

        let (tx, rx) = mpsc::unbounded_channel();
        let error = lock(&self.next_error).take();
        let body = lock(&self.body).clone();
        let destination = destination.to_path_buf();

        tokio::spawn(async move {
            if let Some(error) = error {
                let _ = tx.send(FetchEvent::Completed(Err(error)));
                return;
            }
            let total = body.len() as u64;
            let _ = tx.send(FetchEvent::Progress {
                received: total / 2,
                total: Some(total),
            });
            let result = tokio::fs::write(&destination, &body)
                .await
                .map(|_| total)
                .map_err(|e| FetchError::Write {
                    path: destination.clone(),
                    reason: e.to_string(),
                });
            if result.is_ok() {
                let _ = tx.send(FetchEvent::Progress {
                    received: total,
                    total: Some(total),
                });
            }
            let _ = tx.send(FetchEvent::Completed(result));
        });

        rx
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
