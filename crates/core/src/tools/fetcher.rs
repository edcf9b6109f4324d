//! Streaming HTTP transfers to a file with byte progress.

use async_trait::async_trait;
use futures::StreamExt;
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tracing::debug;

use super::error::FetchError;

/// Events of one transfer. `Completed` is always the last event.
#[derive(Debug)]
pub enum FetchEvent {
    Progress { received: u64, total: Option<u64> },
    /// Bytes written on success.
    Completed(Result<u64, FetchError>),
}

/// Downloads a URL into a file.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str, destination: &Path) -> mpsc::UnboundedReceiver<FetchEvent>;
}

/// Production fetcher on top of `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .user_agent(concat!("yayd/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str, destination: &Path) -> mpsc::UnboundedReceiver<FetchEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        let client = self.client.clone();
        let url = url.to_string();
        let destination = destination.to_path_buf();

        tokio::spawn(async move {
            let result = transfer(&client, &url, &destination, &tx).await;
            let _ = tx.send(FetchEvent::Completed(result));
        });

        rx
    }
}

async fn transfer(
    client: &reqwest::Client,
    url: &str,
    destination: &Path,
    tx: &mpsc::UnboundedSender<FetchEvent>,
) -> Result<u64, FetchError> {
    debug!("Fetching {} into {}", url, destination.display());
    let response = client.get(url).send().await?;
    if !response.status().is_success() {
        return Err(FetchError::Status {
            status: response.status().as_u16(),
            url: url.to_string(),
        });
    }

    let total = response.content_length();
    let write_err = |e: std::io::Error| FetchError::Write {
        path: destination.to_path_buf(),
        reason: e.to_string(),
    };
    let mut file = tokio::fs::File::create(destination).await.map_err(write_err)?;

    let mut received = 0u64;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await.map_err(write_err)?;
        received += chunk.len() as u64;
        let _ = tx.send(FetchEvent::Progress { received, total });
    }
    file.flush().await.map_err(write_err)?;

    Ok(received)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unreachable_host_completes_with_error() {
        let fetcher = HttpFetcher::new(Duration::from_secs(1)).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let mut rx = fetcher
            .fetch("http://127.0.0.1:1/thumb.jpg", &dir.path().join("thumbnail"))
            .await;

        let mut last = None;
        while let Some(event) = rx.recv().await {
            last = Some(event);
        }
        assert!(matches!(last, Some(FetchEvent::Completed(Err(FetchError::Request(_))))));
    }
}
