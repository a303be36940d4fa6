//! The downstream sink that dispatched requests are handed to.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use seedflow_core::async_trait;
use seedflow_core::error::{Error, Result};
use seedflow_core::request::Request;

/// Trait for the component that processes dispatched requests
///
/// A download returns the follow-up requests discovered while processing the
/// response. The engine enqueues them into the scheduler.
#[async_trait]
pub trait Downloader: Send + Sync + 'static {
    /// Process a request and return its follow-up requests
    async fn download(&self, request: Request) -> Result<Vec<Request>>;
}

/// A downloader that accepts every request and produces nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopDownloader;

#[async_trait]
impl Downloader for NoopDownloader {
    async fn download(&self, _request: Request) -> Result<Vec<Request>> {
        Ok(Vec::new())
    }
}

/// A downloader that records the URLs it processes, in completion order
#[derive(Debug, Default)]
pub struct RecordingDownloader {
    /// Simulated per-request latency
    latency: Option<Duration>,

    /// Follow-up requests keyed by the URL whose response yields them
    follow_ups: HashMap<String, Vec<Request>>,

    /// URLs that fail instead of completing
    failures: Vec<String>,

    /// Processed URLs
    processed: Mutex<Vec<String>>,
}

impl RecordingDownloader {
    /// Create a new recording downloader
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait this long before completing each request
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Yield `request` as a follow-up once `url` has been downloaded
    pub fn with_follow_up(mut self, url: impl Into<String>, request: Request) -> Self {
        self.follow_ups.entry(url.into()).or_default().push(request);
        self
    }

    /// Fail the download of `url`
    pub fn with_failure(mut self, url: impl Into<String>) -> Self {
        self.failures.push(url.into());
        self
    }

    /// URLs processed so far
    pub fn processed(&self) -> Vec<String> {
        match self.processed.lock() {
            Ok(processed) => processed.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Wrap in an `Arc`, for handing to the engine while keeping access
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}

#[async_trait]
impl Downloader for RecordingDownloader {
    async fn download(&self, request: Request) -> Result<Vec<Request>> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let url = request.url.to_string();
        if self.failures.contains(&url) {
            return Err(Error::download("simulated failure")
                .with_url(url)
                .with_component("recording_downloader"));
        }

        match self.processed.lock() {
            Ok(mut processed) => processed.push(url.clone()),
            Err(poisoned) => poisoned.into_inner().push(url.clone()),
        }

        Ok(self.follow_ups.get(&url).cloned().unwrap_or_default())
    }
}
