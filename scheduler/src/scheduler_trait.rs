use seedflow_core::async_trait;
use seedflow_core::error::Result;
use seedflow_core::request::Request;

/// Trait for request schedulers
///
/// Enqueueing may happen from anywhere, including while a dispatch is in
/// flight. Dequeueing belongs to the seeding coordinator alone.
#[async_trait]
pub trait Scheduler: Send + Sync + 'static {
    /// Called once before the first request is dispatched
    async fn open(&self) -> Result<()> {
        Ok(())
    }

    /// Called once after the crawl ends, with its finish reason
    async fn close(&self, _reason: &str) -> Result<()> {
        Ok(())
    }

    /// Add a request to the scheduler.
    ///
    /// Returns `false` when the request was dropped as a duplicate.
    async fn enqueue_request(&self, request: Request) -> Result<bool>;

    /// Take the next request, or `None` if nothing is ready right now
    async fn next_request(&self) -> Result<Option<Request>>;

    /// Whether a following `next_request` is expected to yield a request
    async fn has_pending_requests(&self) -> bool;

    /// Get the number of pending requests
    async fn len(&self) -> usize;

    /// Check if the scheduler is empty
    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Clear all pending requests and seen fingerprints
    async fn clear(&self) -> Result<()>;
}
