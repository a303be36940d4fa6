use std::collections::VecDeque;

use log::debug;
use seedflow_core::async_trait;
use seedflow_core::error::Result;
use seedflow_core::request::Request;
use tokio::sync::Mutex;

use crate::dupefilter::DupeFilter;
use crate::scheduler_trait::Scheduler;
use crate::types::SchedulerConfig;

/// A memory-based FIFO scheduler
pub struct MemoryScheduler {
    /// Queue of pending requests
    queue: Mutex<VecDeque<Request>>,

    /// Fingerprints of requests already accepted
    dupefilter: DupeFilter,
}

impl MemoryScheduler {
    /// Create a new memory scheduler
    pub fn new() -> Self {
        Self::with_config(SchedulerConfig::default())
    }

    /// Create a new memory scheduler with the given configuration
    pub fn with_config(config: SchedulerConfig) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            dupefilter: if config.filter_duplicates {
                DupeFilter::new()
            } else {
                DupeFilter::disabled()
            },
        }
    }
}

impl Default for MemoryScheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Scheduler for MemoryScheduler {
    async fn enqueue_request(&self, request: Request) -> Result<bool> {
        if self.dupefilter.request_seen(&request) {
            debug!("Filtered duplicate request: {}", request);
            return Ok(false);
        }

        let mut queue = self.queue.lock().await;
        queue.push_back(request);
        Ok(true)
    }

    async fn next_request(&self) -> Result<Option<Request>> {
        let mut queue = self.queue.lock().await;
        Ok(queue.pop_front())
    }

    async fn has_pending_requests(&self) -> bool {
        !self.queue.lock().await.is_empty()
    }

    async fn len(&self) -> usize {
        self.queue.lock().await.len()
    }

    async fn clear(&self) -> Result<()> {
        self.queue.lock().await.clear();
        self.dupefilter.clear();
        Ok(())
    }
}
