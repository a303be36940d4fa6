use std::cmp::Reverse;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};

use log::debug;
use priority_queue::PriorityQueue;
use seedflow_core::async_trait;
use seedflow_core::error::Result;
use seedflow_core::request::Request;
use tokio::sync::Mutex;

use crate::dupefilter::DupeFilter;
use crate::scheduler_trait::Scheduler;
use crate::types::SchedulerConfig;

/// Queue entry keyed by insertion sequence, so equal URLs let through with
/// `dont_filter` stay distinct entries
struct Sequenced {
    seq: u64,
    request: Request,
}

impl PartialEq for Sequenced {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq
    }
}

impl Eq for Sequenced {}

impl Hash for Sequenced {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.seq.hash(state);
    }
}

/// A memory-based scheduler that pops the highest priority first
///
/// Requests of equal priority come out in insertion order.
pub struct PriorityScheduler {
    /// Queue of pending requests
    queue: Mutex<PriorityQueue<Sequenced, (i32, Reverse<u64>)>>,

    /// Next insertion sequence number
    sequence: AtomicU64,

    /// Fingerprints of requests already accepted
    dupefilter: DupeFilter,
}

impl PriorityScheduler {
    /// Create a new priority scheduler
    pub fn new() -> Self {
        Self::with_config(SchedulerConfig::default())
    }

    /// Create a new priority scheduler with the given configuration
    pub fn with_config(config: SchedulerConfig) -> Self {
        Self {
            queue: Mutex::new(PriorityQueue::new()),
            sequence: AtomicU64::new(0),
            dupefilter: if config.filter_duplicates {
                DupeFilter::new()
            } else {
                DupeFilter::disabled()
            },
        }
    }
}

impl Default for PriorityScheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Scheduler for PriorityScheduler {
    async fn enqueue_request(&self, request: Request) -> Result<bool> {
        if self.dupefilter.request_seen(&request) {
            debug!("Filtered duplicate request: {}", request);
            return Ok(false);
        }

        let mut queue = self.queue.lock().await;
        let seq = self.sequence.fetch_add(1, Ordering::SeqCst);
        let priority = (request.priority, Reverse(seq));
        queue.push(Sequenced { seq, request }, priority);
        Ok(true)
    }

    async fn next_request(&self) -> Result<Option<Request>> {
        let mut queue = self.queue.lock().await;
        Ok(queue.pop().map(|(entry, _)| entry.request))
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
