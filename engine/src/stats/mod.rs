// Engine statistics

use std::fmt;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Why a crawl ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// Seeds and scheduler were both exhausted with nothing in flight
    Finished,
    /// The crawl was cancelled
    Shutdown,
    /// A scheduler or seed source error ended the crawl
    Failed,
}

impl FinishReason {
    /// The value recorded in `EngineStats::finish_reason`
    pub fn as_str(&self) -> &'static str {
        match self {
            FinishReason::Finished => "finished",
            FinishReason::Shutdown => "shutdown",
            FinishReason::Failed => "failed",
        }
    }
}

impl fmt::Display for FinishReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Statistics for the crawler engine
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineStats {
    /// Number of requests dispatched to the downloader
    pub request_count: usize,

    /// Dispatched requests that came from the seed source
    pub seed_request_count: usize,

    /// Dispatched requests that came from the scheduler
    pub scheduler_request_count: usize,

    /// Number of downloads that completed
    pub response_count: usize,

    /// Follow-up requests accepted by the scheduler
    pub follow_up_count: usize,

    /// Number of errors
    pub error_count: usize,

    /// Number of heartbeat fires
    pub heartbeat_count: usize,

    /// Valid policy directives applied
    pub policy_override_count: usize,

    /// Invalid policy directives ignored
    pub invalid_policy_count: usize,

    /// Why the crawl ended
    pub finish_reason: Option<String>,

    /// Start time of the crawl
    #[serde(skip)]
    pub start_time: Option<Instant>,

    /// End time of the crawl
    #[serde(skip)]
    pub end_time: Option<Instant>,
}

impl EngineStats {
    /// Calculate the duration of the crawl
    pub fn duration(&self) -> Option<Duration> {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => Some(end.duration_since(start)),
            (Some(start), None) => Some(Instant::now().duration_since(start)),
            _ => None,
        }
    }

    /// Calculate the requests per second
    pub fn requests_per_second(&self) -> Option<f64> {
        self.duration().map(|duration| {
            let seconds = duration.as_secs_f64();
            if seconds > 0.0 {
                self.request_count as f64 / seconds
            } else {
                0.0
            }
        })
    }

    /// Whether the crawl ended with the given reason
    pub fn finished_with(&self, reason: FinishReason) -> bool {
        self.finish_reason.as_deref() == Some(reason.as_str())
    }
}
