// Configuration types for the engine

use std::time::Duration;

use seedflow_core::seed::SeedingPolicy;
use seedflow_scheduler::SchedulerType;
use serde::{Deserialize, Serialize};

/// How often the coordinator re-checks both work sources while it waits.
///
/// Recovers crawls whose scheduler reports pending work it cannot yet hand out.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);

/// Configuration for the crawler engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Policy for interleaving seeds with scheduled requests
    pub seeding_policy: SeedingPolicy,

    /// Interval of the coordinator heartbeat
    pub heartbeat_interval: Duration,

    /// Maximum number of dispatched requests in flight
    pub concurrent_requests: usize,

    /// Type of scheduler to use
    pub scheduler_type: SchedulerType,

    /// Whether the scheduler drops duplicate requests
    pub filter_duplicates: bool,

    /// Whether to log stats
    pub log_stats: bool,

    /// Interval for logging stats in seconds
    pub stats_interval_secs: u64,

    /// Time allowed for each close step
    pub close_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            seeding_policy: SeedingPolicy::default(),
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            concurrent_requests: 16,
            scheduler_type: SchedulerType::Memory,
            filter_duplicates: true,
            log_stats: true,
            stats_interval_secs: 60,
            close_timeout: Duration::from_secs(5),
        }
    }
}
