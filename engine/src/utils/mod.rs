// Utility functions for the engine

use std::sync::Arc;

use seedflow_scheduler::{MemoryScheduler, PriorityScheduler, Scheduler, SchedulerConfig, SchedulerType};

use crate::config::EngineConfig;

/// Create a scheduler based on the engine configuration
pub fn create_scheduler(config: &EngineConfig) -> Arc<dyn Scheduler> {
    let scheduler_config = SchedulerConfig {
        filter_duplicates: config.filter_duplicates,
    };
    match config.scheduler_type {
        SchedulerType::Memory => Arc::new(MemoryScheduler::with_config(scheduler_config)),
        SchedulerType::Priority => Arc::new(PriorityScheduler::with_config(scheduler_config)),
    }
}

/// Format a duration in human-readable form
pub fn format_duration(duration: std::time::Duration) -> String {
    let total_seconds = duration.as_secs();
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    let millis = duration.subsec_millis();

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}.{:03}s", seconds, millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seedflow_core::request::Request;
    use std::time::Duration;

    #[tokio::test]
    async fn test_create_scheduler_follows_config() {
        let config = EngineConfig {
            scheduler_type: SchedulerType::Priority,
            ..EngineConfig::default()
        };
        let scheduler = create_scheduler(&config);

        let low = Request::new("https://example.com/low").unwrap();
        let high = Request::new("https://example.com/high").unwrap().with_priority(3);
        scheduler.enqueue_request(low).await.unwrap();
        scheduler.enqueue_request(high).await.unwrap();

        let first = scheduler.next_request().await.unwrap().unwrap();
        assert_eq!(first.url.path(), "/high");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.500s");
        assert_eq!(format_duration(Duration::from_secs(125)), "2m 5s");
        assert_eq!(format_duration(Duration::from_secs(3725)), "1h 2m 5s");
    }
}
