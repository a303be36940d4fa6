use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, error, info, warn};
use seedflow_core::diagnostics::{Diagnostics, LogDiagnostics};
use seedflow_core::error::{Error, Result};
use seedflow_core::seed::SeedingPolicy;
use seedflow_core::signal::{Signal, SignalArgs, SignalManager};
use seedflow_core::spider::{Spider, SEEDING_POLICY_SETTING};
use seedflow_scheduler::Scheduler;
use tokio::sync::RwLock;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

pub mod config;
pub mod coordinator;
pub mod downloader;
pub mod seed_source;
pub mod stats;
pub mod utils;

// Re-export key types
pub use config::{EngineConfig, DEFAULT_HEARTBEAT_INTERVAL};
pub use coordinator::{CoordinatorState, SeedingCoordinator};
pub use downloader::{Downloader, NoopDownloader, RecordingDownloader};
pub use seed_source::{SeedPoll, SeedSource};
pub use stats::{EngineStats, FinishReason};

use crate::utils::{create_scheduler, format_duration};

/// The crawl engine
///
/// Owns the collaborators of one crawl and runs a [`SeedingCoordinator`]
/// over them.
pub struct Engine {
    /// The spider providing seeds
    spider: Arc<dyn Spider>,

    /// The scheduler holding queued requests
    scheduler: Arc<dyn Scheduler>,

    /// Whether the scheduler was built from the configuration
    owns_scheduler: bool,

    /// The sink dispatched requests are handed to
    downloader: Arc<dyn Downloader>,

    /// The signal manager
    signals: Arc<SignalManager>,

    /// Sink for recoverable problems
    diagnostics: Arc<dyn Diagnostics>,

    /// The engine configuration
    config: EngineConfig,

    /// The engine statistics
    stats: Arc<RwLock<EngineStats>>,

    /// Whether the engine is running
    running: Arc<RwLock<bool>>,

    /// Cancelled to stop the crawl
    shutdown: CancellationToken,
}

impl Engine {
    /// Create a new engine with the given spider, downloader and default configuration
    pub fn new(spider: Arc<dyn Spider>, downloader: Arc<dyn Downloader>) -> Self {
        let config = EngineConfig::default();
        let scheduler = create_scheduler(&config);
        let mut engine = Self::with_components(spider, scheduler, downloader, config);
        engine.owns_scheduler = true;
        engine
    }

    /// Create a new engine with custom components
    pub fn with_components(
        spider: Arc<dyn Spider>,
        scheduler: Arc<dyn Scheduler>,
        downloader: Arc<dyn Downloader>,
        config: EngineConfig,
    ) -> Self {
        Self {
            spider,
            scheduler,
            owns_scheduler: false,
            downloader,
            signals: Arc::new(SignalManager::new()),
            diagnostics: Arc::new(LogDiagnostics),
            config,
            stats: Arc::new(RwLock::new(EngineStats::default())),
            running: Arc::new(RwLock::new(false)),
            shutdown: CancellationToken::new(),
        }
    }

    /// Set the engine configuration
    ///
    /// An engine created with [`Engine::new`] rebuilds its scheduler to match.
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        if self.owns_scheduler {
            self.scheduler = create_scheduler(&config);
        }
        self.config = config;
        self
    }

    /// Set the diagnostics sink
    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn Diagnostics>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Get the signal manager
    pub fn signals(&self) -> Arc<SignalManager> {
        self.signals.clone()
    }

    /// Get the scheduler
    pub fn scheduler(&self) -> Arc<dyn Scheduler> {
        self.scheduler.clone()
    }

    /// Get the engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// A token that stops the crawl when cancelled
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Stop the crawl: no further seeds or scheduled requests are pulled
    pub fn stop(&self) {
        info!("Engine stop requested");
        self.shutdown.cancel();
    }

    /// The seeding policy a crawl of the current spider starts with.
    ///
    /// The spider's own `SEEDING_POLICY` setting wins over the configuration.
    pub fn resolve_seeding_policy(&self) -> Result<SeedingPolicy> {
        match self.spider.settings().get(SEEDING_POLICY_SETTING) {
            None => Ok(self.config.seeding_policy),
            Some(serde_json::Value::String(name)) => name.parse::<SeedingPolicy>().map_err(|e| {
                Error::Config(format!(
                    "spider {} setting {}: {}",
                    self.spider.name(),
                    SEEDING_POLICY_SETTING,
                    e
                ))
            }),
            Some(other) => Err(Error::Config(format!(
                "spider {} setting {} must be a string, got {}",
                self.spider.name(),
                SEEDING_POLICY_SETTING,
                other
            ))),
        }
    }

    /// Run the crawl until seeds and scheduler are exhausted or it is stopped
    ///
    /// A scheduler or seed source failure ends the crawl with finish reason
    /// `failed` and is returned as the error, after the engine has closed.
    pub async fn run(&mut self) -> Result<EngineStats> {
        // Check if the engine is already running
        {
            let mut running = self.running.write().await;
            if *running {
                return Err(Error::other("Engine is already running"));
            }
            *running = true;
        }

        let policy = match self.resolve_seeding_policy() {
            Ok(policy) => policy,
            Err(e) => {
                *self.running.write().await = false;
                return Err(e);
            }
        };

        // Initialize stats
        {
            let mut stats = self.stats.write().await;
            *stats = EngineStats::default();
            stats.start_time = Some(Instant::now());
        }

        if let Err(e) = self.scheduler.open().await {
            *self.running.write().await = false;
            return Err(e.with_component("scheduler"));
        }

        // Send engine started signal
        self.signals
            .send_catch_log(Signal::EngineStarted, SignalArgs::None)
            .await;

        info!(
            "Opening spider: {} (seeding policy {})",
            self.spider.name(),
            policy
        );
        self.signals
            .send_catch_log(
                Signal::SpiderOpened,
                SignalArgs::Spider(self.spider.clone()),
            )
            .await;

        // Start the stats logger task
        let stats_stop = self.shutdown.child_token();
        let stats_task = if self.config.log_stats {
            let stats = self.stats.clone();
            let interval = Duration::from_secs(self.config.stats_interval_secs.max(1));
            let stop = stats_stop.clone();

            Some(tokio::spawn(async move {
                loop {
                    tokio::select! {
                        _ = stop.cancelled() => break,
                        _ = sleep(interval) => {}
                    }
                    let stats = stats.read().await;
                    if let Some(duration) = stats.duration() {
                        info!(
                            "Stats: {} requests ({} seeds, {} scheduled), {} responses, {} errors, {:.2} req/s, {} elapsed",
                            stats.request_count,
                            stats.seed_request_count,
                            stats.scheduler_request_count,
                            stats.response_count,
                            stats.error_count,
                            stats.requests_per_second().unwrap_or(0.0),
                            format_duration(duration),
                        );
                    }
                }
            }))
        } else {
            None
        };

        let seeds = SeedSource::from_stream(self.spider.yield_seeds());
        let mut coordinator = SeedingCoordinator::new(
            self.scheduler.clone(),
            self.downloader.clone(),
            seeds,
            policy,
        )
        .with_config(&self.config)
        .with_signals(self.signals.clone())
        .with_diagnostics(self.diagnostics.clone())
        .with_stats(self.stats.clone())
        .with_shutdown(self.shutdown.clone());

        let (reason, failure) = match coordinator.run().await {
            Ok(reason) => (reason, None),
            Err(e) => {
                let e = e.with_spider_name(self.spider.name());
                error!("Crawl failed: {}", e);
                self.signals
                    .send_catch_log(Signal::ErrorOccurred, SignalArgs::Error(e.to_string()))
                    .await;
                (FinishReason::Failed, Some(e))
            }
        };

        {
            let mut stats = self.stats.write().await;
            stats.finish_reason = Some(reason.to_string());
        }

        stats_stop.cancel();
        if let Some(task) = stats_task {
            if let Err(e) = task.await {
                warn!("Stats logger task ended abnormally: {}", e);
            }
        }

        self.close().await?;

        if let Some(e) = failure {
            return Err(e);
        }

        // Return the final stats
        let final_stats = self.stats.read().await.clone();
        Ok(final_stats)
    }

    /// Get the current engine statistics
    pub async fn stats(&self) -> EngineStats {
        self.stats.read().await.clone()
    }

    /// Check if the engine is running
    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }

    /// Close the engine and clean up resources
    ///
    /// Closes the scheduler and the spider, each bounded by the configured
    /// close timeout, and sends the closing signals. Safe to call even if
    /// the crawl never ran.
    pub async fn close(&self) -> Result<()> {
        info!("Initiating controlled engine shutdown");

        // Set engine to not running state
        {
            let mut running = self.running.write().await;
            *running = false;
        }

        let reason = {
            let mut stats = self.stats.write().await;
            stats.end_time = Some(Instant::now());
            stats
                .finish_reason
                .get_or_insert_with(|| FinishReason::Shutdown.to_string())
                .clone()
        };

        let timeout_duration = self.config.close_timeout;

        match tokio::time::timeout(timeout_duration, self.scheduler.close(&reason)).await {
            Ok(Ok(())) => debug!("Scheduler closed successfully"),
            Ok(Err(e)) => warn!("Error closing scheduler: {}", e),
            Err(_) => warn!("Timeout while closing scheduler"),
        }

        info!("Closing spider: {}", self.spider.name());
        match tokio::time::timeout(timeout_duration, self.spider.closed()).await {
            Ok(Ok(())) => debug!("Spider closed successfully"),
            Ok(Err(e)) => warn!("Error calling spider.closed(): {}", e),
            Err(_) => warn!("Timeout while closing spider"),
        }

        self.signals
            .send_catch_log(
                Signal::SpiderClosed,
                SignalArgs::Spider(self.spider.clone()),
            )
            .await;

        // Log final stats
        if self.config.log_stats {
            let stats = self.stats.read().await.clone();
            if let Some(duration) = stats.duration() {
                info!(
                    "Final stats: {} requests, {} responses, {} follow-ups, {} errors, {} heartbeats, {:.2} req/s, {} elapsed, finish reason {}",
                    stats.request_count,
                    stats.response_count,
                    stats.follow_up_count,
                    stats.error_count,
                    stats.heartbeat_count,
                    stats.requests_per_second().unwrap_or(0.0),
                    format_duration(duration),
                    reason,
                );
            }
        }

        self.signals
            .send_catch_log(Signal::EngineStopped, SignalArgs::Finished(reason))
            .await;

        info!("Engine shutdown completed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seedflow_core::request::Request;
    use seedflow_core::spider::BasicSpider;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct ClosingSpider {
        closed_flag: Arc<AtomicBool>,
        hang_on_close: bool,
    }

    #[seedflow_core::async_trait]
    impl Spider for ClosingSpider {
        fn name(&self) -> &str {
            "closing"
        }

        fn start_urls(&self) -> Vec<String> {
            vec!["https://example.com/".to_string()]
        }

        async fn closed(&self) -> Result<()> {
            if self.hang_on_close {
                // Simulate a close operation that hangs
                sleep(Duration::from_secs(10)).await;
            }
            self.closed_flag.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    fn quiet_config() -> EngineConfig {
        EngineConfig {
            log_stats: false,
            ..EngineConfig::default()
        }
    }

    #[tokio::test]
    async fn test_engine_run() {
        let spider = Arc::new(
            BasicSpider::new(
                "basic",
                vec![
                    "https://example.com/1".to_string(),
                    "https://example.com/2".to_string(),
                ],
            )
            .unwrap(),
        );
        let downloader = RecordingDownloader::new()
            .with_follow_up("https://example.com/1", Request::new("https://example.com/3").unwrap())
            .shared();

        let mut engine = Engine::new(spider, downloader.clone()).with_config(quiet_config());
        let stats = engine.run().await.unwrap();

        assert_eq!(stats.request_count, 3);
        assert_eq!(stats.response_count, 3);
        assert_eq!(stats.follow_up_count, 1);
        assert_eq!(stats.error_count, 0);
        assert!(stats.finished_with(FinishReason::Finished));
        assert!(stats.end_time.is_some());
        assert!(!engine.is_running().await);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_engine_run_in_spawned_task() {
        let spider = Arc::new(
            BasicSpider::new("spawned", vec!["https://example.com/1".to_string()]).unwrap(),
        );
        let downloader = RecordingDownloader::new().shared();
        let mut engine = Engine::new(spider, downloader.clone()).with_config(quiet_config());

        let crawl = tokio::spawn(async move {
            let stats = engine.run().await;
            (engine, stats)
        });
        let (engine, stats) = crawl.await.unwrap();

        assert_eq!(stats.unwrap().request_count, 1);
        assert_eq!(downloader.processed(), vec!["https://example.com/1"]);
        assert!(!engine.is_running().await);
    }

    #[tokio::test]
    async fn test_engine_close() {
        let closed_flag = Arc::new(AtomicBool::new(false));
        let spider = Arc::new(ClosingSpider {
            closed_flag: closed_flag.clone(),
            hang_on_close: false,
        });

        let engine = Engine::new(spider, Arc::new(NoopDownloader));
        engine.close().await.unwrap();

        assert!(closed_flag.load(Ordering::SeqCst));
        assert!(!engine.is_running().await);
        assert_eq!(engine.stats().await.finish_reason.as_deref(), Some("shutdown"));
    }

    #[tokio::test]
    async fn test_engine_close_with_timeout() {
        let closed_flag = Arc::new(AtomicBool::new(false));
        let spider = Arc::new(ClosingSpider {
            closed_flag: closed_flag.clone(),
            hang_on_close: true,
        });

        let engine = Engine::new(spider, Arc::new(NoopDownloader)).with_config(EngineConfig {
            close_timeout: Duration::from_millis(100),
            ..quiet_config()
        });

        let started = Instant::now();
        engine.close().await.unwrap();

        // close returns at the timeout instead of waiting for the spider
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(!closed_flag.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_spider_setting_overrides_config() {
        let spider = Arc::new(
            BasicSpider::new("pinned", vec![])
                .unwrap()
                .with_seeding_policy(SeedingPolicy::Idle),
        );
        let engine = Engine::new(spider, Arc::new(NoopDownloader)).with_config(EngineConfig {
            seeding_policy: SeedingPolicy::Lazy,
            ..quiet_config()
        });

        assert_eq!(engine.resolve_seeding_policy().unwrap(), SeedingPolicy::Idle);
    }

    #[tokio::test]
    async fn test_invalid_spider_setting_fails_before_dispatch() {
        let spider = Arc::new(
            BasicSpider::new("typo", vec!["https://example.com/".to_string()])
                .unwrap()
                .with_setting(SEEDING_POLICY_SETTING, "front-load"),
        );
        let downloader = RecordingDownloader::new().shared();
        let mut engine = Engine::new(spider, downloader.clone()).with_config(quiet_config());

        let err = engine.run().await.unwrap_err();

        assert!(matches!(err, Error::Config(_)));
        assert!(downloader.processed().is_empty());
        assert!(!engine.is_running().await);
    }

    #[tokio::test]
    async fn test_stop_before_run_finishes_with_shutdown() {
        let spider = Arc::new(
            BasicSpider::new("stopped", vec!["https://example.com/".to_string()]).unwrap(),
        );
        let downloader = RecordingDownloader::new().shared();
        let mut engine = Engine::new(spider, downloader.clone()).with_config(quiet_config());

        engine.stop();
        let stats = engine.run().await.unwrap();

        assert!(stats.finished_with(FinishReason::Shutdown));
        assert_eq!(stats.request_count, 0);
    }

    #[tokio::test]
    async fn test_signals_emitted_once_per_dispatch() {
        let spider = Arc::new(
            BasicSpider::new(
                "signals",
                vec![
                    "https://example.com/a".to_string(),
                    "https://example.com/b".to_string(),
                ],
            )
            .unwrap(),
        );
        let mut engine = Engine::new(spider, Arc::new(NoopDownloader)).with_config(quiet_config());

        let reached = Arc::new(std::sync::Mutex::new(Vec::new()));
        let reached_clone = reached.clone();
        engine
            .signals()
            .connect(Signal::RequestReachedDownloader, move |args| {
                if let SignalArgs::Request(request) = args {
                    reached_clone.lock().unwrap().push(request.url.to_string());
                }
                Ok(())
            })
            .await
            .unwrap();

        let stopped = Arc::new(std::sync::Mutex::new(None));
        let stopped_clone = stopped.clone();
        engine
            .signals()
            .connect(Signal::EngineStopped, move |args| {
                if let SignalArgs::Finished(reason) = args {
                    *stopped_clone.lock().unwrap() = Some(reason);
                }
                Ok(())
            })
            .await
            .unwrap();

        engine.run().await.unwrap();

        assert_eq!(
            *reached.lock().unwrap(),
            vec!["https://example.com/a", "https://example.com/b"]
        );
        assert_eq!(stopped.lock().unwrap().as_deref(), Some("finished"));
    }
}
