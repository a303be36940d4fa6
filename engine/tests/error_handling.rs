mod common;

use std::sync::{Arc, Mutex};

use common::{init_logging, seed, OrderRecorder, ScriptedSpider};
use log::Level;
use seedflow_core::async_trait;
use seedflow_core::diagnostics::MemoryDiagnostics;
use seedflow_core::error::{Error, Result};
use seedflow_core::request::Request;
use seedflow_core::signal::{Signal, SignalArgs};
use seedflow_engine::{Engine, EngineConfig, FinishReason, RecordingDownloader};
use seedflow_scheduler::Scheduler;

fn quiet_config() -> EngineConfig {
    EngineConfig {
        log_stats: false,
        ..EngineConfig::default()
    }
}

/// A scheduler whose queue is unreadable
struct CorruptScheduler;

#[async_trait]
impl Scheduler for CorruptScheduler {
    async fn enqueue_request(&self, _request: Request) -> Result<bool> {
        Ok(true)
    }

    async fn next_request(&self) -> Result<Option<Request>> {
        Err(Error::scheduler("queue file is corrupt"))
    }

    async fn has_pending_requests(&self) -> bool {
        true
    }

    async fn len(&self) -> usize {
        1
    }

    async fn clear(&self) -> Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn test_download_failures_do_not_stop_the_crawl() {
    init_logging();

    let spider = Arc::new(ScriptedSpider::from_items(vec![
        seed("a"),
        seed("b"),
        seed("c"),
    ]));
    let downloader = RecordingDownloader::new()
        .with_failure("https://example.com/b")
        .shared();
    let diagnostics = Arc::new(MemoryDiagnostics::new());

    let mut engine = Engine::new(spider, downloader.clone())
        .with_config(quiet_config())
        .with_diagnostics(diagnostics.clone());
    let recorder = OrderRecorder::attach(&engine).await;

    let reported = Arc::new(Mutex::new(Vec::new()));
    let reported_clone = reported.clone();
    engine
        .signals()
        .connect(Signal::ErrorOccurred, move |args| {
            if let SignalArgs::Error(message) = args {
                reported_clone.lock().unwrap().push(message);
            }
            Ok(())
        })
        .await
        .unwrap();

    let stats = engine.run().await.unwrap();

    assert_eq!(recorder.order(), vec!["a", "b", "c"]);
    assert_eq!(
        downloader.processed(),
        vec!["https://example.com/a", "https://example.com/c"]
    );
    assert_eq!(stats.request_count, 3);
    assert_eq!(stats.response_count, 2);
    assert_eq!(stats.error_count, 1);
    assert!(stats.finished_with(FinishReason::Finished));

    let errors = diagnostics.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].component, "downloader");
    assert!(errors[0].message.contains("simulated failure"));
    assert_eq!(reported.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_scheduler_failure_fails_the_crawl() {
    init_logging();

    let spider = Arc::new(ScriptedSpider::from_items(vec![seed("a")]));
    let config = EngineConfig {
        seeding_policy: seedflow_core::seed::SeedingPolicy::Lazy,
        ..quiet_config()
    };
    let mut engine = Engine::with_components(
        spider,
        Arc::new(CorruptScheduler),
        Arc::new(RecordingDownloader::new()),
        config,
    );

    let stopped = Arc::new(Mutex::new(None));
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

    let err = engine.run().await.unwrap_err();
    assert!(matches!(err, Error::Scheduler { .. }));
    assert!(err.is_fatal());

    let stats = engine.stats().await;
    assert!(stats.finished_with(FinishReason::Failed));
    assert_eq!(stats.request_count, 0);
    assert!(!engine.is_running().await);
    assert_eq!(stopped.lock().unwrap().as_deref(), Some("failed"));
}

#[tokio::test]
async fn test_invalid_directive_reported_once() {
    init_logging();

    let spider = Arc::new(ScriptedSpider::from_items(vec![
        seed("a"),
        seedflow_core::seed::SeedItem::policy_name("eager"),
        seed("b"),
    ]));
    let diagnostics = Arc::new(MemoryDiagnostics::new());
    let mut engine = Engine::new(spider, Arc::new(RecordingDownloader::new()))
        .with_config(quiet_config())
        .with_diagnostics(diagnostics.clone());

    let stats = engine.run().await.unwrap();

    assert_eq!(stats.request_count, 2);
    assert_eq!(stats.invalid_policy_count, 1);
    assert_eq!(stats.policy_override_count, 0);
    assert_eq!(diagnostics.at_least(Level::Error).len(), 1);
    assert!(diagnostics.errors()[0].message.contains("eager"));
}
