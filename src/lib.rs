//! # seedflow
//!
//! seedflow is the seeding and scheduling core of a crawl engine. It decides,
//! at every step, whether the next request handed to the downloader comes
//! from the spider's seed stream or from the scheduler, under one of four
//! seeding policies:
//!
//! - **greedy**: a seed that is ready now goes first.
//! - **lazy**: the scheduler goes first; seeds fill the gaps.
//! - **front_load**: all seeds are collected, ordered by priority and sent
//!   before anything scheduled.
//! - **idle**: seeds are only pulled when the engine has nothing else to do.
//!
//! A spider can switch policy in the middle of its seed stream by yielding a
//! policy directive.
//!
//! ## Components
//!
//! - **Core**: requests, seed items, the spider trait, signals and diagnostics.
//! - **Scheduler**: FIFO and priority schedulers with duplicate filtering.
//! - **Engine**: the seeding coordinator, crawl lifecycle and statistics.
//! - **Settings**: TOML/JSON configuration for the `seedflow` binary.
//!
//! ## Example
//!
//! ```rust,no_run
//! use seedflow::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     env_logger::init();
//!
//!     let spider = Arc::new(
//!         BasicSpider::new("example", vec!["https://example.com".to_string()])?
//!             .with_seeding_policy(SeedingPolicy::Lazy),
//!     );
//!     let mut engine = Engine::new(spider, Arc::new(NoopDownloader));
//!
//!     let stats = engine.run().await?;
//!     println!("Requests: {}", stats.request_count);
//!     println!("Seeds: {}", stats.seed_request_count);
//!     println!("Errors: {}", stats.error_count);
//!
//!     Ok(())
//! }
//! ```

pub use seedflow_core as core;
pub use seedflow_engine as engine;
pub use seedflow_scheduler as scheduler;

pub mod config_adapters;
pub mod dispatch_log;
pub mod seed_file;
pub mod settings;

/// Prelude module that re-exports commonly used types
pub mod prelude {
    pub use seedflow_core::diagnostics::{Diagnostics, LogDiagnostics, MemoryDiagnostics};
    pub use seedflow_core::error::{Error, Result};
    pub use seedflow_core::request::Request;
    pub use seedflow_core::seed::{SeedItem, SeedStream, SeedingPolicy};
    pub use seedflow_core::signal::{Signal, SignalArgs};
    pub use seedflow_core::spider::{BasicSpider, Spider};
    pub use seedflow_engine::{
        Downloader, Engine, EngineConfig, EngineStats, FinishReason, NoopDownloader,
        RecordingDownloader,
    };
    pub use seedflow_scheduler::{MemoryScheduler, PriorityScheduler, Scheduler, SchedulerType};

    pub use crate::dispatch_log::DispatchLog;
    pub use crate::seed_file::SeedListSpider;
    pub use crate::settings::{Settings, SettingsError, SettingsFormat};
}
