pub mod diagnostics;
pub mod error;
pub mod request;
pub mod seed;
pub mod signal;
pub mod spider;

pub use diagnostics::{Diagnostic, Diagnostics, LogDiagnostics, MemoryDiagnostics};
pub use error::{Error, ErrorContext, Result};
pub use request::Request;
pub use seed::{seeds_from_iter, seeds_from_urls, SeedItem, SeedStream, SeedingPolicy};
pub use signal::{Signal, SignalArgs, SignalManager};
pub use spider::{BasicSpider, Spider, SEEDING_POLICY_SETTING};

/// Re-export commonly used crates
pub use async_trait::async_trait;
pub use futures;
pub use serde;
pub use serde_json;
pub use url;
