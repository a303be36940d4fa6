//! Records the order in which an engine hands requests to its downloader.

use std::sync::{Arc, Mutex};

use seedflow_core::error::Result;
use seedflow_core::signal::{Signal, SignalArgs};
use seedflow_engine::Engine;

/// Dispatch order of one crawl, taken from `request_reached_downloader`
///
/// Downloads may complete in any order; this log follows the coordinator's
/// own dispatch sequence.
#[derive(Debug, Clone, Default)]
pub struct DispatchLog {
    urls: Arc<Mutex<Vec<String>>>,
}

impl DispatchLog {
    /// Start recording dispatches of `engine`
    pub async fn attach(engine: &Engine) -> Result<Self> {
        let log = Self::default();
        let urls = log.urls.clone();
        engine
            .signals()
            .connect(Signal::RequestReachedDownloader, move |args| {
                if let SignalArgs::Request(request) = args {
                    if let Ok(mut urls) = urls.lock() {
                        urls.push(request.url.to_string());
                    }
                }
                Ok(())
            })
            .await?;
        Ok(log)
    }

    /// URLs in dispatch order
    pub fn urls(&self) -> Vec<String> {
        self.urls
            .lock()
            .map(|urls| urls.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.urls.lock().map(|urls| urls.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
