use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::Result;
use crate::request::Request;
use crate::seed::SeedingPolicy;
use crate::spider::Spider;

/// Define signal types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Signal {
    /// Sent when engine starts
    EngineStarted,
    /// Sent when engine stops
    EngineStopped,
    /// Sent when spider opens
    SpiderOpened,
    /// Sent when spider closes
    SpiderClosed,
    /// Sent after a follow-up request is accepted by the scheduler
    RequestScheduled,
    /// Sent once per dispatched request, as it is handed to the downloader
    RequestReachedDownloader,
    /// Sent after the downloader finished a request
    ResponseReceived,
    /// Sent when a seed stream directive changes the active policy
    SeedingPolicyChanged,
    /// Sent when error occurs
    ErrorOccurred,
}

impl Signal {
    /// Snake-case name used in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Signal::EngineStarted => "engine_started",
            Signal::EngineStopped => "engine_stopped",
            Signal::SpiderOpened => "spider_opened",
            Signal::SpiderClosed => "spider_closed",
            Signal::RequestScheduled => "request_scheduled",
            Signal::RequestReachedDownloader => "request_reached_downloader",
            Signal::ResponseReceived => "response_received",
            Signal::SeedingPolicyChanged => "seeding_policy_changed",
            Signal::ErrorOccurred => "error_occurred",
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Signal arguments
#[derive(Clone)]
pub enum SignalArgs {
    /// No arguments
    None,
    /// Spider related
    Spider(Arc<dyn Spider>),
    /// Request related
    Request(Box<Request>),
    /// Policy change, from the previous policy to the new one
    Policy {
        /// Policy that was active before the change
        previous: SeedingPolicy,
        /// Policy active from now on
        current: SeedingPolicy,
    },
    /// Crawl finished with the given reason
    Finished(String),
    /// Error related
    Error(String),
}

impl std::fmt::Debug for SignalArgs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "SignalArgs::None"),
            Self::Spider(spider) => write!(f, "SignalArgs::Spider({})", spider.name()),
            Self::Request(request) => write!(f, "SignalArgs::Request({})", request),
            Self::Policy { previous, current } => {
                write!(f, "SignalArgs::Policy({} -> {})", previous, current)
            }
            Self::Finished(reason) => write!(f, "SignalArgs::Finished({})", reason),
            Self::Error(error) => write!(f, "SignalArgs::Error({:?})", error),
        }
    }
}

type SignalHandler = Box<dyn Fn(SignalArgs) -> Result<()> + Send + Sync + 'static>;

/// Synchronous observer registry keyed by [`Signal`]
///
/// Handlers run inline on the sending task, in connection order, so they
/// must be quick and must not block.
pub struct SignalManager {
    handlers: RwLock<HashMap<Signal, Vec<SignalHandler>>>,
}

impl SignalManager {
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
        }
    }

    /// Connect a handler to a signal
    pub async fn connect<F>(&self, signal: Signal, handler: F) -> Result<()>
    where
        F: Fn(SignalArgs) -> Result<()> + Send + Sync + 'static,
    {
        self.handlers
            .write()
            .await
            .entry(signal)
            .or_default()
            .push(Box::new(handler));
        Ok(())
    }

    /// Send a signal to every connected handler.
    ///
    /// All handlers run even if one fails; the first failure is returned.
    pub async fn send(&self, signal: Signal, args: SignalArgs) -> Result<()> {
        let mut first_error = None;
        for error in self.dispatch(signal, args).await {
            first_error.get_or_insert(error);
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Send a signal, logging handler failures instead of returning them
    pub async fn send_catch_log(&self, signal: Signal, args: SignalArgs) {
        for error in self.dispatch(signal, args).await {
            log::error!("Error in {} handler: {}", signal, error);
        }
    }

    /// Number of handlers connected to a signal
    pub async fn handler_count(&self, signal: Signal) -> usize {
        self.handlers
            .read()
            .await
            .get(&signal)
            .map_or(0, |handlers| handlers.len())
    }

    /// Disconnect all signal handlers
    pub async fn disconnect_all(&self) -> Result<()> {
        self.handlers.write().await.clear();
        Ok(())
    }

    /// Disconnect all handlers for a specific signal
    pub async fn disconnect(&self, signal: Signal) -> Result<()> {
        self.handlers.write().await.remove(&signal);
        Ok(())
    }

    async fn dispatch(&self, signal: Signal, args: SignalArgs) -> Vec<crate::error::Error> {
        let handlers = self.handlers.read().await;
        handlers
            .get(&signal)
            .map(|handlers| {
                handlers
                    .iter()
                    .filter_map(|handler| handler(args.clone()).err())
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl Default for SignalManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[tokio::test]
    async fn test_request_reached_downloader_handler() {
        let signal_manager = SignalManager::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let seen_clone = seen.clone();
        signal_manager
            .connect(Signal::RequestReachedDownloader, move |args| {
                if let SignalArgs::Request(request) = args {
                    seen_clone.lock().unwrap().push(request.url.to_string());
                }
                Ok(())
            })
            .await
            .unwrap();

        let request = Request::new("https://example.com/a").unwrap();
        signal_manager
            .send(
                Signal::RequestReachedDownloader,
                SignalArgs::Request(Box::new(request)),
            )
            .await
            .unwrap();

        assert_eq!(*seen.lock().unwrap(), vec!["https://example.com/a"]);
    }

    #[tokio::test]
    async fn test_send_catch_log_swallows_handler_errors() {
        let signal_manager = SignalManager::new();
        let counter = Arc::new(AtomicUsize::new(0));

        signal_manager
            .connect(Signal::ErrorOccurred, |_| Err(Error::Signal("handler failed".into())))
            .await
            .unwrap();

        assert!(signal_manager
            .send(Signal::ErrorOccurred, SignalArgs::None)
            .await
            .is_err());

        // The failing handler does not propagate through send_catch_log
        let counter_clone = counter.clone();
        signal_manager
            .connect(Signal::EngineStarted, move |_| {
                counter_clone.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await
            .unwrap();
        signal_manager
            .send_catch_log(Signal::ErrorOccurred, SignalArgs::None)
            .await;
        signal_manager
            .send_catch_log(Signal::EngineStarted, SignalArgs::None)
            .await;

        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_disconnect() {
        let signal_manager = SignalManager::new();
        let counter = Arc::new(AtomicUsize::new(0));

        let counter_clone = counter.clone();
        signal_manager
            .connect(Signal::SeedingPolicyChanged, move |_| {
                counter_clone.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await
            .unwrap();

        let args = SignalArgs::Policy {
            previous: SeedingPolicy::Lazy,
            current: SeedingPolicy::FrontLoad,
        };
        signal_manager
            .send(Signal::SeedingPolicyChanged, args.clone())
            .await
            .unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        signal_manager.disconnect(Signal::SeedingPolicyChanged).await.unwrap();
        signal_manager
            .send(Signal::SeedingPolicyChanged, args)
            .await
            .unwrap();

        // Counter should not increase because handler is disconnected
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failing_handler_does_not_starve_others() {
        let signal_manager = SignalManager::new();
        let counter = Arc::new(AtomicUsize::new(0));

        signal_manager
            .connect(Signal::ResponseReceived, |_| Err(Error::Signal("first".into())))
            .await
            .unwrap();
        let counter_clone = counter.clone();
        signal_manager
            .connect(Signal::ResponseReceived, move |_| {
                counter_clone.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await
            .unwrap();
        assert_eq!(signal_manager.handler_count(Signal::ResponseReceived).await, 2);

        let err = signal_manager
            .send(Signal::ResponseReceived, SignalArgs::None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("first"));
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        signal_manager.disconnect_all().await.unwrap();
        assert_eq!(signal_manager.handler_count(Signal::ResponseReceived).await, 0);
    }

    #[test]
    fn test_signal_names() {
        assert_eq!(
            Signal::RequestReachedDownloader.to_string(),
            "request_reached_downloader"
        );
        assert_eq!(Signal::SeedingPolicyChanged.to_string(), "seeding_policy_changed");
    }
}
