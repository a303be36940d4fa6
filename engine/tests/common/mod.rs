#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use seedflow_core::async_trait;
use seedflow_core::error::Result;
use seedflow_core::request::Request;
use seedflow_core::seed::{SeedItem, SeedStream};
use seedflow_core::signal::{Signal, SignalArgs};
use seedflow_core::spider::Spider;
use seedflow_engine::Engine;
use seedflow_scheduler::Scheduler;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// `https://example.com/<name>`
pub fn req(name: &str) -> Request {
    Request::new(format!("https://example.com/{}", name)).unwrap()
}

pub fn seed(name: &str) -> SeedItem {
    SeedItem::Request(req(name))
}

pub fn seed_with_priority(name: &str, priority: i32) -> SeedItem {
    SeedItem::Request(req(name).with_priority(priority))
}

/// A scheduler that claims to have pending requests until it is stopped.
///
/// With `holding`, it also refuses to hand out anything before it is stopped.
pub struct BlockingScheduler {
    queue: tokio::sync::Mutex<VecDeque<Request>>,
    stopped: AtomicBool,
    holding: bool,
}

impl BlockingScheduler {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            queue: tokio::sync::Mutex::new(VecDeque::new()),
            stopped: AtomicBool::new(false),
            holding: false,
        })
    }

    pub fn holding() -> Arc<Self> {
        Arc::new(Self {
            queue: tokio::sync::Mutex::new(VecDeque::new()),
            stopped: AtomicBool::new(false),
            holding: true,
        })
    }

    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Scheduler for BlockingScheduler {
    async fn enqueue_request(&self, request: Request) -> Result<bool> {
        self.queue.lock().await.push_back(request);
        Ok(true)
    }

    async fn next_request(&self) -> Result<Option<Request>> {
        if self.holding && !self.is_stopped() {
            return Ok(None);
        }
        Ok(self.queue.lock().await.pop_front())
    }

    async fn has_pending_requests(&self) -> bool {
        !self.queue.lock().await.is_empty() || !self.is_stopped()
    }

    async fn len(&self) -> usize {
        self.queue.lock().await.len()
    }

    async fn clear(&self) -> Result<()> {
        self.queue.lock().await.clear();
        Ok(())
    }
}

type SeedFactory = Box<dyn Fn() -> SeedStream + Send + Sync>;

/// A spider whose seed stream is built by a closure
pub struct ScriptedSpider {
    seeds: SeedFactory,
    settings: HashMap<String, serde_json::Value>,
}

impl ScriptedSpider {
    pub fn new<F>(seeds: F) -> Self
    where
        F: Fn() -> SeedStream + Send + Sync + 'static,
    {
        Self {
            seeds: Box::new(seeds),
            settings: HashMap::new(),
        }
    }

    /// A spider yielding a fixed list of items
    pub fn from_items(items: Vec<SeedItem>) -> Self {
        Self::new(move || seedflow_core::seed::seeds_from_iter(items.clone()))
    }

    pub fn with_setting(mut self, key: &str, value: &str) -> Self {
        self.settings.insert(key.to_string(), value.into());
        self
    }
}

#[async_trait]
impl Spider for ScriptedSpider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn yield_seeds(&self) -> SeedStream {
        (self.seeds)()
    }

    fn settings(&self) -> HashMap<String, serde_json::Value> {
        self.settings.clone()
    }
}

/// Records the order in which requests reach the downloader
#[derive(Clone, Default)]
pub struct OrderRecorder {
    names: Arc<Mutex<Vec<String>>>,
}

impl OrderRecorder {
    pub async fn attach(engine: &Engine) -> Self {
        let recorder = Self::default();
        let names = recorder.names.clone();
        engine
            .signals()
            .connect(Signal::RequestReachedDownloader, move |args| {
                if let SignalArgs::Request(request) = args {
                    let name = request.url.path().trim_start_matches('/').to_string();
                    names.lock().unwrap().push(name);
                }
                Ok(())
            })
            .await
            .unwrap();
        recorder
    }

    pub fn order(&self) -> Vec<String> {
        self.names.lock().unwrap().clone()
    }
}
