//! The seeding coordinator: merges a spider's seed stream with the scheduler
//! into one dispatch loop, governed by a [`SeedingPolicy`].

use std::cmp::Reverse;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{FuturesUnordered, StreamExt};
use log::{debug, info, warn};
use seedflow_core::diagnostics::{Diagnostics, LogDiagnostics};
use seedflow_core::error::{Error, Result};
use seedflow_core::request::Request;
use seedflow_core::seed::{SeedItem, SeedingPolicy};
use seedflow_core::signal::{Signal, SignalArgs, SignalManager};
use seedflow_scheduler::Scheduler;
use tokio::sync::RwLock;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::config::{EngineConfig, DEFAULT_HEARTBEAT_INTERVAL};
use crate::downloader::Downloader;
use crate::seed_source::{SeedPoll, SeedSource};
use crate::stats::{EngineStats, FinishReason};

const COMPONENT: &str = "seeding_coordinator";

/// Lifecycle of a coordinator run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
    /// Nothing dispatched yet
    Seeding,
    /// Seeds and scheduled requests are interleaved
    Steady,
    /// The seed source is exhausted, the scheduler is emptying
    Draining,
    /// No work is ready and nothing is in flight; the heartbeat is armed
    IdleWait,
    /// Terminal
    Finished,
}

impl fmt::Display for CoordinatorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CoordinatorState::Seeding => "seeding",
            CoordinatorState::Steady => "steady",
            CoordinatorState::Draining => "draining",
            CoordinatorState::IdleWait => "idle_wait",
            CoordinatorState::Finished => "finished",
        };
        f.write_str(name)
    }
}

/// Where a dispatched request came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    Seed,
    Scheduler,
}

/// Result of a non-suspending seed pull, after directives are applied
enum Pulled {
    Request(Request),
    Directive,
    Pending,
    Exhausted,
}

/// What woke the coordinator while it was waiting
enum Wake {
    Cancelled,
    Completed(std::result::Result<(Request, Result<Vec<Request>>), JoinError>),
    Seed(Result<Option<SeedItem>>),
    Heartbeat,
}

type InFlight = FuturesUnordered<JoinHandle<(Request, Result<Vec<Request>>)>>;

/// Drives one crawl: pulls seeds and scheduled requests in the order the
/// active policy dictates and hands them to the downloader.
///
/// Dequeueing from the scheduler and pulling seeds happen only here. Follow-up
/// requests returned by the downloader are enqueued by this loop too.
pub struct SeedingCoordinator {
    scheduler: Arc<dyn Scheduler>,
    downloader: Arc<dyn Downloader>,
    seeds: SeedSource,
    policy: SeedingPolicy,
    heartbeat_interval: Duration,
    concurrent_requests: usize,
    signals: Arc<SignalManager>,
    diagnostics: Arc<dyn Diagnostics>,
    stats: Arc<RwLock<EngineStats>>,
    shutdown: CancellationToken,
    state: CoordinatorState,
    /// Seeds of the front-load batch being collected, in arrival order
    batch: Vec<Request>,
    /// Priority-sorted seeds of completed front-load batches
    front_loaded: VecDeque<Request>,
    in_flight: InFlight,
    last_scheduler_dispatch: Instant,
    wakeups: usize,
}

impl SeedingCoordinator {
    /// Create a coordinator with default settings
    pub fn new(
        scheduler: Arc<dyn Scheduler>,
        downloader: Arc<dyn Downloader>,
        seeds: SeedSource,
        policy: SeedingPolicy,
    ) -> Self {
        Self {
            scheduler,
            downloader,
            seeds,
            policy,
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            concurrent_requests: EngineConfig::default().concurrent_requests,
            signals: Arc::new(SignalManager::new()),
            diagnostics: Arc::new(LogDiagnostics),
            stats: Arc::new(RwLock::new(EngineStats::default())),
            shutdown: CancellationToken::new(),
            state: CoordinatorState::Seeding,
            batch: Vec::new(),
            front_loaded: VecDeque::new(),
            in_flight: FuturesUnordered::new(),
            last_scheduler_dispatch: Instant::now(),
            wakeups: 0,
        }
    }

    /// Take heartbeat and concurrency settings from the engine configuration
    pub fn with_config(mut self, config: &EngineConfig) -> Self {
        self.heartbeat_interval = config.heartbeat_interval.max(Duration::from_millis(1));
        self.concurrent_requests = config.concurrent_requests.max(1);
        self
    }

    /// Set the signal manager
    pub fn with_signals(mut self, signals: Arc<SignalManager>) -> Self {
        self.signals = signals;
        self
    }

    /// Set the diagnostics sink
    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn Diagnostics>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Share a stats record with the caller
    pub fn with_stats(mut self, stats: Arc<RwLock<EngineStats>>) -> Self {
        self.stats = stats;
        self
    }

    /// Stop the run when this token is cancelled
    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Current lifecycle state
    pub fn state(&self) -> CoordinatorState {
        self.state
    }

    /// The active seeding policy
    pub fn policy(&self) -> SeedingPolicy {
        self.policy
    }

    /// Number of times the run loop waited and was woken
    pub fn wakeups(&self) -> usize {
        self.wakeups
    }

    /// Run until both sources are exhausted, the run is cancelled, or a
    /// scheduler or seed source error ends it.
    ///
    /// Downloads still in flight when the run is cancelled or fails are
    /// aborted.
    pub async fn run(&mut self) -> Result<FinishReason> {
        info!("Seeding coordinator started with policy {}", self.policy);
        let result = self.run_loop().await;

        if !matches!(result, Ok(FinishReason::Finished)) {
            self.abort_in_flight().await;
        }
        self.transition(CoordinatorState::Finished);

        match &result {
            Ok(reason) => info!("Seeding coordinator finished: {}", reason),
            Err(e) => warn!("Seeding coordinator failed: {}", e),
        }
        result
    }

    async fn run_loop(&mut self) -> Result<FinishReason> {
        let mut heartbeat = interval_at(
            Instant::now() + self.heartbeat_interval,
            self.heartbeat_interval,
        );
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if self.shutdown.is_cancelled() {
                return Ok(FinishReason::Shutdown);
            }

            if self.has_capacity() {
                if let Some((request, origin)) = self.next_ready().await? {
                    self.dispatch(request, origin).await;
                    continue;
                }
            }

            if self.is_finished().await {
                return Ok(FinishReason::Finished);
            }

            if self.in_flight.is_empty() {
                self.transition(CoordinatorState::IdleWait);
            }

            let has_in_flight = !self.in_flight.is_empty();
            let seed_wanted = self.seed_wanted();
            let wake = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => Wake::Cancelled,
                Some(joined) = self.in_flight.next(), if has_in_flight => Wake::Completed(joined),
                pulled = self.seeds.next_seed(), if seed_wanted => Wake::Seed(pulled),
                _ = heartbeat.tick() => Wake::Heartbeat,
            };
            self.wakeups += 1;

            match wake {
                Wake::Cancelled => return Ok(FinishReason::Shutdown),
                Wake::Completed(joined) => self.complete(joined).await?,
                Wake::Seed(pulled) => {
                    if let Some(item) = pulled? {
                        self.seeds.stash(item);
                    }
                }
                Wake::Heartbeat => {
                    let mut stats = self.stats.write().await;
                    stats.heartbeat_count += 1;
                    debug!(
                        "Heartbeat in state {} ({} in flight)",
                        self.state,
                        self.in_flight.len()
                    );
                }
            }
            self.settle_state();
        }
    }

    /// Decide the next request to dispatch without waiting
    async fn next_ready(&mut self) -> Result<Option<(Request, Origin)>> {
        loop {
            if let Some(request) = self.front_loaded.pop_front() {
                return Ok(Some((request, Origin::Seed)));
            }

            match self.policy {
                SeedingPolicy::Greedy => match self.poll_seed().await? {
                    Pulled::Request(request) => return Ok(Some((request, Origin::Seed))),
                    Pulled::Directive => continue,
                    Pulled::Pending | Pulled::Exhausted => return self.from_scheduler().await,
                },
                SeedingPolicy::Lazy => {
                    if let Some(ready) = self.from_scheduler().await? {
                        return Ok(Some(ready));
                    }
                    match self.poll_seed().await? {
                        Pulled::Request(request) => return Ok(Some((request, Origin::Seed))),
                        Pulled::Directive => continue,
                        Pulled::Pending | Pulled::Exhausted => return Ok(None),
                    }
                }
                SeedingPolicy::FrontLoad => {
                    if self.seeds.is_exhausted() {
                        self.flush_batch();
                        if self.front_loaded.is_empty() {
                            return self.from_scheduler().await;
                        }
                        continue;
                    }
                    match self.poll_seed().await? {
                        Pulled::Request(request) => self.batch.push(request),
                        Pulled::Directive | Pulled::Exhausted => {}
                        // Still collecting; nothing else is dispatched meanwhile
                        Pulled::Pending => return Ok(None),
                    }
                }
                SeedingPolicy::Idle => {
                    if let Some(ready) = self.from_scheduler().await? {
                        return Ok(Some(ready));
                    }
                    if !self.idle_seed_allowed() {
                        return Ok(None);
                    }
                    match self.poll_seed().await? {
                        Pulled::Request(request) => return Ok(Some((request, Origin::Seed))),
                        Pulled::Directive => continue,
                        Pulled::Pending | Pulled::Exhausted => return Ok(None),
                    }
                }
            }
        }
    }

    async fn from_scheduler(&mut self) -> Result<Option<(Request, Origin)>> {
        let next = self
            .scheduler
            .next_request()
            .await
            .map_err(|e| e.with_component("scheduler"))?;
        Ok(next.map(|request| (request, Origin::Scheduler)))
    }

    /// Pull a seed if one is ready, applying any directive it turns out to be
    async fn poll_seed(&mut self) -> Result<Pulled> {
        match self.seeds.poll_seed()? {
            SeedPoll::Item(SeedItem::Request(request)) => Ok(Pulled::Request(request)),
            SeedPoll::Item(SeedItem::Policy(policy)) => {
                self.override_policy(policy).await;
                Ok(Pulled::Directive)
            }
            SeedPoll::Item(SeedItem::PolicyName(name)) => {
                match name.parse::<SeedingPolicy>() {
                    Ok(policy) => self.override_policy(policy).await,
                    Err(e) => self.reject_directive(e).await,
                }
                Ok(Pulled::Directive)
            }
            SeedPoll::Pending => Ok(Pulled::Pending),
            SeedPoll::Exhausted => Ok(Pulled::Exhausted),
        }
    }

    async fn override_policy(&mut self, policy: SeedingPolicy) {
        // A directive closes the batch being front-loaded
        self.flush_batch();

        let previous = self.policy;
        self.policy = policy;
        {
            let mut stats = self.stats.write().await;
            stats.policy_override_count += 1;
        }
        info!("Seeding policy changed from {} to {}", previous, policy);
        self.signals
            .send_catch_log(
                Signal::SeedingPolicyChanged,
                SignalArgs::Policy {
                    previous,
                    current: policy,
                },
            )
            .await;
    }

    async fn reject_directive(&mut self, error: Error) {
        {
            let mut stats = self.stats.write().await;
            stats.invalid_policy_count += 1;
        }
        self.diagnostics.error(
            COMPONENT,
            format!("{}; keeping seeding policy {}", error, self.policy),
        );
    }

    fn flush_batch(&mut self) {
        if self.batch.is_empty() {
            return;
        }
        let mut batch = std::mem::take(&mut self.batch);
        // Stable: equal priorities keep their arrival order
        batch.sort_by_key(|request| Reverse(request.priority));
        debug!("Front-loading {} seed requests", batch.len());
        self.front_loaded.extend(batch);
    }

    fn has_capacity(&self) -> bool {
        self.in_flight.len() < self.concurrent_requests
    }

    fn idle_seed_allowed(&self) -> bool {
        self.in_flight.is_empty() || self.last_scheduler_dispatch.elapsed() >= self.heartbeat_interval
    }

    /// Whether the wait should also listen for the next seed
    fn seed_wanted(&self) -> bool {
        // A stashed item is only taken by `next_ready`, which needs capacity
        if self.seeds.is_exhausted() || self.seeds.has_stashed() {
            return false;
        }
        match self.policy {
            // Collecting a batch dispatches nothing, so capacity does not matter
            SeedingPolicy::FrontLoad => true,
            SeedingPolicy::Idle => self.has_capacity() && self.idle_seed_allowed(),
            SeedingPolicy::Greedy | SeedingPolicy::Lazy => self.has_capacity(),
        }
    }

    async fn is_finished(&mut self) -> bool {
        let drained = self.seeds.is_exhausted()
            && self.batch.is_empty()
            && self.front_loaded.is_empty()
            && self.in_flight.is_empty();
        drained && !self.scheduler.has_pending_requests().await
    }

    async fn dispatch(&mut self, request: Request, origin: Origin) {
        debug!("Dispatching {} from {:?} under {}", request, origin, self.policy);
        {
            let mut stats = self.stats.write().await;
            stats.request_count += 1;
            match origin {
                Origin::Seed => stats.seed_request_count += 1,
                Origin::Scheduler => stats.scheduler_request_count += 1,
            }
        }
        if origin == Origin::Scheduler {
            self.last_scheduler_dispatch = Instant::now();
        }

        self.signals
            .send_catch_log(
                Signal::RequestReachedDownloader,
                SignalArgs::Request(Box::new(request.clone())),
            )
            .await;

        let downloader = self.downloader.clone();
        self.in_flight.push(tokio::spawn(async move {
            let result = downloader.download(request.clone()).await;
            (request, result)
        }));
        self.settle_state();
    }

    /// Book a finished download and enqueue its follow-up requests
    async fn complete(
        &mut self,
        joined: std::result::Result<(Request, Result<Vec<Request>>), JoinError>,
    ) -> Result<()> {
        let (request, result) = match joined {
            Ok(done) => done,
            Err(e) => {
                self.record_download_error(format!("download task failed: {}", e))
                    .await;
                return Ok(());
            }
        };

        match result {
            Ok(follow_ups) => {
                {
                    let mut stats = self.stats.write().await;
                    stats.response_count += 1;
                }
                self.signals
                    .send_catch_log(
                        Signal::ResponseReceived,
                        SignalArgs::Request(Box::new(request)),
                    )
                    .await;

                for follow_up in follow_ups {
                    let accepted = self
                        .scheduler
                        .enqueue_request(follow_up.clone())
                        .await
                        .map_err(|e| e.with_component("scheduler"))?;
                    if !accepted {
                        debug!("Follow-up request dropped by scheduler: {}", follow_up);
                        continue;
                    }
                    {
                        let mut stats = self.stats.write().await;
                        stats.follow_up_count += 1;
                    }
                    self.signals
                        .send_catch_log(
                            Signal::RequestScheduled,
                            SignalArgs::Request(Box::new(follow_up)),
                        )
                        .await;
                }
            }
            Err(e) => {
                let e = e.with_url(request.url.as_str());
                self.record_download_error(format!("error downloading {}: {}", request, e))
                    .await;
            }
        }
        Ok(())
    }

    async fn record_download_error(&mut self, message: String) {
        {
            let mut stats = self.stats.write().await;
            stats.error_count += 1;
        }
        self.diagnostics.error("downloader", message.clone());
        self.signals
            .send_catch_log(Signal::ErrorOccurred, SignalArgs::Error(message))
            .await;
    }

    async fn abort_in_flight(&mut self) {
        if self.in_flight.is_empty() {
            return;
        }
        debug!("Aborting {} in-flight downloads", self.in_flight.len());
        for handle in self.in_flight.iter() {
            handle.abort();
        }
        while let Some(joined) = self.in_flight.next().await {
            if let Ok((request, _)) = joined {
                debug!("Download completed during shutdown: {}", request);
            }
        }
    }

    /// Move between the working states after progress was made
    fn settle_state(&mut self) {
        let next = if self.state == CoordinatorState::Seeding && self.in_flight.is_empty() {
            CoordinatorState::Seeding
        } else if self.seeds.is_exhausted() {
            CoordinatorState::Draining
        } else {
            CoordinatorState::Steady
        };
        self.transition(next);
    }

    fn transition(&mut self, next: CoordinatorState) {
        if self.state != next {
            debug!("Coordinator state {} -> {}", self.state, next);
            self.state = next;
        }
    }
}
