//! Pull-based access to a spider's seed stream.

use futures::future::FutureExt;
use futures::stream::StreamExt;
use seedflow_core::error::{Error, Result};
use seedflow_core::seed::{seeds_from_iter, SeedItem, SeedStream};

/// Outcome of a non-suspending seed pull
#[derive(Debug)]
pub enum SeedPoll {
    /// An item was ready
    Item(SeedItem),
    /// The stream has more to give, but nothing right now
    Pending,
    /// The stream is done
    Exhausted,
}

/// Single-step puller over a [`SeedStream`]
///
/// The stream only advances when pulled, so side effects inside a seed
/// generator happen in pull order. Once the stream ends, or fails, the
/// source stays exhausted.
pub struct SeedSource {
    stream: Option<SeedStream>,
    stashed: Option<SeedItem>,
}

impl SeedSource {
    /// Wrap a seed stream
    pub fn from_stream(stream: SeedStream) -> Self {
        Self {
            stream: Some(stream),
            stashed: None,
        }
    }

    /// Wrap a finite, already known sequence of items
    pub fn from_iter<I>(items: I) -> Self
    where
        I: IntoIterator<Item = SeedItem>,
        I::IntoIter: Send + 'static,
    {
        Self::from_stream(seeds_from_iter(items))
    }

    /// A source with no seeds at all
    pub fn empty() -> Self {
        Self {
            stream: None,
            stashed: None,
        }
    }

    /// Pull the next item, suspending until one is available.
    ///
    /// Returns `Ok(None)` once the source is exhausted. Cancel-safe: if the
    /// future is dropped before it completes, no item is lost.
    pub async fn next_seed(&mut self) -> Result<Option<SeedItem>> {
        if let Some(item) = self.stashed.take() {
            return Ok(Some(item));
        }
        let next = match self.stream.as_mut() {
            Some(stream) => stream.next().await,
            None => return Ok(None),
        };
        self.accept(next)
    }

    /// Pull the next item only if it is ready without suspending
    pub fn poll_seed(&mut self) -> Result<SeedPoll> {
        if let Some(item) = self.stashed.take() {
            return Ok(SeedPoll::Item(item));
        }
        let polled = match self.stream.as_mut() {
            // A single poll with a no-op waker, outside the cooperative budget
            // so an exhausted budget never makes a ready seed look pending
            Some(stream) => tokio::task::unconstrained(stream.next()).now_or_never(),
            None => return Ok(SeedPoll::Exhausted),
        };
        match polled {
            None => Ok(SeedPoll::Pending),
            Some(next) => Ok(match self.accept(next)? {
                Some(item) => SeedPoll::Item(item),
                None => SeedPoll::Exhausted,
            }),
        }
    }

    /// Put back an item the caller pulled but cannot use yet. It is returned
    /// first by the next pull.
    pub fn stash(&mut self, item: SeedItem) {
        debug_assert!(self.stashed.is_none(), "only one seed item can be stashed");
        self.stashed = Some(item);
    }

    /// Whether the source will never yield another item
    pub fn is_exhausted(&self) -> bool {
        self.stashed.is_none() && self.stream.is_none()
    }

    /// Whether an item was put back and is waiting to be pulled again
    pub fn has_stashed(&self) -> bool {
        self.stashed.is_some()
    }

    fn accept(&mut self, next: Option<Result<SeedItem>>) -> Result<Option<SeedItem>> {
        match next {
            Some(Ok(item)) => Ok(Some(item)),
            Some(Err(e)) => {
                self.stream = None;
                Err(into_seed_error(e))
            }
            None => {
                self.stream = None;
                Ok(None)
            }
        }
    }
}

impl Default for SeedSource {
    fn default() -> Self {
        Self::empty()
    }
}

/// Keep seed source failures recognisable as such
fn into_seed_error(error: Error) -> Error {
    match error {
        e @ Error::SeedSource { .. } => e.with_component("seed_source"),
        e @ Error::UrlParseError(_) => e,
        other => Error::seed_source(other.to_string()).with_component("seed_source"),
    }
}
