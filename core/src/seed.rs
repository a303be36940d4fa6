//! Seed items and the policies that govern how seeds are interleaved with
//! scheduler work.

use std::fmt;
use std::str::FromStr;

use futures::stream::{self, BoxStream, StreamExt};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::request::Request;

/// Strategy for interleaving seed requests with scheduler requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SeedingPolicy {
    /// Dispatch seeds as soon as they are ready, ahead of queued work
    #[default]
    Greedy,
    /// Ask the scheduler first, pull a seed only when it has nothing to give
    Lazy,
    /// Buffer every seed, sort by priority, dispatch them before queued work
    FrontLoad,
    /// Pull a seed only once the scheduler and the downloader have gone quiet
    Idle,
}

impl SeedingPolicy {
    /// All recognized policies
    pub const ALL: [SeedingPolicy; 4] = [
        SeedingPolicy::Greedy,
        SeedingPolicy::Lazy,
        SeedingPolicy::FrontLoad,
        SeedingPolicy::Idle,
    ];

    /// The canonical configuration name
    pub fn as_str(&self) -> &'static str {
        match self {
            SeedingPolicy::Greedy => "greedy",
            SeedingPolicy::Lazy => "lazy",
            SeedingPolicy::FrontLoad => "front_load",
            SeedingPolicy::Idle => "idle",
        }
    }
}

impl fmt::Display for SeedingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SeedingPolicy {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        SeedingPolicy::ALL
            .into_iter()
            .find(|policy| policy.as_str() == value)
            .ok_or_else(|| Error::InvalidSeedingPolicy(value.to_string()))
    }
}

/// One element of a spider's seed stream
///
/// Policy values travel in the same stream as requests so a spider can
/// retune its own seeding while it is producing seeds. They are directives,
/// never work items.
#[derive(Debug, Clone, PartialEq)]
pub enum SeedItem {
    /// A seed request to dispatch
    Request(Request),
    /// A policy override that is already known to be valid
    Policy(SeedingPolicy),
    /// A policy override given by name, validated when it is received
    PolicyName(String),
}

impl SeedItem {
    /// Build an unvalidated policy directive from its name
    pub fn policy_name<S: Into<String>>(name: S) -> Self {
        SeedItem::PolicyName(name.into())
    }

    /// Whether this item is a directive rather than a request
    pub fn is_directive(&self) -> bool {
        !matches!(self, SeedItem::Request(_))
    }
}

impl From<Request> for SeedItem {
    fn from(request: Request) -> Self {
        SeedItem::Request(request)
    }
}

impl From<SeedingPolicy> for SeedItem {
    fn from(policy: SeedingPolicy) -> Self {
        SeedItem::Policy(policy)
    }
}

/// A lazily produced, possibly suspending sequence of seed items
pub type SeedStream = BoxStream<'static, Result<SeedItem>>;

/// Build a seed stream from a finite, already known sequence
pub fn seeds_from_iter<I>(items: I) -> SeedStream
where
    I: IntoIterator<Item = SeedItem>,
    I::IntoIter: Send + 'static,
{
    stream::iter(items.into_iter().map(Ok)).boxed()
}

/// Build a seed stream of requests from a list of URLs
///
/// URLs are parsed as they are pulled; a malformed URL surfaces as an error
/// item at its position in the stream.
pub fn seeds_from_urls(urls: Vec<String>) -> SeedStream {
    stream::iter(urls)
        .map(|url| Request::new(url).map(SeedItem::Request))
        .boxed()
}
