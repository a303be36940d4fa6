use std::collections::HashMap;

use crate::async_trait;
use crate::error::Result;
use crate::request::Request;
use crate::seed::{seeds_from_iter, seeds_from_urls, SeedItem, SeedStream, SeedingPolicy};

/// Setting key a spider can use to pick its own seeding policy
pub const SEEDING_POLICY_SETTING: &str = "SEEDING_POLICY";

/// Trait for spiders that produce crawl seeds
#[async_trait]
pub trait Spider: Send + Sync + 'static {
    /// Get the name of the spider
    fn name(&self) -> &str;

    /// Get the start URLs for this spider
    fn start_urls(&self) -> Vec<String> {
        Vec::new()
    }

    /// Produce the seed stream for a crawl.
    ///
    /// The stream may suspend between items, may yield [`SeedingPolicy`]
    /// directives, and is pulled at most once per crawl.
    fn yield_seeds(&self) -> SeedStream {
        seeds_from_urls(self.start_urls())
    }

    /// Called when the spider is closed
    async fn closed(&self) -> Result<()> {
        Ok(())
    }

    /// Get custom settings for this spider
    fn settings(&self) -> HashMap<String, serde_json::Value> {
        HashMap::new()
    }
}

/// A spider built from a fixed list of seed requests
pub struct BasicSpider {
    /// The name of the spider
    name: String,

    /// Seed requests, in yield order
    seeds: Vec<Request>,

    /// Custom settings for this spider
    settings: HashMap<String, serde_json::Value>,
}

impl BasicSpider {
    /// Create a new basic spider from start URLs
    pub fn new<S: Into<String>>(name: S, start_urls: Vec<String>) -> Result<Self> {
        let seeds = start_urls
            .iter()
            .map(Request::new)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::from_requests(name, seeds))
    }

    /// Create a new basic spider from prepared requests
    pub fn from_requests<S: Into<String>>(name: S, seeds: Vec<Request>) -> Self {
        Self {
            name: name.into(),
            seeds,
            settings: HashMap::new(),
        }
    }

    /// Set a custom setting for this spider
    pub fn with_setting<K: Into<String>, V: Into<serde_json::Value>>(
        mut self,
        key: K,
        value: V,
    ) -> Self {
        self.settings.insert(key.into(), value.into());
        self
    }

    /// Pin the seeding policy for crawls of this spider
    pub fn with_seeding_policy(self, policy: SeedingPolicy) -> Self {
        self.with_setting(SEEDING_POLICY_SETTING, policy.as_str())
    }
}

#[async_trait]
impl Spider for BasicSpider {
    fn name(&self) -> &str {
        &self.name
    }

    fn start_urls(&self) -> Vec<String> {
        self.seeds.iter().map(|r| r.url.to_string()).collect()
    }

    fn yield_seeds(&self) -> SeedStream {
        seeds_from_iter(
            self.seeds
                .clone()
                .into_iter()
                .map(SeedItem::Request)
                .collect::<Vec<_>>(),
        )
    }

    fn settings(&self) -> HashMap<String, serde_json::Value> {
        self.settings.clone()
    }
}
