use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use url::Url;

use crate::error::{Error, Result};

/// A unit of crawl work handed from a seed source or scheduler to the downloader
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// The URL to request
    pub url: Url,

    /// Priority of this request (higher values = higher priority)
    #[serde(default)]
    pub priority: i32,

    /// Whether to bypass duplicate filtering
    #[serde(default)]
    pub dont_filter: bool,

    /// Metadata associated with this request
    #[serde(default)]
    pub meta: HashMap<String, serde_json::Value>,
}

impl Request {
    /// Create a new request for the given URL
    pub fn new<U: AsRef<str>>(url: U) -> Result<Self> {
        let url = Url::parse(url.as_ref()).map_err(Error::UrlParseError)?;
        Ok(Self::from_url(url))
    }

    /// Create a new request from an already parsed URL
    pub fn from_url(url: Url) -> Self {
        Self {
            url,
            priority: 0,
            dont_filter: false,
            meta: HashMap::new(),
        }
    }

    /// Set the priority for this request
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Set whether to filter this request
    pub fn with_dont_filter(mut self, dont_filter: bool) -> Self {
        self.dont_filter = dont_filter;
        self
    }

    /// Add metadata to the request
    pub fn with_meta<K: Into<String>, V: Into<serde_json::Value>>(
        mut self,
        key: K,
        value: V,
    ) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    /// The key duplicate filters compare requests by
    pub fn fingerprint(&self) -> String {
        self.url.as_str().to_string()
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{} priority={}>", self.url, self.priority)
    }
}

impl PartialEq for Request {
    fn eq(&self, other: &Self) -> bool {
        self.url == other.url
    }
}

impl Eq for Request {}

impl Hash for Request {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.url.as_str().hash(state);
    }
}
