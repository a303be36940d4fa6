//! Plain-text seed lists.
//!
//! One entry per line:
//!
//! ```text
//! # comment
//! https://example.com/a
//! https://example.com/b 10
//! @policy lazy
//! ```
//!
//! A URL may be followed by an integer priority. `@policy NAME` becomes an
//! in-stream directive; the name is validated by the coordinator when it is
//! pulled, not here.

use std::collections::HashMap;
use std::path::Path;

use seedflow_core::async_trait;
use seedflow_core::error::{Error, Result};
use seedflow_core::request::Request;
use seedflow_core::seed::{seeds_from_iter, SeedItem, SeedStream};
use seedflow_core::spider::Spider;

const POLICY_DIRECTIVE: &str = "@policy";

/// Parse seed-file contents into seed items, in file order
pub fn parse_seeds(contents: &str) -> Result<Vec<SeedItem>> {
    let mut items = Vec::new();

    for (index, line) in contents.lines().enumerate() {
        let line_no = index + 1;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let mut parts = line.split_whitespace();
        let first = parts.next().unwrap_or_default();

        if first == POLICY_DIRECTIVE {
            let name = parts.next().ok_or_else(|| {
                Error::Config(format!("line {}: @policy needs a policy name", line_no))
            })?;
            if parts.next().is_some() {
                return Err(Error::Config(format!(
                    "line {}: unexpected text after @policy {}",
                    line_no, name
                )));
            }
            items.push(SeedItem::policy_name(name));
            continue;
        }

        let mut request = Request::new(first)
            .map_err(|e| Error::Config(format!("line {}: {}", line_no, e)))?;
        if let Some(priority) = parts.next() {
            let priority = priority.parse::<i32>().map_err(|e| {
                Error::Config(format!("line {}: bad priority {:?}: {}", line_no, priority, e))
            })?;
            request = request.with_priority(priority);
        }
        if parts.next().is_some() {
            return Err(Error::Config(format!(
                "line {}: expected `URL [priority]`",
                line_no
            )));
        }
        items.push(SeedItem::Request(request));
    }

    Ok(items)
}

/// Read and parse a seed file
pub fn load_seeds<P: AsRef<Path>>(path: P) -> Result<Vec<SeedItem>> {
    let contents = std::fs::read_to_string(path)?;
    parse_seeds(&contents)
}

/// A spider that replays a parsed seed list, directives included
pub struct SeedListSpider {
    name: String,
    items: Vec<SeedItem>,
    settings: HashMap<String, serde_json::Value>,
}

impl SeedListSpider {
    pub fn new<S: Into<String>>(name: S, items: Vec<SeedItem>) -> Self {
        Self {
            name: name.into(),
            items,
            settings: HashMap::new(),
        }
    }

    /// Load a spider from a seed file, named after the file stem
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .unwrap_or_else(|| "seeds".to_string());
        Ok(Self::new(name, load_seeds(path)?))
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

    /// Number of seed requests in the list
    pub fn request_count(&self) -> usize {
        self.items.iter().filter(|item| !item.is_directive()).count()
    }
}

#[async_trait]
impl Spider for SeedListSpider {
    fn name(&self) -> &str {
        &self.name
    }

    fn start_urls(&self) -> Vec<String> {
        self.items
            .iter()
            .filter_map(|item| match item {
                SeedItem::Request(request) => Some(request.url.to_string()),
                _ => None,
            })
            .collect()
    }

    fn yield_seeds(&self) -> SeedStream {
        seeds_from_iter(self.items.clone())
    }

    fn settings(&self) -> HashMap<String, serde_json::Value> {
        self.settings.clone()
    }
}
