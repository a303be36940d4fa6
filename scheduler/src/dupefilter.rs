use dashmap::DashSet;
use seedflow_core::request::Request;

/// Remembers request fingerprints so a URL is only queued once
#[derive(Debug)]
pub struct DupeFilter {
    seen: DashSet<String>,
    enabled: bool,
}

impl DupeFilter {
    /// Create an active filter
    pub fn new() -> Self {
        Self {
            seen: DashSet::new(),
            enabled: true,
        }
    }

    /// Create a filter that lets everything through
    pub fn disabled() -> Self {
        Self {
            seen: DashSet::new(),
            enabled: false,
        }
    }

    /// Mark the request as seen and report whether it had been seen before.
    ///
    /// `dont_filter` requests are never reported as seen.
    pub fn request_seen(&self, request: &Request) -> bool {
        if !self.enabled || request.dont_filter {
            return false;
        }
        // insert returns false when the fingerprint was already present
        !self.seen.insert(request.fingerprint())
    }

    /// Number of fingerprints remembered
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// Whether no fingerprint is remembered
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    /// Forget every fingerprint
    pub fn clear(&self) {
        self.seen.clear();
    }
}

impl Default for DupeFilter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_seen() {
        let filter = DupeFilter::new();
        let request = Request::new("https://example.com/a").unwrap();

        assert!(!filter.request_seen(&request));
        assert!(filter.request_seen(&request));
        assert_eq!(filter.len(), 1);

        filter.clear();
        assert!(!filter.request_seen(&request));
    }

    #[test]
    fn test_dont_filter_and_disabled() {
        let filter = DupeFilter::new();
        let request = Request::new("https://example.com/a")
            .unwrap()
            .with_dont_filter(true);
        assert!(!filter.request_seen(&request));
        assert!(!filter.request_seen(&request));
        assert!(filter.is_empty());

        let disabled = DupeFilter::disabled();
        let plain = Request::new("https://example.com/b").unwrap();
        assert!(!disabled.request_seen(&plain));
        assert!(!disabled.request_seen(&plain));
    }
}
