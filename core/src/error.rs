use std::collections::HashMap;
use std::fmt;
use thiserror::Error;
use url::ParseError;
use serde::{Deserialize, Serialize};

/// Where an error happened, attached to the error variants that carry it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorContext {
    pub url: Option<String>,
    pub spider_name: Option<String>,
    pub component: Option<String>,
    pub metadata: HashMap<String, String>,
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        let labelled = [
            ("url", &self.url),
            ("spider", &self.spider_name),
            ("component", &self.component),
        ];
        for (label, value) in labelled {
            if let Some(value) = value {
                parts.push(format!("{}={}", label, value));
            }
        }

        let mut metadata: Vec<_> = self.metadata.iter().collect();
        metadata.sort();
        for (key, value) in metadata {
            parts.push(format!("{}={}", key, value));
        }

        write!(f, "{}", parts.join(", "))
    }
}

/// Error types for the seedflow crates
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// Error when parsing a URL
    #[error("URL parse error: {0}")]
    UrlParseError(#[from] ParseError),

    /// Error raised by a scheduler
    #[error("Scheduler error: {message} {context}")]
    Scheduler {
        /// Error message
        message: String,
        /// Error context
        context: ErrorContext,
    },

    /// Error raised while producing seeds
    #[error("Seed source error: {message} {context}")]
    SeedSource {
        /// Error message
        message: String,
        /// Error context
        context: ErrorContext,
    },

    /// Error raised by the downstream downloader
    #[error("Download error: {message} {context}")]
    Download {
        /// Error message
        message: String,
        /// Error context
        context: ErrorContext,
    },

    /// A seeding policy name that is not one of the recognized policies
    #[error("Invalid seeding policy: {0:?} (expected one of greedy, lazy, front_load, idle)")]
    InvalidSeedingPolicy(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error raised by a signal handler
    #[error("Signal error: {0}")]
    Signal(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(String),

    /// Serde error
    #[error("Serialization error: {0}")]
    SerdeError(String),

    /// Generic error
    #[error("{message} {context}")]
    Other {
        /// Error message
        message: String,
        /// Error context
        context: ErrorContext,
    },
}

impl Error {
    /// Create a new scheduler error
    pub fn scheduler(message: impl Into<String>) -> Self {
        Self::Scheduler {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    /// Create a new seed source error
    pub fn seed_source(message: impl Into<String>) -> Self {
        Self::SeedSource {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    /// Create a new download error
    pub fn download(message: impl Into<String>) -> Self {
        Self::Download {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    /// Create a new generic error
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    /// Get the error context, for variants that carry one
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Self::Scheduler { context, .. }
            | Self::SeedSource { context, .. }
            | Self::Download { context, .. }
            | Self::Other { context, .. } => Some(context),
            _ => None,
        }
    }

    /// Set the URL in the error context
    pub fn with_url(self, url: impl Into<String>) -> Self {
        self.edit_context(|ctx| ctx.url = Some(url.into()))
    }

    /// Set the spider name in the error context
    pub fn with_spider_name(self, spider_name: impl Into<String>) -> Self {
        self.edit_context(|ctx| ctx.spider_name = Some(spider_name.into()))
    }

    /// Set the component in the error context
    pub fn with_component(self, component: impl Into<String>) -> Self {
        self.edit_context(|ctx| ctx.component = Some(component.into()))
    }

    /// Add metadata to the error context
    pub fn with_metadata(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.edit_context(|ctx| {
            ctx.metadata.insert(key.into(), value.into());
        })
    }

    // Variants without a context are returned unchanged
    fn edit_context(mut self, edit: impl FnOnce(&mut ErrorContext)) -> Self {
        match &mut self {
            Self::Scheduler { context, .. }
            | Self::SeedSource { context, .. }
            | Self::Download { context, .. }
            | Self::Other { context, .. } => edit(context),
            _ => {}
        }
        self
    }

    /// Whether this error must end the crawl.
    ///
    /// Scheduler and seed source failures are fatal: swallowing them would
    /// lose track of requests that were already accepted.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Scheduler { .. } | Self::SeedSource { .. } | Self::UrlParseError(_)
        )
    }
}

/// Result type for seedflow operations
pub type Result<T> = std::result::Result<T, Error>;

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Error::IoError(error.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error::SerdeError(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_context_display() {
        let error = Error::scheduler("queue poisoned")
            .with_component("scheduler")
            .with_spider_name("seeds")
            .with_metadata("queue", "memory");

        let rendered = error.to_string();
        assert!(rendered.starts_with("Scheduler error: queue poisoned"));
        assert!(rendered.contains("spider=seeds"));
        assert!(rendered.contains("component=scheduler"));
        assert!(rendered.contains("queue=memory"));
    }

    #[test]
    fn test_fatal_classification() {
        assert!(Error::scheduler("boom").is_fatal());
        assert!(Error::seed_source("boom").is_fatal());
        assert!(!Error::download("boom").is_fatal());
        assert!(!Error::InvalidSeedingPolicy("front-load".into()).is_fatal());
    }

    #[test]
    fn test_context_only_on_contextual_variants() {
        assert!(Error::download("x").context().is_some());
        assert!(Error::Config("x".into()).context().is_none());

        let error = Error::Config("bad".into()).with_url("https://example.com");
        assert!(error.context().is_none());
    }
}
