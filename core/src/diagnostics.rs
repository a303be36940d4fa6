//! Diagnostic reporting for conditions that are recoverable but worth
//! surfacing, such as invalid policy directives or failed downloads.

use std::fmt;
use std::sync::Mutex;

use log::Level;

/// A single diagnostic record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Severity of the record
    pub level: Level,
    /// Component that produced the record
    pub component: String,
    /// Human readable message
    pub message: String,
}

impl Diagnostic {
    /// Create a new diagnostic
    pub fn new(level: Level, component: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            component: component.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.level, self.component, self.message)
    }
}

/// Sink for diagnostics raised while a crawl runs
pub trait Diagnostics: Send + Sync + 'static {
    /// Report a diagnostic
    fn report(&self, diagnostic: Diagnostic);

    /// Report an error level diagnostic
    fn error(&self, component: &str, message: String) {
        self.report(Diagnostic::new(Level::Error, component, message));
    }

    /// Report a warning level diagnostic
    fn warn(&self, component: &str, message: String) {
        self.report(Diagnostic::new(Level::Warn, component, message));
    }
}

/// Forwards diagnostics to the `log` facade
#[derive(Debug, Default, Clone, Copy)]
pub struct LogDiagnostics;

impl Diagnostics for LogDiagnostics {
    fn report(&self, diagnostic: Diagnostic) {
        log::log!(
            target: "seedflow::diagnostics",
            diagnostic.level,
            "{}: {}",
            diagnostic.component,
            diagnostic.message
        );
    }
}

/// Keeps every diagnostic in memory, for inspection after a crawl
#[derive(Debug, Default)]
pub struct MemoryDiagnostics {
    records: Mutex<Vec<Diagnostic>>,
}

impl MemoryDiagnostics {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded diagnostics, in report order
    pub fn records(&self) -> Vec<Diagnostic> {
        match self.records.lock() {
            Ok(records) => records.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Recorded diagnostics at error level
    pub fn errors(&self) -> Vec<Diagnostic> {
        self.records()
            .into_iter()
            .filter(|d| d.level == Level::Error)
            .collect()
    }

    /// Recorded diagnostics at or above the given severity
    pub fn at_least(&self, level: Level) -> Vec<Diagnostic> {
        // log::Level orders Error < Warn < Info, so "at least" means <=
        self.records()
            .into_iter()
            .filter(|d| d.level <= level)
            .collect()
    }
}

impl Diagnostics for MemoryDiagnostics {
    fn report(&self, diagnostic: Diagnostic) {
        LogDiagnostics.report(diagnostic.clone());
        match self.records.lock() {
            Ok(mut records) => records.push(diagnostic),
            Err(poisoned) => poisoned.into_inner().push(diagnostic),
        }
    }
}
