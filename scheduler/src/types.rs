use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use seedflow_core::error::Error;

/// Scheduler implementations selectable from configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerType {
    /// Plain FIFO queue
    #[default]
    Memory,
    /// Highest priority first, FIFO among equal priorities
    Priority,
}

impl SchedulerType {
    /// The configuration name
    pub fn as_str(&self) -> &'static str {
        match self {
            SchedulerType::Memory => "memory",
            SchedulerType::Priority => "priority",
        }
    }
}

impl fmt::Display for SchedulerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SchedulerType {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "memory" => Ok(SchedulerType::Memory),
            "priority" => Ok(SchedulerType::Priority),
            other => Err(Error::Config(format!(
                "unknown scheduler type {:?} (expected memory or priority)",
                other
            ))),
        }
    }
}

/// Configuration for schedulers
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Drop requests whose fingerprint was already seen
    pub filter_duplicates: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            filter_duplicates: true,
        }
    }
}
