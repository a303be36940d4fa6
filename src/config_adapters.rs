use std::str::FromStr;
use std::time::Duration;

use crate::settings::{Result, Settings, SettingsError};
use seedflow_core::seed::SeedingPolicy;
use seedflow_engine::EngineConfig;
use seedflow_scheduler::SchedulerType;

/// Adapter function to create EngineConfig from Settings
///
/// Keys that are absent keep their [`EngineConfig::default`] value.
pub fn engine_config_from_settings(settings: &Settings) -> Result<EngineConfig> {
    let defaults = EngineConfig::default();

    let seeding_policy = match settings.get_opt::<String>("SEEDING_POLICY")? {
        Some(name) => parse_named("SEEDING_POLICY", &name)?,
        None => defaults.seeding_policy,
    };

    let scheduler_type = match settings.get_opt::<String>("SCHEDULER_TYPE")? {
        Some(name) => parse_named("SCHEDULER_TYPE", &name)?,
        None => defaults.scheduler_type,
    };

    let heartbeat_interval = settings
        .get_opt::<u64>("HEARTBEAT_INTERVAL_MS")?
        .map(Duration::from_millis)
        .unwrap_or(defaults.heartbeat_interval);
    if heartbeat_interval.is_zero() {
        return Err(SettingsError::InvalidValue {
            key: "HEARTBEAT_INTERVAL_MS".to_string(),
            message: "must be greater than zero".to_string(),
        });
    }

    let close_timeout = settings
        .get_opt::<u64>("CLOSE_TIMEOUT_SECS")?
        .map(Duration::from_secs)
        .unwrap_or(defaults.close_timeout);

    Ok(EngineConfig {
        seeding_policy,
        heartbeat_interval,
        concurrent_requests: settings
            .get_opt("CONCURRENT_REQUESTS")?
            .unwrap_or(defaults.concurrent_requests),
        scheduler_type,
        filter_duplicates: settings
            .get_opt("DUPEFILTER_ENABLED")?
            .unwrap_or(defaults.filter_duplicates),
        log_stats: settings.get_opt("LOG_STATS")?.unwrap_or(defaults.log_stats),
        stats_interval_secs: settings
            .get_opt("STATS_INTERVAL_SECS")?
            .unwrap_or(defaults.stats_interval_secs),
        close_timeout,
    })
}

fn parse_named<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e: T::Err| SettingsError::InvalidValue {
        key: key.to_string(),
        message: e.to_string(),
    })
}
