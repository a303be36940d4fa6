use std::path::Path;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use log::{info, warn};
use seedflow::config_adapters::engine_config_from_settings;
use seedflow::core::seed::SeedingPolicy;
use seedflow::dispatch_log::DispatchLog;
use seedflow::engine::utils::format_duration;
use seedflow::engine::{Engine, EngineConfig, EngineStats, RecordingDownloader};
use seedflow::scheduler::SchedulerType;
use seedflow::seed_file::SeedListSpider;
use seedflow::settings::Settings;
use tokio::runtime::Runtime;

#[derive(Parser)]
#[command(
    name = "seedflow",
    about = "Seeding and scheduling coordinator for crawl engines",
    version,
    author,
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a crawl over a seed file and print the dispatch order
    #[command(name = "crawl")]
    Crawl {
        /// Seed file: one `URL [priority]` or `@policy NAME` per line
        seeds_file: String,

        /// Seeding policy (greedy, lazy, front_load, idle)
        #[arg(short, long)]
        policy: Option<String>,

        /// Scheduler type (memory, priority)
        #[arg(long)]
        scheduler: Option<String>,

        /// Settings file to use (.toml or .json)
        #[arg(short, long)]
        settings: Option<String>,

        /// Simulated download latency in milliseconds
        #[arg(long, default_value_t = 0)]
        latency_ms: u64,
    },

    /// List the recognized seeding policies
    #[command(name = "policies")]
    Policies,

    /// Show version information
    #[command(name = "version")]
    Version,
}

fn main() {
    let cli = Cli::parse();

    env_logger::init();

    match cli.command {
        Commands::Crawl {
            seeds_file,
            policy,
            scheduler,
            settings,
            latency_ms,
        } => {
            crawl(
                &seeds_file,
                policy.as_deref(),
                scheduler.as_deref(),
                settings.as_deref(),
                latency_ms,
            );
        }
        Commands::Policies => {
            list_policies();
        }
        Commands::Version => {
            show_version();
        }
    }
}

fn crawl(
    seeds_file: &str,
    policy: Option<&str>,
    scheduler: Option<&str>,
    settings_path: Option<&str>,
    latency_ms: u64,
) {
    let config = build_config(policy, scheduler, settings_path);

    let spider = match SeedListSpider::from_file(seeds_file) {
        Ok(spider) => spider,
        Err(e) => {
            eprintln!("Error loading seeds from {}: {}", seeds_file, e);
            process::exit(1);
        }
    };
    if spider.request_count() == 0 {
        warn!("Seed file {} contains no requests", seeds_file);
    }

    let mut downloader = RecordingDownloader::new();
    if latency_ms > 0 {
        downloader = downloader.with_latency(Duration::from_millis(latency_ms));
    }
    let downloader = downloader.shared();

    let runtime = match Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error creating runtime: {}", e);
            process::exit(1);
        }
    };

    println!("Crawling seeds from {}", seeds_file);
    println!("Seeding policy: {}", config.seeding_policy);
    println!("Scheduler: {}", config.scheduler_type);

    let result = runtime.block_on(async {
        let mut engine = Engine::new(Arc::new(spider), downloader).with_config(config);
        let dispatched = DispatchLog::attach(&engine).await?;

        let shutdown = engine.shutdown_token();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Interrupted, stopping crawl");
                shutdown.cancel();
            }
        });

        let stats = engine.run().await;
        print_dispatch_order(&dispatched);
        stats
    });

    match result {
        Ok(stats) => print_stats(&stats),
        Err(e) => {
            eprintln!("Crawl failed: {}", e);
            process::exit(1);
        }
    }
}

fn build_config(
    policy: Option<&str>,
    scheduler: Option<&str>,
    settings_path: Option<&str>,
) -> EngineConfig {
    let settings = match settings_path {
        Some(path) => load_settings(path),
        None => Settings::default(),
    };

    let mut config = match engine_config_from_settings(&settings) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid settings: {}", e);
            process::exit(1);
        }
    };

    if let Some(policy) = policy {
        config.seeding_policy = match policy.parse::<SeedingPolicy>() {
            Ok(policy) => policy,
            Err(e) => {
                eprintln!("{}", e);
                eprintln!("Run `seedflow policies` to list the recognized policies.");
                process::exit(1);
            }
        };
    }

    if let Some(scheduler) = scheduler {
        config.scheduler_type = match scheduler.parse::<SchedulerType>() {
            Ok(scheduler) => scheduler,
            Err(e) => {
                eprintln!("{}", e);
                process::exit(1);
            }
        };
    }

    config
}

fn print_dispatch_order(dispatched: &DispatchLog) {
    if dispatched.is_empty() {
        return;
    }
    println!("\nDispatch order:");
    for (index, url) in dispatched.urls().iter().enumerate() {
        println!("{:>5}  {}", index + 1, url);
    }
}

fn print_stats(stats: &EngineStats) {
    println!("\nCrawl {}", stats.finish_reason.as_deref().unwrap_or("finished"));
    println!("  requests:          {}", stats.request_count);
    println!("  from seeds:        {}", stats.seed_request_count);
    println!("  from scheduler:    {}", stats.scheduler_request_count);
    println!("  follow-ups:        {}", stats.follow_up_count);
    println!("  responses:         {}", stats.response_count);
    println!("  errors:            {}", stats.error_count);
    println!("  policy overrides:  {}", stats.policy_override_count);
    println!("  invalid policies:  {}", stats.invalid_policy_count);
    println!("  heartbeats:        {}", stats.heartbeat_count);
    if let Some(duration) = stats.duration() {
        println!("  duration:          {}", format_duration(duration));
    }
    if let Some(rps) = stats.requests_per_second() {
        println!("  requests/sec:      {:.2}", rps);
    }
}

fn list_policies() {
    let default = SeedingPolicy::default();
    for policy in SeedingPolicy::ALL {
        let marker = if policy == default { " (default)" } else { "" };
        println!("{}{}", policy, marker);
    }
}

fn show_version() {
    println!("seedflow version {}", env!("CARGO_PKG_VERSION"));
    println!("Seeding and scheduling coordinator for crawl engines");
}

fn load_settings(settings_path: &str) -> Settings {
    match Settings::from_file(Path::new(settings_path)) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error loading settings from {}: {}", settings_path, e);
            process::exit(1);
        }
    }
}
