//! conn-dispatcher: inspect and exercise connection dispatchers
//!
//! Reads dispatch profiles from a YAML file and:
//! - Validates them against the known strategies
//! - Simulates the failover order handed to individual requests
//! - Stress tests shared dispatchers under live profile reloads

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use conn_dispatcher::{
    config::{AppConfig, LogFormat, LoggingConfig},
    failover_candidates, ConnPool, DispatchProfile, DispatcherRegistry, Strategy,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

#[derive(Parser)]
#[command(name = "conn-dispatcher")]
#[command(version = "0.1.0")]
#[command(about = "Inspect and exercise connection dispatchers")]
#[command(long_about = "
conn-dispatcher loads dispatch profiles and shows how requests are routed:
  - Validate profiles and print their canonical connection order
  - Simulate the failover candidates handed to each request
  - Stress shared dispatchers while profiles are reloaded

Example usage:
  conn-dispatcher check-config --config config.yaml
  conn-dispatcher simulate --profile example.org:DSP1 --requests 5
")]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, default_value = "config.yaml")]
    config: PathBuf,

    /// Set logging level (trace, debug, info, warn, error)
    #[arg(long, global = true, value_name = "LEVEL")]
    log_level: Option<LogLevel>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List all supported dispatch strategies
    ListStrategies {
        /// Show detailed information
        #[arg(short, long)]
        verbose: bool,
    },

    /// Validate configuration file
    CheckConfig,

    /// Print the connections each simulated request would try
    Simulate {
        /// Only simulate this profile ("tenant:id")
        #[arg(short, long)]
        profile: Option<String>,
        /// Number of requests per profile
        #[arg(short, long, default_value_t = 3)]
        requests: usize,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Hammer the dispatchers from several threads while reloading profiles
    Stress {
        /// Worker threads
        #[arg(short, long, default_value_t = 8)]
        threads: usize,
        /// Requests per worker thread
        #[arg(short, long, default_value_t = 10_000)]
        iterations: usize,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // logging settings come from the config when it is readable
    let logging = AppConfig::from_file(&cli.config)
        .map(|c| c.logging)
        .unwrap_or_default();
    init_tracing(cli.log_level, &logging);

    match cli.command {
        Commands::ListStrategies { verbose } => {
            list_strategies(verbose);
        }
        Commands::CheckConfig => {
            check_config(cli.config)?;
        }
        Commands::Simulate {
            profile,
            requests,
            json,
        } => {
            simulate(cli.config, profile, requests, json)?;
        }
        Commands::Stress {
            threads,
            iterations,
        } => {
            stress(cli.config, threads, iterations)?;
        }
    }

    Ok(())
}

fn init_tracing(level: Option<LogLevel>, logging: &LoggingConfig) {
    let level_filter = if let Some(level) = level {
        level.to_string()
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&logging.level))
            .to_string()
    };
    let filter = tracing_subscriber::EnvFilter::new(&level_filter);

    match logging.format {
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
        LogFormat::Compact => tracing_subscriber::fmt().compact().with_env_filter(filter).init(),
        LogFormat::Json => tracing_subscriber::fmt().json().with_env_filter(filter).init(),
    }
}

/// List all supported strategies
fn list_strategies(verbose: bool) {
    println!("Supported dispatch strategies:\n");

    for strategy in Strategy::ALL {
        if verbose {
            println!("  {}:", strategy);
            println!("    {}", strategy.description());
            println!();
        } else {
            println!("  {:16} - {}", strategy.name(), strategy.description());
        }
    }

    if verbose {
        println!("\nProfiles select a strategy in config.yaml:");
        println!("\nprofiles:");
        println!("  - tenant: example.org");
        println!("    id: DSP1");
        println!("    strategy: \"*weight\"");
        println!("    conns:");
        println!("      - id: conn1");
        println!("        weight: 20");
    }
}

/// Validate configuration file
fn check_config(config_path: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config_or_exit(&config_path);
    if let Err(e) = config.validate() {
        eprintln!("✗ Configuration error: {}", e);
        std::process::exit(1);
    }

    println!("✓ Configuration file is valid\n");
    println!("Logging:");
    println!("  Level: {}", config.logging.level);
    println!("  Format: {:?}", config.logging.format);
    println!("\nProfiles: {}", config.profiles.len());
    for profile in &config.profiles {
        let pool = ConnPool::from_profile(profile)?;
        println!("\n  {} ({})", profile.tenant_id(), profile.strategy);
        for conn in pool.iter() {
            let blocker = if conn.blocker { " [blocker]" } else { "" };
            println!("    {:24} weight={}{}", conn.id, conn.weight, blocker);
        }
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct SimulatedRequest {
    profile: String,
    request: usize,
    candidates: Vec<String>,
}

/// Simulate requests against every (or one) profile
fn simulate(
    config_path: PathBuf,
    only_profile: Option<String>,
    requests: usize,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config_or_exit(&config_path);
    let registry = DispatcherRegistry::from_profiles(&config.profiles)?;

    let profile_ids = match only_profile {
        Some(id) if registry.get(&id).is_some() => vec![id],
        Some(id) => return Err(format!("Unknown profile: '{}'", id).into()),
        None => registry.profile_ids(),
    };

    let mut results = Vec::new();
    for profile in &profile_ids {
        for request in 1..=requests {
            let Some(instance) = registry.instance(profile) else {
                continue;
            };
            results.push(SimulatedRequest {
                profile: profile.clone(),
                request,
                candidates: failover_candidates(instance.as_ref()),
            });
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        for result in &results {
            println!(
                "{:24} request {:>4}: {}",
                result.profile,
                result.request,
                result.candidates.join(" -> ")
            );
        }
    }
    Ok(())
}

/// Same connections with the weight order inverted
fn reversed(profile: &DispatchProfile) -> DispatchProfile {
    let mut profile = profile.clone();
    for conn in &mut profile.conns {
        conn.weight = -conn.weight;
    }
    profile
}

/// Run workers against the shared registry while one thread keeps reloading profiles
fn stress(
    config_path: PathBuf,
    threads: usize,
    iterations: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config_or_exit(&config_path);
    if config.profiles.is_empty() {
        return Err("No profiles configured".into());
    }
    let known = match config.conn_ids_by_profile() {
        Ok(known) => known,
        Err(e) => {
            eprintln!("✗ Configuration error: {}", e);
            std::process::exit(1);
        }
    };
    let registry = DispatcherRegistry::from_profiles(&config.profiles)?;
    let profile_ids = registry.profile_ids();

    tracing::info!(
        threads,
        iterations,
        profiles = profile_ids.len(),
        "Starting stress run"
    );
    let started = std::time::Instant::now();
    let reloads = AtomicUsize::new(0);
    let done = AtomicBool::new(false);

    let counts = std::thread::scope(|s| {
        s.spawn(|| {
            let mut flip = false;
            while !done.load(Ordering::Relaxed) {
                for profile in &config.profiles {
                    let next = if flip { profile.clone() } else { reversed(profile) };
                    if let Err(e) = registry.upsert(&next) {
                        tracing::error!(error = %e, "Reload failed");
                    }
                }
                flip = !flip;
                reloads.fetch_add(1, Ordering::Relaxed);
                std::thread::yield_now();
            }
        });

        let workers: Vec<_> = (0..threads)
            .map(|worker| {
                let registry = &registry;
                let profile_ids = &profile_ids;
                s.spawn(move || {
                    let mut counts: BTreeMap<(String, String), usize> = BTreeMap::new();
                    for i in 0..iterations {
                        let profile = &profile_ids[(worker + i) % profile_ids.len()];
                        let Some(instance) = registry.instance(profile) else {
                            continue;
                        };
                        for id in failover_candidates(instance.as_ref()) {
                            *counts.entry((profile.clone(), id)).or_default() += 1;
                        }
                    }
                    counts
                })
            })
            .collect();

        let mut total: BTreeMap<(String, String), usize> = BTreeMap::new();
        for worker in workers {
            match worker.join() {
                Ok(counts) => {
                    for (key, n) in counts {
                        *total.entry(key).or_default() += n;
                    }
                }
                Err(_) => tracing::error!("Stress worker panicked"),
            }
        }
        done.store(true, Ordering::Relaxed);
        total
    });

    let mut foreign = 0usize;
    println!("Stress run finished in {:.2?}", started.elapsed());
    println!(
        "  Reloads: {}",
        reloads.load(Ordering::Relaxed)
    );
    for ((profile, id), n) in &counts {
        let ok = known.get(profile).is_some_and(|ids| ids.contains(id));
        if !ok {
            foreign += 1;
        }
        println!("  {:24} {:24} {:>10}{}", profile, id, n, if ok { "" } else { "  ✗ unknown" });
    }

    if foreign > 0 {
        return Err(format!("{} connection ids outside the configured pools", foreign).into());
    }
    println!("✓ Every id belonged to a configured pool");
    Ok(())
}

/// Load configuration or exit with error
fn load_config_or_exit(config_path: &PathBuf) -> AppConfig {
    match AppConfig::from_file(config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            eprintln!("\nMake sure you have a config.yaml file.");
            eprintln!("You can copy config.yaml.default and modify it:");
            eprintln!("  cp config.yaml.default config.yaml");
            std::process::exit(1);
        }
    }
}
