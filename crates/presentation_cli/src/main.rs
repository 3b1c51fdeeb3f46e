//! Ulsan bus CLI
//!
//! Polls the configured bus stops and prints station and per-bus sensor
//! states as JSON.

#![allow(clippy::print_stdout)]

mod runner;
mod settings;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::runner::{Dashboard, check_service};
use crate::settings::AppConfig;

/// Ulsan bus arrival CLI
#[derive(Parser)]
#[command(name = "ulsan-bus")]
#[command(author, version, about = "Ulsan bus arrival sensors", long_about = None)]
struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Path to the TOML configuration file (default: ./ulsan_bus.toml if present)
    #[arg(short, long, global = true, env = "ULSAN_BUS_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll continuously and print one JSON line per sensor on every tick
    Poll {
        /// Override the tick interval in seconds
        #[arg(short, long)]
        tick_secs: Option<u64>,
    },

    /// Run a single polling cycle and print all sensor states
    Once,

    /// Validate the configuration and print a summary
    CheckConfig {
        /// Also query the first configured stop to verify the service key
        #[arg(long)]
        ping: bool,
    },
}

/// Determine log filter level from verbosity count
const fn log_filter_from_verbosity(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Load and validate the configuration
fn load_config(path: Option<&std::path::Path>) -> anyhow::Result<AppConfig> {
    let config = AppConfig::load(path).context("Failed to load configuration")?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {e}"))?;
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over -v when set
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(log_filter_from_verbosity(cli.verbose))
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Poll { tick_secs } => {
            let tick = Duration::from_secs(tick_secs.unwrap_or(config.tick_secs).max(1));
            let mut dashboard = Dashboard::from_config(&config.bus)?;
            let mut interval = tokio::time::interval(tick);

            info!(
                stations = config.bus.stations.len(),
                tick_secs = tick.as_secs(),
                "Polling started"
            );

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let now = config.local_now().map_err(anyhow::Error::msg)?;
                        for state in dashboard.tick(now).await {
                            println!("{}", serde_json::to_string(&state)?);
                        }
                    },
                    _ = tokio::signal::ctrl_c() => {
                        info!("Polling stopped");
                        break;
                    },
                }
            }
        },

        Commands::Once => {
            let mut dashboard = Dashboard::from_config(&config.bus)?;
            let now = config.local_now().map_err(anyhow::Error::msg)?;

            let states = dashboard.tick(now).await;
            info!(buses = dashboard.bus_count(), "Polling cycle complete");

            println!("{}", serde_json::to_string_pretty(&states)?);
        },

        Commands::CheckConfig { ping } => {
            println!("✅ Configuration is valid");
            println!("   Timezone: {}", config.timezone);
            println!("   Tick: {}s", config.tick_secs);
            println!("   API: {}", config.bus.base_url);
            if let Some(issued) = &config.bus.api_issued_date {
                println!("   API key issued: {issued}");
            }
            for station in &config.bus.stations {
                let name = station.name.as_deref().unwrap_or("-");
                println!("   🚏 {} ({name})", station.station_id);
                for window in &station.update_time {
                    let status = if window.parse().is_ok() { "" } else { " ⚠️ malformed" };
                    println!("      🕒 {window}{status}");
                }
                for bus in &station.buses {
                    println!(
                        "      🚌 {} → {}",
                        bus.bus_id,
                        bus.name.as_deref().unwrap_or("-")
                    );
                }
            }

            if ping {
                if check_service(&config.bus).await? {
                    println!("✅ Arrival service answered and accepted the service key");
                } else {
                    anyhow::bail!("Arrival service check failed (see log for details)");
                }
            }
        },
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_filter_verbosity_zero() {
        assert_eq!(log_filter_from_verbosity(0), "warn");
    }

    #[test]
    fn log_filter_verbosity_one() {
        assert_eq!(log_filter_from_verbosity(1), "info");
    }

    #[test]
    fn log_filter_verbosity_two() {
        assert_eq!(log_filter_from_verbosity(2), "debug");
    }

    #[test]
    fn log_filter_verbosity_three_or_more() {
        assert_eq!(log_filter_from_verbosity(3), "trace");
        assert_eq!(log_filter_from_verbosity(10), "trace");
    }

    #[test]
    fn load_config_reports_missing_file() {
        let err = load_config(Some(std::path::Path::new("/nonexistent/ulsan_bus.toml")))
            .unwrap_err();
        assert!(err.to_string().contains("Failed to load configuration"));
    }
}
