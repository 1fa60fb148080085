//! rumord - epidemic gossip simulation daemon
//!
//! Builds a full mesh of nodes, gossips from a random node at a fixed
//! interval for the configured duration, then writes every node's log.

use clap::Parser;
use rumord::config::{load_env_file, Config, ConsoleFormat};
use rumord::simulation::Simulation;
use std::process::ExitCode;
use tracing::level_filters::LevelFilter;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> ExitCode {
    // Parse configuration, with `.env` values as fallbacks
    let env_file = load_env_file(None);
    let config = Config::parse();

    // Initialize logging
    let level = if config.verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();
    let registry = tracing_subscriber::registry().with(filter);
    match config.console_format {
        ConsoleFormat::Pretty => registry.with(fmt::layer()).init(),
        ConsoleFormat::Json => registry.with(fmt::layer().json()).init(),
    }

    info!(
        "rumord v{} - epidemic gossip simulation",
        env!("CARGO_PKG_VERSION")
    );
    if let Some(path) = env_file {
        info!("Loaded environment from {}", path.display());
    }
    info!(
        "Nodes: {}, duration: {}s, interval: {}ms",
        config.nodes, config.duration_secs, config.interval_ms
    );

    let simulation = match Simulation::new(config) {
        Ok(simulation) => simulation,
        Err(e) => {
            error!("Failed to initialize simulation: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let stats = simulation.run().await;

    info!(
        "Final stats: {} nodes, {} rounds, {} delivered, {} failed sends",
        stats.nodes,
        stats.scheduler.rounds_completed,
        stats.scheduler.sends_delivered,
        stats.scheduler.sends_failed
    );
    if let Some(counters) = stats.transport {
        info!(
            "Fault injection: {} of {} sends failed",
            counters.failed, counters.attempted
        );
    }

    if !stats.persisted.is_complete() {
        warn!("Logs missing for nodes {:?}", stats.persisted.failed);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
