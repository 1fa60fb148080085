//! Configuration for rumord

use crate::log_sink::LogFormat;
use clap::Parser;
use rumor_core::NodeId;
use rumor_net::FaultConfig;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Console log output style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ConsoleFormat {
    #[default]
    Pretty,
    Json,
}

/// rumord - epidemic gossip simulation
#[derive(Parser, Debug, Clone)]
#[command(name = "rumord")]
#[command(about = "Simulates gossip dissemination across a full mesh of nodes")]
pub struct Config {
    /// Number of nodes in the mesh
    #[arg(short, long, env = "NUM_NODES")]
    pub nodes: usize,

    /// Total run duration in seconds
    #[arg(long, default_value = "10", env = "RUMOR_DURATION_SECS")]
    pub duration_secs: u64,

    /// Interval between gossip rounds in milliseconds
    #[arg(long, default_value = "1000", env = "RUMOR_INTERVAL_MS")]
    pub interval_ms: u64,

    /// Upper bound (exclusive) of simulated network and processing delay
    #[arg(long, default_value = "100")]
    pub max_latency_ms: u64,

    /// Directory the per-node event logs are written to
    #[arg(long, default_value = ".")]
    pub log_dir: PathBuf,

    /// Event log file format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Probability that any single send is dropped
    #[arg(long, default_value = "0.0")]
    pub drop_rate: f64,

    /// Nodes every send to which fails (comma-separated ids)
    #[arg(long, value_delimiter = ',')]
    pub fail_nodes: Vec<NodeId>,

    /// Seed for node selection and drop decisions
    #[arg(long)]
    pub seed: Option<u64>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Console log format
    #[arg(long, value_enum, default_value_t = ConsoleFormat::Pretty)]
    pub console_format: ConsoleFormat,
}

/// Load environment fallbacks from a `.env` file
///
/// With no path the file is searched for from the working directory upwards.
/// Variables already set in the environment win. A missing or unreadable file
/// is not an error; returns the file that was loaded, if any.
pub fn load_env_file(path: Option<&Path>) -> Option<PathBuf> {
    match path {
        Some(path) => dotenvy::from_path(path).ok().map(|()| path.to_path_buf()),
        None => dotenvy::dotenv().ok(),
    }
}

impl Config {
    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.nodes == 0 {
            anyhow::bail!("Node count must be positive");
        }
        if self.duration_secs == 0 {
            anyhow::bail!("Run duration must be positive");
        }
        if self.interval_ms == 0 {
            anyhow::bail!("Gossip interval must be positive");
        }
        if self.interval() > self.duration() {
            anyhow::bail!(
                "Gossip interval ({}ms) exceeds run duration ({}s)",
                self.interval_ms,
                self.duration_secs
            );
        }
        if !(0.0..=1.0).contains(&self.drop_rate) {
            anyhow::bail!("Drop rate must be within [0, 1], got {}", self.drop_rate);
        }
        if let Some(id) = self
            .fail_nodes
            .iter()
            .find(|id| id.get() as usize > self.nodes)
        {
            anyhow::bail!("Failing node {} is outside 1..={}", id, self.nodes);
        }
        Ok(())
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.duration_secs)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn max_latency(&self) -> Duration {
        Duration::from_millis(self.max_latency_ms)
    }

    /// Fault injection settings derived from the command line
    pub fn faults(&self) -> FaultConfig {
        FaultConfig {
            unreachable: self.fail_nodes.iter().copied().collect(),
            drop_rate: self.drop_rate,
            seed: self.seed,
        }
    }
}
