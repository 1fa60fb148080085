//! rumord - epidemic gossip simulation
//!
//! This crate provides:
//! - Nodes holding a payload and an append-only event log
//! - Concurrent gossip rounds with per-peer failure isolation
//! - Unresponsive peer notices triggered by failed sends
//! - Interval scheduling of rounds over a bounded run
//! - Per-node log persistence after the run

pub mod cluster;
pub mod config;
pub mod engine;
pub mod log_sink;
pub mod node;
pub mod notifier;
pub mod scheduler;
pub mod simulation;

pub use cluster::Cluster;
pub use config::Config;
pub use engine::{GossipEngine, RoundReport};
pub use log_sink::{FileLogSink, LogFormat, LogSink};
pub use node::Node;
pub use notifier::FailureNotifier;
pub use scheduler::Scheduler;
pub use simulation::Simulation;
