//! Simulation driver: builds the mesh, runs the scheduler, persists logs

use crate::cluster::{Cluster, ClusterError};
use crate::config::Config;
use crate::log_sink::{persist_all, FileLogSink, PersistReport};
use crate::scheduler::{Scheduler, SchedulerError, SchedulerStats};
use rumor_net::{
    FaultyTransport, Latency, SimulatedTransport, Transport, TransportCounters, UniformLatency,
};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Setup errors. These are the only errors that stop a run.
#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Cluster error: {0}")]
    Cluster(#[from] ClusterError),
    #[error("Scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),
}

/// Summary of a completed run
#[derive(Debug, Clone)]
pub struct SimulationStats {
    pub nodes: usize,
    pub scheduler: SchedulerStats,
    pub persisted: PersistReport,
    /// Present when fault injection was enabled
    pub transport: Option<TransportCounters>,
}

/// A configured, ready-to-run simulation
pub struct Simulation {
    cluster: Cluster,
    scheduler: Scheduler,
    sink: FileLogSink,
    faults: Option<Arc<FaultyTransport<SimulatedTransport>>>,
}

impl Simulation {
    /// Validate the configuration and build every component
    pub fn new(config: Config) -> Result<Self, SimulationError> {
        config
            .validate()
            .map_err(|e| SimulationError::InvalidConfig(format!("{:#}", e)))?;

        let scheduler = Scheduler::new(config.interval(), config.duration(), config.seed)?;
        std::fs::create_dir_all(&config.log_dir)?;

        let latency: Arc<dyn Latency> = Arc::new(UniformLatency::new(config.max_latency()));
        let simulated = SimulatedTransport::new(latency.clone());

        let fault_config = config.faults();
        let mut faults = None;
        let transport: Arc<dyn Transport> = if fault_config.is_active() {
            info!(
                "Fault injection enabled: unreachable {:?}, drop rate {}",
                fault_config.unreachable, fault_config.drop_rate
            );
            let faulty = Arc::new(FaultyTransport::new(simulated, fault_config, latency.clone()));
            faults = Some(faulty.clone());
            faulty
        } else {
            Arc::new(simulated)
        };

        let cluster = Cluster::new(config.nodes, transport, latency)?;
        let sink = FileLogSink::new(&config.log_dir, config.log_format);

        Ok(Self {
            cluster,
            scheduler,
            sink,
            faults,
        })
    }

    pub fn cluster(&self) -> &Cluster {
        &self.cluster
    }

    /// Run every round to completion, then write each node's log
    pub async fn run(mut self) -> SimulationStats {
        info!("Starting simulation with {} nodes", self.cluster.len());

        let scheduler = self.scheduler.run(&self.cluster).await;

        info!(
            "Rounds finished: {} started, {} completed, {} sends ({} failed)",
            scheduler.rounds_started,
            scheduler.rounds_completed,
            scheduler.sends_attempted,
            scheduler.sends_failed
        );

        info!("Writing node logs to {}", self.sink.dir().display());
        let persisted = persist_all(&self.sink, self.cluster.nodes());

        SimulationStats {
            nodes: self.cluster.len(),
            scheduler,
            persisted,
            transport: self.faults.as_ref().map(|f| f.counters()),
        }
    }
}
