//! Fault-injecting transport
//!
//! Wraps another transport and fails sends to configured nodes, or at random
//! with a fixed probability. The wrapped transport is only consulted for sends
//! that survive fault injection; injected failures still wait out a network
//! delay before resolving.

use crate::latency::{pause, Latency};
use crate::transport::{Transport, TransportError};
use async_trait::async_trait;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rumor_core::{NodeId, Payload};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Fault injection settings
#[derive(Debug, Clone, Default)]
pub struct FaultConfig {
    /// Every send addressed to one of these nodes fails
    pub unreachable: BTreeSet<NodeId>,
    /// Probability in `[0, 1]` that any other send is dropped
    pub drop_rate: f64,
    /// Seed for the drop decision RNG
    pub seed: Option<u64>,
}

impl FaultConfig {
    /// Fail every send to the given nodes, drop nothing else
    pub fn unreachable(nodes: impl IntoIterator<Item = NodeId>) -> Self {
        Self {
            unreachable: nodes.into_iter().collect(),
            ..Default::default()
        }
    }

    /// Whether this configuration injects any fault at all
    pub fn is_active(&self) -> bool {
        !self.unreachable.is_empty() || self.drop_rate > 0.0
    }
}

/// Send counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransportCounters {
    pub attempted: u64,
    pub failed: u64,
}

/// Transport wrapper that injects send failures
pub struct FaultyTransport<T> {
    inner: T,
    config: FaultConfig,
    latency: Arc<dyn Latency>,
    rng: Mutex<StdRng>,
    attempted: AtomicU64,
    failed: AtomicU64,
}

impl<T: Transport> FaultyTransport<T> {
    pub fn new(inner: T, config: FaultConfig, latency: Arc<dyn Latency>) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            inner,
            config,
            latency,
            rng: Mutex::new(rng),
            attempted: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        }
    }

    /// Snapshot of send counters
    pub fn counters(&self) -> TransportCounters {
        TransportCounters {
            attempted: self.attempted.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }

    fn should_drop(&self) -> bool {
        self.config.drop_rate > 0.0 && self.rng.lock().gen_bool(self.config.drop_rate.min(1.0))
    }

    fn inject(&self, from: NodeId, to: NodeId) -> Result<(), TransportError> {
        if self.config.unreachable.contains(&to) {
            return Err(TransportError::Unreachable(to));
        }
        if self.should_drop() {
            return Err(TransportError::Dropped { from, to });
        }
        Ok(())
    }
}

#[async_trait]
impl<T: Transport> Transport for FaultyTransport<T> {
    async fn send(
        &self,
        from: NodeId,
        to: NodeId,
        payload: &Payload,
    ) -> Result<(), TransportError> {
        self.attempted.fetch_add(1, Ordering::Relaxed);

        let result = match self.inject(from, to) {
            Ok(()) => self.inner.send(from, to, payload).await,
            Err(e) => {
                pause(self.latency.network_delay()).await;
                debug!("Injected fault on {} -> {}: {}", from, to, e);
                Err(e)
            }
        };

        if result.is_err() {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::latency::NoLatency;
    use crate::transport::SimulatedTransport;
    use std::time::{Duration, Instant};

    fn simulated() -> SimulatedTransport {
        SimulatedTransport::new(Arc::new(NoLatency))
    }

    fn faulty(config: FaultConfig) -> FaultyTransport<SimulatedTransport> {
        FaultyTransport::new(simulated(), config, Arc::new(NoLatency))
    }

    /// Constant delay on every hop
    struct FixedLatency(Duration);

    impl Latency for FixedLatency {
        fn network_delay(&self) -> Duration {
            self.0
        }

        fn processing_delay(&self) -> Duration {
            Duration::ZERO
        }
    }

    #[tokio::test]
    async fn test_unreachable_node_fails() {
        let transport = faulty(FaultConfig::unreachable([NodeId(2)]));
        let payload = Payload::from("data");

        assert_eq!(
            transport.send(NodeId(1), NodeId(2), &payload).await,
            Err(TransportError::Unreachable(NodeId(2)))
        );
        assert!(transport.send(NodeId(1), NodeId(3), &payload).await.is_ok());
        assert!(transport.send(NodeId(2), NodeId(3), &payload).await.is_ok());

        assert_eq!(
            transport.counters(),
            TransportCounters {
                attempted: 3,
                failed: 1
            }
        );
    }

    #[tokio::test]
    async fn test_drop_rate_extremes() {
        let payload = Payload::from("data");

        let always = faulty(FaultConfig {
            drop_rate: 1.0,
            seed: Some(7),
            ..Default::default()
        });
        for to in 2..20 {
            assert!(matches!(
                always.send(NodeId(1), NodeId(to), &payload).await,
                Err(TransportError::Dropped { .. })
            ));
        }

        let never = faulty(FaultConfig::default());
        for to in 2..20 {
            assert!(never.send(NodeId(1), NodeId(to), &payload).await.is_ok());
        }
        assert_eq!(never.counters().failed, 0);
    }

    #[tokio::test]
    async fn test_injected_failure_waits_network_delay() {
        let delay = Duration::from_millis(30);
        let transport = FaultyTransport::new(
            simulated(),
            FaultConfig::unreachable([NodeId(2)]),
            Arc::new(FixedLatency(delay)),
        );

        let start = Instant::now();
        let result = transport
            .send(NodeId(1), NodeId(2), &Payload::from("data"))
            .await;
        assert_eq!(result, Err(TransportError::Unreachable(NodeId(2))));
        assert!(start.elapsed() >= delay);
    }

    #[test]
    fn test_fault_config_activity() {
        assert!(!FaultConfig::default().is_active());
        assert!(FaultConfig::unreachable([NodeId(1)]).is_active());
        assert!(FaultConfig {
            drop_rate: 0.1,
            ..Default::default()
        }
        .is_active());
    }
}
