//! Abstract send primitive
//!
//! The gossip engine only needs to know whether a payload reached a peer.
//! Latency and success are not guaranteed; implementations decide both.

use crate::latency::{pause, Latency};
use async_trait::async_trait;
use rumor_core::{NodeId, Payload};
use std::sync::Arc;
use thiserror::Error;

/// Transport errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("Node {0} is unreachable")]
    Unreachable(NodeId),
    #[error("Message from Node {from} to Node {to} was dropped")]
    Dropped { from: NodeId, to: NodeId },
    #[error("Node {0} no longer exists")]
    PeerGone(NodeId),
}

/// Send primitive consumed by the gossip engine
#[async_trait]
pub trait Transport: Send + Sync {
    /// Carry `payload` from `from` to `to`, resolving once the outcome is known
    async fn send(
        &self,
        from: NodeId,
        to: NodeId,
        payload: &Payload,
    ) -> Result<(), TransportError>;
}

/// Reference transport: waits a network delay, then always succeeds
pub struct SimulatedTransport {
    latency: Arc<dyn Latency>,
}

impl SimulatedTransport {
    pub fn new(latency: Arc<dyn Latency>) -> Self {
        Self { latency }
    }
}

#[async_trait]
impl Transport for SimulatedTransport {
    async fn send(
        &self,
        _from: NodeId,
        _to: NodeId,
        _payload: &Payload,
    ) -> Result<(), TransportError> {
        pause(self.latency.network_delay()).await;
        Ok(())
    }
}
