//! Node ownership and full-mesh wiring

use crate::engine::{GossipEngine, RoundReport};
use crate::node::{Node, NodeError};
use crate::notifier::FailureNotifier;
use rumor_core::{NodeId, Payload};
use rumor_net::{Latency, Transport};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Cluster construction errors
#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("Node count must be positive")]
    InvalidNodeCount,
    #[error("Node count {0} exceeds the id space")]
    TooManyNodes(usize),
    #[error("Wiring failed: {0}")]
    Wiring(#[from] NodeError),
}

/// Owns every node of a simulation
///
/// Nodes are created and fully wired before the cluster is handed out, so no
/// round ever observes a partially initialized peer set. Peers only hold weak
/// handles; the cluster is the single strong owner.
pub struct Cluster {
    nodes: Vec<Arc<Node>>,
}

impl Cluster {
    /// Create `node_count` nodes with ids `1..=node_count` in a full mesh
    pub fn new(
        node_count: usize,
        transport: Arc<dyn Transport>,
        latency: Arc<dyn Latency>,
    ) -> Result<Self, ClusterError> {
        if node_count == 0 {
            return Err(ClusterError::InvalidNodeCount);
        }
        let count = u32::try_from(node_count).map_err(|_| ClusterError::TooManyNodes(node_count))?;

        let engine = Arc::new(GossipEngine::new(
            transport,
            FailureNotifier::new(latency.clone()),
        ));

        let nodes: Vec<Arc<Node>> = (1..=count)
            .map(NodeId)
            .map(|id| Node::new(id, Payload::initial(id), engine.clone(), latency.clone()))
            .collect();

        for node in &nodes {
            let peers: BTreeMap<NodeId, _> = nodes
                .iter()
                .filter(|peer| peer.id() != node.id())
                .map(|peer| (peer.id(), Arc::downgrade(peer)))
                .collect();
            node.set_peers(peers)?;
        }

        info!("Created {} nodes in a full mesh", nodes.len());

        Ok(Self { nodes })
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All nodes in id order
    pub fn nodes(&self) -> &[Arc<Node>] {
        &self.nodes
    }

    pub fn ids(&self) -> Vec<NodeId> {
        self.nodes.iter().map(|n| n.id()).collect()
    }

    pub fn node(&self, id: NodeId) -> Option<Arc<Node>> {
        let index = (id.get() as usize).checked_sub(1)?;
        self.nodes.get(index).cloned()
    }

    /// Run one round from the given node and wait for it to finish
    pub async fn gossip_from(&self, id: NodeId) -> Option<RoundReport> {
        let node = self.node(id)?;
        Some(node.gossip().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rumor_core::Event;
    use rumor_net::{NoLatency, SimulatedTransport, UniformLatency};

    fn quiet_cluster(n: usize) -> Cluster {
        let latency: Arc<dyn Latency> = Arc::new(NoLatency);
        Cluster::new(n, Arc::new(SimulatedTransport::new(latency.clone())), latency).unwrap()
    }

    #[test]
    fn test_zero_nodes_rejected() {
        let latency: Arc<dyn Latency> = Arc::new(NoLatency);
        let result = Cluster::new(0, Arc::new(SimulatedTransport::new(latency.clone())), latency);
        assert!(matches!(result, Err(ClusterError::InvalidNodeCount)));
    }

    #[test]
    fn test_full_mesh() {
        for n in 1..=8 {
            let cluster = quiet_cluster(n);
            assert_eq!(cluster.len(), n);
            for node in cluster.nodes() {
                let peers = node.peer_ids();
                assert_eq!(peers.len(), n - 1);
                assert!(!peers.contains(&node.id()));
            }
        }
    }

    #[test]
    fn test_node_lookup() {
        let cluster = quiet_cluster(3);
        assert_eq!(cluster.ids(), vec![NodeId(1), NodeId(2), NodeId(3)]);
        assert_eq!(cluster.node(NodeId(2)).unwrap().id(), NodeId(2));
        assert!(cluster.node(NodeId(0)).is_none());
        assert!(cluster.node(NodeId(4)).is_none());
    }

    #[tokio::test]
    async fn test_three_node_round() {
        let cluster = quiet_cluster(3);
        let initial = Payload::initial(NodeId(1));

        let report = cluster.gossip_from(NodeId(1)).await.unwrap();
        assert_eq!(report.delivered, vec![NodeId(2), NodeId(3)]);

        let source_log = cluster.node(NodeId(1)).unwrap().log();
        assert_eq!(source_log.len(), 2);
        let mut sent: Vec<_> = source_log
            .iter()
            .filter_map(|r| match r.event {
                Event::SentTo { peer } => Some(peer),
                _ => None,
            })
            .collect();
        sent.sort();
        assert_eq!(sent, vec![NodeId(2), NodeId(3)]);

        for id in [2, 3] {
            let node = cluster.node(NodeId(id)).unwrap();
            assert_eq!(node.payload(), initial);
            let log = node.log();
            assert_eq!(log.len(), 1);
            assert_eq!(log[0].event, Event::Received);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_overlapping_rounds_share_a_peer() {
        let latency: Arc<dyn Latency> = Arc::new(UniformLatency::from_millis(5));
        let cluster = Arc::new(
            Cluster::new(3, Arc::new(SimulatedTransport::new(latency.clone())), latency).unwrap(),
        );

        // Rounds from 1 and 2 both reach 3, and also reach each other
        let a = tokio::spawn({
            let cluster = cluster.clone();
            async move { cluster.gossip_from(NodeId(1)).await }
        });
        let b = tokio::spawn({
            let cluster = cluster.clone();
            async move { cluster.gossip_from(NodeId(2)).await }
        });

        let joined = tokio::time::timeout(std::time::Duration::from_secs(10), async {
            (a.await.unwrap(), b.await.unwrap())
        })
        .await
        .expect("overlapping rounds deadlocked");
        assert_eq!(joined.0.unwrap().attempted, 2);
        assert_eq!(joined.1.unwrap().attempted, 2);

        let shared = cluster.node(NodeId(3)).unwrap();
        let log = shared.log();
        assert_eq!(log.len(), 2);
        assert!(log.iter().all(|r| r.event == Event::Received));
        let payload = shared.payload();
        assert!(
            payload == Payload::initial(NodeId(1)) || payload == Payload::initial(NodeId(2)),
            "unexpected payload {}",
            payload
        );

        // Sources: two sends each plus one receive from the other round
        assert_eq!(cluster.node(NodeId(1)).unwrap().log_len(), 3);
        assert_eq!(cluster.node(NodeId(2)).unwrap().log_len(), 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_rounds_from_every_node_at_once() {
        let latency: Arc<dyn Latency> = Arc::new(UniformLatency::from_millis(3));
        let cluster = Arc::new(
            Cluster::new(5, Arc::new(SimulatedTransport::new(latency.clone())), latency).unwrap(),
        );

        let mut rounds = tokio::task::JoinSet::new();
        for id in cluster.ids() {
            let cluster = cluster.clone();
            rounds.spawn(async move { cluster.gossip_from(id).await });
        }
        while let Some(res) = rounds.join_next().await {
            assert_eq!(res.unwrap().unwrap().delivered.len(), 4);
        }

        // Every node sent 4 and received 4
        for node in cluster.nodes() {
            assert_eq!(node.log_len(), 8);
        }
    }
}
