//! Gossip round fan-out

use crate::node::Node;
use crate::notifier::FailureNotifier;
use rumor_core::{Event, NodeId};
use rumor_net::{Transport, TransportError};
use std::collections::BTreeSet;
use std::fmt::Display;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Outcome of one gossip round
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundReport {
    pub source: NodeId,
    /// Number of peers a send was attempted to
    pub attempted: usize,
    /// Peers that received the payload, in id order
    pub delivered: Vec<NodeId>,
    /// Peers whose send failed, in id order
    pub failed: Vec<NodeId>,
}

/// Result of a single peer send
enum SendOutcome {
    Delivered(NodeId),
    Failed(NodeId),
}

/// Drives gossip rounds: one concurrent send per peer, joined before returning
pub struct GossipEngine {
    transport: Arc<dyn Transport>,
    notifier: FailureNotifier,
}

impl GossipEngine {
    pub fn new(transport: Arc<dyn Transport>, notifier: FailureNotifier) -> Self {
        Self {
            transport,
            notifier,
        }
    }

    /// Send the source's current payload to every one of its peers
    ///
    /// Sends are isolated from one another; a failed send is reported to the
    /// remaining peers and recorded, never raised. Returns only after every
    /// send has finished.
    pub async fn run(&self, source: &Arc<Node>) -> RoundReport {
        let payload = source.payload();
        let peers = source.peers();
        let expected: BTreeSet<NodeId> = peers.iter().map(|(id, _)| *id).collect();

        debug!("Node {} starting gossip round to {} peers", source.id(), peers.len());

        let mut tasks = JoinSet::new();
        for (peer_id, peer) in peers {
            let source = source.clone();
            let transport = self.transport.clone();
            let notifier = self.notifier.clone();
            let payload = payload.clone();

            tasks.spawn(async move {
                let sent = match peer {
                    Some(peer) => transport
                        .send(source.id(), peer_id, &payload)
                        .await
                        .map(|()| peer),
                    None => Err(TransportError::PeerGone(peer_id)),
                };

                match sent {
                    Ok(peer) => {
                        info!("Node {} sent data to Node {}: {}", source.id(), peer_id, payload);
                        source.record(Event::SentTo { peer: peer_id });
                        peer.receive_data(payload).await;
                        SendOutcome::Delivered(peer_id)
                    }
                    Err(e) => {
                        report_failure(&notifier, &source, peer_id, &e).await;
                        SendOutcome::Failed(peer_id)
                    }
                }
            });
        }

        let mut delivered = BTreeSet::new();
        let mut failed = BTreeSet::new();
        while let Some(res) = tasks.join_next().await {
            match res {
                Ok(SendOutcome::Delivered(id)) => {
                    delivered.insert(id);
                }
                Ok(SendOutcome::Failed(id)) => {
                    failed.insert(id);
                }
                Err(e) => warn!("Gossip send task from Node {} panicked: {}", source.id(), e),
            }
        }

        // A panicked send never reported back; handle it like any failed send
        let lost: Vec<NodeId> = expected
            .iter()
            .filter(|id| !delivered.contains(*id) && !failed.contains(*id))
            .copied()
            .collect();
        for peer_id in lost {
            report_failure(&self.notifier, source, peer_id, &"send task aborted").await;
            failed.insert(peer_id);
        }

        RoundReport {
            source: source.id(),
            attempted: expected.len(),
            delivered: delivered.into_iter().collect(),
            failed: failed.into_iter().collect(),
        }
    }
}

/// Log a failed send, tell the source's other peers, then record it locally
async fn report_failure(
    notifier: &FailureNotifier,
    source: &Node,
    peer_id: NodeId,
    reason: &(dyn Display + Sync),
) {
    warn!(
        "Node {} encountered an error sending data to Node {}: {}",
        source.id(),
        peer_id,
        reason
    );
    notifier.broadcast(source, peer_id).await;
    source.record(Event::SendFailed { peer: peer_id });
}
