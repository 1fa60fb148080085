//! Unresponsive peer notices

use crate::node::Node;
use rumor_core::NodeId;
use rumor_net::{pause, Latency};
use std::sync::Arc;
use tracing::{debug, info};

/// Tells the rest of a node's peers that one of them failed to respond
///
/// Delivery is sequential and best effort. Nothing is retried.
#[derive(Clone)]
pub struct FailureNotifier {
    latency: Arc<dyn Latency>,
}

impl FailureNotifier {
    pub fn new(latency: Arc<dyn Latency>) -> Self {
        Self { latency }
    }

    /// Notify every peer of `initiator` except `failed`. Returns the number of
    /// peers that were reached.
    pub async fn broadcast(&self, initiator: &Node, failed: NodeId) -> usize {
        let mut notified = 0;

        for (peer_id, peer) in initiator.peers() {
            if peer_id == failed || peer_id == initiator.id() {
                continue;
            }

            pause(self.latency.network_delay()).await;

            match peer {
                Some(peer) => {
                    info!(
                        "Node {} notifying Node {} about unresponsive Node {}",
                        initiator.id(),
                        peer_id,
                        failed
                    );
                    peer.handle_unresponsive_node(failed, initiator.id());
                    notified += 1;
                }
                None => debug!(
                    "Node {} skipped notifying dropped Node {}",
                    initiator.id(),
                    peer_id
                ),
            }
        }

        notified
    }
}
