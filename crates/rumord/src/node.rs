//! Gossip node: identity, payload, peers and append-only event log

use crate::engine::{GossipEngine, RoundReport};
use parking_lot::Mutex;
use rumor_core::{Event, EventRecord, NodeId, Payload};
use rumor_net::{pause, Latency};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, OnceLock, Weak};
use thiserror::Error;
use tracing::{info, warn};

/// Node errors
#[derive(Debug, Error)]
pub enum NodeError {
    #[error("Node {0} peers are already wired")]
    AlreadyWired(NodeId),
    #[error("Node {0} cannot be its own peer")]
    SelfPeer(NodeId),
}

/// Mutable state, only touched under the node's state lock
#[derive(Debug)]
struct NodeState {
    payload: Payload,
    log: Vec<EventRecord>,
    /// Peers reported unresponsive by other nodes
    suspects: BTreeSet<NodeId>,
}

impl NodeState {
    fn append(&mut self, event: Event) {
        let seq = self.log.len() as u64;
        self.log.push(EventRecord { seq, event });
    }
}

/// A gossip participant
///
/// Payload and log are guarded by one exclusive lock per node. Concurrent
/// receives race for the payload: the last one to take the lock wins.
pub struct Node {
    id: NodeId,
    /// Non-owning peer handles, set once before any round starts
    peers: OnceLock<BTreeMap<NodeId, Weak<Node>>>,
    state: Mutex<NodeState>,
    /// Held for the whole orchestration of a round started from this node
    round_guard: tokio::sync::Mutex<()>,
    engine: Arc<GossipEngine>,
    latency: Arc<dyn Latency>,
}

impl Node {
    /// Create a node with no peers
    pub fn new(
        id: NodeId,
        payload: Payload,
        engine: Arc<GossipEngine>,
        latency: Arc<dyn Latency>,
    ) -> Arc<Self> {
        Arc::new(Self {
            id,
            peers: OnceLock::new(),
            state: Mutex::new(NodeState {
                payload,
                log: Vec::new(),
                suspects: BTreeSet::new(),
            }),
            round_guard: tokio::sync::Mutex::new(()),
            engine,
            latency,
        })
    }

    /// Wire the peer set. Can only be done once.
    pub fn set_peers(&self, peers: BTreeMap<NodeId, Weak<Node>>) -> Result<(), NodeError> {
        if peers.contains_key(&self.id) {
            return Err(NodeError::SelfPeer(self.id));
        }
        self.peers
            .set(peers)
            .map_err(|_| NodeError::AlreadyWired(self.id))
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Current payload
    pub fn payload(&self) -> Payload {
        self.state.lock().payload.clone()
    }

    /// Snapshot of the event log
    pub fn log(&self) -> Vec<EventRecord> {
        self.state.lock().log.clone()
    }

    pub fn log_len(&self) -> usize {
        self.state.lock().log.len()
    }

    /// Payload and log read under one lock acquisition
    pub fn snapshot(&self) -> (Payload, Vec<EventRecord>) {
        let state = self.state.lock();
        (state.payload.clone(), state.log.clone())
    }

    /// Peers this node has been told are unresponsive
    pub fn suspects(&self) -> BTreeSet<NodeId> {
        self.state.lock().suspects.clone()
    }

    pub fn peer_ids(&self) -> Vec<NodeId> {
        self.peers
            .get()
            .map(|peers| peers.keys().copied().collect())
            .unwrap_or_default()
    }

    pub fn peer_count(&self) -> usize {
        self.peers.get().map(BTreeMap::len).unwrap_or(0)
    }

    /// Peer handles in id order; `None` where the peer has been dropped
    pub fn peers(&self) -> Vec<(NodeId, Option<Arc<Node>>)> {
        self.peers
            .get()
            .map(|peers| {
                peers
                    .iter()
                    .map(|(id, peer)| (*id, peer.upgrade()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Append an event to this node's log
    pub fn record(&self, event: Event) {
        self.state.lock().append(event);
    }

    /// Run one gossip round with this node as the source
    pub async fn gossip(self: &Arc<Self>) -> RoundReport {
        let _round = self.round_guard.lock().await;
        self.engine.run(self).await
    }

    /// Accept a payload from a peer
    ///
    /// Waits out the processing delay, then replaces the payload and logs the
    /// receipt in one critical section.
    pub async fn receive_data(&self, payload: Payload) {
        pause(self.latency.processing_delay()).await;

        info!("Node {} received data: {}", self.id, payload);

        let mut state = self.state.lock();
        state.payload = payload;
        state.append(Event::Received);
    }

    /// Handle a notice that `failed` did not respond to `reported_by`
    pub fn handle_unresponsive_node(&self, failed: NodeId, reported_by: NodeId) {
        warn!(
            "Node {} received notification about unresponsive Node {} from Node {}",
            self.id, failed, reported_by
        );

        let mut state = self.state.lock();
        state.suspects.insert(failed);
        state.append(Event::PeerUnresponsive {
            peer: failed,
            reported_by,
        });
    }
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("peers", &self.peer_ids())
            .finish_non_exhaustive()
    }
}
