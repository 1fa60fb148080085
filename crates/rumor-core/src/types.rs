//! Core types for the rumor simulation
//!
//! A node is identified by a positive integer, carries a single opaque
//! payload, and keeps an append-only log of [`EventRecord`]s. Records carry
//! no wall-clock time; their per-node sequence number is the ordering key.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// IDENTITY
// =============================================================================

/// Node identity, immutable after creation. Ids start at 1.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Get the raw numeric id
    pub fn get(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for NodeId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl FromStr for NodeId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().parse::<u32>() {
            Ok(0) | Err(_) => Err(Error::InvalidNodeId(s.to_string())),
            Ok(id) => Ok(Self(id)),
        }
    }
}

// =============================================================================
// PAYLOAD
// =============================================================================

/// Current gossip value held by a node. Opaque to the protocol.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Payload(pub String);

impl Payload {
    /// Seed value a node starts with before any gossip
    pub fn initial(id: NodeId) -> Self {
        Self(format!("Initial data from Node {}", id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Payload {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Payload {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// =============================================================================
// EVENT LOG
// =============================================================================

/// Kind of entry in a node's event log
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Event {
    /// Payload was delivered to a peer
    SentTo { peer: NodeId },
    /// Payload was received and applied
    Received,
    /// Delivery to a peer failed
    SendFailed { peer: NodeId },
    /// Another node reported a peer as unresponsive
    PeerUnresponsive { peer: NodeId, reported_by: NodeId },
}

impl Event {
    /// Peer referenced by this event, if any
    pub fn peer(&self) -> Option<NodeId> {
        match self {
            Event::SentTo { peer }
            | Event::SendFailed { peer }
            | Event::PeerUnresponsive { peer, .. } => Some(*peer),
            Event::Received => None,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::SentTo { peer } => write!(f, "Sent to Node {}", peer),
            Event::Received => f.write_str("Received"),
            Event::SendFailed { peer } => write!(f, "Send to Node {} failed", peer),
            Event::PeerUnresponsive { peer, reported_by } => write!(
                f,
                "Node {} reported unresponsive by Node {}",
                peer, reported_by
            ),
        }
    }
}

/// An entry in a node's append-only log
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Insertion index within the owning node's log (dense, from 0)
    pub seq: u64,
    #[serde(flatten)]
    pub event: Event,
}

impl fmt::Display for EventRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.event.fmt(f)
    }
}
