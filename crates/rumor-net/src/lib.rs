//! Simulated networking for the rumor gossip simulation
//!
//! This crate provides:
//! - Latency providers standing in for network and processing delay
//! - The abstract send primitive used by the gossip engine
//! - A fault-injecting transport for exercising the failure path

pub mod fault;
pub mod latency;
pub mod transport;

pub use fault::{FaultConfig, FaultyTransport, TransportCounters};
pub use latency::{pause, Latency, NoLatency, UniformLatency};
pub use transport::{SimulatedTransport, Transport, TransportError};
