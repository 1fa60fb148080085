//! Rumor Core Library
//!
//! Shared vocabulary for the rumor epidemic gossip simulation.
//!
//! # Modules
//!
//! - [`types`]: Node identities, gossip payloads and event log records
//! - [`error`]: Error types

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::*;
