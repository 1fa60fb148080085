//! Error types for rumor-core

use thiserror::Error;

/// Result type alias using our Error
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types
#[derive(Debug, Error)]
pub enum Error {
    /// Node identifier was not a positive integer
    #[error("invalid node id: {0:?}")]
    InvalidNodeId(String),
}
