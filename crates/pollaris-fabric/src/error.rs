//! Error types for fabric operations.

use thiserror::Error;

/// Result type alias for fabric operations.
pub type FabricResult<T> = Result<T, FabricError>;

/// Errors that can occur when talking to the service fabric.
#[derive(Debug, Error)]
pub enum FabricError {
    #[error("no live instances of service {0}")]
    NoInstances(String),

    #[error("dispatch to {node} failed: {reason}")]
    Dispatch { node: String, reason: String },

    #[error("serialization error: {0}")]
    Serialize(String),
}
